use crate::*;

/// The payload of a single field, as delivered by [`ContentHandler::field_value`].
///
/// Importers that do not know a field's declared type (the XML importer, for one) deliver the
/// attribute text as [`FieldValue::String`]; consumers that need typed data go through
/// [`to_ints`](Self::to_ints), [`to_floats`](Self::to_floats) and friends, which accept either
/// form.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A single string, or raw field text.
    String(String),
    /// A list of strings (`MFString`).
    StringArray(Vec<String>),
    /// `SFInt32`
    Int(i32),
    /// `MFInt32`
    IntArray(Vec<i32>),
    /// `SFFloat`
    Float(f32),
    /// `MFFloat` and the float vector types, flattened.
    FloatArray(Vec<f32>),
    /// `SFBool`
    Bool(bool),
    /// `MFBool`
    BoolArray(Vec<bool>),
    /// `SFDouble`, `SFTime`
    Double(f64),
    /// `MFDouble`, `MFTime` and the double vector types, flattened.
    DoubleArray(Vec<f64>),
    /// A 64 bit integer.
    Long(i64),
    /// A list of 64 bit integers.
    LongArray(Vec<i64>),
}

fn tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| c.is_ascii_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

fn parse_tokens<T: FromStr>(s: &str, what: &str) -> Result<Vec<T>> {
    tokens(s)
        .map(|t| {
            t.parse()
                .map_err(|_| Error::Str(format!("'{}' is not a valid {}", t, what)))
        })
        .collect()
}

fn parse_bool(s: &str) -> Result<bool> {
    match s {
        "TRUE" | "true" => Ok(true),
        "FALSE" | "false" => Ok(false),
        _ => Err(format!("'{}' is not a boolean", s).into()),
    }
}

/// Splits `MFString` text like `"a.png" "b \"x\".png"` into its strings.
/// Text without any quote is taken as a single unquoted string.
pub(crate) fn parse_mfstring(s: &str) -> Result<Vec<String>> {
    let s = s.trim();
    if !s.starts_with('"') {
        return Ok(if s.is_empty() { vec![] } else { vec![s.to_owned()] });
    }
    let mut res = vec![];
    let mut it = s.chars();
    loop {
        match it.by_ref().find(|c| !c.is_ascii_whitespace() && *c != ',') {
            None => return Ok(res),
            Some('"') => {}
            Some(c) => return Err(format!("unexpected '{}' in string list", c).into()),
        }
        let mut cur = String::new();
        loop {
            match it.next() {
                None => return Err("unterminated string in string list".into()),
                Some('"') => break,
                Some('\\') => cur.push(it.next().ok_or("dangling escape in string list")?),
                Some(c) => cur.push(c),
            }
        }
        res.push(cur);
    }
}

impl FieldValue {
    /// The value as a list of 32 bit integers.
    pub fn to_ints(&self) -> Result<Vec<i32>> {
        match self {
            FieldValue::Int(i) => Ok(vec![*i]),
            FieldValue::IntArray(v) => Ok(v.clone()),
            FieldValue::Long(i) => Ok(vec![i32::try_from(*i).map_err(|_| "integer overflow")?]),
            FieldValue::LongArray(v) => v
                .iter()
                .map(|&i| i32::try_from(i).map_err(|_| "integer overflow".into()))
                .collect(),
            FieldValue::String(s) => parse_tokens(s, "integer"),
            _ => Err("expected integer data".into()),
        }
    }

    /// The value as a list of single precision floats.
    pub fn to_floats(&self) -> Result<Vec<f32>> {
        match self {
            FieldValue::Float(f) => Ok(vec![*f]),
            FieldValue::FloatArray(v) => Ok(v.clone()),
            FieldValue::Double(f) => Ok(vec![*f as f32]),
            FieldValue::DoubleArray(v) => Ok(v.iter().map(|&f| f as f32).collect()),
            FieldValue::Int(i) => Ok(vec![*i as f32]),
            FieldValue::IntArray(v) => Ok(v.iter().map(|&i| i as f32).collect()),
            FieldValue::String(s) => parse_tokens(s, "number"),
            _ => Err("expected numeric data".into()),
        }
    }

    /// The value as a list of strings.
    pub fn to_strings(&self) -> Result<Vec<String>> {
        match self {
            FieldValue::StringArray(v) => Ok(v.clone()),
            FieldValue::String(s) => parse_mfstring(s),
            _ => Err("expected string data".into()),
        }
    }

    /// The value as a single boolean.
    pub fn to_bool(&self) -> Result<bool> {
        match self {
            FieldValue::Bool(b) => Ok(*b),
            FieldValue::BoolArray(v) if v.len() == 1 => Ok(v[0]),
            FieldValue::String(s) => parse_bool(s.trim()),
            _ => Err("expected a boolean".into()),
        }
    }

    /// Does this value hold a list rather than a single item?
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            FieldValue::StringArray(_)
                | FieldValue::IntArray(_)
                | FieldValue::FloatArray(_)
                | FieldValue::BoolArray(_)
                | FieldValue::DoubleArray(_)
                | FieldValue::LongArray(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_text_is_parsed_on_demand() {
        let v = FieldValue::String("0 1, 2 -1".into());
        assert_eq!(v.to_ints().unwrap(), [0, 1, 2, -1]);
        assert_eq!(v.to_floats().unwrap(), [0., 1., 2., -1.]);
        assert!(FieldValue::String("1 x".into()).to_ints().is_err());
        assert!(FieldValue::String("TRUE".into()).to_bool().unwrap());
        assert!(!FieldValue::String(" false ".into()).to_bool().unwrap());
        assert!(FieldValue::String("yes".into()).to_bool().is_err());
    }

    #[test]
    fn string_lists() {
        let v = FieldValue::String(r#""a.png" "dir/b \"q\".png""#.into());
        assert_eq!(v.to_strings().unwrap(), ["a.png", r#"dir/b "q".png"#]);
        let v = FieldValue::String("plain.png".into());
        assert_eq!(v.to_strings().unwrap(), ["plain.png"]);
        assert!(FieldValue::String(r#""open"#.into()).to_strings().is_err());
        assert!(FieldValue::String(String::new()).to_strings().unwrap().is_empty());
    }
}
