use super::*;

/// Describes a stream of values from an array data source.
#[derive(Clone, Debug)]
pub struct Accessor {
    /// The location of the array to access.
    pub source: Url,
    /// The number of times the array is accessed.
    pub count: usize,
    /// The index of the first value to be read from the array.
    pub offset: usize,
    /// The number of values that are to be considered a unit during each access to the array.
    pub stride: usize,
    /// The list of accesses. Params without a name are skipped when reading.
    pub param: Vec<Param>,
}

impl XNode for Accessor {
    const NAME: &'static str = "accessor";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        let res = Accessor {
            source: parse_attr(element.attr("source"))?.ok_or("missing source attr")?,
            count: parse_attr(element.attr("count"))?.ok_or("expected 'count' attr")?,
            offset: parse_attr(element.attr("offset"))?.unwrap_or(0),
            stride: parse_attr(element.attr("stride"))?.unwrap_or(1),
            param: Param::parse_list(&mut it)?,
        };
        if res.stride < res.param.len() {
            return Err("accessor stride does not match params".into());
        }
        finish(res, it)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// The values stored in an array element.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    /// `<float_array>`
    Float(Box<[f32]>),
    /// `<int_array>`
    Int(Box<[i64]>),
    /// `<bool_array>`
    Bool(Box<[bool]>),
    /// `<Name_array>`
    Name(Box<[String]>),
    /// `<IDREF_array>`
    IdRef(Box<[String]>),
}

impl ArrayData {
    /// The number of values.
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Float(v) => v.len(),
            ArrayData::Int(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
            ArrayData::Name(v) | ArrayData::IdRef(v) => v.len(),
        }
    }

    /// Returns true if the array is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A new array of the same kind, holding the values at `indices`.
    fn select(&self, indices: &[usize]) -> Self {
        fn pick<T: Clone>(v: &[T], indices: &[usize]) -> Box<[T]> {
            indices.iter().map(|&i| v[i].clone()).collect()
        }
        match self {
            ArrayData::Float(v) => ArrayData::Float(pick(v, indices)),
            ArrayData::Int(v) => ArrayData::Int(pick(v, indices)),
            ArrayData::Bool(v) => ArrayData::Bool(pick(v, indices)),
            ArrayData::Name(v) => ArrayData::Name(pick(v, indices)),
            ArrayData::IdRef(v) => ArrayData::IdRef(pick(v, indices)),
        }
    }
}

/// A data array element, holding a flat list of values.
#[derive(Clone, Debug)]
pub struct ArrayElement {
    /// A text string containing the unique identifier of the element.
    pub id: Option<String>,
    /// The stored values.
    pub data: ArrayData,
}

impl ArrayElement {
    /// Parse an [`ArrayElement`] from an XML element, if it is one of the array kinds.
    pub fn parse(e: &Element) -> Result<Option<Self>> {
        let text = || get_text(e).unwrap_or_default().split_ascii_whitespace();
        let bad = || Error::Str(format!("parse error in <{}>", e.name()));
        let data = match e.name() {
            "float_array" => ArrayData::Float(
                text()
                    .map(|s| s.parse())
                    .collect::<Result<_, _>>()
                    .map_err(|_| bad())?,
            ),
            "int_array" => ArrayData::Int(
                text()
                    .map(|s| s.parse())
                    .collect::<Result<_, _>>()
                    .map_err(|_| bad())?,
            ),
            "bool_array" => ArrayData::Bool(
                text()
                    .map(parse_bool)
                    .collect::<Option<_>>()
                    .ok_or_else(bad)?,
            ),
            "Name_array" => ArrayData::Name(text().map(Into::into).collect()),
            "IDREF_array" => ArrayData::IdRef(text().map(Into::into).collect()),
            _ => return Ok(None),
        };
        let count: usize = parse_attr(e.attr("count"))?.ok_or("expected 'count' attr")?;
        if data.len() != count {
            return Err(format!("<{}>: 'count' does not match array length", e.name()).into());
        }
        Ok(Some(ArrayElement {
            id: e.attr("id").map(Into::into),
            data,
        }))
    }
}

/// Declares parametric information for its parent element.
#[derive(Clone, Debug)]
pub struct Param {
    /// The text string name of this element. Unnamed params are placeholders.
    pub name: Option<String>,
    /// The type of the value data.
    pub ty: String,
}

impl XNode for Param {
    const NAME: &'static str = "param";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        Ok(Param {
            name: element.attr("name").map(Into::into),
            ty: element.attr("type").ok_or("expecting 'type' attr")?.into(),
        })
    }
}

/// Declares a data repository that provides values according to the semantics of an [`Input`]
/// element that refers to it.
#[derive(Clone, Debug)]
pub struct Source {
    /// A text string containing the unique identifier of the element.
    pub id: Option<String>,
    /// The text string name of this element.
    pub name: Option<String>,
    /// A data array element.
    pub array: Option<ArrayElement>,
    /// The access pattern into the data element.
    pub accessor: Accessor,
}

impl XNode for Source {
    const NAME: &'static str = "source";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        parse_opt("asset", &mut it, |_| Ok(()))?;
        let res = Source {
            id: element.attr("id").map(Into::into),
            name: element.attr("name").map(Into::into),
            array: parse_opt_many(&mut it, ArrayElement::parse)?,
            accessor: parse_one("technique_common", &mut it, |e| {
                let mut it = e.children().peekable();
                finish(Accessor::parse_one(&mut it)?, it)
            })?,
        };
        finish(res, it)
    }
}

impl Source {
    /// The number of values per element after re-packing: the number of named params.
    pub fn width(&self) -> usize {
        self.accessor.param.iter().filter(|p| p.name.is_some()).count()
    }

    /// The number of elements.
    pub fn count(&self) -> usize {
        self.accessor.count
    }

    /// The values of the source, re-packed according to the accessor: element `i` starts at
    /// `offset + i * stride` in the array, and only the slots of named params are kept.
    ///
    /// Only arrays inside this source can be read; an accessor pointing anywhere else is a
    /// format error.
    pub fn source_data(&self) -> Result<ArrayData> {
        let acc = &self.accessor;
        let array = match (&self.array, acc.source.fragment()) {
            (Some(arr), Some(id)) if arr.id.as_deref() == Some(id) => arr,
            _ => return Err(format!("unresolved accessor source {}", acc.source).into()),
        };
        let slots: Vec<usize> = acc
            .param
            .iter()
            .enumerate()
            .filter(|(_, p)| p.name.is_some())
            .map(|(j, _)| j)
            .collect();
        if slots.last().map_or(false, |&j| j >= acc.stride) {
            return Err(format!("accessor of {:?} has more params than its stride", self.id).into());
        }
        let end = acc
            .count
            .checked_mul(acc.stride)
            .and_then(|n| n.checked_add(acc.offset));
        if end.map_or(true, |end| end > array.data.len()) {
            return Err(format!("array is too short for accessor of {:?}", self.id).into());
        }
        let mut indices = Vec::with_capacity(acc.count * slots.len());
        for i in 0..acc.count {
            let base = acc.offset + i * acc.stride;
            indices.extend(slots.iter().map(|j| base + j));
        }
        Ok(array.data.select(&indices))
    }

    /// Like [`source_data`](Self::source_data), but requires numeric values, converted to
    /// floats.
    pub fn float_data(&self) -> Result<Box<[f32]>> {
        match self.source_data()? {
            ArrayData::Float(v) => Ok(v),
            ArrayData::Int(v) => Ok(v.iter().map(|&i| i as f32).collect()),
            _ => Err(format!("source {:?} is not numeric", self.id).into()),
        }
    }
}

mk_extensible_enum! {
    /// An [`Input`] semantic attribute. Common values are pre-parsed,
    /// and the remainder are in the `Other` variant.
    pub enum Semantic {
        /// Geometric binormal (bitangent) vector
        Binormal = "BINORMAL",
        /// Color coordinate vector
        Color = "COLOR",
        /// Sampler input
        Input = "INPUT",
        /// Tangent vector for preceding control point
        InTangent = "IN_TANGENT",
        /// Sampler interpolation type
        Interpolation = "INTERPOLATION",
        /// Normal vector
        Normal = "NORMAL",
        /// Sampler output
        Output = "OUTPUT",
        /// Tangent vector for succeeding control point
        OutTangent = "OUT_TANGENT",
        /// Geometric coordinate vector
        Position = "POSITION",
        /// Geometric tangent vector
        Tangent = "TANGENT",
        /// Texture binormal (bitangent) vector
        TexBinormal = "TEXBINORMAL",
        /// Texture coordinate vector
        TexCoord = "TEXCOORD",
        /// Texture tangent vector
        TexTangent = "TEXTANGENT",
        /// Mesh vertex
        Vertex = "VERTEX",
    }
}

/// Declares the input semantics of a data source and connects a consumer to that source.
/// In the COLLADA spec this is called "`<input>` (unshared)".
#[derive(Clone, Debug)]
pub struct Input {
    /// The user-defined meaning of the input connection.
    pub semantic: Semantic,
    /// The location of the data source: a [`Vertices`] for [`Semantic::Vertex`], otherwise a
    /// [`Source`].
    pub source: Url,
}

impl XNode for Input {
    const NAME: &'static str = "input";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        Ok(Input {
            semantic: parse_attr(element.attr("semantic"))?.ok_or("missing semantic attr")?,
            source: parse_attr(element.attr("source"))?.ok_or("missing source attr")?,
        })
    }
}

impl Input {
    /// Typecast `self.source` as a `UrlRef<Source>`.
    pub fn source_as_source(&self) -> &UrlRef<Source> {
        debug_assert!(!matches!(self.semantic, Semantic::Vertex));
        UrlRef::from_url(&self.source)
    }

    /// Typecast `self.source` as a `UrlRef<Vertices>`.
    pub fn source_as_vertices(&self) -> &UrlRef<Vertices> {
        debug_assert!(matches!(self.semantic, Semantic::Vertex));
        UrlRef::from_url(&self.source)
    }
}

/// An input with an offset into the index list of a primitive.
/// In the COLLADA spec this is called "`<input>` (shared)".
#[derive(Clone, Debug)]
pub struct InputS {
    /// [`InputS`] inherits from [`Input`].
    pub input: Input,
    /// The offset into each index tuple of the parent primitive.
    /// Inputs with the same offset are indexed the same.
    pub offset: u32,
    /// Which inputs to group as a single set.
    pub set: Option<u32>,
}

impl Deref for InputS {
    type Target = Input;
    fn deref(&self) -> &Self::Target {
        &self.input
    }
}

impl XNode for InputS {
    const NAME: &'static str = "input";
    fn parse(element: &Element) -> Result<Self> {
        Ok(InputS {
            input: Input::parse(element)?,
            offset: parse_attr(element.attr("offset"))?.ok_or("missing offset attr")?,
            set: parse_attr(element.attr("set"))?,
        })
    }
}

/// Wraps a group of inputs and precalculates the `stride` field.
#[derive(Clone, Default, Debug)]
pub struct InputList {
    /// The list of inputs.
    pub inputs: Vec<InputS>,
    /// The largest offset plus one: the number of indices per vertex in the primitive.
    pub stride: usize,
}

impl Deref for InputList {
    type Target = Vec<InputS>;

    fn deref(&self) -> &Self::Target {
        &self.inputs
    }
}

impl InputList {
    /// Construct a new `InputList` from a list of inputs.
    pub fn new(inputs: Vec<InputS>) -> Self {
        let stride = inputs.iter().map(|i| i.offset).max().map_or(0, |n| n + 1) as usize;
        Self { inputs, stride }
    }

    /// The first input with the given semantic, preferring the lowest `set`.
    pub fn get(&self, semantic: &Semantic) -> Option<&InputS> {
        self.inputs
            .iter()
            .filter(|i| i.semantic == *semantic)
            .min_by_key(|i| i.set.unwrap_or(0))
    }
}

/// Declares the attributes and identity of mesh-vertices.
#[derive(Clone, Debug)]
pub struct Vertices {
    /// A text string containing the unique identifier of the element.
    pub id: String,
    /// The text string name of this element.
    pub name: Option<String>,
    /// The per-vertex inputs. One of them must have [`Semantic::Position`].
    pub inputs: Vec<Input>,
}

impl XNode for Vertices {
    const NAME: &'static str = "vertices";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        let res = Vertices {
            id: element.attr("id").ok_or("missing 'id' attr")?.into(),
            name: element.attr("name").map(Into::into),
            inputs: Input::parse_list(&mut it)?,
        };
        if !res.inputs.iter().any(|i| i.semantic == Semantic::Position) {
            return Err("<vertices> needs a POSITION input".into());
        }
        finish(res, it)
    }
}

impl Vertices {
    /// The input with the given semantic.
    pub fn get(&self, semantic: &Semantic) -> Option<&Input> {
        self.inputs.iter().find(|i| i.semantic == *semantic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(xml: &str) -> Source {
        let xml = xml.replace("<source", r#"<source xmlns="http://www.collada.org/2005/11/COLLADASchema""#);
        let e: Element = xml.parse().unwrap();
        Source::parse(&e).unwrap()
    }

    #[test]
    fn accessor_repacks_the_array() {
        let s = source(
            r##"<source id="s">
  <float_array id="a" count="10">9 1 2 3 4 5 6 7 8 9</float_array>
  <technique_common>
    <accessor source="#a" count="3" offset="1" stride="3">
      <param name="X" type="float"/>
      <param type="float"/>
      <param name="Z" type="float"/>
    </accessor>
  </technique_common>
</source>"##,
        );
        assert_eq!(s.width(), 2);
        let data = s.source_data().unwrap();
        assert_eq!(data, ArrayData::Float(vec![1., 3., 4., 6., 7., 9.].into()));
        assert_eq!(s.source_data().unwrap(), data);
    }

    #[test]
    fn bad_sources_are_format_errors() {
        let s = source(
            r##"<source id="s">
  <float_array id="a" count="2">0 1</float_array>
  <technique_common>
    <accessor source="#elsewhere" count="1" stride="2">
      <param name="S" type="float"/><param name="T" type="float"/>
    </accessor>
  </technique_common>
</source>"##,
        );
        assert!(s.source_data().is_err());
        let e: Element = r#"<float_array xmlns="http://www.collada.org/2005/11/COLLADASchema" count="3">1 2</float_array>"#
            .parse()
            .unwrap();
        assert!(ArrayElement::parse(&e).is_err());
    }

    #[test]
    fn huge_counts_are_too_short() {
        let s = source(&format!(
            r##"<source id="s">
  <float_array id="a" count="2">0 1</float_array>
  <technique_common>
    <accessor source="#a" count="{}" stride="2">
      <param name="S" type="float"/><param name="T" type="float"/>
    </accessor>
  </technique_common>
</source>"##,
            usize::MAX / 2 + 1
        ));
        assert!(s.source_data().is_err());
        let s = source(&format!(
            r##"<source id="s">
  <float_array id="a" count="2">0 1</float_array>
  <technique_common>
    <accessor source="#a" count="1" offset="{}" stride="2">
      <param name="S" type="float"/><param name="T" type="float"/>
    </accessor>
  </technique_common>
</source>"##,
            usize::MAX
        ));
        assert!(s.source_data().is_err());
    }
}
