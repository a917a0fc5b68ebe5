use chrono::{DateTime, NaiveDateTime, Utc};

use super::*;

/// Asset management information: who made the document, when, and in which units and
/// orientation its coordinates are given.
#[derive(Clone, Default, Debug)]
pub struct Asset {
    /// The contributors to the document.
    pub contributor: Vec<Contributor>,
    /// When the document was created.
    pub created: Option<DateTime<Utc>>,
    /// Search keywords.
    pub keywords: Vec<String>,
    /// When the document was last modified.
    pub modified: Option<DateTime<Utc>>,
    /// Revision information.
    pub revision: Option<String>,
    /// The topical subject of the document.
    pub subject: Option<String>,
    /// The title of the document.
    pub title: Option<String>,
    /// The unit of distance.
    pub unit: Unit,
    /// Which axis points up.
    pub up_axis: UpAxis,
}

/// Parses an XML Schema `dateTime`. Values without a time zone are taken as UTC, and values that
/// do not parse at all are dropped with a warning, since exporters are sloppy here.
fn parse_date(element: &Element) -> Result<Option<DateTime<Utc>>> {
    let text = parse_text(element)?;
    let text = text.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(d.with_timezone(&Utc)));
    }
    match NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(d) => Ok(Some(DateTime::from_naive_utc_and_offset(d, Utc))),
        Err(_) => {
            log::warn!("ignoring malformed <{}> date '{}'", element.name(), text);
            Ok(None)
        }
    }
}

impl XNode for Asset {
    const NAME: &'static str = "asset";

    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        let res = Asset {
            contributor: Contributor::parse_list(&mut it)?,
            created: parse_opt("created", &mut it, parse_date)?.flatten(),
            keywords: parse_opt("keywords", &mut it, parse_text)?.map_or_else(Vec::new, |s| {
                s.split_ascii_whitespace().map(|s| s.to_owned()).collect()
            }),
            modified: parse_opt("modified", &mut it, parse_date)?.flatten(),
            revision: parse_opt("revision", &mut it, parse_text)?,
            subject: parse_opt("subject", &mut it, parse_text)?,
            title: parse_opt("title", &mut it, parse_text)?,
            unit: Unit::parse_opt(&mut it)?.unwrap_or_default(),
            up_axis: UpAxis::parse_opt(&mut it)?.unwrap_or_default(),
        };
        finish(res, it)
    }
}

/// Authoring information.
#[derive(Clone, Default, Debug)]
pub struct Contributor {
    /// The author's name
    pub author: Option<String>,
    /// The name of the authoring tool
    pub authoring_tool: Option<String>,
    /// Comments from this contributor
    pub comments: Option<String>,
    /// Copyright information
    pub copyright: Option<String>,
    /// A reference to the source data used for this asset
    pub source_data: Option<Url>,
}

impl XNode for Contributor {
    const NAME: &'static str = "contributor";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        let res = Contributor {
            author: parse_opt("author", &mut it, parse_text)?,
            authoring_tool: parse_opt("authoring_tool", &mut it, parse_text)?,
            comments: parse_opt("comments", &mut it, parse_text)?,
            copyright: parse_opt("copyright", &mut it, parse_text)?,
            source_data: parse_opt("source_data", &mut it, parse_elem)?,
        };
        finish(res, it)
    }
}

/// The unit of distance of the document.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    /// The name of the unit, like "centimeter" or "inch".
    pub name: Option<String>,
    /// How many meters one unit is: 0.01 for "centimeter", 0.3048 for "foot".
    pub meter: f32,
}

impl Default for Unit {
    fn default() -> Self {
        Unit {
            name: None,
            meter: 1.,
        }
    }
}

impl XNode for Unit {
    const NAME: &'static str = "unit";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        Ok(Unit {
            name: element.attr("name").map(Into::into),
            meter: parse_attr(element.attr("meter"))?.unwrap_or(1.),
        })
    }
}

/// Which axis of the document coordinate system points up.
/// All coordinate systems are right-handed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpAxis {
    /// Right: `-y`, Up: `+x`, In: `+z`
    XUp,
    /// Right: `+x`, Up: `+y`, In: `+z`. This is also the X3D convention.
    #[default]
    YUp,
    /// Right: `+x`, Up: `+z`, In: `-y`
    ZUp,
}

impl XNode for UpAxis {
    const NAME: &'static str = "up_axis";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        Ok(match get_text(element).map(str::trim) {
            Some("X_UP") => UpAxis::XUp,
            Some("Y_UP") => UpAxis::YUp,
            Some("Z_UP") => UpAxis::ZUp,
            _ => return Err("invalid <up_axis> value".into()),
        })
    }
}
