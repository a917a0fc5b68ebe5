//! # X3D filter pipeline
//!
//! This crate converts and cleans up X3D scene documents by pushing them through a chain of
//! streaming filters. Nothing is kept as an in-memory scene graph: an importer walks its source
//! document once and emits a stream of structural events (node and field brackets, field values,
//! `USE` references, routes), each filter consumes that stream and produces a new one, and a
//! serializer writes whatever arrives at the end of the chain.
//!
//! The building blocks are:
//!
//! * [`ContentHandler`], the event protocol every stage implements.
//! * [`BaseFilter`] and the [`Filter`] trait, which give every filter transparent forwarding
//!   plus node/field/DEF bookkeeping.
//! * The concrete filters in [`filter`], for example [`TriangleToFaceSetFilter`] or
//!   [`AppearanceFilter`], and the two-pass machinery in [`TwoPassWrapper`].
//! * [`FilterRegistry`] and [`FilterChain`] for building a pipeline from filter names.
//! * Importers: [`X3dImporter`] for X3D XML and [`ColladaImporter`] for `.dae` documents.
//! * [`ClassicWriter`], which writes the classic (VRML-style) encoding.
//!
//! ```
//! use x3d_filter::*;
//!
//! let x3d = r#"<X3D xmlns="http://www.web3d.org/specifications/x3d-namespace"
//!                  profile="Immersive" version="3.2">
//!   <Scene>
//!     <Shape>
//!       <TriangleStripSet stripCount="4">
//!         <Coordinate point="0 0 0 1 0 0 0 1 0 1 1 0"/>
//!       </TriangleStripSet>
//!     </Shape>
//!   </Scene>
//! </X3D>"#;
//!
//! let registry = FilterRegistry::standard();
//! let filters = vec![registry.create("TriangleToIFS").unwrap()];
//! let (recorder, log) = SharedRecorder::new();
//! let mut head = FilterChain::build(filters, Box::new(recorder));
//! X3dImporter::default().import_str(x3d, &mut *head).unwrap();
//!
//! let events = log.borrow();
//! assert!(events.iter().any(|e| matches!(
//!     e,
//!     Event::StartNode { name, .. } if name == "IndexedFaceSet"
//! )));
//! ```

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]

#[macro_use]
mod macros;
pub mod chain;
pub mod collada;
pub mod driver;
pub mod event;
pub mod filter;
mod url;
pub mod writer;
pub mod x3d;

use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    ops::Deref,
    str::FromStr,
};

pub use crate::{
    chain::{FilterChain, FilterKind, FilterRegistry},
    collada::{ColladaImporter, StyleHints},
    driver::{ExitCode, Options},
    event::{
        ContentHandler, DocumentHeader, Event, EventBuffer, FieldValue, NullHandler, Route,
        SharedRecorder,
    },
    filter::{
        AppearanceFilter, BaseFilter, FaceSetToTriangleFilter, Filter, IdentityFilter,
        ImageTextureDedupFilter, MinimizeProfileFilter, ModifyViewpointFilter,
        TriangleToFaceSetFilter, TwoPassFilter, TwoPassWrapper,
    },
    writer::ClassicWriter,
    x3d::X3dImporter,
};
pub use minidom::Element;
pub use url::{Url, UrlRef};

type XReader<R> = minidom::quick_xml::Reader<R>;

/// The main error type used by this crate.
///
/// Every variant maps to exactly one process [`ExitCode`] through [`Error::exit_code`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error during XML parsing.
    #[error("XML parse error: {0}")]
    Parse(#[from] minidom::Error),
    /// A malformed input document, given by a static string.
    #[error("invalid input: {0}")]
    Other(&'static str),
    /// A malformed input document, given by a string.
    #[error("invalid input: {0}")]
    Str(String),
    /// A malformed or missing command line or filter argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A filter name that is not registered.
    #[error("unknown filter '{0}'")]
    InvalidFilter(String),
    /// A file encoding that this crate cannot read or write.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Geometry that cannot be converted without losing its meaning, like polygons with holes.
    #[error("geometry cannot be converted: {0}")]
    Unsupported(String),
    /// The output could not be created or written.
    #[error("cannot write output: {0}")]
    Output(#[source] std::io::Error),
    /// Any other I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The event stream broke the nesting rules (for example `end_node` without `start_node`).
    #[error("event protocol violation: {0}")]
    Protocol(&'static str),
}

impl From<&'static str> for Error {
    fn from(v: &'static str) -> Self {
        Self::Other(v)
    }
}

impl From<String> for Error {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl Error {
    /// The process exit code reported for this error by the driver.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Error::Parse(_) | Error::Other(_) | Error::Str(_) => ExitCode::InvalidInputFile,
            Error::InvalidArgument(_) => ExitCode::InvalidArguments,
            Error::InvalidFilter(_) => ExitCode::InvalidFilterSpecified,
            Error::UnsupportedFormat(_) => ExitCode::UnsupportedFormat,
            Error::Unsupported(_) => ExitCode::NotAllGeometryConvertible,
            Error::Output(_) => ExitCode::CannotWriteOutputFile,
            Error::Io(e) if e.kind() == std::io::ErrorKind::OutOfMemory => ExitCode::OutOfMemory,
            Error::Io(_) => ExitCode::IoException,
            Error::Protocol(_) => ExitCode::ExceptionalError,
        }
    }
}

/// How importers react to input they cannot represent faithfully.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Any such input is an error.
    Strict,
    /// Such input is skipped with a warning.
    #[default]
    Tolerant,
}

impl FromStr for Strictness {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "strict" | "Strict" | "STRICT" => Ok(Self::Strict),
            "tolerant" | "Tolerant" | "TOLERANT" | "lax" => Ok(Self::Tolerant),
            _ => Err(Error::InvalidArgument(format!("unknown parsing strictness '{}'", s))),
        }
    }
}

/// The result type used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type ElementIter<'a> = std::iter::Peekable<minidom::Children<'a>>;

fn get_text(element: &Element) -> Option<&str> {
    let mut it = element.nodes();
    let text = match it.next() {
        None => "",
        Some(s) => s.as_text()?,
    };
    if it.next().is_some() {
        return None;
    }
    Some(text)
}

fn parse_text(element: &Element) -> Result<String> {
    Ok(get_text(element).ok_or("expecting a text node")?.to_owned())
}

fn parse_array<T: FromStr>(e: &Element) -> Result<Box<[T]>> {
    get_text(e)
        .ok_or("expected text node")?
        .split_ascii_whitespace()
        .map(|s| s.parse())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("parse error in <{}>", e.name()).into())
}

fn parse_array_n<T: FromStr, const N: usize>(element: &Element) -> Result<Box<[T; N]>> {
    parse_array(element)?
        .try_into()
        .map_err(|_| format!("<{}>: unexpected number of elements", element.name()).into())
}

fn parse_elem<T: FromStr>(e: &Element) -> Result<T> {
    get_text(e)
        .ok_or("expected text node")?
        .trim()
        .parse()
        .map_err(|_| format!("parse error in <{}>", e.name()).into())
}

fn parse_attr<T: FromStr>(attr: Option<&str>) -> Result<Option<T>> {
    Ok(match attr {
        None => None,
        Some(s) => Some(
            s.parse()
                .map_err(|_| format!("parse failure in attribute value '{}'", s))?,
        ),
    })
}

fn parse_one<'a, T>(
    name: &str,
    it: &mut impl Iterator<Item = &'a Element>,
    f: impl FnOnce(&'a Element) -> Result<T>,
) -> Result<T> {
    let e = it.next().ok_or_else(|| format!("expected <{}>", name))?;
    if e.name() != name {
        return Err(format!("expected <{}>, found <{}>", name, e.name()).into());
    }
    f(e)
}

fn parse_opt<'a, T>(
    name: &str,
    it: &mut ElementIter<'a>,
    f: impl FnOnce(&'a Element) -> Result<T>,
) -> Result<Option<T>> {
    let mut res = None;
    if let Some(&e) = it.peek() {
        if e.name() == name {
            res = Some(f(e)?);
            it.next();
        }
    }
    Ok(res)
}

fn parse_opt_many<'a, T>(
    it: &mut ElementIter<'a>,
    f: impl FnOnce(&'a Element) -> Result<Option<T>>,
) -> Result<Option<T>> {
    let res = match it.peek() {
        None => None,
        Some(&e) => f(e)?,
    };
    if res.is_some() {
        it.next();
    }
    Ok(res)
}

fn parse_list<'a, T>(
    name: &str,
    it: &mut ElementIter<'a>,
    mut f: impl FnMut(&'a Element) -> Result<T>,
) -> Result<Vec<T>> {
    parse_list_many(it, |e| {
        Ok(if e.name() == name { Some(f(e)?) } else { None })
    })
}

fn parse_list_many<'a, T>(
    it: &mut ElementIter<'a>,
    mut f: impl FnMut(&'a Element) -> Result<Option<T>>,
) -> Result<Vec<T>> {
    let mut res = vec![];
    while let Some(&e) = it.peek() {
        match f(e)? {
            Some(t) => res.push(t),
            None => break,
        }
        it.next();
    }
    Ok(res)
}

/// Skips the trailing `<technique>` and `<extra>` elements that exporters attach to almost
/// everything, and rejects anything else.
fn finish<'a, T>(t: T, it: impl Iterator<Item = &'a Element>) -> Result<T> {
    for e in it {
        match e.name() {
            "extra" | "technique" => {}
            name => return Err(format!("unexpected node <{}>", name).into()),
        }
    }
    Ok(t)
}

/// A common trait for all data structures that represent an XML element.
pub trait XNode: Sized {
    /// The name of the XML element.
    const NAME: &'static str;

    /// Parse an XML element into this type. In most cases, the parser will require with a
    /// `debug_assert` that the element to parse has name [`Self::NAME`].
    fn parse(element: &Element) -> Result<Self>;

    /// Parse a single required element from the given element iterator.
    fn parse_one<'a>(it: &mut impl Iterator<Item = &'a Element>) -> Result<Self> {
        parse_one(Self::NAME, it, Self::parse)
    }

    /// Parse an optional element from the given element iterator, using [`Self::NAME`] to
    /// determine if it is the correct type.
    fn parse_opt(it: &mut ElementIter<'_>) -> Result<Option<Self>> {
        parse_opt(Self::NAME, it, Self::parse)
    }

    /// Parse a list of elements from the given element iterator,
    /// as long as it continues yielding elements of name [`Self::NAME`].
    fn parse_list(it: &mut ElementIter<'_>) -> Result<Vec<Self>> {
        parse_list(Self::NAME, it, Self::parse)
    }

    /// Parse a list of elements from the given element iterator,
    /// as long as it continues yielding elements of name [`Self::NAME`],
    /// and assert that the resulting list has length at least `N`.
    fn parse_list_n<const N: usize>(it: &mut ElementIter<'_>) -> Result<Vec<Self>> {
        let arr = parse_list(Self::NAME, it, Self::parse)?;
        if arr.len() < N {
            return Err(format!("parse error: expected {} {} elements", N, Self::NAME).into());
        }
        Ok(arr)
    }

    /// Parse every child of `element` named [`Self::NAME`], in document order,
    /// ignoring the other children.
    fn parse_children(element: &Element) -> Result<Vec<Self>> {
        element
            .children()
            .filter(|e| e.name() == Self::NAME)
            .map(Self::parse)
            .collect()
    }
}
