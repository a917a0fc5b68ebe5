use std::{
    fmt::{Debug, Display},
    marker::PhantomData,
    ops::Deref,
    str::FromStr,
};

use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, CONTROLS};
use ref_cast::RefCast;

/// https://url.spec.whatwg.org/#fragment-percent-encode-set
const FRAGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// A reference as it appears in a COLLADA `url`, `source` or `target` attribute.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Url {
    /// A same-document reference `#id`, stored decoded.
    Fragment(String),
    /// Anything else, kept verbatim.
    Other(String),
}

impl Url {
    /// The referenced id, if this is a same-document reference.
    pub fn fragment(&self) -> Option<&str> {
        match self {
            Url::Fragment(s) => Some(s),
            Url::Other(_) => None,
        }
    }
}

impl FromStr for Url {
    type Err = std::str::Utf8Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut it = s.chars();
        Ok(if it.next() == Some('#') {
            Url::Fragment(percent_decode_str(it.as_str()).decode_utf8()?.into())
        } else {
            Url::Other(s.into())
        })
    }
}

impl Display for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fragment(s) => write!(f, "#{}", percent_encode(s.as_bytes(), FRAGMENT)),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl Debug for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.to_string(), f)
    }
}

/// A [`Url`] that is known to point at a `T`.
///
/// This only documents intent, the target type is not checked at parse time, but it lets
/// [`LocalMaps::get`](crate::collada::LocalMaps::get) infer which table to search.
#[derive(RefCast)]
#[repr(transparent)]
pub struct UrlRef<T: ?Sized> {
    /// The raw reference.
    pub val: Url,
    _marker: PhantomData<T>,
}

impl<T: ?Sized> UrlRef<T> {
    /// Wrap a raw reference.
    pub fn new(val: Url) -> Self {
        Self {
            val,
            _marker: PhantomData,
        }
    }

    /// View a raw reference as a typed one.
    pub fn from_url(url: &Url) -> &Self {
        Self::ref_cast(url)
    }
}

impl<T: ?Sized> Clone for UrlRef<T> {
    fn clone(&self) -> Self {
        Self::new(self.val.clone())
    }
}

impl<T: ?Sized> Debug for UrlRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.val.fmt(f)
    }
}

impl<T: ?Sized> Deref for UrlRef<T> {
    type Target = Url;

    fn deref(&self) -> &Self::Target {
        &self.val
    }
}

impl<T: ?Sized> FromStr for UrlRef<T> {
    type Err = std::str::Utf8Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::from_str(s).map(UrlRef::new)
    }
}
