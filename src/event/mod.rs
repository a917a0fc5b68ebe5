//! The event protocol spoken between importers, filters and writers.
//!
//! A document is delivered as a well nested sequence of calls on a [`ContentHandler`]:
//!
//! ```text
//! start_document
//!   profile_decl component_decl* meta_decl*
//!   ( start_node
//!       ( start_field (field_value | (use_decl | start_node .. end_node)*) end_field )*
//!     end_node
//!   | route_decl )*
//! end_document
//! ```
//!
//! Every `start_field` is closed by exactly one `end_field`, whatever it contained. A `use_decl`
//! stands for one node of its field, so a `children` field may mix references and new nodes.
//! Root nodes are not wrapped in a field.

mod record;
mod value;

pub use record::{EventBuffer, SharedRecorder};
pub(crate) use value::parse_mfstring;
pub use value::FieldValue;

use crate::*;

/// The header information delivered with [`ContentHandler::start_document`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentHeader {
    /// Where the document was read from, if known.
    pub uri: Option<String>,
    /// The specification version, like `"3.2"`.
    pub version: String,
    /// The specification name, always `"X3D"` for documents produced by this crate.
    pub spec: String,
}

impl DocumentHeader {
    /// A header for an X3D document of the given version.
    pub fn x3d(version: impl Into<String>) -> Self {
        Self {
            uri: None,
            version: version.into(),
            spec: "X3D".into(),
        }
    }
}

impl Default for DocumentHeader {
    fn default() -> Self {
        Self::x3d("3.2")
    }
}

/// A `ROUTE` statement connecting an output field of one DEF'ed node to an input of another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// DEF name of the source node.
    pub from_node: String,
    /// The output field of the source node.
    pub from_field: String,
    /// DEF name of the destination node.
    pub to_node: String,
    /// The input field of the destination node.
    pub to_field: String,
}

impl Route {
    /// Construct a new route.
    pub fn new(
        from_node: impl Into<String>,
        from_field: impl Into<String>,
        to_node: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self {
            from_node: from_node.into(),
            from_field: from_field.into(),
            to_node: to_node.into(),
            to_field: to_field.into(),
        }
    }
}

/// The receiving side of the event protocol. See the [module documentation](self) for the
/// order in which calls arrive.
pub trait ContentHandler {
    /// The document begins.
    fn start_document(&mut self, header: &DocumentHeader) -> Result<()>;
    /// The document is complete.
    fn end_document(&mut self) -> Result<()>;
    /// The profile the document claims to need, like `Immersive`.
    fn profile_decl(&mut self, profile: &str) -> Result<()>;
    /// An additional component, in `name:level` form.
    fn component_decl(&mut self, component: &str) -> Result<()>;
    /// A document level name/content metadata pair.
    fn meta_decl(&mut self, name: &str, content: &str) -> Result<()>;
    /// A node of type `name` begins, optionally introduced under a DEF name.
    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()>;
    /// The innermost open node ends.
    fn end_node(&mut self) -> Result<()>;
    /// A field of the innermost open node begins.
    fn start_field(&mut self, name: &str) -> Result<()>;
    /// The value of the innermost open field.
    fn field_value(&mut self, value: FieldValue) -> Result<()>;
    /// The innermost open field holds a reference to a DEF'ed node.
    fn use_decl(&mut self, def: &str) -> Result<()>;
    /// The innermost open field ends.
    fn end_field(&mut self) -> Result<()>;
    /// A route between two DEF'ed nodes.
    fn route_decl(&mut self, route: &Route) -> Result<()>;

    /// Send a complete field holding a single value.
    fn value_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        self.start_field(name)?;
        self.field_value(value)?;
        self.end_field()
    }
}

impl<T: ContentHandler + ?Sized> ContentHandler for Box<T> {
    fn start_document(&mut self, header: &DocumentHeader) -> Result<()> {
        (**self).start_document(header)
    }
    fn end_document(&mut self) -> Result<()> {
        (**self).end_document()
    }
    fn profile_decl(&mut self, profile: &str) -> Result<()> {
        (**self).profile_decl(profile)
    }
    fn component_decl(&mut self, component: &str) -> Result<()> {
        (**self).component_decl(component)
    }
    fn meta_decl(&mut self, name: &str, content: &str) -> Result<()> {
        (**self).meta_decl(name, content)
    }
    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()> {
        (**self).start_node(name, def)
    }
    fn end_node(&mut self) -> Result<()> {
        (**self).end_node()
    }
    fn start_field(&mut self, name: &str) -> Result<()> {
        (**self).start_field(name)
    }
    fn field_value(&mut self, value: FieldValue) -> Result<()> {
        (**self).field_value(value)
    }
    fn use_decl(&mut self, def: &str) -> Result<()> {
        (**self).use_decl(def)
    }
    fn end_field(&mut self) -> Result<()> {
        (**self).end_field()
    }
    fn route_decl(&mut self, route: &Route) -> Result<()> {
        (**self).route_decl(route)
    }
}

/// A handler that discards everything. This is the downstream of a filter that has not been
/// connected yet.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullHandler;

impl ContentHandler for NullHandler {
    fn start_document(&mut self, _: &DocumentHeader) -> Result<()> {
        Ok(())
    }
    fn end_document(&mut self) -> Result<()> {
        Ok(())
    }
    fn profile_decl(&mut self, _: &str) -> Result<()> {
        Ok(())
    }
    fn component_decl(&mut self, _: &str) -> Result<()> {
        Ok(())
    }
    fn meta_decl(&mut self, _: &str, _: &str) -> Result<()> {
        Ok(())
    }
    fn start_node(&mut self, _: &str, _: Option<&str>) -> Result<()> {
        Ok(())
    }
    fn end_node(&mut self) -> Result<()> {
        Ok(())
    }
    fn start_field(&mut self, _: &str) -> Result<()> {
        Ok(())
    }
    fn field_value(&mut self, _: FieldValue) -> Result<()> {
        Ok(())
    }
    fn use_decl(&mut self, _: &str) -> Result<()> {
        Ok(())
    }
    fn end_field(&mut self) -> Result<()> {
        Ok(())
    }
    fn route_decl(&mut self, _: &Route) -> Result<()> {
        Ok(())
    }
}

/// One call of the [`ContentHandler`] protocol, as a value.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// [`ContentHandler::start_document`]
    StartDocument(DocumentHeader),
    /// [`ContentHandler::end_document`]
    EndDocument,
    /// [`ContentHandler::profile_decl`]
    Profile(String),
    /// [`ContentHandler::component_decl`]
    Component(String),
    /// [`ContentHandler::meta_decl`]
    Meta {
        /// The metadata key.
        name: String,
        /// The metadata value.
        content: String,
    },
    /// [`ContentHandler::start_node`]
    StartNode {
        /// The node type.
        name: String,
        /// The DEF name, if any.
        def: Option<String>,
    },
    /// [`ContentHandler::use_decl`]
    UseDecl(String),
    /// [`ContentHandler::start_field`]
    StartField(String),
    /// [`ContentHandler::field_value`]
    Value(FieldValue),
    /// [`ContentHandler::end_field`]
    EndField,
    /// [`ContentHandler::end_node`]
    EndNode,
    /// [`ContentHandler::route_decl`]
    Route(Route),
}

impl Event {
    /// Shorthand for a [`Event::StartNode`] event.
    pub fn start_node(name: &str, def: Option<&str>) -> Self {
        Event::StartNode {
            name: name.into(),
            def: def.map(Into::into),
        }
    }

    /// Deliver this event to `handler`.
    pub fn send_to<H: ContentHandler + ?Sized>(&self, handler: &mut H) -> Result<()> {
        match self {
            Event::StartDocument(h) => handler.start_document(h),
            Event::EndDocument => handler.end_document(),
            Event::Profile(p) => handler.profile_decl(p),
            Event::Component(c) => handler.component_decl(c),
            Event::Meta { name, content } => handler.meta_decl(name, content),
            Event::StartNode { name, def } => handler.start_node(name, def.as_deref()),
            Event::UseDecl(def) => handler.use_decl(def),
            Event::StartField(name) => handler.start_field(name),
            Event::Value(v) => handler.field_value(v.clone()),
            Event::EndField => handler.end_field(),
            Event::EndNode => handler.end_node(),
            Event::Route(r) => handler.route_decl(r),
        }
    }

    /// Deliver this event to `handler`, giving away the field value instead of cloning it.
    pub fn send_owned<H: ContentHandler + ?Sized>(self, handler: &mut H) -> Result<()> {
        match self {
            Event::Value(v) => handler.field_value(v),
            e => e.send_to(handler),
        }
    }
}
