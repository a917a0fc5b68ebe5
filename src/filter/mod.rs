//! The filter framework and the filters shipped with this crate.
//!
//! Every filter embeds a [`BaseFilter`], which forwards events to the next stage and keeps track
//! of the open nodes, fields and DEF names. A filter implements [`ContentHandler`] by overriding
//! the calls it is interested in and handing everything else to its base, usually with
//! `forward_events!`.

mod appearance;
mod face_set;
pub mod index;
mod profile;
mod texture;
mod triangles;
mod two_pass;
mod viewpoint;

pub use appearance::AppearanceFilter;
pub use face_set::FaceSetToTriangleFilter;
pub use profile::{MinimizeProfileFilter, Profile};
pub use texture::ImageTextureDedupFilter;
pub use triangles::TriangleToFaceSetFilter;
pub use two_pass::{Pass, TwoPassFilter, TwoPassWrapper};
pub use viewpoint::ModifyViewpointFilter;

use crate::{event::*, *};

/// The shared state of every filter: the downstream handler and the node, field and DEF stacks.
pub struct BaseFilter {
    next: Box<dyn ContentHandler>,
    nodes: Vec<String>,
    fields: Vec<String>,
    defs: Vec<Option<String>>,
}

impl Debug for BaseFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseFilter")
            .field("nodes", &self.nodes)
            .field("fields", &self.fields)
            .field("defs", &self.defs)
            .finish_non_exhaustive()
    }
}

impl Default for BaseFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseFilter {
    /// A base filter connected to a [`NullHandler`].
    pub fn new() -> Self {
        Self {
            next: Box::new(NullHandler),
            nodes: vec![],
            fields: vec![],
            defs: vec![],
        }
    }

    /// Replace the downstream handler.
    pub fn set_content_handler(&mut self, next: Box<dyn ContentHandler>) {
        self.next = next
    }

    /// Remove the downstream handler, leaving a [`NullHandler`] in its place.
    pub fn take_content_handler(&mut self) -> Box<dyn ContentHandler> {
        std::mem::replace(&mut self.next, Box::new(NullHandler))
    }

    /// The next stage. Events sent here bypass this filter's stacks, so they must be
    /// balanced on their own.
    pub fn downstream(&mut self) -> &mut dyn ContentHandler {
        &mut *self.next
    }

    /// The type of the innermost open node.
    pub fn current_node(&self) -> Option<&str> {
        self.nodes.last().map(|s| &**s)
    }

    /// The type of the node enclosing the innermost open node.
    pub fn parent_node(&self) -> Option<&str> {
        self.nodes.iter().rev().nth(1).map(|s| &**s)
    }

    /// The innermost open field.
    pub fn current_field(&self) -> Option<&str> {
        self.fields.last().map(|s| &**s)
    }

    /// The field enclosing the innermost open field.
    pub fn parent_field(&self) -> Option<&str> {
        self.fields.iter().rev().nth(1).map(|s| &**s)
    }

    /// The DEF name of the innermost open node.
    pub fn current_def(&self) -> Option<&str> {
        self.defs.last()?.as_deref()
    }

    /// The number of open nodes.
    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    /// The number of open fields.
    pub fn field_depth(&self) -> usize {
        self.fields.len()
    }
}

impl ContentHandler for BaseFilter {
    fn start_document(&mut self, header: &DocumentHeader) -> Result<()> {
        self.nodes.clear();
        self.fields.clear();
        self.defs.clear();
        self.next.start_document(header)
    }

    fn end_document(&mut self) -> Result<()> {
        self.next.end_document()
    }

    fn profile_decl(&mut self, profile: &str) -> Result<()> {
        self.next.profile_decl(profile)
    }

    fn component_decl(&mut self, component: &str) -> Result<()> {
        self.next.component_decl(component)
    }

    fn meta_decl(&mut self, name: &str, content: &str) -> Result<()> {
        self.next.meta_decl(name, content)
    }

    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()> {
        self.nodes.push(name.into());
        self.defs.push(def.map(Into::into));
        self.next.start_node(name, def)
    }

    fn end_node(&mut self) -> Result<()> {
        self.nodes.pop().ok_or(Error::Protocol("end_node without start_node"))?;
        self.defs.pop();
        self.next.end_node()
    }

    fn start_field(&mut self, name: &str) -> Result<()> {
        self.fields.push(name.into());
        self.next.start_field(name)
    }

    fn field_value(&mut self, value: FieldValue) -> Result<()> {
        self.next.field_value(value)
    }

    fn use_decl(&mut self, def: &str) -> Result<()> {
        self.next.use_decl(def)
    }

    fn end_field(&mut self) -> Result<()> {
        self.fields.pop().ok_or(Error::Protocol("end_field without start_field"))?;
        self.next.end_field()
    }

    fn route_decl(&mut self, route: &Route) -> Result<()> {
        self.next.route_decl(route)
    }
}

/// A stage of the filter chain.
pub trait Filter: ContentHandler {
    /// The embedded base filter.
    fn base_mut(&mut self) -> &mut BaseFilter;

    /// Connect this filter to the next stage.
    fn set_content_handler(&mut self, next: Box<dyn ContentHandler>) {
        self.base_mut().set_content_handler(next)
    }

    /// Disconnect this filter from the next stage and return it.
    fn take_content_handler(&mut self) -> Box<dyn ContentHandler> {
        self.base_mut().take_content_handler()
    }

    /// Configure the filter from the command line flags. The same list is handed to every
    /// filter in the chain, so flags belonging to other filters must be ignored.
    fn set_arguments(&mut self, args: &[String]) -> Result<()> {
        let _ = args;
        Ok(())
    }
}

/// What the open field of a [`NodeMarker`] has received so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldContent {
    /// Nothing yet.
    Empty,
    /// A field value.
    Value,
    /// One or more child nodes.
    Nodes,
    /// A `USE` reference.
    Use,
}

/// Per-node bookkeeping for filters that need more than the [`BaseFilter`] stacks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeMarker {
    /// The node type.
    pub node_name: String,
    /// The open field of this node, if any.
    pub field_name: Option<String>,
    /// What the open field has received.
    pub field_type: Option<FieldContent>,
}

impl NodeMarker {
    /// A marker for a freshly started node.
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            field_name: None,
            field_type: None,
        }
    }

    /// Record that `field` was opened on this node.
    pub fn set_field_data(&mut self, field: &str) {
        self.field_name = Some(field.into());
        self.field_type = Some(FieldContent::Empty);
    }

    /// Record what the open field received.
    pub fn mark(&mut self, content: FieldContent) {
        if self.field_name.is_some() {
            self.field_type = Some(content);
        }
    }

    /// Record that the open field was closed.
    pub fn clear_field(&mut self) {
        self.field_name = None;
        self.field_type = None;
    }

    /// The `"<node>.<field>"` key of the open field.
    pub fn key(&self) -> Option<String> {
        Some(format!("{}.{}", self.node_name, self.field_name.as_ref()?))
    }
}

/// A filter that changes nothing.
#[derive(Debug, Default)]
pub struct IdentityFilter {
    base: BaseFilter,
}

impl IdentityFilter {
    /// A new identity filter.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentHandler for IdentityFilter {
    forward_events! {
        start_document, end_document, profile_decl, component_decl, meta_decl,
        start_node, end_node, start_field, field_value, use_decl, end_field, route_decl,
    }
}

impl Filter for IdentityFilter {
    fn base_mut(&mut self) -> &mut BaseFilter {
        &mut self.base
    }
}

fn flag_position(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
}

/// Is `flag` present in the argument list?
pub(crate) fn has_flag(args: &[String], flag: &str) -> bool {
    flag_position(args, flag).is_some()
}

/// The single token following `flag`, if the flag is present.
pub(crate) fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    match flag_position(args, flag) {
        None => Ok(None),
        Some(i) => match args.get(i + 1) {
            Some(v) => Ok(Some(v)),
            None => Err(Error::InvalidArgument(format!("{} expects a value", flag))),
        },
    }
}

/// The `N` numbers following `flag`, if the flag is present. Fewer than `N` tokens, or tokens
/// that are not numbers, are an argument error.
pub(crate) fn flag_floats<const N: usize>(args: &[String], flag: &str) -> Result<Option<[f32; N]>> {
    let i = match flag_position(args, flag) {
        None => return Ok(None),
        Some(i) => i,
    };
    let mut res = [0.; N];
    for (k, out) in res.iter_mut().enumerate() {
        let tok = args.get(i + 1 + k).ok_or_else(|| {
            Error::InvalidArgument(format!("{} expects {} numbers, found {}", flag, N, k))
        })?;
        *out = tok.parse().map_err(|_| {
            Error::InvalidArgument(format!("{}: '{}' is not a number", flag, tok))
        })?;
    }
    Ok(Some(res))
}
