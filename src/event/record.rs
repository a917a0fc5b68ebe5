use std::{cell::RefCell, rc::Rc};

use super::*;

/// An owned, replayable recording of an event stream.
///
/// `EventBuffer` is itself a [`ContentHandler`]: every call is appended as an [`Event`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventBuffer(Vec<Event>);

impl EventBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, e: Event) {
        self.0.push(e)
    }

    /// Remove every recorded event.
    pub fn clear(&mut self) {
        self.0.clear()
    }

    /// Send every recorded event, in order, to `handler`. The buffer is left intact.
    pub fn replay<H: ContentHandler + ?Sized>(&self, handler: &mut H) -> Result<()> {
        self.0.iter().try_for_each(|e| e.send_to(handler))
    }

    /// Like [`replay`](Self::replay), but consumes the buffer.
    pub fn replay_owned<H: ContentHandler + ?Sized>(self, handler: &mut H) -> Result<()> {
        self.0.into_iter().try_for_each(|e| e.send_owned(handler))
    }

    /// The recorded events.
    pub fn into_events(self) -> Vec<Event> {
        self.0
    }
}

impl Deref for EventBuffer {
    type Target = [Event];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Event>> for EventBuffer {
    fn from(v: Vec<Event>) -> Self {
        Self(v)
    }
}

impl ContentHandler for EventBuffer {
    fn start_document(&mut self, header: &DocumentHeader) -> Result<()> {
        self.push(Event::StartDocument(header.clone()));
        Ok(())
    }
    fn end_document(&mut self) -> Result<()> {
        self.push(Event::EndDocument);
        Ok(())
    }
    fn profile_decl(&mut self, profile: &str) -> Result<()> {
        self.push(Event::Profile(profile.into()));
        Ok(())
    }
    fn component_decl(&mut self, component: &str) -> Result<()> {
        self.push(Event::Component(component.into()));
        Ok(())
    }
    fn meta_decl(&mut self, name: &str, content: &str) -> Result<()> {
        self.push(Event::Meta {
            name: name.into(),
            content: content.into(),
        });
        Ok(())
    }
    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()> {
        self.push(Event::start_node(name, def));
        Ok(())
    }
    fn end_node(&mut self) -> Result<()> {
        self.push(Event::EndNode);
        Ok(())
    }
    fn start_field(&mut self, name: &str) -> Result<()> {
        self.push(Event::StartField(name.into()));
        Ok(())
    }
    fn field_value(&mut self, value: FieldValue) -> Result<()> {
        self.push(Event::Value(value));
        Ok(())
    }
    fn use_decl(&mut self, def: &str) -> Result<()> {
        self.push(Event::UseDecl(def.into()));
        Ok(())
    }
    fn end_field(&mut self) -> Result<()> {
        self.push(Event::EndField);
        Ok(())
    }
    fn route_decl(&mut self, route: &Route) -> Result<()> {
        self.push(Event::Route(route.clone()));
        Ok(())
    }
}

/// A recording handler whose buffer stays reachable after the handler itself has been moved
/// into a filter chain.
#[derive(Clone, Debug, Default)]
pub struct SharedRecorder(Rc<RefCell<EventBuffer>>);

impl SharedRecorder {
    /// Create a recorder, and return it together with a handle to its buffer.
    pub fn new() -> (Self, Rc<RefCell<EventBuffer>>) {
        let buf = Rc::new(RefCell::new(EventBuffer::new()));
        (Self(buf.clone()), buf)
    }
}

macro_rules! record_into {
    ($($name:ident($($arg:ident: $ty:ty),*);)*) => {
        impl ContentHandler for SharedRecorder {
            $(fn $name(&mut self, $($arg: $ty),*) -> Result<()> {
                self.0.borrow_mut().$name($($arg),*)
            })*
        }
    }
}

record_into! {
    start_document(header: &DocumentHeader);
    end_document();
    profile_decl(profile: &str);
    component_decl(component: &str);
    meta_decl(name: &str, content: &str);
    start_node(name: &str, def: Option<&str>);
    end_node();
    start_field(name: &str);
    field_value(value: FieldValue);
    use_decl(def: &str);
    end_field();
    route_decl(route: &Route);
}
