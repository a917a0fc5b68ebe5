use super::*;

/// The pass a [`TwoPassFilter`] is in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pass {
    /// The filter sees the document for the first time, and forwards nothing.
    #[default]
    First,
    /// The same document is replayed, and the filter writes its output.
    Second,
}

/// A filter that needs to see the whole document before it can write the beginning of it.
///
/// The passes are switched by [`TwoPassWrapper`], never by the filter itself.
pub trait TwoPassFilter: Filter {
    /// The document is about to be delivered for the first time.
    fn start_first_pass(&mut self);
    /// The document is about to be delivered again.
    fn start_second_pass(&mut self);
}

/// Runs a [`TwoPassFilter`]: the document is recorded while it is fed to the filter, with the
/// filter's downstream disconnected, and replayed to it once `end_document` arrives.
pub struct TwoPassWrapper<F> {
    inner: F,
    buffer: EventBuffer,
    /// The downstream of `inner`, parked during the first pass.
    parked: Option<Box<dyn ContentHandler>>,
}

impl<F: Debug> Debug for TwoPassWrapper<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoPassWrapper")
            .field("inner", &self.inner)
            .field("recorded", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

impl<F: TwoPassFilter> TwoPassWrapper<F> {
    /// Wrap `inner`.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            buffer: EventBuffer::new(),
            parked: None,
        }
    }

    /// The wrapped filter.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    fn handle(&mut self, e: Event) -> Result<()> {
        if self.parked.is_some() {
            e.send_to(&mut self.inner)?;
            self.buffer.push(e);
            Ok(())
        } else {
            e.send_owned(&mut self.inner)
        }
    }
}

impl<F: TwoPassFilter> ContentHandler for TwoPassWrapper<F> {
    fn start_document(&mut self, header: &DocumentHeader) -> Result<()> {
        self.buffer.clear();
        self.inner.start_first_pass();
        self.parked = Some(self.inner.take_content_handler());
        self.handle(Event::StartDocument(header.clone()))
    }

    fn end_document(&mut self) -> Result<()> {
        self.handle(Event::EndDocument)?;
        let Some(next) = self.parked.take() else {
            return Ok(());
        };
        self.inner.set_content_handler(next);
        self.inner.start_second_pass();
        std::mem::take(&mut self.buffer).replay_owned(&mut self.inner)
    }

    fn profile_decl(&mut self, profile: &str) -> Result<()> {
        self.handle(Event::Profile(profile.into()))
    }

    fn component_decl(&mut self, component: &str) -> Result<()> {
        self.handle(Event::Component(component.into()))
    }

    fn meta_decl(&mut self, name: &str, content: &str) -> Result<()> {
        self.handle(Event::Meta {
            name: name.into(),
            content: content.into(),
        })
    }

    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()> {
        self.handle(Event::start_node(name, def))
    }

    fn end_node(&mut self) -> Result<()> {
        self.handle(Event::EndNode)
    }

    fn start_field(&mut self, name: &str) -> Result<()> {
        self.handle(Event::StartField(name.into()))
    }

    fn field_value(&mut self, value: FieldValue) -> Result<()> {
        self.handle(Event::Value(value))
    }

    fn use_decl(&mut self, def: &str) -> Result<()> {
        self.handle(Event::UseDecl(def.into()))
    }

    fn end_field(&mut self) -> Result<()> {
        self.handle(Event::EndField)
    }

    fn route_decl(&mut self, route: &Route) -> Result<()> {
        self.handle(Event::Route(route.clone()))
    }
}

impl<F: TwoPassFilter> Filter for TwoPassWrapper<F> {
    fn base_mut(&mut self) -> &mut BaseFilter {
        self.inner.base_mut()
    }

    fn set_content_handler(&mut self, next: Box<dyn ContentHandler>) {
        match &mut self.parked {
            Some(parked) => *parked = next,
            None => self.inner.set_content_handler(next),
        }
    }

    fn take_content_handler(&mut self) -> Box<dyn ContentHandler> {
        match &mut self.parked {
            Some(parked) => std::mem::replace(parked, Box::new(NullHandler)),
            None => self.inner.take_content_handler(),
        }
    }

    fn set_arguments(&mut self, args: &[String]) -> Result<()> {
        self.inner.set_arguments(args)
    }
}
