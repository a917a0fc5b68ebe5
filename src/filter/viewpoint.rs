use super::*;

/// Overrides the fields of `Viewpoint` and `OrthoViewpoint` nodes with values given on the
/// command line.
///
/// Arguments: `-position x y z`, `-orientation x y z a`, `-fieldOfView f`,
/// `-centerOfRotation x y z`, `-description text`, and `-viewpoint DEF` to touch only the
/// viewpoint with that DEF name. `fieldOfView` has a different type on `OrthoViewpoint` and is
/// only applied to `Viewpoint`.
#[derive(Debug, Default)]
pub struct ModifyViewpointFilter {
    base: BaseFilter,
    overrides: Vec<(&'static str, FieldValue)>,
    only: Option<String>,
    /// One entry per open node: is it a viewpoint being modified?
    open: Vec<bool>,
    /// Is the incoming field being replaced?
    skipping: bool,
}

impl ModifyViewpointFilter {
    /// A filter with no overrides; see [`Filter::set_arguments`].
    pub fn new() -> Self {
        Self::default()
    }

    fn applies(&self, node: &str, field: &str) -> bool {
        self.overrides.iter().any(|(f, _)| *f == field)
            && (node == "Viewpoint" || field != "fieldOfView")
    }

    fn modifying(&self) -> bool {
        self.open.last().copied().unwrap_or(false)
    }
}

impl ContentHandler for ModifyViewpointFilter {
    forward_events! {
        start_document, end_document, profile_decl, component_decl, meta_decl, route_decl,
    }

    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()> {
        let modify = matches!(name, "Viewpoint" | "OrthoViewpoint")
            && !self.overrides.is_empty()
            && self.only.as_deref().map_or(true, |only| def == Some(only));
        self.open.push(modify);
        self.base.start_node(name, def)
    }

    fn start_field(&mut self, name: &str) -> Result<()> {
        if self.modifying() {
            if let Some(node) = self.base.current_node() {
                if self.applies(node, name) {
                    self.skipping = true;
                    return Ok(());
                }
            }
        }
        self.base.start_field(name)
    }

    fn field_value(&mut self, value: FieldValue) -> Result<()> {
        if self.skipping {
            return Ok(());
        }
        self.base.field_value(value)
    }

    fn use_decl(&mut self, def: &str) -> Result<()> {
        if self.skipping {
            return Ok(());
        }
        self.base.use_decl(def)
    }

    fn end_field(&mut self) -> Result<()> {
        if std::mem::take(&mut self.skipping) {
            return Ok(());
        }
        self.base.end_field()
    }

    fn end_node(&mut self) -> Result<()> {
        if self.open.pop().unwrap_or(false) {
            let node = self.base.current_node().unwrap_or_default().to_owned();
            for (field, value) in &self.overrides {
                if self.applies(&node, field) {
                    self.base.value_field(field, value.clone())?;
                }
            }
        }
        self.base.end_node()
    }
}

impl Filter for ModifyViewpointFilter {
    fn base_mut(&mut self) -> &mut BaseFilter {
        &mut self.base
    }

    fn set_arguments(&mut self, args: &[String]) -> Result<()> {
        self.overrides.clear();
        if let Some(p) = flag_floats::<3>(args, "-position")? {
            self.overrides.push(("position", FieldValue::FloatArray(p.to_vec())));
        }
        if let Some(o) = flag_floats::<4>(args, "-orientation")? {
            self.overrides.push(("orientation", FieldValue::FloatArray(o.to_vec())));
        }
        if let Some([f]) = flag_floats::<1>(args, "-fieldOfView")? {
            if !(f > 0. && f < std::f32::consts::PI) {
                return Err(Error::InvalidArgument(format!(
                    "-fieldOfView {} is not between 0 and pi",
                    f
                )));
            }
            self.overrides.push(("fieldOfView", FieldValue::Float(f)));
        }
        if let Some(c) = flag_floats::<3>(args, "-centerOfRotation")? {
            self.overrides.push(("centerOfRotation", FieldValue::FloatArray(c.to_vec())));
        }
        if let Some(d) = flag_value(args, "-description")? {
            self.overrides.push(("description", FieldValue::String(d.into())));
        }
        self.only = flag_value(args, "-viewpoint")?.map(Into::into);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::{args, connect};

    fn viewpoint(out: &mut impl ContentHandler, name: &str, def: &str) {
        out.start_node(name, Some(def)).unwrap();
        out.value_field("position", FieldValue::String("0 0 10".into()))
            .unwrap();
        out.value_field("fieldOfView", FieldValue::String("0.785".into()))
            .unwrap();
        out.end_node().unwrap();
    }

    #[test]
    fn overrides_replace_fields() {
        let mut f = ModifyViewpointFilter::new();
        f.set_arguments(&args("-position 1 2 3 -fieldOfView 1.2 -description Front"))
            .unwrap();
        let log = connect(&mut f);
        viewpoint(&mut f, "Viewpoint", "V1");
        viewpoint(&mut f, "OrthoViewpoint", "V2");
        assert_eq!(
            **log.borrow(),
            [
                Event::start_node("Viewpoint", Some("V1")),
                Event::StartField("position".into()),
                Event::Value(FieldValue::FloatArray(vec![1., 2., 3.])),
                Event::EndField,
                Event::StartField("fieldOfView".into()),
                Event::Value(FieldValue::Float(1.2)),
                Event::EndField,
                Event::StartField("description".into()),
                Event::Value(FieldValue::String("Front".into())),
                Event::EndField,
                Event::EndNode,
                Event::start_node("OrthoViewpoint", Some("V2")),
                Event::StartField("fieldOfView".into()),
                Event::Value(FieldValue::String("0.785".into())),
                Event::EndField,
                Event::StartField("position".into()),
                Event::Value(FieldValue::FloatArray(vec![1., 2., 3.])),
                Event::EndField,
                Event::StartField("description".into()),
                Event::Value(FieldValue::String("Front".into())),
                Event::EndField,
                Event::EndNode,
            ]
        );
    }

    #[test]
    fn restricted_to_one_viewpoint() {
        let mut f = ModifyViewpointFilter::new();
        f.set_arguments(&args("-viewpoint V2 -orientation 0 1 0 3.14"))
            .unwrap();
        let log = connect(&mut f);
        let mut input = EventBuffer::new();
        viewpoint(&mut input, "Viewpoint", "V1");
        input.replay(&mut f).unwrap();
        assert_eq!(*log.borrow(), input);
        viewpoint(&mut f, "Viewpoint", "V2");
        assert!(log
            .borrow()
            .contains(&Event::StartField("orientation".into())));
    }

    #[test]
    fn bad_arguments() {
        let mut f = ModifyViewpointFilter::new();
        assert!(f.set_arguments(&args("-orientation 0 1 0")).is_err());
        assert!(f.set_arguments(&args("-fieldOfView 4")).is_err());
        assert!(f.set_arguments(&args("-description")).is_err());
        assert!(f.set_arguments(&args("-diffuse 1 1 1")).is_ok());
    }
}
