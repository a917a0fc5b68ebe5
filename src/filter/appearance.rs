use super::*;

/// Texture nodes. An appearance holding one of these never gets a synthesized material.
const TEXTURE_NODES: &[&str] = &[
    "ImageTexture",
    "MovieTexture",
    "PixelTexture",
    "ImageTexture3D",
    "PixelTexture3D",
    "ComposedTexture3D",
    "MultiTexture",
    "ComposedCubeMapTexture",
    "GeneratedCubeMapTexture",
    "ImageCubeMapTexture",
];

/// Per-vertex color nodes, which replace the material color.
const COLOR_NODES: &[&str] = &["Color", "ColorRGBA"];

#[derive(Clone, Copy, Debug, Default)]
struct Scope {
    appearance_added: bool,
    material_added: bool,
}

/// Makes sure every `Shape` has an `Appearance`, and optionally that every `Appearance` has a
/// `Material`.
///
/// Missing nodes are appended just before the `end_node` of their parent. The synthesized
/// material has `diffuseColor` set to the configured color (`0.8 0.8 0.8` unless `-diffuse` says
/// otherwise). No material is added to an appearance that holds a texture, or to a shape whose
/// geometry carries per-vertex colors.
#[derive(Debug)]
pub struct AppearanceFilter {
    base: BaseFilter,
    add_material: bool,
    force_material: bool,
    diffuse: [f32; 3],
    scopes: Vec<Scope>,
    /// One entry per open `Appearance`: did it open its own scope?
    own_scope: Vec<bool>,
}

impl Default for AppearanceFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl AppearanceFilter {
    /// The default diffuse color of synthesized materials.
    pub const DEFAULT_DIFFUSE: [f32; 3] = [0.8, 0.8, 0.8];

    /// A filter that adds missing appearances. Material synthesis is enabled by `-appAndMat`.
    pub fn new() -> Self {
        Self {
            base: BaseFilter::new(),
            add_material: false,
            force_material: false,
            diffuse: Self::DEFAULT_DIFFUSE,
            scopes: vec![],
            own_scope: vec![],
        }
    }

    /// A filter that adds both missing appearances and missing materials.
    pub fn with_material() -> Self {
        Self {
            add_material: true,
            force_material: true,
            ..Self::new()
        }
    }

    /// Is material synthesis enabled?
    pub fn adds_material(&self) -> bool {
        self.add_material
    }

    /// The diffuse color given to synthesized materials.
    pub fn diffuse(&self) -> [f32; 3] {
        self.diffuse
    }

    fn scope(&mut self) -> Option<&mut Scope> {
        self.scopes.last_mut()
    }

    fn write_material(&mut self) -> Result<()> {
        let out = self.base.downstream();
        out.start_field("material")?;
        out.start_node("Material", None)?;
        out.value_field("diffuseColor", FieldValue::FloatArray(self.diffuse.to_vec()))?;
        out.end_node()?;
        out.end_field()
    }

    fn write_appearance(&mut self, with_material: bool) -> Result<()> {
        let out = self.base.downstream();
        out.start_field("appearance")?;
        out.start_node("Appearance", None)?;
        if with_material {
            self.write_material()?;
        }
        let out = self.base.downstream();
        out.end_node()?;
        out.end_field()
    }
}

impl ContentHandler for AppearanceFilter {
    forward_events! {
        start_document, end_document, profile_decl, component_decl, meta_decl,
        start_field, field_value, end_field, route_decl,
    }

    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()> {
        match name {
            "Shape" => self.scopes.push(Scope::default()),
            "Appearance" => {
                let own = self.base.current_node() != Some("Shape");
                if own {
                    self.scopes.push(Scope::default());
                }
                self.own_scope.push(own);
                if let Some(scope) = self.scope() {
                    scope.appearance_added = true;
                }
            }
            _ if COLOR_NODES.contains(&name) || self.base.current_field() == Some("material") => {
                if let Some(scope) = self.scope() {
                    scope.material_added = true;
                }
            }
            _ => {}
        }
        self.base.start_node(name, def)
    }

    fn use_decl(&mut self, def: &str) -> Result<()> {
        let field = self.base.current_field();
        let in_shape = self.base.current_node() == Some("Shape");
        let in_appearance = self.base.current_node() == Some("Appearance");
        let (appearance, material) = match field {
            Some("appearance") if in_shape => (true, true),
            Some("material" | "texture") if in_appearance => (false, true),
            _ => (false, false),
        };
        if let Some(scope) = self.scope() {
            scope.appearance_added |= appearance;
            scope.material_added |= material;
        }
        self.base.use_decl(def)
    }

    fn end_node(&mut self) -> Result<()> {
        match self.base.current_node() {
            Some("Shape") => {
                let scope = self.scopes.pop().unwrap_or_default();
                if !scope.appearance_added {
                    self.write_appearance(self.add_material && !scope.material_added)?;
                }
            }
            Some("Appearance") => {
                let material_added = self.scope().map_or(false, |s| s.material_added);
                if self.add_material && !material_added {
                    self.write_material()?;
                    if let Some(scope) = self.scope() {
                        scope.material_added = true;
                    }
                }
                if self.own_scope.pop().unwrap_or(false) {
                    self.scopes.pop();
                }
            }
            Some(name) if TEXTURE_NODES.contains(&name) => {
                if let Some(scope) = self.scope() {
                    scope.material_added = true;
                }
            }
            _ => {}
        }
        self.base.end_node()
    }
}

impl Filter for AppearanceFilter {
    fn base_mut(&mut self) -> &mut BaseFilter {
        &mut self.base
    }

    fn set_arguments(&mut self, args: &[String]) -> Result<()> {
        self.add_material = self.force_material || has_flag(args, "-appAndMat");
        if let Some(diffuse) = flag_floats::<3>(args, "-diffuse")? {
            self.diffuse = diffuse;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::{args, connect};

    fn shape(out: &mut impl ContentHandler, body: impl FnOnce(&mut dyn ContentHandler)) {
        out.start_node("Shape", None).unwrap();
        body(&mut *out);
        out.end_node().unwrap();
    }

    fn count(log: &EventBuffer, node: &str) -> usize {
        log.iter()
            .filter(|e| matches!(e, Event::StartNode { name, .. } if name == node))
            .count()
    }

    #[test]
    fn default_material_is_appended_before_end_node() {
        let mut f = AppearanceFilter::with_material();
        f.set_arguments(&[]).unwrap();
        let log = connect(&mut f);
        f.start_node("Appearance", None).unwrap();
        f.end_node().unwrap();
        assert_eq!(
            **log.borrow(),
            [
                Event::start_node("Appearance", None),
                Event::StartField("material".into()),
                Event::start_node("Material", None),
                Event::StartField("diffuseColor".into()),
                Event::Value(FieldValue::FloatArray(vec![0.8, 0.8, 0.8])),
                Event::EndField,
                Event::EndNode,
                Event::EndField,
                Event::EndNode,
            ]
        );
    }

    #[test]
    fn every_shape_gets_one_appearance() {
        let mut f = AppearanceFilter::new();
        let log = connect(&mut f);
        shape(&mut f, |out| {
            out.start_field("geometry").unwrap();
            out.start_node("Box", None).unwrap();
            out.end_node().unwrap();
            out.end_field().unwrap();
        });
        shape(&mut f, |out| {
            out.start_field("appearance").unwrap();
            out.use_decl("APP").unwrap();
            out.end_field().unwrap();
        });
        shape(&mut f, |out| {
            out.start_field("appearance").unwrap();
            out.start_node("Appearance", None).unwrap();
            out.end_node().unwrap();
            out.end_field().unwrap();
        });
        let log = log.borrow();
        assert_eq!(count(&log, "Appearance"), 2);
        assert_eq!(count(&log, "Material"), 0);
        assert_eq!(log.iter().filter(|e| matches!(e, Event::UseDecl(_))).count(), 1);
    }

    #[test]
    fn textures_and_colors_suppress_materials() {
        let mut f = AppearanceFilter::new();
        f.set_arguments(&args("-appAndMat -diffuse 1 0 0")).unwrap();
        let log = connect(&mut f);
        shape(&mut f, |out| {
            out.start_field("appearance").unwrap();
            out.start_node("Appearance", None).unwrap();
            out.start_field("texture").unwrap();
            out.start_node("ImageTexture", None).unwrap();
            out.end_node().unwrap();
            out.end_field().unwrap();
            out.end_node().unwrap();
            out.end_field().unwrap();
        });
        shape(&mut f, |out| {
            out.start_field("geometry").unwrap();
            out.start_node("IndexedFaceSet", None).unwrap();
            out.start_field("color").unwrap();
            out.start_node("Color", None).unwrap();
            out.end_node().unwrap();
            out.end_field().unwrap();
            out.end_node().unwrap();
            out.end_field().unwrap();
        });
        shape(&mut f, |_| {});
        let log = log.borrow();
        assert_eq!(count(&log, "Appearance"), 3);
        assert_eq!(count(&log, "Material"), 1);
        assert!(log.contains(&Event::Value(FieldValue::FloatArray(vec![1., 0., 0.]))));
    }

    #[test]
    fn diffuse_needs_three_numbers() {
        let mut f = AppearanceFilter::new();
        let err = f.set_arguments(&args("-appAndMat -diffuse 0.1 0.2")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(err.exit_code(), ExitCode::InvalidArguments);
        assert!(!AppearanceFilter::new().adds_material());
    }
}
