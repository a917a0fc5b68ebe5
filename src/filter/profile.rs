use std::collections::BTreeMap;

use super::*;

/// The X3D profiles this crate can minimize to, in increasing order of capability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Profile {
    /// Static geometry, appearance and keyframe animation.
    #[default]
    Interchange,
    /// Adds sensors, lights other than directional, switches and inlines.
    Interactive,
    /// Everything in the VRML 97 feature set.
    Immersive,
}

impl Profile {
    /// The profile name as written in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Interchange => "Interchange",
            Profile::Interactive => "Interactive",
            Profile::Immersive => "Immersive",
        }
    }

    /// The smallest profile containing the node type `name`.
    /// Nodes outside these tables need `Immersive` plus a component, see [`component_for`].
    pub fn for_node(name: &str) -> Profile {
        if INTERCHANGE.contains(&name) {
            Profile::Interchange
        } else if INTERACTIVE.contains(&name) {
            Profile::Interactive
        } else {
            Profile::Immersive
        }
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Core" | "Interchange" | "CADInterchange" => Ok(Profile::Interchange),
            "Interactive" => Ok(Profile::Interactive),
            "Immersive" | "MPEG4Interactive" | "Full" => Ok(Profile::Immersive),
            _ => Err(format!("unknown profile '{}'", s).into()),
        }
    }
}

const INTERCHANGE: &[&str] = &[
    "Appearance", "Background", "Box", "Color", "ColorInterpolator", "ColorRGBA", "Cone",
    "Coordinate", "CoordinateInterpolator", "Cylinder", "DirectionalLight", "Group",
    "ImageTexture", "IndexedFaceSet", "IndexedLineSet", "IndexedTriangleFanSet",
    "IndexedTriangleSet", "IndexedTriangleStripSet", "LineSet", "Material", "MetadataDouble",
    "MetadataFloat", "MetadataInteger", "MetadataSet", "MetadataString", "NavigationInfo",
    "Normal", "NormalInterpolator", "OrientationInterpolator", "PixelTexture", "PointSet",
    "PositionInterpolator", "ScalarInterpolator", "Shape", "Sphere", "TextureCoordinate",
    "TextureCoordinateGenerator", "TextureTransform", "TimeSensor", "Transform",
    "TriangleFanSet", "TriangleSet", "TriangleStripSet", "Viewpoint", "WorldInfo",
];

const INTERACTIVE: &[&str] = &[
    "Anchor", "BooleanFilter", "BooleanSequencer", "BooleanToggle", "BooleanTrigger",
    "CylinderSensor", "ElevationGrid", "Inline", "IntegerSequencer", "IntegerTrigger",
    "KeySensor", "LOD", "PlaneSensor", "PointLight", "ProximitySensor", "SphereSensor",
    "SpotLight", "StringSensor", "Switch", "TimeTrigger", "TouchSensor", "VisibilitySensor",
];

/// The component, and its level, that a node outside the `Immersive` profile needs.
pub fn component_for(name: &str) -> Option<(&'static str, u32)> {
    let prefixed: &[(&str, (&str, u32))] = &[
        ("Nurbs", ("NURBS", 1)),
        ("HAnim", ("H-Anim", 1)),
        ("Geo", ("Geospatial", 1)),
        ("CAD", ("CADGeometry", 2)),
    ];
    if let Some((_, c)) = prefixed.iter().find(|(p, _)| name.starts_with(p)) {
        return Some(*c);
    }
    Some(match name {
        "ComposedShader" | "ShaderPart" | "ShaderProgram" | "ProgramShader" | "PackagedShader"
        | "FloatVertexAttribute" | "Matrix3VertexAttribute" | "Matrix4VertexAttribute" => {
            ("Shaders", 1)
        }
        "ImageTexture3D" | "PixelTexture3D" | "ComposedTexture3D" | "TextureCoordinate3D"
        | "TextureCoordinate4D" | "TextureTransform3D" | "TextureTransformMatrix3D" => {
            ("Texturing3D", 1)
        }
        "ComposedCubeMapTexture" | "GeneratedCubeMapTexture" | "ImageCubeMapTexture" => {
            ("CubeMapTexturing", 1)
        }
        "ParticleSystem" | "PointEmitter" | "ConeEmitter" | "ExplosionEmitter"
        | "PolylineEmitter" | "SurfaceEmitter" | "VolumeEmitter" | "WindPhysicsModel"
        | "ForcePhysicsModel" | "BoundedPhysicsModel" => ("ParticleSystems", 1),
        "RigidBody" | "RigidBodyCollection" | "CollidableShape" | "CollisionCollection"
        | "CollisionSensor" | "BallJoint" | "HingeJoint" | "SliderJoint" => {
            ("RigidBodyPhysics", 1)
        }
        "VolumeData" | "SegmentedVolumeData" | "IsoSurfaceVolumeData" => ("VolumeRendering", 1),
        "OrthoViewpoint" | "ViewpointGroup" => ("Navigation", 3),
        "EspduTransform" | "ReceiverPdu" | "SignalPdu" | "TransmitterPdu" | "DISEntityManager" => {
            ("DIS", 1)
        }
        "TwoSidedMaterial" => ("Shape", 4),
        "ClipPlane" => ("Rendering", 5),
        _ => return None,
    })
}

/// Replaces the profile declaration of a document by the smallest profile that covers the nodes
/// it actually uses.
///
/// The first pass collects the largest profile over all nodes, and the components needed by
/// nodes outside `Immersive` (those keep the profile at `Immersive` and add a
/// `COMPONENT name:level`). The second pass writes the new profile and components in place of
/// the original declarations. Must be run inside a [`TwoPassWrapper`].
#[derive(Debug, Default)]
pub struct MinimizeProfileFilter {
    base: BaseFilter,
    pass: Pass,
    profile: Profile,
    components: BTreeMap<&'static str, u32>,
    declared: bool,
}

impl MinimizeProfileFilter {
    /// A new filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// The profile found by the first pass.
    pub fn profile(&self) -> Profile {
        self.profile
    }

    fn declare(&mut self) -> Result<()> {
        if self.pass == Pass::Second && !self.declared {
            self.declared = true;
            log::info!("minimized profile: {}", self.profile);
            self.base.profile_decl(self.profile.as_str())?;
            for (name, level) in &self.components {
                self.base.component_decl(&format!("{}:{}", name, level))?;
            }
        }
        Ok(())
    }
}

impl ContentHandler for MinimizeProfileFilter {
    forward_events! {
        start_document, end_node, start_field, field_value, use_decl, end_field,
    }

    fn end_document(&mut self) -> Result<()> {
        self.declare()?;
        self.base.end_document()
    }

    fn profile_decl(&mut self, _: &str) -> Result<()> {
        self.declare()
    }

    fn component_decl(&mut self, component: &str) -> Result<()> {
        log::debug!("dropping COMPONENT {}", component);
        Ok(())
    }

    fn meta_decl(&mut self, name: &str, content: &str) -> Result<()> {
        self.declare()?;
        self.base.meta_decl(name, content)
    }

    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()> {
        match self.pass {
            Pass::First => {
                self.profile = self.profile.max(Profile::for_node(name));
                if let Some((component, level)) = component_for(name) {
                    let l = self.components.entry(component).or_default();
                    *l = (*l).max(level);
                }
            }
            Pass::Second => self.declare()?,
        }
        self.base.start_node(name, def)
    }

    fn route_decl(&mut self, route: &Route) -> Result<()> {
        self.declare()?;
        self.base.route_decl(route)
    }
}

impl Filter for MinimizeProfileFilter {
    fn base_mut(&mut self) -> &mut BaseFilter {
        &mut self.base
    }
}

impl TwoPassFilter for MinimizeProfileFilter {
    fn start_first_pass(&mut self) {
        self.pass = Pass::First;
        self.profile = Profile::Interchange;
        self.components.clear();
        self.declared = false;
    }

    fn start_second_pass(&mut self) {
        self.pass = Pass::Second;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::connect;

    fn run(nodes: &[&str], header: &[Event]) -> Vec<Event> {
        let mut f = TwoPassWrapper::new(MinimizeProfileFilter::new());
        let log = connect(&mut f);
        let mut doc = EventBuffer::new();
        doc.start_document(&DocumentHeader::default()).unwrap();
        for e in header {
            doc.push(e.clone());
        }
        for n in nodes {
            doc.start_node(n, None).unwrap();
            doc.end_node().unwrap();
        }
        doc.end_document().unwrap();
        doc.replay(&mut f).unwrap();
        let log = log.borrow();
        log.iter()
            .filter(|e| matches!(e, Event::Profile(_) | Event::Component(_) | Event::Meta { .. }))
            .cloned()
            .collect()
    }

    #[test]
    fn profile_is_minimized() {
        let header = [
            Event::Profile("Full".into()),
            Event::Component("Shaders:1".into()),
            Event::Meta {
                name: "title".into(),
                content: "t".into(),
            },
        ];
        assert_eq!(
            run(&["Shape", "Box", "Transform"], &header),
            [Event::Profile("Interchange".into()), header[2].clone()]
        );
        assert_eq!(
            run(&["Shape", "TouchSensor"], &header)[0],
            Event::Profile("Interactive".into())
        );
    }

    #[test]
    fn components_keep_immersive() {
        let out = run(&["ParticleSystem", "OrthoViewpoint", "Group", "CADPart"], &[]);
        assert_eq!(
            out,
            [
                Event::Profile("Immersive".into()),
                Event::Component("CADGeometry:2".into()),
                Event::Component("Navigation:3".into()),
                Event::Component("ParticleSystems:1".into()),
            ]
        );
        assert_eq!(Profile::for_node("Billboard"), Profile::Immersive);
        assert_eq!(component_for("NurbsCurve"), Some(("NURBS", 1)));
        assert_eq!(component_for("Shape"), None);
    }
}
