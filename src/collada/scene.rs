use super::*;

/// The visual scene the document instantiates.
#[derive(Clone, Default, Debug)]
pub struct Scene {
    /// The `url` of the `<instance_visual_scene>`.
    pub instance_visual_scene: Option<UrlRef<VisualScene>>,
}

impl XNode for Scene {
    const NAME: &'static str = "scene";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let instance = element
            .children()
            .find(|e| e.name() == "instance_visual_scene");
        Ok(Scene {
            instance_visual_scene: match instance {
                Some(e) => Some(parse_attr(e.attr("url"))?.ok_or("missing url attribute")?),
                None => None,
            },
        })
    }
}

/// A scene graph.
#[derive(Clone, Debug)]
pub struct VisualScene {
    /// A text string containing the unique identifier of the element.
    pub id: Option<String>,
    /// The text string name of this element.
    pub name: Option<String>,
    /// The scene graph subtrees.
    pub nodes: Vec<Node>,
}

impl XNode for VisualScene {
    const NAME: &'static str = "visual_scene";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        parse_opt("asset", &mut it, |_| Ok(()))?;
        let res = VisualScene {
            id: element.attr("id").map(Into::into),
            name: element.attr("name").map(Into::into),
            nodes: Node::parse_list(&mut it)?,
        };
        parse_list("evaluate_scene", &mut it, |_| Ok(()))?;
        finish(res, it)
    }
}

/// Instantiates a geometry, binding its material symbols.
#[derive(Clone, Debug)]
pub struct InstanceGeometry {
    /// The geometry to instantiate.
    pub url: UrlRef<Geometry>,
    /// The text string name of this element.
    pub name: Option<String>,
    /// The material bindings.
    pub bind_material: Option<BindMaterial>,
}

impl XNode for InstanceGeometry {
    const NAME: &'static str = "instance_geometry";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        let res = InstanceGeometry {
            url: parse_attr(element.attr("url"))?.ok_or("missing url attribute")?,
            name: element.attr("name").map(Into::into),
            bind_material: BindMaterial::parse_opt(&mut it)?,
        };
        finish(res, it)
    }
}

fn instance_url<T>(e: &Element) -> Result<UrlRef<T>> {
    Ok(parse_attr(e.attr("url"))?.ok_or("missing url attribute")?)
}

/// A point of interest in the scene graph: a coordinate system, and what is placed in it.
#[derive(Clone, Debug)]
pub struct Node {
    /// A text string containing the unique identifier of the element.
    pub id: Option<String>,
    /// The scoped identifier of the element.
    pub sid: Option<String>,
    /// The text string name of this element.
    pub name: Option<String>,
    /// The transformations, applied to child coordinates last to first.
    pub transforms: Vec<Transform>,
    /// Cameras placed at this node.
    pub instance_camera: Vec<UrlRef<Camera>>,
    /// Skinned or morphed geometry, which is not converted.
    pub instance_controller: Vec<Url>,
    /// Geometry placed at this node.
    pub instance_geometry: Vec<InstanceGeometry>,
    /// Lights placed at this node.
    pub instance_light: Vec<UrlRef<Light>>,
    /// Other node hierarchies placed at this node.
    pub instance_node: Vec<UrlRef<Node>>,
    /// Child nodes.
    pub children: Vec<Node>,
}

impl XNode for Node {
    const NAME: &'static str = "node";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        parse_opt("asset", &mut it, |_| Ok(()))?;
        let res = Node {
            id: element.attr("id").map(Into::into),
            sid: element.attr("sid").map(Into::into),
            name: element.attr("name").map(Into::into),
            transforms: parse_list_many(&mut it, Transform::parse)?,
            instance_camera: parse_list("instance_camera", &mut it, instance_url)?,
            instance_controller: parse_list("instance_controller", &mut it, |e| {
                Ok(parse_attr(e.attr("url"))?.ok_or("missing url attribute")?)
            })?,
            instance_geometry: InstanceGeometry::parse_list(&mut it)?,
            instance_light: parse_list("instance_light", &mut it, instance_url)?,
            instance_node: parse_list("instance_node", &mut it, instance_url)?,
            children: Node::parse_list(&mut it)?,
        };
        finish(res, it)
    }
}

/// The projection of a [`Camera`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// A perspective view. At least one of the field of view angles (in degrees) is given.
    Perspective {
        /// Horizontal field of view.
        xfov: Option<f32>,
        /// Vertical field of view.
        yfov: Option<f32>,
        /// Width over height.
        aspect_ratio: Option<f32>,
    },
    /// An orthographic view.
    Orthographic {
        /// Horizontal magnification.
        xmag: Option<f32>,
        /// Vertical magnification.
        ymag: Option<f32>,
    },
}

/// A view into the scene.
#[derive(Clone, Debug)]
pub struct Camera {
    /// A text string containing the unique identifier of the element.
    pub id: Option<String>,
    /// The text string name of this element.
    pub name: Option<String>,
    /// The projection of the common technique.
    pub projection: Projection,
}

impl XNode for Camera {
    const NAME: &'static str = "camera";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let optics = element
            .children()
            .find(|e| e.name() == "optics")
            .ok_or("<camera> without <optics>")?;
        let common = optics
            .children()
            .find(|e| e.name() == "technique_common")
            .ok_or("<optics> without <technique_common>")?;
        let proj = common.children().next().ok_or("empty <technique_common>")?;
        let get = |name: &str| -> Result<Option<f32>> {
            match proj.children().find(|e| e.name() == name) {
                Some(e) => Ok(Some(parse_elem(e)?)),
                None => Ok(None),
            }
        };
        let projection = match proj.name() {
            "perspective" => Projection::Perspective {
                xfov: get("xfov")?,
                yfov: get("yfov")?,
                aspect_ratio: get("aspect_ratio")?,
            },
            "orthographic" => Projection::Orthographic {
                xmag: get("xmag")?,
                ymag: get("ymag")?,
            },
            name => return Err(format!("unknown projection <{}>", name).into()),
        };
        Ok(Camera {
            id: element.attr("id").map(Into::into),
            name: element.attr("name").map(Into::into),
            projection,
        })
    }
}

/// Distance attenuation of point and spot lights: `1 / (constant + linear d + quadratic d²)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attenuation {
    /// The constant term.
    pub constant: f32,
    /// The linear term.
    pub linear: f32,
    /// The quadratic term.
    pub quadratic: f32,
}

/// The kind of a [`Light`], with its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    /// Light from everywhere.
    Ambient,
    /// Light along the local `-z` axis.
    Directional,
    /// Light from the local origin.
    Point(Attenuation),
    /// Light from the local origin along `-z`, within a cone.
    Spot {
        /// Distance attenuation.
        attenuation: Attenuation,
        /// The full cone angle in degrees.
        falloff_angle: f32,
        /// How fast the intensity decreases towards the edge of the cone.
        falloff_exponent: f32,
    },
}

/// A light source.
#[derive(Clone, Debug)]
pub struct Light {
    /// A text string containing the unique identifier of the element.
    pub id: Option<String>,
    /// The text string name of this element.
    pub name: Option<String>,
    /// The RGB color of the light.
    pub color: [f32; 3],
    /// The kind of light.
    pub kind: LightKind,
}

impl XNode for Light {
    const NAME: &'static str = "light";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let common = element
            .children()
            .find(|e| e.name() == "technique_common")
            .ok_or("<light> without <technique_common>")?;
        let e = common.children().next().ok_or("empty <technique_common>")?;
        let get = |name: &str, default: f32| -> Result<f32> {
            match e.children().find(|c| c.name() == name) {
                Some(c) => parse_elem(c),
                None => Ok(default),
            }
        };
        let attenuation = || -> Result<Attenuation> {
            Ok(Attenuation {
                constant: get("constant_attenuation", 1.)?,
                linear: get("linear_attenuation", 0.)?,
                quadratic: get("quadratic_attenuation", 0.)?,
            })
        };
        let kind = match e.name() {
            "ambient" => LightKind::Ambient,
            "directional" => LightKind::Directional,
            "point" => LightKind::Point(attenuation()?),
            "spot" => LightKind::Spot {
                attenuation: attenuation()?,
                falloff_angle: get("falloff_angle", 180.)?,
                falloff_exponent: get("falloff_exponent", 0.)?,
            },
            name => return Err(format!("unknown light <{}>", name).into()),
        };
        let color: Box<[f32; 3]> = parse_one("color", &mut e.children(), parse_array_n)?;
        Ok(Light {
            id: element.attr("id").map(Into::into),
            name: element.attr("name").map(Into::into),
            color: *color,
            kind,
        })
    }
}
