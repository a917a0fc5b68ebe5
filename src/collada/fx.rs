use super::*;

/// Declares an image resource, which for our purposes is always a file reference.
#[derive(Clone, Debug)]
pub struct Image {
    /// A text string containing the unique identifier of the element.
    pub id: Option<String>,
    /// The text string name of this element.
    pub name: Option<String>,
    /// The file the image is stored in, or `None` for embedded data.
    pub init_from: Option<String>,
}

impl XNode for Image {
    const NAME: &'static str = "image";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let init_from = match element.children().find(|e| e.name() == "init_from") {
            // COLLADA 1.5 puts the file in a nested `<ref>`
            Some(e) => match e.children().find(|e| e.name() == "ref") {
                Some(r) => Some(parse_text(r)?),
                None => Some(parse_text(e)?),
            },
            None => {
                log::debug!("image {:?} has no file reference", element.attr("id"));
                None
            }
        };
        Ok(Image {
            id: element.attr("id").map(Into::into),
            name: element.attr("name").map(Into::into),
            init_from: init_from.map(|s| s.trim().to_owned()),
        })
    }
}

/// The value of a [`NewParam`].
#[derive(Clone, Debug)]
pub enum ParamValue {
    /// A `<surface>`, naming the [`Image`] it is initialized from.
    Surface {
        /// The id of the image.
        init_from: Option<String>,
    },
    /// A `<sampler2D>`.
    Sampler2D(Sampler2D),
    /// A `<float>`.
    Float(f32),
    /// A `<float4>`, usable as a color.
    Float4(Box<[f32; 4]>),
    /// Any other parameter type, by element name.
    Other(String),
}

/// A two-dimensional texture sampler.
#[derive(Clone, Debug)]
pub struct Sampler2D {
    /// The sid of the `<surface>` parameter to sample (COLLADA 1.4).
    pub source: Option<String>,
    /// The image to sample (COLLADA 1.5).
    pub instance_image: Option<Url>,
    /// Whether the texture repeats in the S direction.
    pub repeat_s: bool,
    /// Whether the texture repeats in the T direction.
    pub repeat_t: bool,
}

fn wraps(e: Option<&Element>) -> Result<bool> {
    Ok(match e.map(parse_text).transpose()?.as_deref().map(str::trim) {
        None | Some("WRAP" | "MIRROR") => true,
        Some(_) => false,
    })
}

impl XNode for Sampler2D {
    const NAME: &'static str = "sampler2D";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let child = |name: &str| element.children().find(|e| e.name() == name);
        Ok(Sampler2D {
            source: child("source").map(parse_text).transpose()?,
            instance_image: match child("instance_image") {
                Some(e) => Some(parse_attr(e.attr("url"))?.ok_or("missing url attr")?),
                None => None,
            },
            repeat_s: wraps(child("wrap_s"))?,
            repeat_t: wraps(child("wrap_t"))?,
        })
    }
}

/// Creates a new, named parameter object in an effect.
#[derive(Clone, Debug)]
pub struct NewParam {
    /// Identifier for this parameter (that is, the variable name).
    pub sid: String,
    /// The parameter value.
    pub value: ParamValue,
}

impl XNode for NewParam {
    const NAME: &'static str = "newparam";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let e = element
            .children()
            .find(|e| !matches!(e.name(), "annotate" | "semantic" | "modifier"))
            .ok_or("empty <newparam>")?;
        let value = match e.name() {
            "surface" => ParamValue::Surface {
                init_from: match e.children().find(|e| e.name() == "init_from") {
                    Some(i) => Some(parse_text(i)?.trim().to_owned()),
                    None => None,
                },
            },
            Sampler2D::NAME => ParamValue::Sampler2D(Sampler2D::parse(e)?),
            "float" => ParamValue::Float(parse_elem(e)?),
            "float4" => ParamValue::Float4(parse_array_n(e)?),
            name => ParamValue::Other(name.into()),
        };
        Ok(NewParam {
            sid: element.attr("sid").ok_or("expected sid attr")?.into(),
            value,
        })
    }
}

/// A color parameter referencing a texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    /// The `sid` of a `sampler2D` parameter, or (for some exporters) the id of an [`Image`].
    pub texture: String,
    /// The texture coordinate set symbol, bound in [`BindMaterial`].
    pub texcoord: Option<String>,
}

/// The value of a color attribute of a shader.
#[derive(Clone, Debug)]
pub enum ColorParam {
    /// A literal RGBA color.
    Color(Box<[f32; 4]>),
    /// A reference to a `float4` parameter.
    Param(String),
    /// A texture.
    Texture(Texture),
}

impl ColorParam {
    /// Parse a [`ColorParam`] from an XML element.
    pub fn parse(element: &Element) -> Result<Self> {
        let e = element.children().next().ok_or("expected a color")?;
        Ok(match e.name() {
            "color" => Self::Color(parse_array_n(e)?),
            "param" => Self::Param(e.attr("ref").ok_or("expected ref attr")?.into()),
            "texture" => Self::Texture(Texture {
                texture: e.attr("texture").ok_or("expected texture attr")?.into(),
                texcoord: e.attr("texcoord").map(Into::into),
            }),
            name => return Err(format!("unexpected <{}> in <{}>", name, element.name()).into()),
        })
    }
}

/// The value of a scalar attribute of a shader.
#[derive(Clone, Debug)]
pub enum FloatParam {
    /// A literal value.
    Float(f32),
    /// A reference to a `float` parameter.
    Param(String),
}

impl FloatParam {
    /// Parse a [`FloatParam`] from an XML element.
    pub fn parse(element: &Element) -> Result<Self> {
        let e = element.children().next().ok_or("expected a float")?;
        Ok(match e.name() {
            "float" => Self::Float(parse_elem(e)?),
            "param" => Self::Param(e.attr("ref").ok_or("expected ref attr")?.into()),
            name => return Err(format!("unexpected <{}> in <{}>", name, element.name()).into()),
        })
    }
}

/// The fixed-function shading models of `profile_COMMON`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderKind {
    /// Unlit: only emission, reflection and transparency.
    Constant,
    /// Diffuse shading.
    Lambert,
    /// Phong specular shading.
    Phong,
    /// Blinn specular shading.
    Blinn,
}

/// A fixed-function shader. The attributes a shading model does not have are always `None`.
#[derive(Clone, Debug)]
pub struct Shader {
    /// The shading model.
    pub kind: ShaderKind,
    /// Light emitted from the surface.
    pub emission: Option<ColorParam>,
    /// Ambient light reflected from the surface.
    pub ambient: Option<ColorParam>,
    /// Light diffusely reflected from the surface.
    pub diffuse: Option<ColorParam>,
    /// Color of specular reflections.
    pub specular: Option<ColorParam>,
    /// The specular exponent.
    pub shininess: Option<FloatParam>,
    /// Color of a perfect mirror reflection.
    pub reflective: Option<ColorParam>,
    /// Amount of mirror reflection, between 0 and 1.
    pub reflectivity: Option<FloatParam>,
    /// Color of perfectly refracted light.
    pub transparent: Option<ColorParam>,
    /// Amount of refracted light, between 0 and 1.
    pub transparency: Option<FloatParam>,
    /// Index of refraction.
    pub index_of_refraction: Option<FloatParam>,
}

impl Shader {
    /// Parse a [`Shader`] from an XML element, if it is one of the shader kinds.
    pub fn parse(element: &Element) -> Result<Option<Self>> {
        let kind = match element.name() {
            "constant" => ShaderKind::Constant,
            "lambert" => ShaderKind::Lambert,
            "phong" => ShaderKind::Phong,
            "blinn" => ShaderKind::Blinn,
            _ => return Ok(None),
        };
        let mut res = Shader {
            kind,
            emission: None,
            ambient: None,
            diffuse: None,
            specular: None,
            shininess: None,
            reflective: None,
            reflectivity: None,
            transparent: None,
            transparency: None,
            index_of_refraction: None,
        };
        let specular = matches!(kind, ShaderKind::Phong | ShaderKind::Blinn);
        for e in element.children() {
            match e.name() {
                "emission" => res.emission = Some(ColorParam::parse(e)?),
                "ambient" if kind != ShaderKind::Constant => {
                    res.ambient = Some(ColorParam::parse(e)?)
                }
                "diffuse" if kind != ShaderKind::Constant => {
                    res.diffuse = Some(ColorParam::parse(e)?)
                }
                "specular" if specular => res.specular = Some(ColorParam::parse(e)?),
                "shininess" if specular => res.shininess = Some(FloatParam::parse(e)?),
                "reflective" => res.reflective = Some(ColorParam::parse(e)?),
                "reflectivity" => res.reflectivity = Some(FloatParam::parse(e)?),
                "transparent" => res.transparent = Some(ColorParam::parse(e)?),
                "transparency" => res.transparency = Some(FloatParam::parse(e)?),
                "index_of_refraction" => res.index_of_refraction = Some(FloatParam::parse(e)?),
                name => {
                    return Err(format!("unexpected <{}> in <{}>", name, element.name()).into())
                }
            }
        }
        Ok(Some(res))
    }
}

/// The platform-independent profile of an effect.
#[derive(Clone, Debug)]
pub struct ProfileCommon {
    /// The parameters of the profile, like samplers and surfaces.
    pub new_param: Vec<NewParam>,
    /// The shader of the profile's technique.
    pub shader: Shader,
}

impl XNode for ProfileCommon {
    const NAME: &'static str = "profile_COMMON";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let technique = element
            .children()
            .find(|e| e.name() == "technique")
            .ok_or("<profile_COMMON> without <technique>")?;
        let shader = technique.children().find_map(|e| Shader::parse(e).transpose());
        Ok(ProfileCommon {
            new_param: NewParam::parse_children(element)?,
            shader: shader.ok_or("<technique> without a shader")??,
        })
    }
}

/// A self-contained description of an effect. Only the common profile is kept.
#[derive(Clone, Debug)]
pub struct Effect {
    /// Global identifier for this object.
    pub id: String,
    /// The text string name of this element.
    pub name: Option<String>,
    /// Parameters declared for all profiles.
    pub new_param: Vec<NewParam>,
    /// The common profile, if the effect has one.
    pub profile: Option<ProfileCommon>,
}

impl XNode for Effect {
    const NAME: &'static str = "effect";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let res = Effect {
            id: element.attr("id").ok_or("expected id attr")?.into(),
            name: element.attr("name").map(Into::into),
            new_param: NewParam::parse_children(element)?,
            profile: ProfileCommon::parse_children(element)?.into_iter().next(),
        };
        if res.profile.is_none() {
            log::debug!("effect {} has no profile_COMMON", res.id);
        }
        Ok(res)
    }
}

impl Effect {
    /// Get a parameter of the effect by sid, looking in the profile first.
    pub fn get_param(&self, sid: &str) -> Option<&NewParam> {
        let profile = self.profile.iter().flat_map(|p| &p.new_param);
        profile.chain(&self.new_param).find(|p| p.sid == sid)
    }
}

/// Describes the visual appearance of a geometric object, by instantiating an effect.
#[derive(Clone, Debug)]
pub struct Material {
    /// A text string containing the unique identifier of the element.
    pub id: Option<String>,
    /// The text string name of this element.
    pub name: Option<String>,
    /// The `url` of the `<instance_effect>`.
    pub effect: UrlRef<Effect>,
}

impl XNode for Material {
    const NAME: &'static str = "material";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        parse_opt("asset", &mut it, |_| Ok(()))?;
        let res = Material {
            id: element.attr("id").map(Into::into),
            name: element.attr("name").map(Into::into),
            effect: parse_one("instance_effect", &mut it, |e| {
                Ok(parse_attr(e.attr("url"))?.ok_or("missing url attr")?)
            })?,
        };
        finish(res, it)
    }
}

/// Binds a vertex input of a geometry to a texture coordinate symbol of the effect.
#[derive(Clone, Debug)]
pub struct BindVertexInput {
    /// The effect's texture coordinate symbol.
    pub semantic: String,
    /// The semantic of the geometry input, normally `TEXCOORD`.
    pub input_semantic: String,
    /// The set of the geometry input.
    pub input_set: Option<u32>,
}

impl XNode for BindVertexInput {
    const NAME: &'static str = "bind_vertex_input";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        Ok(BindVertexInput {
            semantic: element.attr("semantic").ok_or("missing semantic attr")?.into(),
            input_semantic: element
                .attr("input_semantic")
                .ok_or("missing input_semantic attr")?
                .into(),
            input_set: parse_attr(element.attr("input_set"))?,
        })
    }
}

/// Binds a material symbol of a geometry to a material.
#[derive(Clone, Debug)]
pub struct InstanceMaterial {
    /// The symbol used by the primitives of the geometry.
    pub symbol: String,
    /// The material to use.
    pub target: UrlRef<Material>,
    /// Texture coordinate bindings.
    pub bind_vertex_input: Vec<BindVertexInput>,
}

impl XNode for InstanceMaterial {
    const NAME: &'static str = "instance_material";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        Ok(InstanceMaterial {
            symbol: element.attr("symbol").ok_or("expecting symbol attr")?.into(),
            target: parse_attr(element.attr("target"))?.ok_or("expecting target attr")?,
            bind_vertex_input: BindVertexInput::parse_children(element)?,
        })
    }
}

/// Binds the material symbols of an instantiated geometry.
#[derive(Clone, Debug, Default)]
pub struct BindMaterial {
    /// The material bindings of the common technique.
    pub instance_material: Vec<InstanceMaterial>,
}

impl XNode for BindMaterial {
    const NAME: &'static str = "bind_material";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        parse_list("param", &mut it, |_| Ok(()))?;
        let res = BindMaterial {
            instance_material: parse_one("technique_common", &mut it, |e| {
                let mut it = e.children().peekable();
                finish(InstanceMaterial::parse_list(&mut it)?, it)
            })?,
        };
        finish(res, it)
    }
}

impl BindMaterial {
    /// Look up an [`InstanceMaterial`] by symbol name.
    pub fn get(&self, symbol: &str) -> Option<&InstanceMaterial> {
        self.instance_material.iter().find(|m| m.symbol == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phong_effect() {
        let e: Element = r##"<effect xmlns="http://www.collada.org/2005/11/COLLADASchema" id="fx">
  <profile_COMMON>
    <newparam sid="surf"><surface type="2D"><init_from>img</init_from></surface></newparam>
    <newparam sid="samp">
      <sampler2D><source>surf</source><wrap_s>CLAMP</wrap_s></sampler2D>
    </newparam>
    <technique sid="common">
      <phong>
        <emission><color>0 0 0 1</color></emission>
        <diffuse><texture texture="samp" texcoord="UV0"/></diffuse>
        <shininess><float>20</float></shininess>
        <transparency><param ref="alpha"/></transparency>
      </phong>
    </technique>
  </profile_COMMON>
</effect>"##
            .parse()
            .unwrap();
        let fx = Effect::parse(&e).unwrap();
        let shader = &fx.profile.as_ref().unwrap().shader;
        assert_eq!(shader.kind, ShaderKind::Phong);
        assert!(matches!(shader.diffuse, Some(ColorParam::Texture(ref t)) if t.texture == "samp"));
        assert!(matches!(shader.shininess, Some(FloatParam::Float(f)) if f == 20.));
        assert!(matches!(shader.transparency, Some(FloatParam::Param(ref p)) if p == "alpha"));
        match &fx.get_param("samp").unwrap().value {
            ParamValue::Sampler2D(s) => {
                assert_eq!(s.source.as_deref(), Some("surf"));
                assert!(!s.repeat_s && s.repeat_t);
            }
            v => panic!("unexpected {:?}", v),
        }
        assert!(matches!(
            &fx.get_param("surf").unwrap().value,
            ParamValue::Surface { init_from: Some(i) } if i == "img"
        ));
    }
}
