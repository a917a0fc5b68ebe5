use super::*;

fn color(effect: &Effect, c: Option<&ColorParam>) -> Option<[f32; 4]> {
    match c? {
        ColorParam::Color(c) => Some(**c),
        ColorParam::Param(sid) => match &effect.get_param(sid)?.value {
            ParamValue::Float4(c) => Some(**c),
            _ => None,
        },
        ColorParam::Texture(_) => None,
    }
}

fn float(effect: &Effect, f: Option<&FloatParam>) -> Option<f32> {
    match f? {
        FloatParam::Float(f) => Some(*f),
        FloatParam::Param(sid) => match effect.get_param(sid)?.value {
            ParamValue::Float(f) => Some(f),
            _ => None,
        },
    }
}

fn rgb(c: [f32; 4]) -> FieldValue {
    FieldValue::FloatArray(c[..3].to_vec())
}

/// The texture a shader is mapped with: the diffuse color, or the emission of a constant shader.
fn texture_slot(shader: &Shader) -> Option<&Texture> {
    let slot = match shader.kind {
        ShaderKind::Constant => &shader.emission,
        _ => &shader.diffuse,
    };
    match slot {
        Some(ColorParam::Texture(t)) => Some(t),
        _ => None,
    }
}

impl<'a> Emitter<'a, '_> {
    /// Emit the `appearance` field of a shape using `material`.
    pub(super) fn appearance(&mut self, material: &'a Material) -> Result<()> {
        let effect = self.maps.resolve(&material.effect)?;
        let Some(profile) = &effect.profile else {
            log::debug!("effect {} has no common profile, leaving the shape unshaded", effect.id);
            return Ok(());
        };
        let shader = &profile.shader;
        self.out.start_field("appearance")?;
        self.out.start_node("Appearance", None)?;
        self.out.start_field("material")?;
        match self.materials.get(effect.id.as_str()) {
            Some(def) => self.out.use_decl(def)?,
            None => {
                let def = self.def_name(&effect.id);
                self.out.start_node("Material", Some(&def))?;
                self.material_fields(effect, shader)?;
                self.out.end_node()?;
                self.materials.insert(&effect.id, def);
            }
        }
        self.out.end_field()?;
        if let Some(tex) = texture_slot(shader) {
            self.image_texture(effect, tex)?;
        }
        self.out.end_node()?;
        self.out.end_field()
    }

    fn material_fields(&mut self, effect: &Effect, shader: &Shader) -> Result<()> {
        let emission = color(effect, shader.emission.as_ref());
        if shader.kind == ShaderKind::Constant {
            self.out
                .value_field("diffuseColor", FieldValue::FloatArray(vec![0., 0., 0.]))?;
            if let Some(c) = emission {
                self.out.value_field("emissiveColor", rgb(c))?;
            }
        } else {
            if let Some(c) = color(effect, shader.diffuse.as_ref()) {
                self.out.value_field("diffuseColor", rgb(c))?;
            }
            if let Some(c) = emission {
                self.out.value_field("emissiveColor", rgb(c))?;
            }
            if let Some(c) = color(effect, shader.ambient.as_ref()) {
                let intensity = ((c[0] + c[1] + c[2]) / 3.).clamp(0., 1.);
                self.out
                    .value_field("ambientIntensity", FieldValue::Float(intensity))?;
            }
            if let Some(c) = color(effect, shader.specular.as_ref()) {
                self.out.value_field("specularColor", rgb(c))?;
            }
            if let Some(s) = float(effect, shader.shininess.as_ref()) {
                let s = (s / 128.).clamp(0., 1.);
                self.out.value_field("shininess", FieldValue::Float(s))?;
            }
        }
        // A_ONE opacity mode: the alpha of `transparent` scaled by `transparency`
        let a = color(effect, shader.transparent.as_ref()).map_or(1., |c| c[3]);
        let t = float(effect, shader.transparency.as_ref()).unwrap_or(1.);
        let transparency = (1. - a * t).clamp(0., 1.);
        if transparency > 0. {
            self.out
                .value_field("transparency", FieldValue::Float(transparency))?;
        }
        Ok(())
    }

    /// Find the image behind a texture reference, with its wrap modes: through a sampler and
    /// its surface (COLLADA 1.4), a sampler's image (COLLADA 1.5), or directly by image id.
    fn resolve_texture(&self, effect: &'a Effect, tex: &Texture) -> Option<(&'a Image, bool, bool)> {
        let surface_image = |sid: &str| match &effect.get_param(sid)?.value {
            ParamValue::Surface {
                init_from: Some(id),
            } => self.maps.get_str::<Image>(id),
            _ => None,
        };
        match effect.get_param(&tex.texture).map(|p| &p.value) {
            Some(ParamValue::Sampler2D(s)) => {
                let image = match (&s.instance_image, &s.source) {
                    (Some(url), _) => self.maps.get(UrlRef::from_url(url)),
                    (None, Some(sid)) => surface_image(sid),
                    (None, None) => None,
                }?;
                Some((image, s.repeat_s, s.repeat_t))
            }
            Some(ParamValue::Surface { .. }) => Some((surface_image(&tex.texture)?, true, true)),
            _ => Some((self.maps.get_str(&tex.texture)?, true, true)),
        }
    }

    /// Emit the `texture` field of an appearance. Textures with the same file and wrap modes
    /// share one `ImageTexture`.
    fn image_texture(&mut self, effect: &'a Effect, tex: &Texture) -> Result<()> {
        let Some((image, repeat_s, repeat_t)) = self.resolve_texture(effect, tex) else {
            log::warn!("effect {}: cannot resolve texture '{}'", effect.id, tex.texture);
            return Ok(());
        };
        let Some(file) = &image.init_from else {
            log::warn!("image {:?} has no file, dropping the texture", image.id);
            return Ok(());
        };
        self.out.start_field("texture")?;
        let key = (file.clone(), repeat_s, repeat_t);
        match self.textures.get(&key) {
            Some(def) => self.out.use_decl(def)?,
            None => {
                let def = self.def_name(image.id.as_deref().unwrap_or("texture"));
                self.out.start_node("ImageTexture", Some(&def))?;
                self.out
                    .value_field("url", FieldValue::StringArray(vec![file.clone()]))?;
                if !repeat_s {
                    self.out.value_field("repeatS", FieldValue::Bool(false))?;
                }
                if !repeat_t {
                    self.out.value_field("repeatT", FieldValue::Bool(false))?;
                }
                self.out.end_node()?;
                self.textures.insert(key, def);
            }
        }
        self.out.end_field()
    }
}
