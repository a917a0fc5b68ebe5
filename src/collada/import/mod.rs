//! Emitting a COLLADA [`Document`] as X3D events.

mod anim;
mod material;
mod mesh;

use std::{
    collections::HashSet,
    f32::consts::{FRAC_PI_2, PI},
    io::{BufRead, BufReader},
    path::Path,
};

use nalgebra::{Matrix4, Rotation3, Unit as Axis, Vector3};

use super::*;
pub use mesh::validate_indices;

/// The `-nonWeb3DFileStyles` hints for converting COLLADA documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StyleHints {
    /// `UNCOLORED`: drop per-vertex colors.
    pub uncolored: bool,
    /// `MATRIX_TRANSFORM`: write transformations that are not a plain translate, rotate, scale
    /// sequence as `MatrixTransform` nodes, instead of decomposing them.
    pub matrix_transform: bool,
}

impl FromStr for StyleHints {
    type Err = Error;

    /// Parses a comma separated list of hints. Unknown hints are ignored with a warning.
    fn from_str(s: &str) -> Result<Self> {
        let mut res = StyleHints::default();
        for hint in s.split(',').map(str::trim).filter(|h| !h.is_empty()) {
            match &*hint.to_ascii_uppercase() {
                "UNCOLORED" => res.uncolored = true,
                "MATRIX_TRANSFORM" => res.matrix_transform = true,
                _ => log::warn!("ignoring unknown file style '{}'", hint),
            }
        }
        Ok(res)
    }
}

/// Imports COLLADA documents (`.dae`).
///
/// The visual scene becomes a tree of `Transform` nodes below one root `Transform`, which
/// converts the document's unit to meters and its up axis to `+y`. Every primitive of an
/// instantiated mesh becomes a `Shape` holding an `IndexedTriangleSet`, `IndexedFaceSet` or
/// `IndexedLineSet`, with an `Appearance` built from the bound material's common profile.
/// Anything instantiated twice (nodes, shapes, materials, textures, data arrays) is written once
/// under a DEF name and referenced with `USE` afterwards. Cameras and lights become viewpoints
/// and X3D lights. Keyframe animations of translations and scales become interpolators.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColladaImporter {
    /// Whether indices past the end of their source are an error, or drop their face.
    pub strictness: Strictness,
    /// Conversion hints.
    pub hints: StyleHints,
}

impl ColladaImporter {
    /// An importer with the given settings.
    pub fn new(strictness: Strictness, hints: StyleHints) -> Self {
        Self { strictness, hints }
    }

    /// Import a document given as a string.
    pub fn import_str(&self, s: &str, handler: &mut dyn ContentHandler) -> Result<()> {
        self.import_reader(s.as_bytes(), None, handler)
    }

    /// Import a document from a file.
    pub fn import_file<P: AsRef<Path>>(
        &self,
        path: P,
        handler: &mut dyn ContentHandler,
    ) -> Result<()> {
        let uri = path.as_ref().display().to_string();
        let file = BufReader::new(std::fs::File::open(path)?);
        self.import_reader(file, Some(&uri), handler)
    }

    /// Import a document from any [`BufRead`] reader.
    pub fn import_reader<R: BufRead>(
        &self,
        reader: R,
        uri: Option<&str>,
        handler: &mut dyn ContentHandler,
    ) -> Result<()> {
        self.import_document(&Document::from_reader(reader)?, uri, handler)
    }

    /// Import a document that has already been parsed.
    pub fn import_document(
        &self,
        doc: &Document,
        uri: Option<&str>,
        handler: &mut dyn ContentHandler,
    ) -> Result<()> {
        Emitter {
            opts: *self,
            doc,
            maps: doc.local_maps(),
            out: handler,
            defs: HashSet::new(),
            nodes: HashMap::new(),
            active: vec![],
            shapes: HashMap::new(),
            sources: HashMap::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            targets: HashMap::new(),
            anim_count: 0,
            warned_indices: false,
        }
        .document(uri)
    }
}

/// Replace the characters that may not appear in an X3D name.
fn sanitize_def(s: &str) -> String {
    let mut res: String = s
        .chars()
        .map(|c| match c {
            '"' | '\'' | '#' | ',' | '.' | '[' | ']' | '\\' | '{' | '}' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();
    if res.is_empty() || res.starts_with(|c: char| c.is_ascii_digit() || c == '+' || c == '-') {
        res.insert(0, '_')
    }
    res
}

/// The transformation list of a node, if it has the `translate* rotate* scale*` shape that a
/// `Transform` can express directly.
struct Trs<'a> {
    translate: Vec<&'a Transform>,
    rotate: Vec<&'a Transform>,
    scale: Vec<&'a Transform>,
}

impl<'a> Trs<'a> {
    fn split(transforms: &'a [Transform]) -> Option<Self> {
        let mut res = Trs {
            translate: vec![],
            rotate: vec![],
            scale: vec![],
        };
        let mut stage = 0;
        for t in transforms {
            let (s, list) = match t.kind {
                TransformKind::Translate(_) => (0, &mut res.translate),
                TransformKind::Rotate(_) => (1, &mut res.rotate),
                TransformKind::Scale(_) => (2, &mut res.scale),
                _ => return None,
            };
            if s < stage {
                return None;
            }
            stage = s;
            list.push(t);
        }
        Some(res)
    }

    fn translation(&self) -> [f32; 3] {
        let mut v = [0.; 3];
        for t in &self.translate {
            if let TransformKind::Translate(d) = t.kind {
                (0..3).for_each(|i| v[i] += d[i])
            }
        }
        v
    }

    fn rotation(&self) -> [f32; 4] {
        match &*self.rotate {
            [Transform {
                kind: TransformKind::Rotate([x, y, z, a]),
                ..
            }] => [*x, *y, *z, a.to_radians()],
            rotate => {
                let mut r = Rotation3::identity();
                for t in rotate {
                    if let TransformKind::Rotate([x, y, z, a]) = t.kind {
                        let axis = Axis::new_normalize(Vector3::new(x, y, z));
                        r *= Rotation3::from_axis_angle(&axis, a.to_radians());
                    }
                }
                axis_angle(&r)
            }
        }
    }

    fn scale(&self) -> [f32; 3] {
        let mut v = [1.; 3];
        for t in &self.scale {
            if let TransformKind::Scale(s) = t.kind {
                (0..3).for_each(|i| v[i] *= s[i])
            }
        }
        v
    }
}

fn floats(v: &[f32]) -> FieldValue {
    FieldValue::FloatArray(v.to_vec())
}

/// The other field of view angle, in degrees, given one angle and the ratio of the other
/// extent to its extent.
fn other_fov(fov: f32, ratio: f32) -> f32 {
    2. * ((fov.to_radians() / 2.).tan() * ratio).atan().to_degrees()
}

struct Emitter<'a, 'h> {
    opts: ColladaImporter,
    doc: &'a Document,
    maps: LocalMaps<'a>,
    out: &'h mut dyn ContentHandler,
    /// Every DEF name given out so far.
    defs: HashSet<String>,
    /// DEF names of emitted nodes, by id.
    nodes: HashMap<&'a str, String>,
    /// Ids of the nodes being emitted, to catch `<instance_node>` cycles.
    active: Vec<&'a str>,
    /// DEF names of shapes, by geometry id, primitive index and material id.
    shapes: HashMap<(&'a str, usize, Option<&'a str>), String>,
    /// DEF names of data nodes, by source id and node type.
    sources: HashMap<(&'a str, &'static str), String>,
    /// DEF names of `Material` nodes, by effect id.
    materials: HashMap<&'a str, String>,
    /// DEF names of `ImageTexture` nodes, by file and wrap modes.
    textures: HashMap<(String, bool, bool), String>,
    /// Animatable fields, by `node/sid` address: the DEF name and the field name.
    targets: HashMap<String, (String, &'static str)>,
    anim_count: usize,
    warned_indices: bool,
}

impl Debug for Emitter<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("opts", &self.opts)
            .field("defs", &self.defs)
            .finish_non_exhaustive()
    }
}

impl<'a> Emitter<'a, '_> {
    /// A fresh DEF name based on `base`.
    fn def_name(&mut self, base: &str) -> String {
        let base = sanitize_def(base);
        let mut name = base.clone();
        let mut n = 1;
        while !self.defs.insert(name.clone()) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        name
    }

    fn document(&mut self, uri: Option<&str>) -> Result<()> {
        let doc = self.doc;
        let mut header = DocumentHeader::x3d("3.2");
        header.uri = uri.map(Into::into);
        self.out.start_document(&header)?;
        self.out.profile_decl("Immersive")?;
        self.metadata(&doc.asset)?;
        match doc.get_visual_scene(&self.maps)? {
            Some(scene) => {
                self.root(scene)?;
                self.animations()?;
            }
            None => log::warn!("the document has no scene to convert"),
        }
        self.out.end_document()
    }

    fn metadata(&mut self, asset: &Asset) -> Result<()> {
        let mut meta = vec![];
        if let Some(title) = &asset.title {
            meta.push(("title", title.clone()));
        }
        if let Some(subject) = &asset.subject {
            meta.push(("subject", subject.clone()));
        }
        if !asset.keywords.is_empty() {
            meta.push(("keywords", asset.keywords.join(" ")));
        }
        if let Some(d) = asset.created {
            meta.push(("created", d.to_rfc3339()));
        }
        if let Some(d) = asset.modified {
            meta.push(("modified", d.to_rfc3339()));
        }
        for c in &asset.contributor {
            meta.extend(c.author.clone().map(|a| ("creator", a)));
            meta.extend(c.authoring_tool.clone().map(|a| ("generator", a)));
            meta.extend(c.copyright.clone().map(|a| ("rights", a)));
        }
        for (name, content) in meta {
            self.out.meta_decl(name, &content)?;
        }
        Ok(())
    }

    /// The root `Transform`, which scales to meters and turns the up axis to `+y`.
    fn root(&mut self, scene: &'a VisualScene) -> Result<()> {
        let asset = &self.doc.asset;
        self.out.start_node("Transform", None)?;
        let m = asset.unit.meter;
        if m != 1. {
            self.out.value_field("scale", floats(&[m, m, m]))?;
        }
        match asset.up_axis {
            UpAxis::XUp => self.out.value_field("rotation", floats(&[0., 0., 1., FRAC_PI_2]))?,
            UpAxis::YUp => {}
            UpAxis::ZUp => self.out.value_field("rotation", floats(&[-1., 0., 0., FRAC_PI_2]))?,
        }
        self.out.start_field("children")?;
        for node in &scene.nodes {
            self.node(node)?;
        }
        self.out.end_field()?;
        self.out.end_node()
    }

    fn node(&mut self, node: &'a Node) -> Result<()> {
        let id = node.id.as_deref();
        if let Some(id) = id {
            if self.active.contains(&id) {
                return Err(format!("node {} instantiates itself", id).into());
            }
            if let Some(def) = self.nodes.get(id) {
                return self.out.use_decl(def);
            }
        }
        let def = id.map(|id| self.def_name(id));
        if let (Some(id), Some(def)) = (id, &def) {
            self.nodes.insert(id, def.clone());
            self.active.push(id);
        }
        self.transform(node, def.as_deref())?;
        self.out.start_field("children")?;
        for url in &node.instance_camera {
            let camera = self.maps.resolve(url)?;
            self.camera(camera)?;
        }
        for url in &node.instance_light {
            let light = self.maps.resolve(url)?;
            self.light(light)?;
        }
        for inst in &node.instance_geometry {
            self.instance_geometry(inst)?;
        }
        for url in &node.instance_controller {
            log::warn!("skipping controller {}: skins and morphs are not converted", url);
        }
        for url in &node.instance_node {
            let n = self.maps.resolve(url)?;
            self.node(n)?;
        }
        for child in &node.children {
            self.node(child)?;
        }
        self.out.end_field()?;
        if id.is_some() {
            self.active.pop();
        }
        self.out.end_node()
    }

    /// Start the grouping node of `node`, holding its transformation.
    fn transform(&mut self, node: &'a Node, def: Option<&str>) -> Result<()> {
        if let Some(trs) = Trs::split(&node.transforms) {
            self.out.start_node("Transform", def)?;
            if !trs.translate.is_empty() {
                self.out.value_field("translation", floats(&trs.translation()))?;
            }
            if !trs.rotate.is_empty() {
                self.out.value_field("rotation", floats(&trs.rotation()))?;
            }
            if !trs.scale.is_empty() {
                self.out.value_field("scale", floats(&trs.scale()))?;
            }
            if let (Some(def), Some(id)) = (def, &node.id) {
                for (list, field) in [(&trs.translate, "translation"), (&trs.scale, "scale")] {
                    if let [Transform { sid: Some(sid), .. }] = &list[..] {
                        let target = format!("{}/{}", id, sid);
                        self.targets.insert(target, (def.to_owned(), field));
                    }
                }
            }
            return Ok(());
        }
        let m = node
            .transforms
            .iter()
            .fold(Matrix4::identity(), |m, t| m * t.as_matrix());
        if self.opts.hints.matrix_transform {
            self.out.start_node("MatrixTransform", def)?;
            // column by column
            self.out.value_field("matrix", floats(m.as_slice()))?;
        } else {
            let d = Decomposed::new(&m);
            self.out.start_node("Transform", def)?;
            self.out.value_field("translation", floats(&d.translation))?;
            self.out.value_field("rotation", floats(&d.rotation))?;
            self.out.value_field("scale", floats(&d.scale))?;
        }
        Ok(())
    }

    fn instance_geometry(&mut self, inst: &'a InstanceGeometry) -> Result<()> {
        let geom = self.maps.resolve(&inst.url)?;
        let Some(mesh) = &geom.mesh else {
            log::debug!("geometry {} has no mesh", inst.url.val);
            return Ok(());
        };
        let geom_id = geom.id.as_deref().unwrap_or("geometry");
        for (i, prim) in mesh.primitives.iter().enumerate() {
            if prim.holes != 0 {
                return Err(Error::Unsupported(format!(
                    "polygons with holes in geometry {}",
                    geom_id
                )));
            }
            let binding = match (&prim.material, &inst.bind_material) {
                (Some(symbol), Some(bind)) => bind.get(symbol),
                _ => None,
            };
            let material = match binding {
                Some(b) => Some(self.maps.resolve(&b.target)?),
                None => None,
            };
            let key = (geom_id, i, material.and_then(|m| m.id.as_deref()));
            if let Some(def) = self.shapes.get(&key) {
                self.out.use_decl(def)?;
                continue;
            }
            let def = self.def_name(&format!("{}_{}", geom_id, i));
            self.out.start_node("Shape", Some(&def))?;
            if let Some(material) = material {
                self.appearance(material)?;
            }
            self.geometry(geom, prim)?;
            self.out.end_node()?;
            self.shapes.insert(key, def);
        }
        Ok(())
    }

    fn camera(&mut self, camera: &Camera) -> Result<()> {
        match camera.projection {
            Projection::Perspective {
                xfov,
                yfov,
                aspect_ratio,
            } => {
                let (x, y) = match (xfov, yfov, aspect_ratio) {
                    (Some(x), None, Some(a)) => (Some(x), Some(other_fov(x, 1. / a))),
                    (None, Some(y), Some(a)) => (Some(other_fov(y, a)), Some(y)),
                    (x, y, _) => (x, y),
                };
                self.out.start_node("Viewpoint", None)?;
                self.out.value_field("position", floats(&[0., 0., 0.]))?;
                if let Some(fov) = x.into_iter().chain(y).reduce(f32::min) {
                    let fov = fov.to_radians().clamp(0., PI);
                    self.out.value_field("fieldOfView", FieldValue::Float(fov))?;
                }
            }
            Projection::Orthographic { xmag, ymag } => {
                let x = xmag.or(ymag).unwrap_or(1.);
                let y = ymag.unwrap_or(x);
                self.out.start_node("OrthoViewpoint", None)?;
                self.out.value_field("position", floats(&[0., 0., 0.]))?;
                self.out.value_field("fieldOfView", floats(&[-x, -y, x, y]))?;
            }
        }
        if let Some(name) = camera.name.as_ref().or(camera.id.as_ref()) {
            self.out
                .value_field("description", FieldValue::String(name.clone()))?;
        }
        self.out.end_node()
    }

    fn light(&mut self, light: &Light) -> Result<()> {
        let attenuation = |a: &Attenuation| floats(&[a.constant, a.linear, a.quadratic]);
        match light.kind {
            LightKind::Ambient => {
                self.out.start_node("DirectionalLight", None)?;
                self.out.value_field("intensity", FieldValue::Float(0.))?;
                self.out.value_field("ambientIntensity", FieldValue::Float(1.))?;
            }
            LightKind::Directional => {
                self.out.start_node("DirectionalLight", None)?;
                self.out.value_field("direction", floats(&[0., 0., -1.]))?;
            }
            LightKind::Point(a) => {
                self.out.start_node("PointLight", None)?;
                self.out.value_field("attenuation", attenuation(&a))?;
            }
            LightKind::Spot {
                attenuation: a,
                falloff_angle,
                ..
            } => {
                self.out.start_node("SpotLight", None)?;
                self.out.value_field("direction", floats(&[0., 0., -1.]))?;
                self.out.value_field("attenuation", attenuation(&a))?;
                let cut_off = (falloff_angle / 2.).to_radians().clamp(0., FRAC_PI_2);
                self.out.value_field("cutOffAngle", FieldValue::Float(cut_off))?;
                self.out.value_field("beamWidth", FieldValue::Float(cut_off))?;
            }
        }
        self.out.value_field("color", floats(&light.color))?;
        self.out.end_node()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(scene: &str, libraries: &str) -> String {
        format!(
            r##"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <asset><unit meter="1"/><up_axis>Y_UP</up_axis></asset>
  <library_geometries>
    <geometry id="quad">
      <mesh>
        <source id="quad-pos">
          <float_array id="quad-pos-array" count="12">0 0 0 1 0 0 1 1 0 0 1 0</float_array>
          <technique_common>
            <accessor source="#quad-pos-array" count="4" stride="3">
              <param name="X" type="float"/>
              <param name="Y" type="float"/>
              <param name="Z" type="float"/>
            </accessor>
          </technique_common>
        </source>
        <source id="quad-nrm">
          <float_array id="quad-nrm-array" count="3">0 0 1</float_array>
          <technique_common>
            <accessor source="#quad-nrm-array" count="1" stride="3">
              <param name="X" type="float"/>
              <param name="Y" type="float"/>
              <param name="Z" type="float"/>
            </accessor>
          </technique_common>
        </source>
        <vertices id="quad-vtx"><input semantic="POSITION" source="#quad-pos"/></vertices>
        <triangles count="2" material="mat">
          <input semantic="VERTEX" source="#quad-vtx" offset="0"/>
          <input semantic="NORMAL" source="#quad-nrm" offset="1"/>
          <p>0 0 1 0 2 0  0 0 2 0 3 0</p>
        </triangles>
      </mesh>
    </geometry>
  </library_geometries>
  {}
  <library_visual_scenes>
    <visual_scene id="scene">{}</visual_scene>
  </library_visual_scenes>
  <scene><instance_visual_scene url="#scene"/></scene>
</COLLADA>"##,
            libraries, scene
        )
    }

    fn import(xml: &str) -> Result<Vec<Event>> {
        let mut buf = EventBuffer::new();
        ColladaImporter::default().import_str(xml, &mut buf)?;
        Ok(buf.into_events())
    }

    fn field<'e>(events: &'e [Event], name: &str) -> Option<&'e FieldValue> {
        let i = events
            .iter()
            .position(|e| matches!(e, Event::StartField(f) if f == name))?;
        match &events[i + 1] {
            Event::Value(v) => Some(v),
            _ => None,
        }
    }

    #[test]
    fn def_names_are_valid() {
        assert_eq!(sanitize_def("my mesh.001"), "my_mesh_001");
        assert_eq!(sanitize_def("3ds-node"), "_3ds-node");
        assert_eq!(sanitize_def(""), "_");
    }

    #[test]
    fn style_hints() {
        let h: StyleHints = "uncolored, MATRIX_TRANSFORM,bogus".parse().unwrap();
        assert!(h.uncolored && h.matrix_transform);
        assert_eq!("".parse::<StyleHints>().unwrap(), StyleHints::default());
    }

    #[test]
    fn separate_offsets_give_a_face_set() {
        let events = import(&doc(
            r##"<node id="a"><translate sid="t">1 2 3</translate><instance_geometry url="#quad"/></node>"##,
            "",
        ))
        .unwrap();
        assert!(events.contains(&Event::start_node("Transform", Some("a"))));
        assert_eq!(
            field(&events, "translation"),
            Some(&FieldValue::FloatArray(vec![1., 2., 3.]))
        );
        assert!(events.contains(&Event::start_node("IndexedFaceSet", None)));
        assert_eq!(
            field(&events, "coordIndex"),
            Some(&FieldValue::IntArray(vec![0, 1, 2, -1, 0, 2, 3, -1]))
        );
        assert_eq!(
            field(&events, "normalIndex"),
            Some(&FieldValue::IntArray(vec![0, 0, 0, -1, 0, 0, 0, -1]))
        );
        assert!(events.contains(&Event::start_node("Coordinate", Some("quad-pos"))));
        // no material is bound, so there is no appearance
        assert!(!events.contains(&Event::StartField("appearance".into())));
    }

    #[test]
    fn repeated_instances_are_shared() {
        let lib = r##"<library_effects>
    <effect id="red"><profile_COMMON><technique sid="c"><lambert>
      <diffuse><color>1 0 0 1</color></diffuse>
    </lambert></technique></profile_COMMON></effect>
  </library_effects>
  <library_materials><material id="red-mat"><instance_effect url="#red"/></material></library_materials>"##;
        let inst = r##"<instance_geometry url="#quad"><bind_material><technique_common>
          <instance_material symbol="mat" target="#red-mat"/>
        </technique_common></bind_material></instance_geometry>"##;
        let scene = format!("<node>{}</node><node>{}</node>", inst, inst);
        let events = import(&doc(&scene, lib)).unwrap();
        let shapes = events
            .iter()
            .filter(|e| matches!(e, Event::StartNode { name, .. } if name == "Shape"))
            .count();
        assert_eq!(shapes, 1);
        assert!(events.contains(&Event::UseDecl("quad_0".into())));
        assert!(events.contains(&Event::start_node("Material", Some("red"))));
        assert_eq!(
            field(&events, "diffuseColor"),
            Some(&FieldValue::FloatArray(vec![1., 0., 0.]))
        );
    }

    #[test]
    fn bad_indices_depend_on_strictness() {
        let xml = doc(r##"<node><instance_geometry url="#quad"/></node>"##, "")
            .replace("0 0 2 0 3 0", "0 0 2 0 9 0");
        let events = import(&xml).unwrap();
        assert_eq!(
            field(&events, "coordIndex"),
            Some(&FieldValue::IntArray(vec![0, 1, 2, -1]))
        );
        let strict = ColladaImporter::new(Strictness::Strict, StyleHints::default());
        assert!(strict.import_str(&xml, &mut NullHandler).is_err());
    }

    #[test]
    fn translations_are_animated() {
        let lib = r##"<library_animations>
    <animation id="move">
      <source id="t-in">
        <float_array id="t-in-array" count="2">0 2</float_array>
        <technique_common><accessor source="#t-in-array" count="2">
          <param name="TIME" type="float"/>
        </accessor></technique_common>
      </source>
      <source id="t-out">
        <float_array id="t-out-array" count="6">0 0 0 0 5 0</float_array>
        <technique_common><accessor source="#t-out-array" count="2" stride="3">
          <param name="X" type="float"/><param name="Y" type="float"/><param name="Z" type="float"/>
        </accessor></technique_common>
      </source>
      <sampler id="t-sampler">
        <input semantic="INPUT" source="#t-in"/>
        <input semantic="OUTPUT" source="#t-out"/>
      </sampler>
      <channel source="#t-sampler" target="box/loc"/>
      <channel source="#t-sampler" target="box/loc.X"/>
    </animation>
  </library_animations>"##;
        let events = import(&doc(
            r#"<node id="box"><translate sid="loc">0 0 0</translate></node>"#,
            lib,
        ))
        .unwrap();
        assert!(events.contains(&Event::start_node("TimeSensor", Some("TS_0"))));
        assert_eq!(
            field(&events, "key"),
            Some(&FieldValue::FloatArray(vec![0., 1.]))
        );
        assert!(events.contains(&Event::Route(Route::new(
            "PI_0",
            "value_changed",
            "box",
            "set_translation"
        ))));
        let routes = events.iter().filter(|e| matches!(e, Event::Route(_))).count();
        assert_eq!(routes, 2);
    }

    #[test]
    fn up_axis_and_unit_wrap_the_scene() {
        let xml = doc("", "")
            .replace(r#"<unit meter="1"/>"#, r#"<unit meter="0.01"/>"#)
            .replace("Y_UP", "Z_UP");
        let events = import(&xml).unwrap();
        assert_eq!(events[2], Event::start_node("Transform", None));
        assert_eq!(
            field(&events, "rotation"),
            Some(&FieldValue::FloatArray(vec![-1., 0., 0., FRAC_PI_2]))
        );
        assert_eq!(
            field(&events, "scale"),
            Some(&FieldValue::FloatArray(vec![0.01, 0.01, 0.01]))
        );
    }

    #[test]
    fn holes_are_unsupported() {
        let xml = doc(r##"<node><instance_geometry url="#quad"/></node>"##, "").replace(
            r#"<triangles count="2" material="mat">"#,
            r##"<polygons count="1">
          <input semantic="VERTEX" source="#quad-vtx" offset="0"/>
          <ph><p>0 1 2 3</p><h>0 1 2</h></ph>
        </polygons>
        <triangles count="2" material="mat">"##,
        );
        let err = import(&xml).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
