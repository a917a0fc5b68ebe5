//! Reading X3D documents in the XML encoding.

use std::{
    io::{BufRead, BufReader},
    path::Path,
};

use crate::{event::*, *};

/// Elements that need prototype or import/export support, which this crate does not have.
const UNSUPPORTED: &[&str] = &[
    "ProtoDeclare",
    "ExternProtoDeclare",
    "ProtoInstance",
    "IMPORT",
    "EXPORT",
    "IS",
    "field",
    "fieldValue",
];

const GEOMETRY: &[&str] = &[
    "Arc2D", "ArcClose2D", "Box", "Circle2D", "Cone", "Cylinder", "Disk2D", "ElevationGrid",
    "Extrusion", "GeoElevationGrid", "IndexedFaceSet", "IndexedLineSet", "IndexedQuadSet",
    "IndexedTriangleFanSet", "IndexedTriangleSet", "IndexedTriangleStripSet", "LineSet",
    "NurbsCurve", "NurbsPatchSurface", "NurbsSweptSurface", "NurbsSwungSurface",
    "NurbsTrimmedSurface", "PointSet", "Polyline2D", "Polypoint2D", "QuadSet", "Rectangle2D",
    "Sphere", "Text", "TriangleFanSet", "TriangleSet", "TriangleSet2D", "TriangleStripSet",
];

/// The field a child element goes into when it has no `containerField` attribute.
fn default_container(child: &str, parent: &str) -> &'static str {
    match child {
        _ if child.starts_with("Metadata") => {
            if parent == "MetadataSet" {
                "value"
            } else {
                "metadata"
            }
        }
        _ if GEOMETRY.contains(&child) => "geometry",
        "Appearance" => "appearance",
        "Material" | "TwoSidedMaterial" => "material",
        "Coordinate" | "CoordinateDouble" | "GeoCoordinate" => "coord",
        "Normal" => "normal",
        "Color" | "ColorRGBA" => "color",
        "FontStyle" => "fontStyle",
        "LineProperties" => "lineProperties",
        "FillProperties" => "fillProperties",
        "TextureProperties" => "textureProperties",
        "ShaderPart" => "parts",
        "ShaderProgram" => "programs",
        "ComposedShader" | "PackagedShader" | "ProgramShader" => "shaders",
        "FloatVertexAttribute" | "Matrix3VertexAttribute" | "Matrix4VertexAttribute" => "attrib",
        _ if child.starts_with("TextureCoordinate") || child == "MultiTextureCoordinate" => {
            "texCoord"
        }
        _ if child.starts_with("TextureTransform") || child == "MultiTextureTransform" => {
            "textureTransform"
        }
        _ if child.ends_with("Texture") || child.ends_with("Texture3D") => "texture",
        _ => "children",
    }
}

fn is_skipped_attr(name: &str) -> bool {
    matches!(name, "DEF" | "USE" | "containerField" | "class")
        || name.starts_with("xmlns")
        || name.contains(':')
}

/// Imports X3D XML documents (`.x3d`), turning every element into events.
///
/// Attribute values are delivered as raw [`FieldValue::String`] text, since the field types are
/// not known here. Child elements are grouped into fields by their `containerField` attribute, or
/// by the usual default for their node type. Routes nested inside nodes are delivered after the
/// enclosing root node.
#[derive(Clone, Copy, Debug, Default)]
pub struct X3dImporter {
    /// What to do with prototypes, `IMPORT` and `EXPORT`.
    pub strictness: Strictness,
}

impl X3dImporter {
    /// An importer with the given strictness.
    pub fn new(strictness: Strictness) -> Self {
        Self { strictness }
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
        let root = Element::from_reader(&mut XReader::from_reader(reader))?;
        self.import_element(&root, uri, handler)
    }

    /// Import a document that has already been parsed.
    pub fn import_element(
        &self,
        root: &Element,
        uri: Option<&str>,
        handler: &mut dyn ContentHandler,
    ) -> Result<()> {
        if root.name() != "X3D" {
            return Err("expected X3D root node".into());
        }
        let mut header = DocumentHeader::x3d(root.attr("version").unwrap_or("3.2"));
        header.uri = uri.map(Into::into);
        handler.start_document(&header)?;
        handler.profile_decl(root.attr("profile").unwrap_or("Full"))?;
        if let Some(head) = root.children().find(|e| e.name() == "head") {
            for e in head.children() {
                match e.name() {
                    "component" => {
                        let name = e.attr("name").ok_or("component without name")?;
                        let level = e.attr("level").unwrap_or("1");
                        handler.component_decl(&format!("{}:{}", name, level))?;
                    }
                    "meta" => {
                        let name = e.attr("name").unwrap_or_default();
                        handler.meta_decl(name, e.attr("content").unwrap_or_default())?;
                    }
                    name => log::debug!("ignoring <{}> in <head>", name),
                }
            }
        }
        if let Some(scene) = root.children().find(|e| e.name() == "Scene") {
            let mut routes = vec![];
            for e in scene.children() {
                match e.name() {
                    "ROUTE" => handler.route_decl(&route(e)?)?,
                    _ if e.attr("USE").is_some() => {
                        log::warn!("skipping USE of {:?} at the root of the scene", e.attr("USE"))
                    }
                    _ => {
                        self.node(e, handler, &mut routes)?;
                        for r in routes.drain(..) {
                            handler.route_decl(&r)?;
                        }
                    }
                }
            }
        }
        handler.end_document()
    }

    fn unsupported(&self, e: &Element) -> Result<()> {
        match self.strictness {
            Strictness::Strict => Err(format!("unsupported element <{}>", e.name()).into()),
            Strictness::Tolerant => {
                log::warn!("skipping unsupported element <{}>", e.name());
                Ok(())
            }
        }
    }

    fn node(
        &self,
        e: &Element,
        handler: &mut dyn ContentHandler,
        routes: &mut Vec<Route>,
    ) -> Result<()> {
        if UNSUPPORTED.contains(&e.name()) {
            return self.unsupported(e);
        }
        if let Some(def) = e.attr("USE") {
            return handler.use_decl(def);
        }
        handler.start_node(e.name(), e.attr("DEF"))?;
        for (name, value) in e.attrs() {
            if !is_skipped_attr(name) {
                handler.value_field(name, FieldValue::String(value.into()))?;
            }
        }
        let mut fields: Vec<(&str, Vec<&Element>)> = vec![];
        for child in e.children() {
            match child.name() {
                "ROUTE" => routes.push(route(child)?),
                name if UNSUPPORTED.contains(&name) => self.unsupported(child)?,
                name => {
                    let field = child
                        .attr("containerField")
                        .unwrap_or_else(|| default_container(name, e.name()));
                    match fields.iter_mut().find(|(f, _)| *f == field) {
                        Some((_, children)) => children.push(child),
                        None => fields.push((field, vec![child])),
                    }
                }
            }
        }
        for (field, children) in fields {
            handler.start_field(field)?;
            for child in children {
                self.node(child, handler, routes)?;
            }
            handler.end_field()?;
        }
        handler.end_node()
    }
}

fn route(e: &Element) -> Result<Route> {
    let get = |attr: &str| {
        e.attr(attr)
            .map(String::from)
            .ok_or_else(|| Error::Str(format!("ROUTE without {}", attr)))
    };
    Ok(Route {
        from_node: get("fromNode")?,
        from_field: get("fromField")?,
        to_node: get("toNode")?,
        to_field: get("toField")?,
    })
}
