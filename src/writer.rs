//! The classic (VRML-style) X3D encoding.

use std::io::Write;

use crate::{event::*, *};

/// Fields that hold a list of nodes, and so are written in brackets.
const MF_NODE_FIELDS: &[&str] = &[
    "children", "shaders", "programs", "parts", "attrib", "layers", "rootNodes", "skeleton",
    "joints", "segments", "sites", "displacers", "skin", "value", "level", "choice",
    "addChildren", "removeChildren", "trimmingContour", "geometry3D",
];

/// Value fields of list type, whatever node they are on.
const MF_VALUE_FIELDS: &[&str] = &[
    "point", "vector", "coordIndex", "index", "normalIndex", "colorIndex", "texCoordIndex",
    "key", "keyValue", "stripCount", "fanCount", "vertexCount", "url", "string", "info", "type",
    "family", "justify", "skyAngle", "groundAngle", "skyColor", "groundColor", "crossSection",
    "spine", "range", "avatarSize", "transitionType", "parameter", "value", "frontUrl",
    "backUrl", "leftUrl", "rightUrl", "topUrl", "bottomUrl", "objectType", "mode", "source",
    "function", "weight", "knot",
];

/// Fields holding a single string, which are quoted.
const SF_STRING_FIELDS: &[&str] = &[
    "description", "title", "name", "reference", "style", "language", "fogType", "geoSystem",
];

/// Fields holding strings, written as a list of quoted strings.
const MF_STRING_FIELDS: &[&str] = &[
    "url", "string", "info", "type", "family", "justify", "transitionType", "parameter",
    "frontUrl", "backUrl", "leftUrl", "rightUrl", "topUrl", "bottomUrl", "objectType", "mode",
    "source", "function",
];

fn is_mf_node_field(node: &str, field: &str) -> bool {
    MF_NODE_FIELDS.contains(&field)
        || (node.starts_with("Multi")
            && matches!(field, "texture" | "texCoord" | "textureTransform"))
}

fn is_mf_value_field(node: &str, field: &str) -> bool {
    MF_VALUE_FIELDS.contains(&field)
        || matches!(
            (node, field),
            ("ElevationGrid", "height")
                | ("Extrusion", "orientation" | "scale")
                | ("Color" | "ColorRGBA", "color")
        )
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\')
        }
        out.push(c)
    }
    out.push('"');
    out
}

fn join<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// The classic encoding of `value`, as the value of `node.field`.
fn format_value(node: &str, field: &str, value: &FieldValue) -> String {
    let text = match value {
        FieldValue::String(s) if MF_STRING_FIELDS.contains(&field) => match parse_mfstring(s) {
            Ok(v) => v.iter().map(|s| quote(s)).collect::<Vec<_>>().join(" "),
            Err(_) => s.clone(),
        },
        FieldValue::String(s) if SF_STRING_FIELDS.contains(&field) => quote(s),
        FieldValue::String(s) => match s.trim() {
            "true" => "TRUE".into(),
            "false" => "FALSE".into(),
            s if s.contains('"') => s.into(),
            s => s.replace(',', " "),
        },
        FieldValue::StringArray(v) => v.iter().map(|s| quote(s)).collect::<Vec<_>>().join(" "),
        FieldValue::Int(i) => i.to_string(),
        FieldValue::IntArray(v) => join(v),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::FloatArray(v) => join(v),
        FieldValue::Bool(b) => bool_str(*b).into(),
        FieldValue::BoolArray(v) => v.iter().map(|&b| bool_str(b)).collect::<Vec<_>>().join(" "),
        FieldValue::Double(f) => f.to_string(),
        FieldValue::DoubleArray(v) => join(v),
        FieldValue::Long(i) => i.to_string(),
        FieldValue::LongArray(v) => join(v),
    };
    if is_mf_value_field(node, field) || matches!(value, FieldValue::StringArray(_)) {
        format!("[ {} ]", text)
    } else {
        text
    }
}

#[derive(Debug)]
struct OpenField {
    name: String,
    mf_nodes: bool,
    started: bool,
}

/// Writes the event stream as an X3D classic encoding (`.x3dv`) document.
///
/// Fields holding a single node are written without brackets (`geometry Box { }`), node lists
/// and list-typed values in brackets. Field values from XML sources arrive as raw attribute text
/// and are written mostly as they are, with `true`/`false` turned into `TRUE`/`FALSE`.
#[derive(Debug)]
pub struct ClassicWriter<W> {
    out: W,
    version: Option<String>,
    depth: usize,
    nodes: Vec<String>,
    fields: Vec<OpenField>,
}

impl<W: Write> ClassicWriter<W> {
    /// A writer to `out`, using the version of the incoming document.
    pub fn new(out: W) -> Self {
        Self {
            out,
            version: None,
            depth: 0,
            nodes: vec![],
            fields: vec![],
        }
    }

    /// Write the header with `version` instead of the version of the incoming document.
    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    /// Recover the output.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) -> Result<()> {
        let indent = "  ".repeat(self.depth);
        writeln!(self.out, "{}{}", indent, text).map_err(Error::Output)
    }

    /// Open the enclosing field, if needed, for a node or `USE` item and return the prefix to
    /// write before the item.
    fn item_prefix(&mut self) -> Result<String> {
        let Some(field) = self.fields.last_mut() else {
            return Ok(String::new());
        };
        if !field.mf_nodes {
            field.started = true;
            return Ok(format!("{} ", field.name));
        }
        if !field.started {
            field.started = true;
            let open = format!("{} [", field.name);
            self.line(&open)?;
            self.depth += 1;
        }
        Ok(String::new())
    }
}

impl<W: Write> ContentHandler for ClassicWriter<W> {
    fn start_document(&mut self, header: &DocumentHeader) -> Result<()> {
        self.depth = 0;
        self.nodes.clear();
        self.fields.clear();
        let version = self.version.as_deref().unwrap_or(&header.version);
        writeln!(self.out, "#X3D V{} utf8", version).map_err(Error::Output)
    }

    fn end_document(&mut self) -> Result<()> {
        self.out.flush().map_err(Error::Output)
    }

    fn profile_decl(&mut self, profile: &str) -> Result<()> {
        self.line(&format!("PROFILE {}", profile))
    }

    fn component_decl(&mut self, component: &str) -> Result<()> {
        self.line(&format!("COMPONENT {}", component))
    }

    fn meta_decl(&mut self, name: &str, content: &str) -> Result<()> {
        self.line(&format!("META {} {}", quote(name), quote(content)))
    }

    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()> {
        let prefix = self.item_prefix()?;
        let text = match def {
            Some(def) => format!("{}DEF {} {} {{", prefix, def, name),
            None => format!("{}{} {{", prefix, name),
        };
        self.line(&text)?;
        self.depth += 1;
        self.nodes.push(name.into());
        Ok(())
    }

    fn end_node(&mut self) -> Result<()> {
        self.nodes.pop().ok_or(Error::Protocol("end_node without start_node"))?;
        self.depth = self.depth.saturating_sub(1);
        self.line("}")
    }

    fn start_field(&mut self, name: &str) -> Result<()> {
        let node = self.nodes.last().map_or("", |s| &**s);
        let mf_nodes = is_mf_node_field(node, name);
        self.fields.push(OpenField {
            name: name.into(),
            mf_nodes,
            started: false,
        });
        Ok(())
    }

    fn field_value(&mut self, value: FieldValue) -> Result<()> {
        let node = self.nodes.last().map_or("", |s| &**s);
        let field = self
            .fields
            .last_mut()
            .ok_or(Error::Protocol("field_value outside of a field"))?;
        field.started = true;
        let text = format!("{} {}", field.name, format_value(node, &field.name, &value));
        self.line(&text)
    }

    fn use_decl(&mut self, def: &str) -> Result<()> {
        let prefix = self.item_prefix()?;
        self.line(&format!("{}USE {}", prefix, def))
    }

    fn end_field(&mut self) -> Result<()> {
        let field = self.fields.pop().ok_or(Error::Protocol("end_field without start_field"))?;
        if field.mf_nodes && field.started {
            self.depth = self.depth.saturating_sub(1);
            self.line("]")?;
        }
        Ok(())
    }

    fn route_decl(&mut self, route: &Route) -> Result<()> {
        self.line(&format!(
            "ROUTE {}.{} TO {}.{}",
            route.from_node, route.from_field, route.to_node, route.to_field
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(events: impl FnOnce(&mut ClassicWriter<Vec<u8>>)) -> String {
        let mut w = ClassicWriter::new(vec![]);
        events(&mut w);
        String::from_utf8(w.into_inner()).unwrap()
    }

    #[test]
    fn nested_document() {
        let out = write(|w| {
            w.start_document(&DocumentHeader::default()).unwrap();
            w.profile_decl("Interchange").unwrap();
            w.meta_decl("title", "t").unwrap();
            w.start_node("Transform", Some("T")).unwrap();
            w.value_field("translation", FieldValue::FloatArray(vec![1., 2.5, 3.]))
                .unwrap();
            w.start_field("children").unwrap();
            w.start_node("Shape", None).unwrap();
            w.start_field("geometry").unwrap();
            w.start_node("Box", None).unwrap();
            w.value_field("solid", FieldValue::String("false".into()))
                .unwrap();
            w.end_node().unwrap();
            w.end_field().unwrap();
            w.end_node().unwrap();
            w.use_decl("S").unwrap();
            w.end_field().unwrap();
            w.end_node().unwrap();
            w.route_decl(&Route::new("A", "b", "C", "d")).unwrap();
            w.end_document().unwrap();
        });
        assert_eq!(
            out,
            "#X3D V3.2 utf8
PROFILE Interchange
META \"title\" \"t\"
DEF T Transform {
  translation 1 2.5 3
  children [
    Shape {
      geometry Box {
        solid FALSE
      }
    }
    USE S
  ]
}
ROUTE A.b TO C.d
"
        );
    }

    #[test]
    fn values_are_encoded_by_field() {
        let out = write(|w| {
            w.start_document(&DocumentHeader::x3d("3.3")).unwrap();
            w.start_node("ImageTexture", None).unwrap();
            w.value_field("url", FieldValue::String("\"a.png\" \"b.png\"".into()))
                .unwrap();
            w.value_field("description", FieldValue::String("My \"tex\"".into()))
                .unwrap();
            w.end_node().unwrap();
            w.start_node("IndexedFaceSet", None).unwrap();
            w.value_field("coordIndex", FieldValue::String("0,1,2,-1".into()))
                .unwrap();
            w.start_field("coord").unwrap();
            w.use_decl("C").unwrap();
            w.end_field().unwrap();
            w.end_node().unwrap();
        });
        assert_eq!(
            out,
            "#X3D V3.3 utf8
ImageTexture {
  url [ \"a.png\" \"b.png\" ]
  description \"My \\\"tex\\\"\"
}
IndexedFaceSet {
  coordIndex [ 0 1 2 -1 ]
  coord USE C
}
"
        );
    }

    #[test]
    fn quoted_commas_survive() {
        let out = write(|w| {
            w.start_document(&DocumentHeader::default()).unwrap();
            w.start_node("MetadataString", None).unwrap();
            w.value_field("value", FieldValue::String("\"a, b\" \"c\"".into()))
                .unwrap();
            w.value_field("name", FieldValue::String("tags".into()))
                .unwrap();
            w.end_node().unwrap();
            w.start_node("Coordinate", None).unwrap();
            w.value_field("point", FieldValue::String("0 0 0, 1 0 0".into()))
                .unwrap();
            w.end_node().unwrap();
        });
        assert!(out.contains("\"a, b\" \"c\""), "{}", out);
        assert!(out.contains("0 0 0  1 0 0"), "{}", out);
    }

    #[test]
    fn version_override_and_empty_fields() {
        let mut w = ClassicWriter::new(vec![]).with_version(Some("3.0".into()));
        w.start_document(&DocumentHeader::default()).unwrap();
        w.start_node("Group", None).unwrap();
        w.start_field("children").unwrap();
        w.end_field().unwrap();
        w.end_node().unwrap();
        let out = String::from_utf8(w.into_inner()).unwrap();
        assert_eq!(out, "#X3D V3.0 utf8\nGroup {\n}\n");
    }
}
