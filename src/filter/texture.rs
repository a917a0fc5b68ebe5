use std::collections::HashSet;

use super::*;

/// What makes two `ImageTexture`s interchangeable: the primary URL and the wrap flags.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TextureKey {
    url: String,
    repeat_s: bool,
    repeat_t: bool,
}

/// A buffered `ImageTexture`.
#[derive(Debug)]
struct PendingTexture {
    def: Option<String>,
    /// The field values of the texture, in arrival order.
    fields: Vec<(String, FieldValue)>,
    field: Option<String>,
    /// Open nodes below the texture.
    depth: usize,
    /// Was the texture a root node?
    root: bool,
}

impl PendingTexture {
    fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn key(&self) -> Result<Option<TextureKey>> {
        let url = match self.get("url") {
            Some(v) => v.to_strings()?.into_iter().next(),
            None => None,
        };
        let Some(url) = url else { return Ok(None) };
        let flag = |name: &str| self.get(name).map_or(Ok(true), FieldValue::to_bool);
        Ok(Some(TextureKey {
            url,
            repeat_s: flag("repeatS")?,
            repeat_t: flag("repeatT")?,
        }))
    }
}

/// Folds `ImageTexture`s that load the same image with the same wrap flags into one `DEF`'ed
/// node and `USE` references to it.
///
/// Every texture is buffered until its end. The first texture of each kind is written with its
/// own DEF name, or a generated `TEXAG_<n>` one. Later ones are replaced by a `USE`, and any later
/// `USE` or `ROUTE` naming their DEFs is redirected to the surviving texture. Children of textures
/// (`metadata`, `textureProperties`) are not kept.
#[derive(Debug, Default)]
pub struct ImageTextureDedupFilter {
    base: BaseFilter,
    pending: Option<PendingTexture>,
    first: HashMap<TextureKey, String>,
    aliases: HashMap<String, String>,
    seen_defs: HashSet<String>,
    counter: usize,
}

impl ImageTextureDedupFilter {
    /// A new filter.
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_def(&mut self) -> String {
        loop {
            let name = format!("TEXAG_{}", self.counter);
            self.counter += 1;
            if self.seen_defs.insert(name.clone()) {
                return name;
            }
        }
    }

    fn write(&mut self, tex: PendingTexture, def: Option<&str>) -> Result<()> {
        self.base.start_node("ImageTexture", def)?;
        for (name, value) in tex.fields {
            self.base.value_field(&name, value)?;
        }
        self.base.end_node()
    }

    fn finish(&mut self, tex: PendingTexture) -> Result<()> {
        let key = tex.key()?;
        match key.as_ref().and_then(|k| self.first.get(k)) {
            Some(surviving) if !tex.root => {
                let surviving = surviving.clone();
                log::debug!("ImageTexture {:?} folded into {}", tex.def, surviving);
                if let Some(def) = tex.def {
                    self.aliases.insert(def, surviving.clone());
                }
                self.base.use_decl(&surviving)
            }
            Some(_) => {
                let def = tex.def.clone();
                self.write(tex, def.as_deref())
            }
            None => {
                let def = match tex.def.clone() {
                    Some(def) => def,
                    None => self.fresh_def(),
                };
                if let Some(key) = key {
                    self.first.insert(key, def.clone());
                }
                self.write(tex, Some(&def))
            }
        }
    }
}

impl ContentHandler for ImageTextureDedupFilter {
    forward_events! {
        end_document, profile_decl, component_decl, meta_decl,
    }

    fn route_decl(&mut self, route: &Route) -> Result<()> {
        let alias = |name: &String| self.aliases.get(name).unwrap_or(name).clone();
        let route = Route {
            from_node: alias(&route.from_node),
            to_node: alias(&route.to_node),
            ..route.clone()
        };
        self.base.route_decl(&route)
    }

    fn start_document(&mut self, header: &DocumentHeader) -> Result<()> {
        self.pending = None;
        self.first.clear();
        self.aliases.clear();
        self.seen_defs.clear();
        self.counter = 0;
        self.base.start_document(header)
    }

    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()> {
        if let Some(def) = def {
            self.seen_defs.insert(def.into());
        }
        if let Some(tex) = &mut self.pending {
            tex.depth += 1;
            return Ok(());
        }
        if name != "ImageTexture" {
            return self.base.start_node(name, def);
        }
        self.pending = Some(PendingTexture {
            def: def.map(Into::into),
            fields: vec![],
            field: None,
            depth: 0,
            root: self.base.depth() == 0,
        });
        Ok(())
    }

    fn start_field(&mut self, name: &str) -> Result<()> {
        match &mut self.pending {
            Some(tex) => {
                if tex.depth == 0 {
                    tex.field = Some(name.into());
                }
                Ok(())
            }
            None => self.base.start_field(name),
        }
    }

    fn field_value(&mut self, value: FieldValue) -> Result<()> {
        match &mut self.pending {
            Some(PendingTexture {
                fields,
                field: Some(field),
                depth: 0,
                ..
            }) => {
                fields.push((field.clone(), value));
                Ok(())
            }
            Some(_) => Ok(()),
            None => self.base.field_value(value),
        }
    }

    fn use_decl(&mut self, def: &str) -> Result<()> {
        if self.pending.is_some() {
            return Ok(());
        }
        match self.aliases.get(def) {
            Some(surviving) => {
                let surviving = surviving.clone();
                self.base.use_decl(&surviving)
            }
            None => self.base.use_decl(def),
        }
    }

    fn end_field(&mut self) -> Result<()> {
        match &mut self.pending {
            Some(tex) => {
                if tex.depth == 0 {
                    tex.field = None;
                }
                Ok(())
            }
            None => self.base.end_field(),
        }
    }

    fn end_node(&mut self) -> Result<()> {
        match self.pending.take() {
            None => self.base.end_node(),
            Some(tex) if tex.depth == 0 => self.finish(tex),
            Some(mut tex) => {
                tex.depth -= 1;
                self.pending = Some(tex);
                Ok(())
            }
        }
    }
}

impl Filter for ImageTextureDedupFilter {
    fn base_mut(&mut self) -> &mut BaseFilter {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::connect;

    fn textured_shape(out: &mut impl ContentHandler, def: Option<&str>, url: &str, repeat_s: &str) {
        out.start_node("Shape", None).unwrap();
        out.start_field("appearance").unwrap();
        out.start_node("Appearance", None).unwrap();
        out.start_field("texture").unwrap();
        out.start_node("ImageTexture", def).unwrap();
        out.value_field("url", FieldValue::String(url.into()))
            .unwrap();
        out.value_field("repeatS", FieldValue::String(repeat_s.into()))
            .unwrap();
        out.start_field("metadata").unwrap();
        out.start_node("MetadataString", None).unwrap();
        out.end_node().unwrap();
        out.end_field().unwrap();
        out.end_node().unwrap();
        out.end_field().unwrap();
        out.end_node().unwrap();
        out.end_field().unwrap();
        out.end_node().unwrap();
    }

    fn textures(log: &EventBuffer) -> Vec<Event> {
        log.iter()
            .filter(|e| {
                matches!(e, Event::UseDecl(_))
                    || matches!(e, Event::StartNode { name, .. } if name == "ImageTexture")
            })
            .cloned()
            .collect()
    }

    #[test]
    fn same_image_is_shared() {
        let mut f = ImageTextureDedupFilter::new();
        let log = connect(&mut f);
        textured_shape(&mut f, None, r#""wood.png" "alt.png""#, "TRUE");
        textured_shape(&mut f, Some("W2"), r#""wood.png""#, "true");
        textured_shape(&mut f, None, r#""stone.png""#, "TRUE");
        textured_shape(&mut f, None, r#""wood.png""#, "FALSE");
        let log = log.borrow();
        assert_eq!(
            textures(&log),
            [
                Event::start_node("ImageTexture", Some("TEXAG_0")),
                Event::UseDecl("TEXAG_0".into()),
                Event::start_node("ImageTexture", Some("TEXAG_1")),
                Event::start_node("ImageTexture", Some("TEXAG_2")),
            ]
        );
        assert!(!log.contains(&Event::start_node("MetadataString", None)));
    }

    #[test]
    fn folded_defs_are_redirected() {
        let mut f = ImageTextureDedupFilter::new();
        let log = connect(&mut f);
        f.start_document(&DocumentHeader::default()).unwrap();
        f.start_node("Group", Some("TEXAG_0")).unwrap();
        f.end_node().unwrap();
        textured_shape(&mut f, Some("A"), "\"a.png\"", "TRUE");
        textured_shape(&mut f, Some("B"), "\"a.png\"", "TRUE");
        textured_shape(&mut f, None, "\"b.png\"", "TRUE");
        f.start_node("Shape", None).unwrap();
        f.start_field("appearance").unwrap();
        f.start_node("Appearance", None).unwrap();
        f.start_field("texture").unwrap();
        f.use_decl("B").unwrap();
        f.end_field().unwrap();
        f.end_node().unwrap();
        f.end_field().unwrap();
        f.end_node().unwrap();
        let log = log.borrow();
        assert_eq!(
            textures(&log),
            [
                Event::start_node("ImageTexture", Some("A")),
                Event::UseDecl("A".into()),
                Event::start_node("ImageTexture", Some("TEXAG_1")),
                Event::UseDecl("A".into()),
            ]
        );
    }

    #[test]
    fn routes_follow_folded_defs() {
        let mut f = ImageTextureDedupFilter::new();
        let log = connect(&mut f);
        textured_shape(&mut f, Some("A"), "\"a.png\"", "TRUE");
        textured_shape(&mut f, Some("B"), "\"a.png\"", "TRUE");
        f.route_decl(&Route::new("TS", "isActive", "B", "set_repeatS"))
            .unwrap();
        f.route_decl(&Route::new("B", "url_changed", "A", "set_url"))
            .unwrap();
        let log = log.borrow();
        assert!(log.contains(&Event::Route(Route::new(
            "TS",
            "isActive",
            "A",
            "set_repeatS"
        ))));
        assert!(log.contains(&Event::Route(Route::new("A", "url_changed", "A", "set_url"))));
        assert!(!log.contains(&Event::start_node("ImageTexture", Some("B"))));
    }

    #[test]
    fn textures_without_url_get_a_name() {
        let mut f = ImageTextureDedupFilter::new();
        let log = connect(&mut f);
        f.start_node("ImageTexture", None).unwrap();
        f.end_node().unwrap();
        assert_eq!(
            **log.borrow(),
            [
                Event::start_node("ImageTexture", Some("TEXAG_0")),
                Event::EndNode
            ]
        );
    }
}
