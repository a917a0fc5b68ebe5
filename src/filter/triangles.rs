use super::{index::*, *};

/// The node types rewritten by [`TriangleToFaceSetFilter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Convertible {
    IndexedTriangleSet,
    IndexedTriangleFanSet,
    IndexedTriangleStripSet,
    TriangleSet,
    TriangleFanSet,
    TriangleStripSet,
}

impl Convertible {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "IndexedTriangleSet" => Self::IndexedTriangleSet,
            "IndexedTriangleFanSet" => Self::IndexedTriangleFanSet,
            "IndexedTriangleStripSet" => Self::IndexedTriangleStripSet,
            "TriangleSet" => Self::TriangleSet,
            "TriangleFanSet" => Self::TriangleFanSet,
            "TriangleStripSet" => Self::TriangleStripSet,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Self::IndexedTriangleSet => "IndexedTriangleSet",
            Self::IndexedTriangleFanSet => "IndexedTriangleFanSet",
            Self::IndexedTriangleStripSet => "IndexedTriangleStripSet",
            Self::TriangleSet => "TriangleSet",
            Self::TriangleFanSet => "TriangleFanSet",
            Self::TriangleStripSet => "TriangleStripSet",
        }
    }
}

/// Child node fields carried over to the `IndexedFaceSet`, in output order.
const NODE_FIELDS: &[&str] = &["coord", "color", "normal", "texCoord"];
/// Scalar fields carried over to the `IndexedFaceSet`, in output order.
const SCALAR_FIELDS: &[&str] = &["ccw", "solid", "colorPerVertex", "normalPerVertex"];
const COORD_NODES: &[&str] = &["Coordinate", "CoordinateDouble"];

/// The state of one node being rewritten.
#[derive(Debug)]
struct Conversion {
    kind: Convertible,
    /// Field values seen inside the node, keyed `"<node>.<field>"`.
    values: HashMap<String, FieldValue>,
    /// The complete content of each child node field of the converted node.
    children: HashMap<String, EventBuffer>,
    /// The converted node itself.
    top: NodeMarker,
    /// The open nodes below the converted node, with their DEF names.
    inner: Vec<(NodeMarker, Option<String>)>,
    /// The child field of the converted node that is being recorded.
    recording: Option<(String, EventBuffer)>,
}

impl Conversion {
    fn new(kind: Convertible) -> Self {
        Self {
            kind,
            values: HashMap::new(),
            children: HashMap::new(),
            top: NodeMarker::new(kind.name()),
            inner: vec![],
            recording: None,
        }
    }

    fn at_top(&self) -> bool {
        self.inner.is_empty()
    }

    fn marker(&mut self) -> &mut NodeMarker {
        match self.inner.last_mut() {
            Some((m, _)) => m,
            None => &mut self.top,
        }
    }

    fn record(&mut self, e: Event) {
        if let Some((_, buf)) = &mut self.recording {
            buf.push(e)
        }
    }

    fn ints(&self, field: &str) -> Result<Vec<i32>> {
        match self.values.get(&format!("{}.{}", self.kind.name(), field)) {
            Some(v) => v.to_ints(),
            None => Ok(vec![]),
        }
    }
}

/// Rewrites `IndexedTriangleSet`, `IndexedTriangleFanSet`, `IndexedTriangleStripSet`,
/// `TriangleSet`, `TriangleFanSet` and `TriangleStripSet` nodes as `IndexedFaceSet`s.
///
/// The converted node is buffered until its end, because the index list can only be computed
/// once both the indices and the coordinates are known. The output carries `coordIndex`, then
/// the `coord`, `color`, `normal` and `texCoord` children exactly as they arrived (DEF and USE
/// included), then `ccw`, `solid`, `colorPerVertex` and `normalPerVertex`.
#[derive(Debug, Default)]
pub struct TriangleToFaceSetFilter {
    base: BaseFilter,
    conversion: Option<Conversion>,
    /// Vertex counts of DEF'ed coordinate nodes, for `coord USE` in non-indexed nodes.
    coord_sizes: HashMap<String, usize>,
}

impl TriangleToFaceSetFilter {
    /// A new filter.
    pub fn new() -> Self {
        Self::default()
    }

    fn vertex_count(&self, conv: &Conversion) -> usize {
        for node in COORD_NODES {
            if let Some(v) = conv.values.get(&format!("{}.point", node)) {
                return v.to_floats().map_or(0, |p| p.len() / 3);
            }
        }
        let used = conv.children.get("coord").and_then(|buf| match &**buf {
            [Event::UseDecl(def)] => Some(def),
            _ => None,
        });
        used.and_then(|def| self.coord_sizes.get(def).copied())
            .unwrap_or(0)
    }

    fn face_index(&self, conv: &Conversion) -> Result<Vec<i32>> {
        let runs_of = |field: &str| -> Result<Vec<i32>> {
            let counts = conv.ints(field)?;
            if counts.is_empty() {
                log::warn!(
                    "{} without {}, writing an empty coordIndex",
                    conv.kind.name(),
                    field
                );
            }
            Ok(implicit_runs(&counts))
        };
        Ok(match conv.kind {
            Convertible::IndexedTriangleSet => triangles_to_faces(&conv.ints("index")?),
            Convertible::IndexedTriangleFanSet => indexed_fans_to_faces(&conv.ints("index")?),
            Convertible::IndexedTriangleStripSet => strips_to_faces(&conv.ints("index")?),
            Convertible::TriangleSet => {
                let n = self.vertex_count(conv) as i32;
                triangles_to_faces(&(0..n).collect::<Vec<_>>())
            }
            Convertible::TriangleFanSet => fans_to_faces(&runs_of("fanCount")?),
            Convertible::TriangleStripSet => strips_to_faces(&runs_of("stripCount")?),
        })
    }

    fn finish(&mut self, mut conv: Conversion) -> Result<()> {
        let index = self.face_index(&conv)?;
        self.base
            .value_field("coordIndex", FieldValue::IntArray(index))?;
        for &field in NODE_FIELDS {
            if let Some(buf) = conv.children.remove(field) {
                self.base.start_field(field)?;
                buf.replay_owned(&mut self.base)?;
                self.base.end_field()?;
            }
        }
        for &field in SCALAR_FIELDS {
            let key = format!("{}.{}", conv.kind.name(), field);
            if let Some(v) = conv.values.remove(&key) {
                self.base.value_field(field, v)?;
            }
        }
        if let Some(buf) = conv.children.remove("metadata") {
            self.base.start_field("metadata")?;
            buf.replay_owned(&mut self.base)?;
            self.base.end_field()?;
        }
        for field in conv.children.keys() {
            log::debug!("dropping {}.{}", conv.kind.name(), field);
        }
        self.base.end_node()
    }
}

impl ContentHandler for TriangleToFaceSetFilter {
    forward_events! {
        start_document, end_document, profile_decl, component_decl, meta_decl, route_decl,
    }

    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()> {
        if let Some(conv) = &mut self.conversion {
            conv.record(Event::start_node(name, def));
            conv.marker().mark(FieldContent::Nodes);
            conv.inner.push((NodeMarker::new(name), def.map(Into::into)));
            return Ok(());
        }
        match Convertible::parse(name) {
            Some(kind) => {
                self.conversion = Some(Conversion::new(kind));
                self.base.start_node("IndexedFaceSet", def)
            }
            None => self.base.start_node(name, def),
        }
    }

    fn start_field(&mut self, name: &str) -> Result<()> {
        match &mut self.conversion {
            Some(conv) => {
                if conv.at_top() {
                    conv.recording = Some((name.into(), EventBuffer::new()));
                } else {
                    conv.record(Event::StartField(name.into()));
                }
                conv.marker().set_field_data(name);
                Ok(())
            }
            None => self.base.start_field(name),
        }
    }

    fn field_value(&mut self, value: FieldValue) -> Result<()> {
        match &mut self.conversion {
            Some(conv) => {
                let marker = conv.marker();
                marker.mark(FieldContent::Value);
                if let Some(key) = marker.key() {
                    conv.values.insert(key, value.clone());
                }
                conv.record(Event::Value(value));
                Ok(())
            }
            None => {
                let is_point = self.base.current_field() == Some("point")
                    && COORD_NODES.iter().any(|&n| self.base.current_node() == Some(n));
                if let (true, Some(def)) = (is_point, self.base.current_def()) {
                    let n = value.to_floats().map_or(0, |p| p.len() / 3);
                    self.coord_sizes.insert(def.into(), n);
                }
                self.base.field_value(value)
            }
        }
    }

    fn use_decl(&mut self, def: &str) -> Result<()> {
        match &mut self.conversion {
            Some(conv) => {
                conv.marker().mark(FieldContent::Use);
                conv.record(Event::UseDecl(def.into()));
                Ok(())
            }
            None => self.base.use_decl(def),
        }
    }

    fn end_field(&mut self) -> Result<()> {
        match &mut self.conversion {
            Some(conv) => {
                conv.marker().clear_field();
                if conv.at_top() {
                    if let Some((name, buf)) = conv.recording.take() {
                        if !buf.is_empty() && !matches!(&*buf, [Event::Value(_)]) {
                            conv.children.insert(name, buf);
                        }
                    }
                } else {
                    conv.record(Event::EndField);
                }
                Ok(())
            }
            None => self.base.end_field(),
        }
    }

    fn end_node(&mut self) -> Result<()> {
        match self.conversion.take() {
            None => self.base.end_node(),
            Some(conv) if conv.at_top() => self.finish(conv),
            Some(mut conv) => {
                if let Some((marker, Some(def))) = conv.inner.pop() {
                    let key = format!("{}.point", marker.node_name);
                    if let (true, Some(point)) = (
                        COORD_NODES.contains(&&*marker.node_name),
                        conv.values.get(&key),
                    ) {
                        let n = point.to_floats().map_or(0, |p| p.len() / 3);
                        self.coord_sizes.insert(def, n);
                    }
                }
                conv.record(Event::EndNode);
                self.conversion = Some(conv);
                Ok(())
            }
        }
    }
}

impl Filter for TriangleToFaceSetFilter {
    fn base_mut(&mut self) -> &mut BaseFilter {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::connect;

    fn node_with(
        f: &mut impl ContentHandler,
        name: &str,
        fields: &[(&str, FieldValue)],
        coord: Option<&[f32]>,
    ) {
        f.start_node(name, Some("GEO")).unwrap();
        for (field, v) in fields {
            f.value_field(field, v.clone()).unwrap();
        }
        if let Some(point) = coord {
            f.start_field("coord").unwrap();
            f.start_node("Coordinate", Some("PTS")).unwrap();
            f.value_field("point", FieldValue::FloatArray(point.to_vec()))
                .unwrap();
            f.end_node().unwrap();
            f.end_field().unwrap();
        }
        f.end_node().unwrap();
    }

    fn coord_index(log: &EventBuffer) -> Vec<i32> {
        let pos = log
            .iter()
            .position(|e| *e == Event::StartField("coordIndex".into()))
            .expect("coordIndex written");
        match &log[pos + 1] {
            Event::Value(v) => v.to_ints().unwrap(),
            e => panic!("unexpected {:?}", e),
        }
    }

    #[test]
    fn strip_set_becomes_face_set() {
        let point = [0., 0., 0., 1., 0., 0., 0., 1., 0., 1., 1., 0.];
        let mut f = TriangleToFaceSetFilter::new();
        let log = connect(&mut f);
        node_with(
            &mut f,
            "TriangleStripSet",
            &[
                ("solid", FieldValue::String("FALSE".into())),
                ("stripCount", FieldValue::IntArray(vec![4])),
            ],
            Some(&point),
        );
        let log = log.borrow();
        assert_eq!(log[0], Event::start_node("IndexedFaceSet", Some("GEO")));
        assert_eq!(coord_index(&log), [0, 1, 2, -1, 1, 3, 2, -1]);
        assert!(log.contains(&Event::start_node("Coordinate", Some("PTS"))));
        assert!(log.contains(&Event::Value(FieldValue::FloatArray(point.to_vec()))));
        assert!(!log.contains(&Event::StartField("stripCount".into())));
        let solid = log.iter().position(|e| *e == Event::StartField("solid".into()));
        let coord = log.iter().position(|e| *e == Event::StartField("coord".into()));
        assert!(coord < solid);
        assert_eq!(log.last(), Some(&Event::EndNode));
    }

    #[test]
    fn indexed_variants() {
        let mut f = TriangleToFaceSetFilter::new();
        let log = connect(&mut f);
        let index = FieldValue::String("0 1 2 3 4 5".into());
        node_with(&mut f, "IndexedTriangleSet", &[("index", index)], None);
        assert_eq!(coord_index(&log.borrow()), [0, 1, 2, -1, 3, 4, 5, -1]);

        log.borrow_mut().clear();
        let index = FieldValue::IntArray(vec![0, 1, 2, 3, -1, 4, 5, 6]);
        node_with(&mut f, "IndexedTriangleFanSet", &[("index", index)], None);
        assert_eq!(coord_index(&log.borrow()), [0, 1, 2, 3, -1, 4, 5, 6, -1]);
    }

    #[test]
    fn non_indexed_fans_and_triangles() {
        let point = [0.; 18];
        let mut f = TriangleToFaceSetFilter::new();
        let log = connect(&mut f);
        node_with(
            &mut f,
            "TriangleFanSet",
            &[("fanCount", FieldValue::IntArray(vec![4, 2]))],
            Some(&point),
        );
        assert_eq!(coord_index(&log.borrow()), [0, 1, 2, -1, 0, 2, 3, -1]);

        log.borrow_mut().clear();
        node_with(&mut f, "TriangleSet", &[], Some(&point));
        assert_eq!(coord_index(&log.borrow()), [0, 1, 2, -1, 3, 4, 5, -1]);

        log.borrow_mut().clear();
        node_with(&mut f, "TriangleStripSet", &[], Some(&point));
        assert!(coord_index(&log.borrow()).is_empty());
    }

    #[test]
    fn used_coordinates_keep_their_size() {
        let mut f = TriangleToFaceSetFilter::new();
        let log = connect(&mut f);
        node_with(&mut f, "TriangleSet", &[], Some(&[0.; 9]));
        f.start_node("TriangleSet", None).unwrap();
        f.start_field("coord").unwrap();
        f.use_decl("PTS").unwrap();
        f.end_field().unwrap();
        f.end_node().unwrap();
        let log = log.borrow();
        let second = log
            .iter()
            .rposition(|e| *e == Event::start_node("IndexedFaceSet", None))
            .unwrap();
        let rest = EventBuffer::from(log[second..].to_vec());
        assert_eq!(coord_index(&rest), [0, 1, 2, -1]);
        assert!(rest.contains(&Event::UseDecl("PTS".into())));
    }

    #[test]
    fn other_nodes_pass_through() {
        let mut f = TriangleToFaceSetFilter::new();
        let log = connect(&mut f);
        let mut input = EventBuffer::new();
        let index = FieldValue::String("0 1 2 -1".into());
        node_with(&mut input, "IndexedFaceSet", &[("coordIndex", index)], Some(&[0.; 9]));
        input.replay(&mut f).unwrap();
        assert_eq!(*log.borrow(), input);
    }
}
