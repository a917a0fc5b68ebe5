use super::{index::runs, *};

const COORD_NODES: &[&str] = &["Coordinate", "CoordinateDouble"];

/// A buffered `IndexedFaceSet`.
#[derive(Debug)]
struct Pending {
    def: Option<String>,
    /// Everything after the `start_node` of the face set.
    events: EventBuffer,
    /// The open nodes; the first one is the face set.
    markers: Vec<NodeMarker>,
    coord_index: Option<FieldValue>,
    point: Option<FieldValue>,
    ccw: Option<FieldValue>,
    solid: Option<FieldValue>,
    /// Fields that have no place in a `TriangleSet` and will be lost.
    dropped: Vec<String>,
    /// DEF names declared inside the face set.
    inner_defs: Vec<String>,
}

impl Pending {
    fn new(def: Option<&str>) -> Self {
        Self {
            def: def.map(Into::into),
            events: EventBuffer::new(),
            markers: vec![NodeMarker::new("IndexedFaceSet")],
            coord_index: None,
            point: None,
            ccw: None,
            solid: None,
            dropped: vec![],
            inner_defs: vec![],
        }
    }

    /// The point field of the inline coordinate node, if that is where the stream is.
    fn in_coord_point(&self) -> bool {
        match &*self.markers {
            [ifs, coord] => {
                ifs.field_name.as_deref() == Some("coord")
                    && COORD_NODES.contains(&&*coord.node_name)
                    && coord.field_name.as_deref() == Some("point")
            }
            _ => false,
        }
    }
}

/// Rewrites already triangulated `IndexedFaceSet`s as `TriangleSet`s, baking every face's
/// coordinates into a new point-only `Coordinate`.
///
/// Only `coord`, `ccw` and `solid` survive. A face set without `coordIndex`, whose `coord`
/// is a `USE` or has no `point`, or that declares a DEF below itself, is forwarded untouched. Faces with more than three vertices are
/// fan triangulated after a warning.
#[derive(Debug, Default)]
pub struct FaceSetToTriangleFilter {
    base: BaseFilter,
    pending: Option<Pending>,
    warned: bool,
}

impl FaceSetToTriangleFilter {
    /// A new filter.
    pub fn new() -> Self {
        Self::default()
    }

    fn bake(&mut self, index: &[i32], point: &[f32]) -> Vec<f32> {
        let n = point.len() / 3;
        let mut out = vec![];
        for face in runs(index) {
            if face.len() != 3 && !self.warned {
                log::warn!("IndexedFaceSet has faces that are not triangles, triangulating");
                self.warned = true;
            }
            if face.len() < 3 || face.iter().any(|&i| i < 0 || i as usize >= n) {
                log::debug!("skipping face {:?}", face);
                continue;
            }
            for w in face[1..].windows(2) {
                for i in [face[0], w[0], w[1]] {
                    let i = i as usize * 3;
                    out.extend_from_slice(&point[i..i + 3]);
                }
            }
        }
        out
    }

    fn finish(&mut self, p: Pending) -> Result<()> {
        let (index, point) = match (&p.coord_index, &p.point) {
            (Some(index), Some(point)) if p.inner_defs.is_empty() => {
                (index.to_ints()?, point.to_floats()?)
            }
            _ => {
                if !p.inner_defs.is_empty() {
                    log::debug!(
                        "keeping IndexedFaceSet, it defines {}",
                        p.inner_defs.join(", ")
                    );
                }
                self.base.start_node("IndexedFaceSet", p.def.as_deref())?;
                p.events.replay_owned(&mut self.base)?;
                return self.base.end_node();
            }
        };
        if !p.dropped.is_empty() {
            log::warn!("IndexedFaceSet to TriangleSet drops {}", p.dropped.join(", "));
        }
        let baked = self.bake(&index, &point);
        self.base.start_node("TriangleSet", p.def.as_deref())?;
        self.base.start_field("coord")?;
        self.base.start_node("Coordinate", None)?;
        self.base.value_field("point", FieldValue::FloatArray(baked))?;
        self.base.end_node()?;
        self.base.end_field()?;
        if let Some(ccw) = p.ccw {
            self.base.value_field("ccw", ccw)?;
        }
        if let Some(solid) = p.solid {
            self.base.value_field("solid", solid)?;
        }
        self.base.end_node()
    }
}

impl ContentHandler for FaceSetToTriangleFilter {
    forward_events! {
        end_document, profile_decl, component_decl, meta_decl, route_decl,
    }

    fn start_document(&mut self, header: &DocumentHeader) -> Result<()> {
        self.pending = None;
        self.warned = false;
        self.base.start_document(header)
    }

    fn start_node(&mut self, name: &str, def: Option<&str>) -> Result<()> {
        if let Some(p) = &mut self.pending {
            if let Some(m) = p.markers.last_mut() {
                m.mark(FieldContent::Nodes)
            }
            p.markers.push(NodeMarker::new(name));
            if let Some(def) = def {
                p.inner_defs.push(def.into());
            }
            return p.events.start_node(name, def);
        }
        if name != "IndexedFaceSet" {
            return self.base.start_node(name, def);
        }
        self.pending = Some(Pending::new(def));
        Ok(())
    }

    fn start_field(&mut self, name: &str) -> Result<()> {
        match &mut self.pending {
            Some(p) => {
                if p.markers.len() == 1
                    && !matches!(name, "coord" | "coordIndex" | "ccw" | "solid" | "metadata")
                {
                    p.dropped.push(name.into());
                }
                if let Some(m) = p.markers.last_mut() {
                    m.set_field_data(name)
                }
                p.events.start_field(name)
            }
            None => self.base.start_field(name),
        }
    }

    fn field_value(&mut self, value: FieldValue) -> Result<()> {
        let p = match &mut self.pending {
            Some(p) => p,
            None => return self.base.field_value(value),
        };
        if p.in_coord_point() {
            p.point = Some(value.clone());
        } else if let [ifs] = &*p.markers {
            let slot = match ifs.field_name.as_deref() {
                Some("coordIndex") => Some(&mut p.coord_index),
                Some("ccw") => Some(&mut p.ccw),
                Some("solid") => Some(&mut p.solid),
                _ => None,
            };
            if let Some(slot) = slot {
                *slot = Some(value.clone());
            }
        }
        p.events.field_value(value)
    }

    fn use_decl(&mut self, def: &str) -> Result<()> {
        match &mut self.pending {
            Some(p) => p.events.use_decl(def),
            None => self.base.use_decl(def),
        }
    }

    fn end_field(&mut self) -> Result<()> {
        match &mut self.pending {
            Some(p) => {
                if let Some(m) = p.markers.last_mut() {
                    m.clear_field()
                }
                p.events.end_field()
            }
            None => self.base.end_field(),
        }
    }

    fn end_node(&mut self) -> Result<()> {
        match self.pending.take() {
            None => self.base.end_node(),
            Some(p) if p.markers.len() == 1 => self.finish(p),
            Some(mut p) => {
                p.markers.pop();
                p.events.end_node()?;
                self.pending = Some(p);
                Ok(())
            }
        }
    }
}

impl Filter for FaceSetToTriangleFilter {
    fn base_mut(&mut self) -> &mut BaseFilter {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::connect;

    fn face_set(out: &mut impl ContentHandler, index: &str, coord: Option<&str>) {
        out.start_node("IndexedFaceSet", Some("IFS")).unwrap();
        out.value_field("solid", FieldValue::String("false".into()))
            .unwrap();
        out.value_field("coordIndex", FieldValue::String(index.into()))
            .unwrap();
        out.start_field("coord").unwrap();
        match coord {
            Some(point) => {
                out.start_node("Coordinate", None).unwrap();
                out.value_field("point", FieldValue::String(point.into()))
                    .unwrap();
                out.end_node().unwrap();
            }
            None => out.use_decl("C").unwrap(),
        }
        out.end_field().unwrap();
        out.end_node().unwrap();
    }

    #[test]
    fn coordinates_are_baked() {
        let mut f = FaceSetToTriangleFilter::new();
        let log = connect(&mut f);
        face_set(&mut f, "0 1 2 -1 2 1 3 -1", Some("0 0 0, 1 0 0, 0 1 0, 1 1 0"));
        assert_eq!(
            **log.borrow(),
            [
                Event::start_node("TriangleSet", Some("IFS")),
                Event::StartField("coord".into()),
                Event::start_node("Coordinate", None),
                Event::StartField("point".into()),
                Event::Value(FieldValue::FloatArray(vec![
                    0., 0., 0., 1., 0., 0., 0., 1., 0., //
                    0., 1., 0., 1., 0., 0., 1., 1., 0.,
                ])),
                Event::EndField,
                Event::EndNode,
                Event::EndField,
                Event::StartField("solid".into()),
                Event::Value(FieldValue::String("false".into())),
                Event::EndField,
                Event::EndNode,
            ]
        );
    }

    #[test]
    fn quads_are_split_and_bad_faces_skipped() {
        let mut f = FaceSetToTriangleFilter::new();
        let log = connect(&mut f);
        face_set(&mut f, "0 1 3 2 -1 0 9 1 -1 0 1 -1", Some("0 0 0 1 0 0 0 1 0 1 1 0"));
        let log = log.borrow();
        let point = log
            .iter()
            .find_map(|e| match e {
                Event::Value(FieldValue::FloatArray(p)) => Some(p.len()),
                _ => None,
            })
            .unwrap();
        assert_eq!(point, 2 * 9);
    }

    #[test]
    fn used_coordinates_are_left_alone() {
        let mut input = EventBuffer::new();
        face_set(&mut input, "0 1 2 -1", None);
        let mut f = FaceSetToTriangleFilter::new();
        let log = connect(&mut f);
        input.replay(&mut f).unwrap();
        assert_eq!(*log.borrow(), input);
    }

    #[test]
    fn shared_coordinates_keep_their_def() {
        let mut input = EventBuffer::new();
        for (index, coord) in [("0 1 2 -1", Some("C")), ("2 1 0 -1", None)] {
            input.start_node("IndexedFaceSet", None).unwrap();
            input
                .value_field("coordIndex", FieldValue::String(index.into()))
                .unwrap();
            input.start_field("coord").unwrap();
            match coord {
                Some(def) => {
                    input.start_node("Coordinate", Some(def)).unwrap();
                    input
                        .value_field("point", FieldValue::String("0 0 0 1 0 0 0 1 0".into()))
                        .unwrap();
                    input.end_node().unwrap();
                }
                None => input.use_decl("C").unwrap(),
            }
            input.end_field().unwrap();
            input.end_node().unwrap();
        }
        let mut f = FaceSetToTriangleFilter::new();
        let log = connect(&mut f);
        input.replay(&mut f).unwrap();
        let log = log.borrow();
        let defs: Vec<_> = log
            .iter()
            .filter_map(|e| match e {
                Event::StartNode { def: Some(d), .. } => Some(d.clone()),
                _ => None,
            })
            .collect();
        for e in log.iter() {
            if let Event::UseDecl(name) = e {
                assert!(defs.contains(name), "USE {} has no DEF", name);
            }
        }
        assert_eq!(*log, input);
    }
}
