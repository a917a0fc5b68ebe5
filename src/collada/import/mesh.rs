//! Turning mesh primitives into indexed X3D geometry.
//!
//! A COLLADA primitive indexes every input separately: each vertex is a tuple of `stride`
//! indices, and the input with offset `k` reads the `k`-th index of the tuple. X3D indexes
//! `coord`, `normal`, `texCoord` and `color` either all through one list, or through one list
//! each. When all inputs share an offset, the single list is enough.

use super::*;

/// Checks every index tuple of `p` against the sizes of the inputs, face by face, and drops the
/// faces that index past the end of an input.
///
/// `p` is cut into faces of `span` indices, a whole number of `stride`-long tuples. Each entry
/// of `limits` is an `(offset, len)` pair: the index at `offset` in every tuple must be below
/// `len`. A trailing partial face is dropped as well. Returns the kept indices and the number
/// of dropped faces.
pub fn validate_indices(
    p: &[u32],
    stride: usize,
    span: usize,
    limits: &[(usize, usize)],
) -> (Vec<u32>, usize) {
    if span == 0 {
        return (vec![], 0);
    }
    let mut kept = Vec::with_capacity(p.len());
    let mut dropped = 0;
    for face in p.chunks(span) {
        if face.len() == span && face_in_range(face, stride, limits) {
            kept.extend_from_slice(face)
        } else {
            dropped += 1
        }
    }
    (kept, dropped)
}

fn face_in_range(face: &[u32], stride: usize, limits: &[(usize, usize)]) -> bool {
    face.chunks(stride)
        .all(|t| limits.iter().all(|&(off, len)| (t[off] as usize) < len))
}

/// Index tuples grouped into faces (or polylines, for line primitives).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(super) struct Faces {
    /// The tuples of all faces, back to back.
    pub tuples: Vec<u32>,
    /// The number of vertices of each face.
    pub sizes: Vec<usize>,
}

impl Faces {
    fn push(&mut self, face: &[u32], stride: usize) {
        let face = &face[..face.len() / stride * stride];
        self.tuples.extend_from_slice(face);
        self.sizes.push(face.len() / stride);
    }

    /// Group the indices of a primitive. Strips and fans are cut into triangles.
    pub fn new(prim: &Primitive) -> Self {
        let stride = prim.inputs.stride;
        let mut res = Faces::default();
        for group in prim.groups() {
            let vertex = |i: usize| &group[i * stride..(i + 1) * stride];
            let n = group.len() / stride;
            match prim.kind {
                PrimitiveKind::TriFans => {
                    for i in 1..n.saturating_sub(1) {
                        res.push(&[vertex(0), vertex(i), vertex(i + 1)].concat(), stride)
                    }
                }
                PrimitiveKind::TriStrips => {
                    for i in 0..n.saturating_sub(2) {
                        let tri = if i % 2 == 0 {
                            [vertex(i), vertex(i + 1), vertex(i + 2)]
                        } else {
                            [vertex(i), vertex(i + 2), vertex(i + 1)]
                        };
                        res.push(&tri.concat(), stride)
                    }
                }
                _ => res.push(group, stride),
            }
        }
        res
    }

    /// The common size of all faces, if they have one.
    fn uniform(&self) -> Option<usize> {
        let n = *self.sizes.first()?;
        self.sizes.iter().all(|&m| m == n).then_some(n)
    }

    /// Drop the faces that index past the end of an input. Returns the number of dropped faces.
    pub fn retain_valid(&mut self, stride: usize, limits: &[(usize, usize)]) -> usize {
        if let Some(n) = self.uniform() {
            let (kept, dropped) = validate_indices(&self.tuples, stride, n * stride, limits);
            self.tuples = kept;
            self.sizes.truncate(self.sizes.len() - dropped);
            return dropped;
        }
        let mut res = Faces::default();
        let mut start = 0;
        for &n in &self.sizes {
            let face = &self.tuples[start..start + n * stride];
            if face_in_range(face, stride, limits) {
                res.push(face, stride)
            }
            start += n * stride;
        }
        let dropped = self.sizes.len() - res.sizes.len();
        *self = res;
        dropped
    }

    /// Whether every face is a triangle.
    pub fn all_triangles(&self) -> bool {
        self.sizes.iter().all(|&n| n == 3)
    }

    /// The indices at `offset` of every tuple, with a `-1` after each face if `terminate` is set.
    pub fn index(&self, stride: usize, offset: usize, terminate: bool) -> Vec<i32> {
        let mut out = Vec::with_capacity(self.tuples.len() / stride + self.sizes.len());
        let mut tuples = self.tuples.chunks(stride);
        for &n in &self.sizes {
            out.extend(tuples.by_ref().take(n).map(|t| t[offset] as i32));
            if terminate {
                out.push(-1)
            }
        }
        out
    }
}

/// The per-vertex attributes of X3D geometry nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(super) enum Attr {
    Coord,
    Normal,
    TexCoord,
    Color,
}

impl Attr {
    /// The node field holding the data node.
    fn field(self) -> &'static str {
        match self {
            Attr::Coord => "coord",
            Attr::Normal => "normal",
            Attr::TexCoord => "texCoord",
            Attr::Color => "color",
        }
    }

    /// The index field of an `IndexedFaceSet`.
    fn index_field(self) -> &'static str {
        match self {
            Attr::Coord => "coordIndex",
            Attr::Normal => "normalIndex",
            Attr::TexCoord => "texCoordIndex",
            Attr::Color => "colorIndex",
        }
    }

    /// The data node type and its value field, for data of the given width.
    fn node(self, width: usize) -> (&'static str, &'static str) {
        match self {
            Attr::Coord => ("Coordinate", "point"),
            Attr::Normal => ("Normal", "vector"),
            Attr::TexCoord => ("TextureCoordinate", "point"),
            Attr::Color if width == 4 => ("ColorRGBA", "color"),
            Attr::Color => ("Color", "color"),
        }
    }

    /// The number of components X3D keeps, given the width of the source.
    fn keep(self, width: usize) -> Option<usize> {
        match self {
            Attr::Coord | Attr::Normal if width >= 3 => Some(3),
            Attr::TexCoord if width >= 2 => Some(2),
            Attr::Color if width == 3 || width == 4 => Some(width),
            _ => None,
        }
    }
}

/// One input of a primitive, with its data narrowed to what X3D keeps.
#[derive(Debug)]
pub(super) struct VertexData<'a> {
    attr: Attr,
    source: &'a Source,
    offset: usize,
    width: usize,
    count: usize,
    data: Vec<f32>,
}

impl<'a> Emitter<'a, '_> {
    /// Read an input source. Sources of an unusable width give `None` (and an error for
    /// positions).
    fn channel(
        &self,
        attr: Attr,
        url: &UrlRef<Source>,
        offset: usize,
    ) -> Result<Option<VertexData<'a>>> {
        let source = self.maps.resolve(url)?;
        let width = source.width();
        let Some(keep) = attr.keep(width) else {
            if attr == Attr::Coord {
                return Err(format!("positions of width {} in {}", width, url.val).into());
            }
            log::warn!("ignoring {} source {} of width {}", attr.field(), url.val, width);
            return Ok(None);
        };
        let raw = source.float_data()?;
        let data = if keep == width {
            raw.into_vec()
        } else {
            raw.chunks_exact(width).flat_map(|c| &c[..keep]).copied().collect()
        };
        Ok(Some(VertexData {
            attr,
            source,
            offset,
            width: keep,
            count: source.count(),
            data,
        }))
    }

    /// The inputs of `prim` that have an X3D counterpart. Positions come first.
    fn channels(&self, prim: &'a Primitive) -> Result<Vec<VertexData<'a>>> {
        let inputs = &prim.inputs;
        let vertex = inputs
            .get(&Semantic::Vertex)
            .ok_or_else(|| format!("<{}> without VERTEX input", prim.kind.name()))?;
        let vertices = self.maps.resolve(vertex.source_as_vertices())?;
        let voff = vertex.offset as usize;
        let mut res = vec![];
        for (attr, semantic) in [
            (Attr::Coord, Semantic::Position),
            (Attr::Normal, Semantic::Normal),
            (Attr::TexCoord, Semantic::TexCoord),
            (Attr::Color, Semantic::Color),
        ] {
            if attr == Attr::Color && self.opts.hints.uncolored {
                continue;
            }
            let input = match inputs.get(&semantic) {
                Some(i) => Some((i.source_as_source(), i.offset as usize)),
                None => vertices.get(&semantic).map(|i| (i.source_as_source(), voff)),
            };
            if let Some((url, offset)) = input {
                res.extend(self.channel(attr, url, offset)?)
            }
        }
        Ok(res)
    }

    /// Emit the `geometry` field of a shape for `prim`.
    pub(super) fn geometry(&mut self, geom: &'a Geometry, prim: &'a Primitive) -> Result<()> {
        let stride = prim.inputs.stride;
        let mut channels = self.channels(prim)?;
        if prim.kind.is_lines() {
            channels.retain(|c| matches!(c.attr, Attr::Coord | Attr::Color));
        }
        let mut faces = Faces::new(prim);
        let limits: Vec<_> = channels.iter().map(|c| (c.offset, c.count)).collect();
        let dropped = faces.retain_valid(stride, &limits);
        if dropped != 0 {
            let what = format!(
                "{} <{}> face(s) of geometry {:?} index past the end of their sources",
                dropped,
                prim.kind.name(),
                geom.id.as_deref().unwrap_or_default()
            );
            if self.opts.strictness == Strictness::Strict {
                return Err(what.into());
            }
            if !self.warned_indices {
                log::warn!("dropping faces with bad indices: {}", what);
                self.warned_indices = true;
            } else {
                log::debug!("{}", what);
            }
        }
        let Some(coord_offset) = channels
            .first()
            .filter(|c| c.attr == Attr::Coord)
            .map(|c| c.offset)
        else {
            return Err(format!("geometry {:?} has no positions", geom.id).into());
        };
        let shared = channels.iter().all(|c| c.offset == coord_offset);

        self.out.start_field("geometry")?;
        if prim.kind.is_lines() {
            self.out.start_node("IndexedLineSet", None)?;
            self.index_fields(&faces, stride, &channels, shared)?;
        } else if shared && faces.all_triangles() {
            self.out.start_node("IndexedTriangleSet", None)?;
            let index = faces.index(stride, coord_offset, false);
            self.out.value_field("index", FieldValue::IntArray(index))?;
        } else {
            self.out.start_node("IndexedFaceSet", None)?;
            self.index_fields(&faces, stride, &channels, shared)?;
        }
        for c in &channels {
            self.data_node(c)?;
        }
        self.out.end_node()?;
        self.out.end_field()
    }

    fn index_fields(
        &mut self,
        faces: &Faces,
        stride: usize,
        channels: &[VertexData<'a>],
        shared: bool,
    ) -> Result<()> {
        for c in channels {
            if c.attr == Attr::Coord || !shared {
                let index = faces.index(stride, c.offset, true);
                self.out
                    .value_field(c.attr.index_field(), FieldValue::IntArray(index))?;
            }
        }
        Ok(())
    }

    /// Emit the data node of a channel, or a `USE` if its source was already emitted as the
    /// same node type.
    fn data_node(&mut self, c: &VertexData<'a>) -> Result<()> {
        let (node, field) = c.attr.node(c.width);
        self.out.start_field(c.attr.field())?;
        let key = c.source.id.as_deref().map(|id| (id, node));
        match key.and_then(|k| self.sources.get(&k)) {
            Some(def) => self.out.use_decl(def)?,
            None => {
                let def = key.map(|(id, _)| self.def_name(id));
                self.out.start_node(node, def.as_deref())?;
                self.out
                    .value_field(field, FieldValue::FloatArray(c.data.clone()))?;
                self.out.end_node()?;
                if let (Some(k), Some(def)) = (key, def) {
                    self.sources.insert(k, def);
                }
            }
        }
        self.out.end_field()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bad_faces_are_dropped() {
        // two triangles over (vertex, normal) tuples; the second names normal 7 of 4
        let p = [0, 0, 1, 1, 2, 2, 0, 0, 2, 7, 3, 3];
        let (kept, dropped) = validate_indices(&p, 2, 6, &[(0, 4), (1, 4)]);
        assert_eq!(kept, [0, 0, 1, 1, 2, 2]);
        assert_eq!(dropped, 1);
        let (kept, dropped) = validate_indices(&p, 2, 6, &[(0, 4)]);
        assert_eq!(kept.len(), 12);
        assert_eq!(dropped, 0);
    }

    fn prim(kind: PrimitiveKind, stride: u32, prims: Vec<Vec<u32>>) -> Primitive {
        let inputs = (0..stride)
            .map(|offset| InputS {
                input: Input {
                    semantic: if offset == 0 { Semantic::Vertex } else { Semantic::Normal },
                    source: Url::Fragment("s".into()),
                },
                offset,
                set: None,
            })
            .collect();
        Primitive {
            kind,
            name: None,
            material: None,
            count: prims.len(),
            inputs: InputList::new(inputs),
            vcount: None,
            prims: prims.into_iter().map(Into::into).collect(),
            holes: 0,
        }
    }

    #[test]
    fn strips_and_fans_are_triangulated() {
        let strip = Faces::new(&prim(PrimitiveKind::TriStrips, 1, vec![vec![0, 1, 2, 3]]));
        assert_eq!(strip.index(1, 0, true), [0, 1, 2, -1, 1, 3, 2, -1]);
        let fan = Faces::new(&prim(PrimitiveKind::TriFans, 2, vec![vec![0, 0, 1, 1, 2, 2, 3, 3]]));
        assert_eq!(fan.index(2, 1, false), [0, 1, 2, 0, 2, 3]);
        assert!(fan.all_triangles());
    }

    #[test]
    fn mixed_faces_are_checked_one_by_one() {
        let mut faces = Faces::new(&prim(
            PrimitiveKind::Polygons,
            1,
            vec![vec![0, 1, 2, 3], vec![0, 9, 1], vec![3, 2, 1]],
        ));
        assert_eq!(faces.retain_valid(1, &[(0, 4)]), 1);
        assert_eq!(faces.sizes, [4, 3]);
        assert_eq!(faces.index(1, 0, true), [0, 1, 2, 3, -1, 3, 2, 1, -1]);
    }

    proptest! {
        #[test]
        fn kept_faces_are_in_range(
            p in proptest::collection::vec(0u32..12, 0..90),
            limit in 1usize..12,
        ) {
            let (kept, dropped) = validate_indices(&p, 3, 9, &[(0, limit), (2, 12)]);
            prop_assert_eq!(kept.len() % 9, 0);
            prop_assert_eq!(kept.len() / 9 + dropped, (p.len() + 8) / 9);
            for t in kept.chunks(3) {
                prop_assert!((t[0] as usize) < limit);
            }
        }

        #[test]
        fn strip_gives_one_triangle_per_extra_vertex(n in 3u32..40) {
            let faces = Faces::new(&prim(PrimitiveKind::TriStrips, 1, vec![(0..n).collect()]));
            prop_assert_eq!(faces.sizes.len(), n as usize - 2);
            let index = faces.index(1, 0, true);
            prop_assert_eq!(index.iter().filter(|&&i| i == -1).count(), n as usize - 2);
        }
    }
}
