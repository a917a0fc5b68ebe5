use super::*;

/// Describes the visual shape of an object in a scene.
#[derive(Clone, Debug)]
pub struct Geometry {
    /// A text string containing the unique identifier of the element.
    pub id: Option<String>,
    /// The text string name of this element.
    pub name: Option<String>,
    /// The mesh data, or `None` for splines and other geometry kinds without a mesh.
    pub mesh: Option<Mesh>,
}

impl XNode for Geometry {
    const NAME: &'static str = "geometry";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        parse_opt("asset", &mut it, |_| Ok(()))?;
        let mesh = match it.next() {
            Some(e) if matches!(e.name(), "mesh" | "convex_mesh") => Some(Mesh::parse(e)?),
            Some(e) => {
                log::debug!("geometry {:?}: skipping <{}>", element.attr("id"), e.name());
                None
            }
            None => return Err("<geometry> without content".into()),
        };
        Ok(Geometry {
            id: element.attr("id").map(Into::into),
            name: element.attr("name").map(Into::into),
            mesh,
        })
    }
}

/// Describes basic geometric meshes using vertex and primitive information.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Provides the bulk of the mesh’s vertex data.
    pub sources: Vec<Source>,
    /// Describes the mesh-vertex attributes and establishes their topological identity.
    /// Only a `convex_mesh` that refers to another geometry may leave this out.
    pub vertices: Option<Vertices>,
    /// Geometric primitives, which assemble values from the inputs into vertex attribute data.
    pub primitives: Vec<Primitive>,
}

impl Mesh {
    /// The element name is `mesh` or `convex_mesh`.
    pub fn parse(element: &Element) -> Result<Self> {
        let mut it = element.children().peekable();
        let res = Mesh {
            sources: Source::parse_list(&mut it)?,
            vertices: Vertices::parse_opt(&mut it)?,
            primitives: parse_list_many(&mut it, Primitive::parse)?,
        };
        finish(res, it)
    }
}

/// The kinds of primitive a [`Mesh`] may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `<lines>`: independent two-vertex lines.
    Lines,
    /// `<linestrips>`: one `<p>` per connected line strip.
    LineStrips,
    /// `<polygons>`: one `<p>` per polygon, and `<ph>` for polygons with holes.
    Polygons,
    /// `<polylist>`: polygons given by a `<vcount>` list and a single `<p>`.
    PolyList,
    /// `<triangles>`: independent triangles.
    Triangles,
    /// `<trifans>`: one `<p>` per triangle fan.
    TriFans,
    /// `<tristrips>`: one `<p>` per triangle strip.
    TriStrips,
}

impl PrimitiveKind {
    /// The element name.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Lines => "lines",
            PrimitiveKind::LineStrips => "linestrips",
            PrimitiveKind::Polygons => "polygons",
            PrimitiveKind::PolyList => "polylist",
            PrimitiveKind::Triangles => "triangles",
            PrimitiveKind::TriFans => "trifans",
            PrimitiveKind::TriStrips => "tristrips",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "lines" => PrimitiveKind::Lines,
            "linestrips" => PrimitiveKind::LineStrips,
            "polygons" => PrimitiveKind::Polygons,
            "polylist" => PrimitiveKind::PolyList,
            "triangles" => PrimitiveKind::Triangles,
            "trifans" => PrimitiveKind::TriFans,
            "tristrips" => PrimitiveKind::TriStrips,
            _ => return None,
        })
    }

    /// Line primitives, as opposed to surfaces.
    pub fn is_lines(self) -> bool {
        matches!(self, PrimitiveKind::Lines | PrimitiveKind::LineStrips)
    }
}

/// A geometric primitive: a list of index tuples into the inputs, grouped into faces, lines or
/// strips.
#[derive(Clone, Debug)]
pub struct Primitive {
    /// Which primitive element this is.
    pub kind: PrimitiveKind,
    /// The text string name of this element.
    pub name: Option<String>,
    /// A symbol for a material, bound through an [`InstanceMaterial`] when the geometry is
    /// instantiated.
    pub material: Option<String>,
    /// The number of primitives (lines, triangles, polygons, strips or fans).
    pub count: usize,
    /// The inputs, with offsets into each index tuple.
    pub inputs: InputList,
    /// The vertex count of each polygon of a `<polylist>`.
    pub vcount: Option<Box<[u32]>>,
    /// The `<p>` index lists: one for `lines`, `triangles` and `polylist`, one per strip, fan or
    /// polygon otherwise.
    pub prims: Vec<Box<[u32]>>,
    /// The number of `<ph>` polygons with holes, which are not stored.
    pub holes: usize,
}

impl Primitive {
    /// Parse a [`Primitive`] from an XML element, if it is one of the primitive kinds.
    pub fn parse(element: &Element) -> Result<Option<Self>> {
        let Some(kind) = PrimitiveKind::from_name(element.name()) else {
            return Ok(None);
        };
        let mut it = element.children().peekable();
        let mut res = Primitive {
            kind,
            name: element.attr("name").map(Into::into),
            material: element.attr("material").map(Into::into),
            count: parse_attr(element.attr("count"))?.ok_or("expected 'count' attr")?,
            inputs: InputList::new(InputS::parse_list(&mut it)?),
            vcount: parse_opt("vcount", &mut it, parse_array)?,
            prims: vec![],
            holes: 0,
        };
        // `<ph>` may be interleaved with `<p>` in `<polygons>`
        let groups = parse_list_many(&mut it, |e| match e.name() {
            "p" => Ok(Some(Some(parse_array(e)?))),
            "ph" if kind == PrimitiveKind::Polygons => Ok(Some(None)),
            _ => Ok(None),
        })?;
        for g in groups {
            match g {
                Some(p) => res.prims.push(p),
                None => res.holes += 1,
            }
        }
        res.validate()?;
        finish(Some(res), it)
    }

    fn validate(&self) -> Result<()> {
        let stride = self.inputs.stride;
        let bad = |what: &str| -> Result<()> {
            Err(format!("<{}>: {}", self.kind.name(), what).into())
        };
        if stride == 0 {
            return bad("no inputs");
        }
        if self.prims.iter().any(|p| p.len() % stride != 0) {
            return bad("<p> length is not a multiple of the input count");
        }
        let single = |n: usize| match &*self.prims {
            [] => n == 0,
            [p] => p.len() == n * stride,
            _ => false,
        };
        match self.kind {
            PrimitiveKind::Lines if !single(2 * self.count) => bad("count does not match <p>"),
            PrimitiveKind::Triangles if !single(3 * self.count) => bad("count does not match <p>"),
            PrimitiveKind::PolyList => {
                let vcount = self.vcount.as_deref().unwrap_or_default();
                if vcount.len() != self.count {
                    return bad("count does not match <vcount>");
                }
                let total = vcount.iter().map(|&n| n as usize).sum();
                if !single(total) {
                    return bad("<vcount> does not match <p>");
                }
                Ok(())
            }
            PrimitiveKind::Polygons | PrimitiveKind::TriFans | PrimitiveKind::TriStrips
            | PrimitiveKind::LineStrips
                if self.prims.len() + self.holes != self.count =>
            {
                bad("count does not match the number of <p>")
            }
            _ => Ok(()),
        }
    }

    /// Split the index data into its groups: faces for `triangles`, `polylist` and
    /// `polygons`, segments for `lines`, and whole strips or fans for the other kinds.
    /// Each group is a list of index tuples of length `inputs.stride`.
    pub fn groups(&self) -> Vec<&[u32]> {
        let stride = self.inputs.stride;
        if stride == 0 {
            return vec![];
        }
        match self.kind {
            PrimitiveKind::Lines | PrimitiveKind::Triangles => {
                let n = if self.kind == PrimitiveKind::Lines { 2 } else { 3 };
                self.prims
                    .iter()
                    .flat_map(|p| p.chunks(n * stride))
                    .collect()
            }
            PrimitiveKind::PolyList => {
                let (Some(p), Some(vcount)) = (self.prims.first(), &self.vcount) else {
                    return vec![];
                };
                let mut rest = &**p;
                let mut out = Vec::with_capacity(vcount.len());
                for &n in vcount.iter() {
                    let len = n as usize * stride;
                    if len > rest.len() {
                        log::warn!("<polylist> has fewer indices than <vcount> asks for");
                        break;
                    }
                    let (face, tail) = rest.split_at(len);
                    out.push(face);
                    rest = tail;
                }
                out
            }
            _ => self.prims.iter().map(|p| &**p).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prim(xml: &str) -> Result<Option<Primitive>> {
        let xml = xml.replacen(
            ' ',
            r#" xmlns="http://www.collada.org/2005/11/COLLADASchema" "#,
            1,
        );
        Primitive::parse(&xml.parse().unwrap())
    }

    #[test]
    fn polylist_groups() {
        let p = prim(
            r##"<polylist count="2">
  <input semantic="VERTEX" source="#v" offset="0"/>
  <input semantic="NORMAL" source="#n" offset="1"/>
  <vcount>3 4</vcount>
  <p>0 0 1 0 2 0  0 1 1 1 2 1 3 1</p>
</polylist>"##,
        )
        .unwrap()
        .unwrap();
        assert_eq!(p.inputs.stride, 2);
        let groups = p.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], [0, 0, 1, 0, 2, 0]);
        assert_eq!(groups[1].len(), 8);
    }

    #[test]
    fn counts_are_checked() {
        assert!(prim(
            r##"<triangles count="2">
  <input semantic="VERTEX" source="#v" offset="0"/>
  <p>0 1 2</p>
</triangles>"##
        )
        .is_err());
        let p = prim(
            r##"<polygons count="2">
  <input semantic="VERTEX" source="#v" offset="0"/>
  <p>0 1 2</p>
  <ph><p>0 1 2 3</p><h>4 5 6</h></ph>
</polygons>"##,
        )
        .unwrap()
        .unwrap();
        assert_eq!((p.prims.len(), p.holes), (1, 1));
        assert!(prim(r#"<spline closed="true"/>"#).unwrap().is_none());
    }
}
