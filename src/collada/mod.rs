//! COLLADA (`.dae`) input: a data binding for the parts of the schema that have an X3D
//! counterpart, and [`ColladaImporter`], which walks a parsed [`Document`] and emits it as
//! X3D events.

mod anim;
mod data;
mod fx;
mod geom;
mod import;
mod local_map;
mod meta;
mod scene;
mod transform;

use crate::*;
pub use {
    anim::*, data::*, fx::*, geom::*, import::*, local_map::*, meta::*, scene::*, transform::*,
};

/// A trait for nodes that can be placed in a library element.
pub trait ParseLibrary: XNode {
    /// The name of the library element. For example, the [`Geometry`] element has
    /// `LIBRARY = "library_geometries"`,
    /// and the corresponding library type is [`Library`]`<Geometry>`.
    const LIBRARY: &'static str;

    /// Extract the library from a single [`LibraryElement`].
    fn extract_element(e: &LibraryElement) -> Option<&Library<Self>>;
}

/// Declares a module of elements of type `T`.
#[derive(Clone, Debug)]
pub struct Library<T> {
    /// The individual items in the module.
    pub items: Vec<T>,
}

impl<T: ParseLibrary> XNode for Library<T> {
    const NAME: &'static str = T::LIBRARY;
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        parse_opt("asset", &mut it, |_| Ok(()))?;
        let res = Library {
            items: T::parse_list(&mut it)?, // should be 1 or more but blender disagrees
        };
        finish(res, it)
    }
}

impl<T: CollectLocalMaps> CollectLocalMaps for Library<T> {
    fn collect_local_maps<'a>(&'a self, maps: &mut LocalMaps<'a>) {
        self.items.collect_local_maps(maps)
    }
}

macro_rules! mk_libraries {
    ($($name:ident($arg:ident) = $s:literal,)*) => {
        /// A library element, which can be a module of any of the kinds that are converted.
        #[derive(Clone, Debug)]
        pub enum LibraryElement {
            $(
                #[doc = concat!("Declares a module of [`", stringify!($arg), "`] elements.")]
                $name(Library<$arg>),
            )*
        }

        $(
            impl ParseLibrary for $arg {
                const LIBRARY: &'static str = $s;

                fn extract_element(e: &LibraryElement) -> Option<&Library<Self>> {
                    if let LibraryElement::$name(arg) = e {
                        Some(arg)
                    } else {
                        None
                    }
                }
            }
        )*

        impl LibraryElement {
            /// Parse a [`LibraryElement`] from an XML element.
            /// Libraries of kinds that have no X3D counterpart, like controllers or physics,
            /// give `None`.
            pub fn parse(e: &Element) -> Result<Option<Self>> {
                Ok(Some(match e.name() {
                    $($arg::LIBRARY => Self::$name(Library::parse(e)?),)*
                    _ => return Ok(None),
                }))
            }
        }

        impl CollectLocalMaps for LibraryElement {
            fn collect_local_maps<'a>(&'a self, maps: &mut LocalMaps<'a>) {
                match self {
                    $(Self::$name(lib) => lib.collect_local_maps(maps),)*
                }
            }
        }
    }
}

mk_libraries! {
    Animations(Animation) = "library_animations",
    Cameras(Camera) = "library_cameras",
    Effects(Effect) = "library_effects",
    Geometries(Geometry) = "library_geometries",
    Images(Image) = "library_images",
    Lights(Light) = "library_lights",
    Materials(Material) = "library_materials",
    Nodes(Node) = "library_nodes",
    VisualScenes(VisualScene) = "library_visual_scenes",
}

/// A parsed COLLADA document.
#[derive(Clone, Debug)]
pub struct Document {
    /// The COLLADA schema version, like `1.4.1`.
    pub version: String,
    /// Metadata about the document, including its unit and up axis.
    pub asset: Asset,
    /// The libraries of the document, in document order.
    pub library: Vec<LibraryElement>,
    /// The scene to instantiate.
    pub scene: Option<Scene>,
}

impl Document {
    /// Constructs a new [`Document`] from any [`BufRead`](std::io::BufRead) reader.
    pub fn from_reader<R: std::io::BufRead>(reader: R) -> Result<Self> {
        Self::try_from(&Element::from_reader(&mut XReader::from_reader(reader))?)
    }

    /// Constructs a new [`Document`] from a file.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Self::from_reader(std::io::BufReader::new(std::fs::File::open(path)?))
    }

    /// Iterate over all the elements of type `T` declared in the libraries of the document.
    pub fn iter<'a, T: ParseLibrary + 'a>(&'a self) -> impl Iterator<Item = &'a T> + 'a {
        self.library
            .iter()
            .filter_map(T::extract_element)
            .flat_map(|lib| &lib.items)
    }

    /// Build the id lookup tables of the document.
    pub fn local_maps(&self) -> LocalMaps<'_> {
        LocalMaps::new(self)
    }

    /// The visual scene the `<scene>` element instantiates.
    pub fn get_visual_scene<'a>(&self, maps: &LocalMaps<'a>) -> Result<Option<&'a VisualScene>> {
        match self.scene.as_ref().and_then(|s| s.instance_visual_scene.as_ref()) {
            Some(url) => maps.resolve(url).map(Some),
            None => Ok(None),
        }
    }
}

impl FromStr for Document {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::from_reader(s.as_bytes())
    }
}

impl TryFrom<&Element> for Document {
    type Error = Error;

    fn try_from(element: &Element) -> Result<Self> {
        if element.name() != "COLLADA" {
            return Err("Expected COLLADA root node".into());
        }
        let version = element.attr("version").ok_or("expected version attr")?;
        let mut it = element.children().peekable();
        let asset = Asset::parse_opt(&mut it)?.unwrap_or_default();
        let mut library = vec![];
        let mut scene = None;
        for e in it {
            match e.name() {
                Scene::NAME => scene = Some(Scene::parse(e)?),
                "extra" => {}
                name => match LibraryElement::parse(e)? {
                    Some(lib) => library.push(lib),
                    None => log::debug!("skipping <{}>", name),
                },
            }
        }
        Ok(Document {
            version: version.into(),
            asset,
            library,
            scene,
        })
    }
}

impl CollectLocalMaps for Document {
    fn collect_local_maps<'a>(&'a self, maps: &mut LocalMaps<'a>) {
        self.library.collect_local_maps(maps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <asset>
    <created>2020-01-01T00:00:00Z</created>
    <unit name="centimeter" meter="0.01"/>
    <up_axis>Z_UP</up_axis>
  </asset>
  <library_controllers/>
  <library_geometries>
    <geometry id="tri" name="tri">
      <mesh>
        <source id="tri-pos">
          <float_array id="tri-pos-array" count="9">0 0 0 1 0 0 0 1 0</float_array>
          <technique_common>
            <accessor source="#tri-pos-array" count="3" stride="3">
              <param name="X" type="float"/>
              <param name="Y" type="float"/>
              <param name="Z" type="float"/>
            </accessor>
          </technique_common>
        </source>
        <vertices id="tri-vtx"><input semantic="POSITION" source="#tri-pos"/></vertices>
        <triangles count="1">
          <input semantic="VERTEX" source="#tri-vtx" offset="0"/>
          <p>0 1 2</p>
        </triangles>
      </mesh>
    </geometry>
  </library_geometries>
  <library_visual_scenes>
    <visual_scene id="scene">
      <node id="n"><instance_geometry url="#tri"/></node>
    </visual_scene>
  </library_visual_scenes>
  <scene><instance_visual_scene url="#scene"/></scene>
</COLLADA>"##;

    #[test]
    fn parse_and_resolve() {
        let doc: Document = CUBE.parse().unwrap();
        assert_eq!(doc.version, "1.4.1");
        assert_eq!(doc.asset.up_axis, UpAxis::ZUp);
        assert_eq!(doc.asset.unit.meter, 0.01);
        assert!(doc.asset.created.is_some());
        let maps = doc.local_maps();
        let scene = doc.get_visual_scene(&maps).unwrap().unwrap();
        let geom = maps.resolve(&scene.nodes[0].instance_geometry[0].url).unwrap();
        let mesh = geom.mesh.as_ref().unwrap();
        let vertices = maps.get_str::<Vertices>("tri-vtx").unwrap();
        let pos = maps
            .resolve(vertices.get(&Semantic::Position).unwrap().source_as_source())
            .unwrap();
        assert_eq!(pos.float_data().unwrap().len(), 9);
        assert_eq!(mesh.primitives[0].groups(), vec![&[0u32, 1, 2][..]]);
        assert_eq!(doc.iter::<Geometry>().count(), 1);
    }

    #[test]
    fn unresolved_references_are_errors() {
        let doc: Document = CUBE.replace(r##"url="#tri""##, r##"url="#nope""##).parse().unwrap();
        let maps = doc.local_maps();
        let scene = doc.get_visual_scene(&maps).unwrap().unwrap();
        assert!(maps.resolve(&scene.nodes[0].instance_geometry[0].url).is_err());
        assert!("<COLLADA/>".parse::<Document>().is_err());
    }
}
