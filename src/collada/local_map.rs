use super::*;

/// A generic ID getter function.
pub trait HasId {
    /// Get the ID of the node.
    fn id(&self) -> Option<&str>;

    /// Extract the relevant `LocalMap` field from a `LocalMaps`.
    fn get_local_map<'a, 'b>(maps: &'b LocalMaps<'a>) -> &'b LocalMap<'a, Self>;

    /// Extract the relevant `LocalMap` field from a `LocalMaps`.
    fn get_local_map_mut<'a, 'b>(maps: &'b mut LocalMaps<'a>) -> &'b mut LocalMap<'a, Self>;
}

/// A map for looking up elements of type `T` in the document by ID.
#[derive(Clone, Debug)]
pub struct LocalMap<'a, T: ?Sized>(pub HashMap<&'a str, &'a T>);

impl<'a, T: ?Sized> Default for LocalMap<'a, T> {
    fn default() -> Self {
        Self(Default::default())
    }
}

impl<'a, T: ?Sized> LocalMap<'a, T> {
    /// Look up an element by ID.
    pub fn get_str(&self, n: &str) -> Option<&'a T> {
        self.0.get(n).copied()
    }

    /// Look up an element by URL reference.
    ///
    /// This is a local map, meaning that it does not support references to URLs which are not
    /// of the special form `#ref`, referring to an element with ID `ref` in the same document.
    pub fn get_raw(&self, url: &Url) -> Option<&'a T> {
        self.get_str(url.fragment()?)
    }

    /// Look up an element by URL reference.
    pub fn get(&self, url: &UrlRef<T>) -> Option<&'a T> {
        self.get_raw(&url.val)
    }
}

trait IdField {
    fn try_to_str(&self) -> Option<&str>;
}
impl IdField for Option<String> {
    fn try_to_str(&self) -> Option<&str> {
        self.as_deref()
    }
}
impl IdField for String {
    fn try_to_str(&self) -> Option<&str> {
        Some(self)
    }
}

macro_rules! mk_local_maps {
    ($($name:ident: $ty:ty,)*) => {
        /// ID lookup tables for every referenceable element type, built in a single pass over
        /// a [`Document`].
        #[derive(Clone, Debug, Default)]
        pub struct LocalMaps<'a> {
            $($name: LocalMap<'a, $ty>,)*
        }

        $(
            impl HasId for $ty {
                fn id(&self) -> Option<&str> {
                    self.id.try_to_str()
                }

                fn get_local_map<'a, 'b>(maps: &'b LocalMaps<'a>) -> &'b LocalMap<'a, Self> {
                    &maps.$name
                }

                fn get_local_map_mut<'a, 'b>(
                    maps: &'b mut LocalMaps<'a>,
                ) -> &'b mut LocalMap<'a, Self> {
                    &mut maps.$name
                }
            }
        )*
    }
}

mk_local_maps! {
    animation: Animation,
    camera: Camera,
    effect: Effect,
    geometry: Geometry,
    image: Image,
    light: Light,
    material: Material,
    node: Node,
    sampler: Sampler,
    source: Source,
    vertices: Vertices,
    visual_scene: VisualScene,
}

impl<'a> LocalMaps<'a> {
    /// Collect the ids of every element of `doc`.
    pub fn new(doc: &'a Document) -> Self {
        let mut maps = Self::default();
        doc.collect_local_maps(&mut maps);
        maps
    }

    /// Register an element. When two elements of a type share an id, the first one wins.
    pub(crate) fn insert<T: HasId>(&mut self, t: &'a T) {
        if let Some(id) = t.id() {
            let map = &mut T::get_local_map_mut(self).0;
            if map.contains_key(id) {
                log::warn!("duplicate id '{}', keeping the first element", id);
            } else {
                map.insert(id, t);
            }
        }
    }

    /// Retrieve a map by type.
    pub fn get_map<T: HasId>(&self) -> &LocalMap<'a, T> {
        T::get_local_map(self)
    }

    /// Look up an element by ID.
    pub fn get_str<T: HasId>(&self, n: &str) -> Option<&'a T> {
        self.get_map().get_str(n)
    }

    /// Look up an element by URL reference.
    pub fn get_raw<T: HasId>(&self, url: &Url) -> Option<&'a T> {
        self.get_map().get_raw(url)
    }

    /// Look up an element by URL reference.
    pub fn get<T: HasId>(&self, url: &UrlRef<T>) -> Option<&'a T> {
        self.get_map().get(url)
    }

    /// Look up an element by URL reference, failing with a format error if it does not exist.
    pub fn resolve<T: HasId>(&self, url: &UrlRef<T>) -> Result<&'a T> {
        self.get(url)
            .ok_or_else(|| format!("unresolved reference {}", url.val).into())
    }
}

pub(crate) trait CollectLocalMaps {
    /// Insert this node and all its ID-containing children into the `maps` data structure.
    fn collect_local_maps<'a>(&'a self, maps: &mut LocalMaps<'a>);
}

impl<T: CollectLocalMaps> CollectLocalMaps for Option<T> {
    fn collect_local_maps<'a>(&'a self, maps: &mut LocalMaps<'a>) {
        if let Some(x) = self {
            x.collect_local_maps(maps)
        }
    }
}

impl<T: CollectLocalMaps> CollectLocalMaps for Vec<T> {
    fn collect_local_maps<'a>(&'a self, maps: &mut LocalMaps<'a>) {
        for x in self {
            x.collect_local_maps(maps)
        }
    }
}

macro_rules! leaf_local_maps {
    ($($ty:ty),*) => {
        $(impl CollectLocalMaps for $ty {
            fn collect_local_maps<'a>(&'a self, maps: &mut LocalMaps<'a>) {
                maps.insert(self)
            }
        })*
    }
}

leaf_local_maps!(Camera, Effect, Image, Light, Material, Source, Sampler);

impl CollectLocalMaps for Animation {
    fn collect_local_maps<'a>(&'a self, maps: &mut LocalMaps<'a>) {
        maps.insert(self);
        self.source.collect_local_maps(maps);
        self.sampler.collect_local_maps(maps);
        self.children.collect_local_maps(maps);
    }
}

impl CollectLocalMaps for Geometry {
    fn collect_local_maps<'a>(&'a self, maps: &mut LocalMaps<'a>) {
        maps.insert(self);
        if let Some(mesh) = &self.mesh {
            mesh.sources.collect_local_maps(maps);
            if let Some(v) = &mesh.vertices {
                maps.insert(v);
            }
        }
    }
}

impl CollectLocalMaps for Node {
    fn collect_local_maps<'a>(&'a self, maps: &mut LocalMaps<'a>) {
        maps.insert(self);
        self.children.collect_local_maps(maps);
    }
}

impl CollectLocalMaps for VisualScene {
    fn collect_local_maps<'a>(&'a self, maps: &mut LocalMaps<'a>) {
        maps.insert(self);
        self.nodes.collect_local_maps(maps);
    }
}
