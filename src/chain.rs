//! Filter lookup by name, and assembly of filters into a chain.

use crate::{filter::*, *};

/// Every filter this crate ships.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// [`IdentityFilter`]
    Identity,
    /// [`AppearanceFilter`], adding only missing appearances unless `-appAndMat` is given.
    Appearance,
    /// [`AppearanceFilter`] with material synthesis always on.
    Material,
    /// [`TriangleToFaceSetFilter`]
    TriangleToIfs,
    /// [`FaceSetToTriangleFilter`]
    IfsToTriangle,
    /// [`ImageTextureDedupFilter`]
    TextureDedup,
    /// [`ModifyViewpointFilter`]
    ModifyViewpoint,
    /// [`MinimizeProfileFilter`], wrapped in a [`TwoPassWrapper`].
    MinimizeProfile,
}

impl FilterKind {
    /// Every kind, in registry order.
    pub const ALL: [FilterKind; 8] = [
        FilterKind::Identity,
        FilterKind::Appearance,
        FilterKind::Material,
        FilterKind::TriangleToIfs,
        FilterKind::IfsToTriangle,
        FilterKind::TextureDedup,
        FilterKind::ModifyViewpoint,
        FilterKind::MinimizeProfile,
    ];

    /// The short name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Identity => "Identity",
            FilterKind::Appearance => "Appearance",
            FilterKind::Material => "Material",
            FilterKind::TriangleToIfs => "TriangleToIFS",
            FilterKind::IfsToTriangle => "IFSToTriangle",
            FilterKind::TextureDedup => "DEFUSEImageTexture",
            FilterKind::ModifyViewpoint => "ModifyViewpoint",
            FilterKind::MinimizeProfile => "MinimizeProfile",
        }
    }

    /// The fully qualified name of the implementing type.
    pub fn qualified_name(self) -> &'static str {
        match self {
            FilterKind::Identity => "x3d_filter::filter::IdentityFilter",
            FilterKind::Appearance | FilterKind::Material => {
                "x3d_filter::filter::AppearanceFilter"
            }
            FilterKind::TriangleToIfs => "x3d_filter::filter::TriangleToFaceSetFilter",
            FilterKind::IfsToTriangle => "x3d_filter::filter::FaceSetToTriangleFilter",
            FilterKind::TextureDedup => "x3d_filter::filter::ImageTextureDedupFilter",
            FilterKind::ModifyViewpoint => "x3d_filter::filter::ModifyViewpointFilter",
            FilterKind::MinimizeProfile => "x3d_filter::filter::MinimizeProfileFilter",
        }
    }

    /// A fresh, unconnected filter of this kind.
    pub fn create(self) -> Box<dyn Filter> {
        match self {
            FilterKind::Identity => Box::new(IdentityFilter::new()),
            FilterKind::Appearance => Box::new(AppearanceFilter::new()),
            FilterKind::Material => Box::new(AppearanceFilter::with_material()),
            FilterKind::TriangleToIfs => Box::new(TriangleToFaceSetFilter::new()),
            FilterKind::IfsToTriangle => Box::new(FaceSetToTriangleFilter::new()),
            FilterKind::TextureDedup => Box::new(ImageTextureDedupFilter::new()),
            FilterKind::ModifyViewpoint => Box::new(ModifyViewpointFilter::new()),
            FilterKind::MinimizeProfile => {
                Box::new(TwoPassWrapper::new(MinimizeProfileFilter::new()))
            }
        }
    }
}

/// A read-only table from filter names to filter kinds.
///
/// Both the short name (`TriangleToIFS`) and the qualified name of the implementing type are
/// accepted.
#[derive(Clone, Debug)]
pub struct FilterRegistry {
    by_name: HashMap<&'static str, FilterKind>,
}

impl FilterRegistry {
    /// The registry of all filters shipped with this crate.
    pub fn standard() -> Self {
        let mut by_name = HashMap::new();
        for kind in FilterKind::ALL {
            by_name.insert(kind.name(), kind);
            by_name.entry(kind.qualified_name()).or_insert(kind);
        }
        Self { by_name }
    }

    /// Look up a filter kind.
    pub fn get(&self, name: &str) -> Option<FilterKind> {
        self.by_name.get(name).copied()
    }

    /// Create a filter by name.
    pub fn create(&self, name: &str) -> Result<Box<dyn Filter>> {
        match self.get(name) {
            Some(kind) => Ok(kind.create()),
            None => Err(Error::InvalidFilter(name.into())),
        }
    }

    /// The short names of all registered filters.
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        FilterKind::ALL.into_iter().map(FilterKind::name)
    }
}

/// Chain assembly.
#[derive(Debug)]
pub struct FilterChain;

impl FilterChain {
    /// Connect `filters[i]` to `filters[i + 1]` and the last filter to `sink`, and return the head
    /// of the chain. With no filters the sink itself is the head.
    pub fn build(
        filters: Vec<Box<dyn Filter>>,
        sink: Box<dyn ContentHandler>,
    ) -> Box<dyn ContentHandler> {
        let mut next = sink;
        for mut filter in filters.into_iter().rev() {
            filter.set_content_handler(next);
            let stage: Box<dyn ContentHandler> = Box::new(filter);
            next = stage;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve() {
        let reg = FilterRegistry::standard();
        assert_eq!(reg.get("TriangleToIFS"), Some(FilterKind::TriangleToIfs));
        assert_eq!(
            reg.get("x3d_filter::filter::FaceSetToTriangleFilter"),
            Some(FilterKind::IfsToTriangle)
        );
        assert_eq!(
            reg.get("x3d_filter::filter::AppearanceFilter"),
            Some(FilterKind::Appearance)
        );
        assert_eq!(reg.names().count(), FilterKind::ALL.len());
        let err = reg.create("Frobnicate").err().unwrap();
        assert_eq!(err.exit_code(), ExitCode::InvalidFilterSpecified);
    }

    #[test]
    fn chains_run_in_order() {
        let reg = FilterRegistry::standard();
        let filters = vec![
            reg.create("Identity").unwrap(),
            reg.create("Appearance").unwrap(),
            reg.create("Identity").unwrap(),
        ];
        let (rec, log) = SharedRecorder::new();
        let mut head = FilterChain::build(filters, Box::new(rec));
        head.start_node("Shape", None).unwrap();
        head.end_node().unwrap();
        assert!(log
            .borrow()
            .contains(&Event::start_node("Appearance", None)));
    }

    #[test]
    fn empty_chain_is_the_sink() {
        let (rec, log) = SharedRecorder::new();
        let mut head = FilterChain::build(vec![], Box::new(rec));
        head.profile_decl("Immersive").unwrap();
        assert_eq!(**log.borrow(), [Event::Profile("Immersive".into())]);
    }
}
