macro_rules! mk_extensible_enum {
    ($(#[$tydoc:meta])* pub enum $ty:ident { $($(#[$doc:meta])* $n:ident = $t:literal,)* }) => {
        $(#[$tydoc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub enum $ty {
            $($(#[$doc])* $n,)*
            /// Any value not covered above
            Other(Box<str>),
        }

        impl $ty {
            fn parse(s: &str) -> Self {
                match s {
                    $($t => Self::$n,)*
                    _ => Self::Other(s.into()),
                }
            }

            /// The textual form of this value.
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$n => $t,)*
                    Self::Other(s) => s,
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::parse(s))
            }
        }
    };
}

/// Generates `ContentHandler` methods that hand the event unchanged to `self.base`,
/// for the filters that only override a few of them.
macro_rules! forward_events {
    (@one start_document) => {
        fn start_document(&mut self, header: &$crate::event::DocumentHeader) -> $crate::Result<()> {
            self.base.start_document(header)
        }
    };
    (@one end_document) => {
        fn end_document(&mut self) -> $crate::Result<()> {
            self.base.end_document()
        }
    };
    (@one profile_decl) => {
        fn profile_decl(&mut self, profile: &str) -> $crate::Result<()> {
            self.base.profile_decl(profile)
        }
    };
    (@one component_decl) => {
        fn component_decl(&mut self, component: &str) -> $crate::Result<()> {
            self.base.component_decl(component)
        }
    };
    (@one meta_decl) => {
        fn meta_decl(&mut self, name: &str, content: &str) -> $crate::Result<()> {
            self.base.meta_decl(name, content)
        }
    };
    (@one start_node) => {
        fn start_node(&mut self, name: &str, def: Option<&str>) -> $crate::Result<()> {
            self.base.start_node(name, def)
        }
    };
    (@one end_node) => {
        fn end_node(&mut self) -> $crate::Result<()> {
            self.base.end_node()
        }
    };
    (@one start_field) => {
        fn start_field(&mut self, name: &str) -> $crate::Result<()> {
            self.base.start_field(name)
        }
    };
    (@one field_value) => {
        fn field_value(&mut self, value: $crate::event::FieldValue) -> $crate::Result<()> {
            self.base.field_value(value)
        }
    };
    (@one use_decl) => {
        fn use_decl(&mut self, def: &str) -> $crate::Result<()> {
            self.base.use_decl(def)
        }
    };
    (@one end_field) => {
        fn end_field(&mut self) -> $crate::Result<()> {
            self.base.end_field()
        }
    };
    (@one route_decl) => {
        fn route_decl(&mut self, route: &$crate::event::Route) -> $crate::Result<()> {
            self.base.route_decl(route)
        }
    };
    ($($m:ident),* $(,)?) => {
        $(forward_events!(@one $m);)*
    };
}
