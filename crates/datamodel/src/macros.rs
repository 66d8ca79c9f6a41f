//! Shell shared by every record type of the datamodel

/// Declare the user-facing wrapper of a datatype
///
/// Emits the newtype over `Handle<Self>` plus the conveniences every record
/// type offers: default/unavailable construction, deep copies, deref to the
/// handle, equality by payload identity, `Debug` and `Display`.
/// The `Datatype` impl and the typed accessors are written next to it.
macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(hepstore_model::Handle<$name>);

        impl $name {
            /// Record with default field values, outside any collection
            pub fn new() -> Self {
                Self(hepstore_model::Handle::new())
            }

            /// Record that references no payload
            pub fn unavailable() -> Self {
                Self(hepstore_model::Handle::unavailable())
            }

            /// Independent copy with the same field values and relations
            pub fn deep_clone(&self) -> hepstore_core::Result<Self> {
                self.0.deep_clone().map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = hepstore_model::Handle<$name>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Debug::fmt(&self.0, f)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let name = <$name as hepstore_model::Datatype>::TYPE_NAME;
                match self.0.object_id() {
                    Ok(id) => write!(f, "{}#{}", name, id),
                    Err(_) => write!(f, "{}#unavailable", name),
                }
            }
        }
    };
}
