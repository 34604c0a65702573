//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing a cart ID with an album ID.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
/// - `FromStr` for path segments and CLI arguments
/// - a transparent `sqlx::Type` (with the `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use musicshop_core::define_id;
/// define_id!(ShelfId);
/// define_id!(CrateId);
///
/// let shelf = ShelfId::new(1);
/// let record_crate = CrateId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ShelfId = record_crate;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type), sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw database key.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        /// Parses the decimal form used in URLs and CLI arguments.
        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Catalog
define_id!(GenreId);
define_id!(MemberId);
define_id!(MediaTypeId);
define_id!(ArtistId);
define_id!(AlbumId);

// Accounts
define_id!(UserId);
define_id!(CustomerId);
define_id!(NotificationId);

// Purchasing
define_id!(CartId);
define_id!(OrderId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversion() {
        let id = AlbumId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i32::from(id), 42);
        assert_eq!(AlbumId::from(42), id);
    }

    #[test]
    fn test_id_parses_from_text() {
        assert_eq!(" 12".parse::<OrderId>(), Ok(OrderId::new(12)));
        assert!("twelve".parse::<OrderId>().is_err());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&CartId::new(7)).unwrap_or_default();
        assert_eq!(json, "7");
    }
}
