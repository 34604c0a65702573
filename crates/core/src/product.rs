//! Purchasable products.
//!
//! A cart line points at a product through [`ProductRef`], a tagged reference
//! over the known product kinds. Pricing and naming go through the
//! [`Purchasable`] capability, so the cart never inspects concrete types.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Album;
use crate::types::AlbumId;

/// Errors parsing a [`ProductRef`] from its text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductRefError {
    #[error("product reference must look like kind:id, got {0:?}")]
    Malformed(String),
    #[error("unknown product kind: {0}")]
    UnknownKind(String),
}

/// Reference to a purchasable product.
///
/// The text form is `kind:id` (e.g. `album:42`); it is what forms post and
/// what storage keeps in the `product_kind`/`product_id` column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProductRef {
    Album(AlbumId),
}

impl ProductRef {
    /// Storage/URL name of the product kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Album(_) => "album",
        }
    }

    /// Numeric ID of the referenced record.
    #[must_use]
    pub const fn object_id(&self) -> i32 {
        match self {
            Self::Album(id) => id.as_i32(),
        }
    }

    /// Rebuild a reference from its stored parts.
    ///
    /// # Errors
    ///
    /// Returns `ProductRefError::UnknownKind` for kinds this build doesn't sell.
    pub fn from_parts(kind: &str, object_id: i32) -> Result<Self, ProductRefError> {
        match kind {
            "album" => Ok(Self::Album(AlbumId::new(object_id))),
            other => Err(ProductRefError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for ProductRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.object_id())
    }
}

impl FromStr for ProductRef {
    type Err = ProductRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| ProductRefError::Malformed(s.to_string()))?;
        let id = id
            .parse::<i32>()
            .map_err(|_| ProductRefError::Malformed(s.to_string()))?;
        Self::from_parts(kind, id)
    }
}

impl TryFrom<String> for ProductRef {
    type Error = ProductRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProductRef> for String {
    fn from(value: ProductRef) -> Self {
        value.to_string()
    }
}

/// Something that can be put in a cart.
pub trait Purchasable {
    /// Reference stored on the cart line.
    fn product_ref(&self) -> ProductRef;
    /// Current unit price.
    fn unit_price(&self) -> Decimal;
    /// Name shown on the cart line.
    fn display_name(&self) -> String;
}

impl Purchasable for Album {
    fn product_ref(&self) -> ProductRef {
        ProductRef::Album(self.id)
    }

    fn unit_price(&self) -> Decimal {
        self.price
    }

    fn display_name(&self) -> String {
        format!("{} - {}", self.artist_name, self.name)
    }
}

/// A resolved product of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Product {
    Album(Album),
}

impl Purchasable for Product {
    fn product_ref(&self) -> ProductRef {
        match self {
            Self::Album(album) => album.product_ref(),
        }
    }

    fn unit_price(&self) -> Decimal {
        match self {
            Self::Album(album) => album.unit_price(),
        }
    }

    fn display_name(&self) -> String {
        match self {
            Self::Album(album) => album.display_name(),
        }
    }
}
