//! The cart aggregate.
//!
//! A [`Cart`] belongs to exactly one identity ([`CartOwner`]): a customer or
//! an anonymous session token. Every mutation recomputes the touched line's
//! total and the cart-level totals before returning, so `total_items` and
//! `total_price` are always the sums over the current lines.
//!
//! Once a cart is consumed by an order (`in_order`), every mutation fails
//! with [`CartError::FrozenCart`].

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::product::{ProductRef, Purchasable};
use crate::types::{CartId, CustomerId};

// =============================================================================
// Quantity
// =============================================================================

/// Errors validating a line quantity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("quantity must be a whole number, got {0:?}")]
    NotAnInteger(String),
    #[error("quantity must be at least 1")]
    NotPositive,
    #[error("quantity must be at most {max}")]
    TooLarge { max: u32 },
}

/// A validated, positive line quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Largest quantity a single line may hold.
    pub const MAX: u32 = 9_999;

    /// A quantity of one.
    pub const ONE: Self = Self(1);

    /// Validate a quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` for zero and
    /// `QuantityError::TooLarge` above [`Quantity::MAX`].
    pub const fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 {
            return Err(QuantityError::NotPositive);
        }
        if value > Self::MAX {
            return Err(QuantityError::TooLarge { max: Self::MAX });
        }
        Ok(Self(value))
    }

    /// Parse a quantity from form input.
    ///
    /// # Errors
    ///
    /// Rejects non-integers (`"1.5"`, `"two"`), zero, negatives, and values
    /// above [`Quantity::MAX`].
    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        let trimmed = input.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| QuantityError::NotAnInteger(trimmed.to_string()))?;
        if value <= 0 {
            return Err(QuantityError::NotPositive);
        }
        let value = u32::try_from(value).map_err(|_| QuantityError::TooLarge { max: Self::MAX })?;
        Self::new(value)
    }

    /// The raw count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Add two quantities, failing past [`Quantity::MAX`].
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::TooLarge` when the sum exceeds the maximum.
    pub fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        self.0
            .checked_add(other.0)
            .ok_or(QuantityError::TooLarge { max: Self::MAX })
            .and_then(Self::new)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Opaque token identifying an anonymous visitor's cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartToken(String);

impl CartToken {
    /// Length of freshly generated tokens.
    pub const LENGTH: usize = 32;

    /// Generate a new random token.
    #[must_use]
    pub fn generate() -> Self {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(Self::LENGTH)
            .map(char::from)
            .collect();
        Self(token)
    }

    /// Wrap a token read back from storage or the session.
    #[must_use]
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// The token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Who a cart belongs to. Exactly one of the two, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartOwner {
    Customer(CustomerId),
    Anonymous(CartToken),
}

impl CartOwner {
    /// The owning customer, if any.
    #[must_use]
    pub const fn customer(&self) -> Option<CustomerId> {
        match self {
            Self::Customer(id) => Some(*id),
            Self::Anonymous(_) => None,
        }
    }

    /// The anonymous session token, if any.
    #[must_use]
    pub const fn token(&self) -> Option<&CartToken> {
        match self {
            Self::Customer(_) => None,
            Self::Anonymous(token) => Some(token),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// The cart was consumed by an order and can no longer change.
    #[error("cart {0} is already part of an order")]
    FrozenCart(CartId),

    /// The product has no line in this cart.
    #[error("{0} is not in the cart")]
    ItemNotInCart(ProductRef),

    /// The requested quantity is invalid.
    #[error(transparent)]
    Quantity(#[from] QuantityError),
}

// =============================================================================
// Lines
// =============================================================================

/// One product entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    product: ProductRef,
    display_name: String,
    quantity: Quantity,
    unit_price: Decimal,
    line_total: Decimal,
}

impl CartLine {
    fn new(product: &impl Purchasable, quantity: Quantity) -> Self {
        let mut line = Self {
            product: product.product_ref(),
            display_name: product.display_name(),
            quantity,
            unit_price: product.unit_price(),
            line_total: Decimal::ZERO,
        };
        line.recalculate();
        line
    }

    /// Rebuild a line from storage.
    #[must_use]
    pub const fn restore(
        product: ProductRef,
        display_name: String,
        quantity: Quantity,
        unit_price: Decimal,
        line_total: Decimal,
    ) -> Self {
        Self {
            product,
            display_name,
            quantity,
            unit_price,
            line_total,
        }
    }

    #[must_use]
    pub const fn product(&self) -> ProductRef {
        self.product
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Unit price captured the last time the line was saved.
    #[must_use]
    pub const fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    #[must_use]
    pub const fn line_total(&self) -> Decimal {
        self.line_total
    }

    fn refresh_product(&mut self, product: &impl Purchasable) {
        self.display_name = product.display_name();
        self.unit_price = product.unit_price();
    }

    fn recalculate(&mut self) {
        self.line_total = self.unit_price * Decimal::from(self.quantity.get());
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A mutable container of line items for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    owner: CartOwner,
    lines: Vec<CartLine>,
    total_items: u32,
    total_price: Decimal,
    in_order: bool,
    version: i32,
    created_at: DateTime<Utc>,
}

impl Cart {
    /// A fresh, empty cart as storage creates it.
    #[must_use]
    pub const fn new(id: CartId, owner: CartOwner, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            lines: Vec::new(),
            total_items: 0,
            total_price: Decimal::ZERO,
            in_order: false,
            version: 0,
            created_at,
        }
    }

    /// Rebuild a cart from storage, cached totals included.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn restore(
        id: CartId,
        owner: CartOwner,
        lines: Vec<CartLine>,
        total_items: u32,
        total_price: Decimal,
        in_order: bool,
        version: i32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            lines,
            total_items,
            total_price,
            in_order,
            version,
            created_at,
        }
    }

    #[must_use]
    pub const fn id(&self) -> CartId {
        self.id
    }

    #[must_use]
    pub const fn owner(&self) -> &CartOwner {
        &self.owner
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Line for `product`, if present.
    #[must_use]
    pub fn line(&self, product: ProductRef) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product == product)
    }

    #[must_use]
    pub const fn total_items(&self) -> u32 {
        self.total_items
    }

    #[must_use]
    pub const fn total_price(&self) -> Decimal {
        self.total_price
    }

    #[must_use]
    pub const fn is_in_order(&self) -> bool {
        self.in_order
    }

    #[must_use]
    pub const fn for_anonymous_user(&self) -> bool {
        matches!(self.owner, CartOwner::Anonymous(_))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Optimistic concurrency version, bumped by storage on every save.
    #[must_use]
    pub const fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Record the version storage assigned on save.
    pub const fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    /// Add `quantity` of `product`, merging into an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::FrozenCart` if the cart is in an order and
    /// `CartError::Quantity` if the merged quantity overflows.
    pub fn add_item(
        &mut self,
        product: &impl Purchasable,
        quantity: Quantity,
    ) -> Result<(), CartError> {
        self.ensure_mutable()?;

        let product_ref = product.product_ref();
        if let Some(line) = self.line_mut(product_ref) {
            line.quantity = line.quantity.checked_add(quantity)?;
            line.refresh_product(product);
            line.recalculate();
        } else {
            self.lines.push(CartLine::new(product, quantity));
        }

        self.recalculate();
        Ok(())
    }

    /// Set the quantity of an existing line.
    ///
    /// Returns `false` when the quantity was already `quantity`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::FrozenCart` if the cart is in an order and
    /// `CartError::ItemNotInCart` if the product has no line.
    pub fn set_quantity(
        &mut self,
        product: &impl Purchasable,
        quantity: Quantity,
    ) -> Result<bool, CartError> {
        self.ensure_mutable()?;

        let product_ref = product.product_ref();
        let line = self
            .line_mut(product_ref)
            .ok_or(CartError::ItemNotInCart(product_ref))?;
        if line.quantity == quantity {
            return Ok(false);
        }

        line.quantity = quantity;
        line.refresh_product(product);
        line.recalculate();
        self.recalculate();
        Ok(true)
    }

    /// Remove the line for `product`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::FrozenCart` if the cart is in an order and
    /// `CartError::ItemNotInCart` if the product has no line.
    pub fn remove_item(&mut self, product: ProductRef) -> Result<CartLine, CartError> {
        self.ensure_mutable()?;

        let index = self
            .lines
            .iter()
            .position(|line| line.product == product)
            .ok_or(CartError::ItemNotInCart(product))?;
        let removed = self.lines.remove(index);

        self.recalculate();
        Ok(removed)
    }

    /// Move every line of `other` into this cart.
    ///
    /// Lines for products already present add their quantities; the existing
    /// line keeps its unit price.
    ///
    /// # Errors
    ///
    /// Returns `CartError::FrozenCart` if either cart is in an order and
    /// `CartError::Quantity` if a merged quantity overflows.
    pub fn absorb(&mut self, other: &Self) -> Result<(), CartError> {
        self.ensure_mutable()?;
        other.ensure_mutable()?;

        for incoming in &other.lines {
            if let Some(line) = self.line_mut(incoming.product) {
                line.quantity = line.quantity.checked_add(incoming.quantity)?;
                line.recalculate();
            } else {
                let mut line = incoming.clone();
                line.recalculate();
                self.lines.push(line);
            }
        }

        self.recalculate();
        Ok(())
    }

    /// Freeze the cart as part of an order. Happens exactly once.
    ///
    /// # Errors
    ///
    /// Returns `CartError::FrozenCart` if the cart is already in an order.
    pub fn mark_in_order(&mut self) -> Result<(), CartError> {
        self.ensure_mutable()?;
        self.in_order = true;
        Ok(())
    }

    /// Fail if the cart can no longer change.
    ///
    /// # Errors
    ///
    /// Returns `CartError::FrozenCart` if the cart is in an order.
    pub const fn ensure_mutable(&self) -> Result<(), CartError> {
        if self.in_order {
            return Err(CartError::FrozenCart(self.id));
        }
        Ok(())
    }

    fn line_mut(&mut self, product: ProductRef) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.product == product)
    }

    fn recalculate(&mut self) {
        self.total_items = self.lines.iter().map(|line| line.quantity.get()).sum();
        self.total_price = self.lines.iter().map(CartLine::line_total).sum();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use crate::types::AlbumId;

    fn cart() -> Cart {
        Cart::new(
            CartId::new(1),
            CartOwner::Anonymous(CartToken::generate()),
            Utc::now(),
        )
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn assert_totals_consistent(cart: &Cart) {
        let items: u32 = cart.lines().iter().map(|l| l.quantity().get()).sum();
        let price: Decimal = cart
            .lines()
            .iter()
            .map(|l| l.unit_price() * Decimal::from(l.quantity().get()))
            .sum();
        assert_eq!(cart.total_items(), items);
        assert_eq!(cart.total_price(), price);
    }

    #[test]
    fn test_quantity_parse() {
        assert_eq!(Quantity::parse(" 3 ").unwrap().get(), 3);
        assert_eq!(Quantity::parse("0"), Err(QuantityError::NotPositive));
        assert_eq!(Quantity::parse("-2"), Err(QuantityError::NotPositive));
        assert!(matches!(
            Quantity::parse("1.5"),
            Err(QuantityError::NotAnInteger(_))
        ));
        assert!(matches!(
            Quantity::parse("lots"),
            Err(QuantityError::NotAnInteger(_))
        ));
        assert_eq!(
            Quantity::parse("10000"),
            Err(QuantityError::TooLarge { max: 9_999 })
        );
    }

    #[test]
    fn test_generated_tokens_are_distinct() {
        let a = CartToken::generate();
        let b = CartToken::generate();
        assert_eq!(a.as_str().len(), CartToken::LENGTH);
        assert_ne!(a, b);
    }

    #[test]
    fn test_add_same_product_twice_merges_lines() {
        let mut cart = cart();
        let album = fixtures::album(1, Decimal::new(1500, 2));

        cart.add_item(&album, Quantity::ONE).unwrap();
        cart.add_item(&album, Quantity::ONE).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity().get(), 2);
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.total_price(), Decimal::new(3000, 2));
        assert_totals_consistent(&cart);
    }

    #[test]
    fn test_add_refreshes_unit_price() {
        let mut cart = cart();
        let mut album = fixtures::album(1, Decimal::new(10, 0));
        cart.add_item(&album, Quantity::ONE).unwrap();

        album.price = Decimal::new(12, 0);
        cart.add_item(&album, Quantity::ONE).unwrap();

        assert_eq!(cart.lines()[0].line_total(), Decimal::new(24, 0));
        assert_totals_consistent(&cart);
    }

    #[test]
    fn test_largest_line_is_exact() {
        let mut cart = cart();
        let album = fixtures::album(1, Decimal::new(9_999_999_99, 2));
        cart.add_item(&album, qty(Quantity::MAX)).unwrap();

        assert_eq!(cart.lines()[0].line_total(), Decimal::new(99_989_999_900_01, 2));
        assert_eq!(cart.total_price().scale(), 2);
        assert_totals_consistent(&cart);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = cart();
        let album = fixtures::album(1, Decimal::new(10, 0));
        cart.add_item(&album, qty(2)).unwrap();

        assert!(!cart.set_quantity(&album, qty(2)).unwrap());
        assert!(cart.set_quantity(&album, qty(5)).unwrap());
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_price(), Decimal::new(50, 0));
        assert_totals_consistent(&cart);
    }

    #[test]
    fn test_set_quantity_on_missing_line() {
        let mut cart = cart();
        let album = fixtures::album(7, Decimal::ONE);
        assert_eq!(
            cart.set_quantity(&album, Quantity::ONE),
            Err(CartError::ItemNotInCart(ProductRef::Album(AlbumId::new(7))))
        );
    }

    #[test]
    fn test_remove_item_updates_totals() {
        let mut cart = cart();
        let first = fixtures::album(1, Decimal::new(10, 0));
        let second = fixtures::album(2, Decimal::new(30, 0));
        cart.add_item(&first, qty(1)).unwrap();
        cart.add_item(&second, qty(1)).unwrap();

        cart.remove_item(ProductRef::Album(first.id)).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total_price(), Decimal::new(30, 0));
        assert_totals_consistent(&cart);
        assert!(matches!(
            cart.remove_item(ProductRef::Album(first.id)),
            Err(CartError::ItemNotInCart(_))
        ));
    }

    #[test]
    fn test_frozen_cart_rejects_mutation() {
        let mut cart = cart();
        let album = fixtures::album(1, Decimal::ONE);
        cart.add_item(&album, Quantity::ONE).unwrap();
        cart.mark_in_order().unwrap();

        let id = cart.id();
        assert_eq!(
            cart.add_item(&album, Quantity::ONE),
            Err(CartError::FrozenCart(id))
        );
        assert_eq!(
            cart.set_quantity(&album, qty(3)),
            Err(CartError::FrozenCart(id))
        );
        assert_eq!(
            cart.remove_item(ProductRef::Album(album.id)),
            Err(CartError::FrozenCart(id))
        );
        assert_eq!(cart.mark_in_order(), Err(CartError::FrozenCart(id)));
    }

    #[test]
    fn test_absorb_sums_overlapping_lines() {
        let shared = fixtures::album(1, Decimal::new(10, 0));
        let only_anon = fixtures::album(2, Decimal::new(20, 0));

        let mut target = Cart::new(
            CartId::new(2),
            CartOwner::Customer(CustomerId::new(1)),
            Utc::now(),
        );
        target.add_item(&shared, qty(1)).unwrap();

        let mut anonymous = cart();
        anonymous.add_item(&shared, qty(2)).unwrap();
        anonymous.add_item(&only_anon, qty(1)).unwrap();

        target.absorb(&anonymous).unwrap();

        assert_eq!(target.line(ProductRef::Album(shared.id)).unwrap().quantity().get(), 3);
        assert_eq!(target.line(ProductRef::Album(only_anon.id)).unwrap().quantity().get(), 1);
        assert_eq!(target.total_items(), 4);
        assert_eq!(target.total_price(), Decimal::new(50, 0));
        assert_totals_consistent(&target);
    }

    #[test]
    fn test_add_overflow_is_rejected() {
        let mut cart = cart();
        let album = fixtures::album(1, Decimal::ONE);
        cart.add_item(&album, qty(Quantity::MAX)).unwrap();
        assert!(matches!(
            cart.add_item(&album, Quantity::ONE),
            Err(CartError::Quantity(QuantityError::TooLarge { .. }))
        ));
        assert_eq!(cart.total_items(), Quantity::MAX);
    }

    #[test]
    fn test_owner_accessors() {
        let token = CartToken::generate();
        let owner = CartOwner::Anonymous(token.clone());
        assert_eq!(owner.token(), Some(&token));
        assert_eq!(owner.customer(), None);
        assert!(cart().for_anonymous_user());
    }
}
