//! Music Shop Core - domain types and rules.
//!
//! This crate holds everything about the shop that does not touch I/O:
//! - [`types`] - type-safe IDs, prices, emails, and status enums
//! - [`catalog`] - artists, albums, genres, members, and media types
//! - [`product`] - the purchasable product reference and its capability trait
//! - [`cart`] - the cart aggregate, line items, and quantity rules
//! - [`order`] - checkout details and order records
//! - [`inventory`] - stock transitions and restock notifications
//! - [`customer`] - users, customers, and notifications
//!
//! The `storefront` crate persists these types and drives them from HTTP
//! handlers; the `cli` crate drives them from the command line.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod customer;
pub mod inventory;
pub mod order;
pub mod product;
pub mod types;

pub use cart::{Cart, CartError, CartLine, CartOwner, CartToken, Quantity, QuantityError};
pub use catalog::{Album, Artist, Genre, MediaType, Member};
pub use customer::{Customer, Notification, User};
pub use inventory::{StockError, StockTransition};
pub use order::{CheckoutDetails, CheckoutError, Order, OrderError};
pub use product::{Product, ProductRef, ProductRefError, Purchasable};
pub use types::*;
