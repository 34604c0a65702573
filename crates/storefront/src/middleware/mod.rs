//! HTTP middleware and extractors.
//!
//! # Layer order (outermost first)
//!
//! 1. Sentry (hub per request, transactions)
//! 2. `TraceLayer`
//! 3. Request ID
//! 4. Security headers
//! 5. Session (tower-sessions with the `PostgreSQL` store)

pub mod auth;
pub mod cart;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, set_current_user};
pub use cart::{ActiveCart, ExistingCart, cart_token, clear_cart_token};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
