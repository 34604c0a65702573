//! Cart route handlers.
//!
//! Forms post plain `application/x-www-form-urlencoded` bodies. HTMX
//! requests get a fragment plus a `cart-updated` trigger; everything else is
//! redirected back to the cart page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use musicshop_core::{Cart, CartLine, ProductRef, Quantity};
use rust_decimal::Decimal;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{ActiveCart, ExistingCart, OptionalAuth};
use crate::models::CurrentUser;
use crate::services::{CartService, ShopError};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    /// `kind:id`, posted back by the update and remove forms.
    pub product: String,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    pub fn new(cart: &Cart, state: &AppState) -> Self {
        Self {
            items: cart
                .lines()
                .iter()
                .map(|line| CartItemView::new(line, state))
                .collect(),
            subtotal: state.price(cart.total_price()),
            item_count: cart.total_items(),
        }
    }

    /// The view of a cart that does not exist yet.
    pub fn empty(state: &AppState) -> Self {
        Self {
            items: Vec::new(),
            subtotal: state.price(Decimal::ZERO),
            item_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CartItemView {
    fn new(line: &CartLine, state: &AppState) -> Self {
        Self {
            product: line.product().to_string(),
            name: line.display_name().to_string(),
            quantity: line.quantity().get(),
            price: state.price(line.unit_price()),
            line_price: state.price(line.line_total()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product: String,
    #[serde(default)]
    pub quantity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product: String,
    pub quantity: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub user: Option<CurrentUser>,
    pub cart: CartView,
}

/// Cart lines fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Parse the posted product reference.
fn parse_product(raw: &str) -> Result<ProductRef> {
    raw.trim()
        .parse()
        .map_err(|e: musicshop_core::ProductRefError| AppError::BadRequest(e.to_string()))
}

/// Parse an optional posted quantity. Missing or blank means one.
fn parse_quantity(raw: Option<&str>) -> Result<Quantity> {
    match raw.map(str::trim).filter(|q| !q.is_empty()) {
        Some(raw) => Ok(Quantity::parse(raw).map_err(ShopError::from)?),
        None => Ok(Quantity::ONE),
    }
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// HTMX gets `fragment` with a `cart-updated` trigger, forms go back to the cart.
fn cart_updated(headers: &HeaderMap, fragment: impl IntoResponse) -> Response {
    if is_htmx(headers) {
        (AppendHeaders([("HX-Trigger", "cart-updated")]), fragment).into_response()
    } else {
        Redirect::to("/cart").into_response()
    }
}

/// Display the cart page. Visitors without a cart see an empty one.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ExistingCart(cart): ExistingCart,
) -> CartShowTemplate {
    CartShowTemplate {
        user,
        cart: cart.map_or_else(|| CartView::empty(&state), |cart| CartView::new(&cart, &state)),
    }
}

/// Add a product to the cart.
#[instrument(skip_all, fields(cart_id = %active.cart.id(), product = %form.product))]
pub async fn add(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut active: ActiveCart,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product = parse_product(&form.product)?;
    let quantity = parse_quantity(form.quantity.as_deref())?;

    CartService::new(state.store())
        .add_item(&mut active.cart, product, quantity)
        .await?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product", product.to_string()),
            ("quantity", quantity.get().to_string()),
        ],
    );

    Ok(cart_updated(
        &headers,
        CartCountTemplate {
            count: active.cart.total_items(),
        },
    ))
}

/// Set a line's quantity.
#[instrument(skip_all, fields(cart_id = %active.cart.id(), product = %form.product))]
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut active: ActiveCart,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let product = parse_product(&form.product)?;
    let quantity = parse_quantity(Some(&form.quantity))?;

    CartService::new(state.store())
        .set_quantity(&mut active.cart, product, quantity)
        .await?;

    Ok(cart_updated(
        &headers,
        CartItemsTemplate {
            cart: CartView::new(&active.cart, &state),
        },
    ))
}

/// Remove a line.
#[instrument(skip_all, fields(cart_id = %active.cart.id(), product = %form.product))]
pub async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut active: ActiveCart,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let product = parse_product(&form.product)?;

    CartService::new(state.store())
        .remove_item(&mut active.cart, product)
        .await?;

    Ok(cart_updated(
        &headers,
        CartItemsTemplate {
            cart: CartView::new(&active.cart, &state),
        },
    ))
}

/// Cart count badge.
pub async fn count(ExistingCart(cart): ExistingCart) -> CartCountTemplate {
    CartCountTemplate {
        count: cart.as_ref().map_or(0, Cart::total_items),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use musicshop_core::{AlbumId, QuantityError};

    #[test]
    fn test_product_text_round_trips() {
        let product = ProductRef::Album(AlbumId::new(12));
        assert_eq!(parse_product(&product.to_string()).unwrap(), product);
        assert_eq!(parse_product(" album:12 ").unwrap(), product);
    }

    #[test]
    fn test_bad_product_is_bad_request() {
        for raw in ["", "album", "album:x", "single:3"] {
            assert!(matches!(parse_product(raw), Err(AppError::BadRequest(_))));
        }
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        assert_eq!(parse_quantity(None).unwrap(), Quantity::ONE);
        assert_eq!(parse_quantity(Some("  ")).unwrap(), Quantity::ONE);
        assert_eq!(parse_quantity(Some("3")).unwrap().get(), 3);
    }

    #[test]
    fn test_invalid_quantity_rejected() {
        assert!(matches!(
            parse_quantity(Some("0")),
            Err(AppError::Shop(ShopError::Quantity(QuantityError::NotPositive)))
        ));
        assert!(matches!(
            parse_quantity(Some("two")),
            Err(AppError::Shop(ShopError::Quantity(QuantityError::NotAnInteger(_))))
        ));
    }

    #[test]
    fn test_htmx_requests_get_fragments() {
        let mut headers = HeaderMap::new();
        let response = cart_updated(&headers, CartCountTemplate { count: 2 });
        assert!(response.status().is_redirection());

        headers.insert("hx-request", HeaderValue::from_static("true"));
        let response = cart_updated(&headers, CartCountTemplate { count: 2 });
        assert!(response.status().is_success());
        assert_eq!(response.headers().get("HX-Trigger").unwrap(), "cart-updated");
    }
}
