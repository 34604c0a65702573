//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::Redirect,
};
use tracing::instrument;

use musicshop_core::{Album, Customer, Notification, NotificationId, Order};

use super::cart::CartView;
use super::catalog::AlbumCard;
use crate::db::CustomerStore;
use crate::error::Result;
use crate::middleware::{ActiveCart, RequireAuth};
use crate::models::CurrentUser;
use crate::services::{AuthService, CheckoutService, WishlistService};
use crate::state::AppState;

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub status: String,
    pub buying_type: String,
    pub order_date: String,
    pub placed_at: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            status: order.status.label().to_string(),
            buying_type: order.buying_type.label().to_string(),
            order_date: order.order_date.format("%Y-%m-%d").to_string(),
            placed_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Notification display data for templates.
#[derive(Clone)]
pub struct NotificationView {
    pub id: i32,
    pub text: String,
    pub created_at: String,
    pub album_url: Option<String>,
}

impl NotificationView {
    fn new(notification: &Notification, album: Option<&Album>) -> Self {
        Self {
            id: notification.id.as_i32(),
            text: notification.text.clone(),
            created_at: notification.created_at.format("%Y-%m-%d %H:%M").to_string(),
            album_url: album.map(Album::url_path),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub user: Option<CurrentUser>,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub cart: CartView,
    pub orders: Vec<OrderView>,
    pub wishlist: Vec<AlbumCard>,
    pub notifications: Vec<NotificationView>,
}

/// The customer profile for the logged-in user, created on first use.
pub(super) async fn customer_for(state: &AppState, user: &CurrentUser) -> Result<Customer> {
    let (customer, _) = state.store().ensure_customer(user.id).await?;
    Ok(customer)
}

/// Account overview: profile, cart, orders, wishlist, unread notifications.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    active: ActiveCart,
) -> Result<AccountTemplate> {
    let user = AuthService::new(state.store()).get_user(current.id).await?;
    let customer = match active.customer {
        Some(customer) => customer,
        None => customer_for(&state, &current).await?,
    };

    let orders = CheckoutService::new(state.store())
        .orders_for(&customer)
        .await?;
    let wishlist = WishlistService::new(state.store());
    let albums = wishlist.albums(customer.id).await?;
    let notifications = wishlist.unread_with_albums(customer.id).await?;

    Ok(AccountTemplate {
        user: Some(current),
        email: user.email.to_string(),
        phone: customer.phone,
        address: customer.address,
        cart: CartView::new(&active.cart, &state),
        orders: orders.iter().map(OrderView::from).collect(),
        wishlist: AlbumCard::list(&albums, &state),
        notifications: notifications
            .iter()
            .map(|(notification, album)| NotificationView::new(notification, album.as_ref()))
            .collect(),
    })
}

/// Mark every notification read.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn clear_notifications(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Redirect> {
    let customer = customer_for(&state, &current).await?;
    WishlistService::new(state.store()).clear(customer.id).await?;
    Ok(Redirect::to("/account"))
}

/// Mark one notification read.
#[instrument(skip_all, fields(user_id = %current.id, notification_id = %id))]
pub async fn read_notification(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<NotificationId>,
) -> Result<Redirect> {
    let customer = customer_for(&state, &current).await?;
    WishlistService::new(state.store())
        .mark_read(customer.id, id)
        .await?;
    Ok(Redirect::to("/account"))
}
