//! Checkout: the order form and order placement.
//!
//! Checkout requires a logged-in customer. Anonymous visitors are sent to
//! the login page and their cart is merged when they come back.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;
use tracing::instrument;

use musicshop_core::{BuyingType, Cart, CheckoutDetails, Customer, User};

use super::cart::CartView;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{ActiveCart, RequireAuth};
use crate::models::CurrentUser;
use crate::services::{AuthService, CheckoutService, ShopError};
use crate::state::AppState;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Posted checkout form.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub buying_type: BuyingType,
    #[serde(default)]
    pub comment: String,
    /// `YYYY-MM-DD`; blank means today.
    #[serde(default)]
    pub order_date: String,
}

impl CheckoutForm {
    /// Prefill from the account.
    fn prefilled(user: &User, customer: &Customer) -> Self {
        let tomorrow = Utc::now()
            .date_naive()
            .checked_add_days(Days::new(1))
            .unwrap_or_else(|| Utc::now().date_naive());
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            buying_type: BuyingType::default(),
            comment: String::new(),
            order_date: tomorrow.format(DATE_FORMAT).to_string(),
        }
    }

    fn details(&self, today: NaiveDate) -> std::result::Result<CheckoutDetails, String> {
        let raw_date = self.order_date.trim();
        let order_date = if raw_date.is_empty() {
            today
        } else {
            NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
                .map_err(|_| format!("invalid date {raw_date:?}, expected YYYY-MM-DD"))?
        };
        Ok(CheckoutDetails {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            buying_type: self.buying_type,
            comment: self.comment.clone(),
            order_date,
        })
    }

    /// Whether delivery is selected, for the template's radio buttons.
    pub fn is_delivery(&self) -> bool {
        self.buying_type == BuyingType::Delivery
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutTemplate {
    pub user: Option<CurrentUser>,
    pub cart: CartView,
    pub form: CheckoutForm,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/placed.html")]
pub struct OrderPlacedTemplate {
    pub user: Option<CurrentUser>,
    pub order_id: String,
    pub status: String,
    pub buying_type: String,
    pub order_date: String,
    pub total: String,
}

fn require_customer(active: &ActiveCart) -> Result<Customer> {
    active
        .customer
        .clone()
        .ok_or_else(|| AppError::Internal("authenticated cart without customer".to_string()))
}

/// Show the checkout form.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    active: ActiveCart,
) -> Result<Response> {
    if active.cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }
    let customer = require_customer(&active)?;
    let user = AuthService::new(state.store()).get_user(current.id).await?;

    Ok(CheckoutTemplate {
        cart: CartView::new(&active.cart, &state),
        form: CheckoutForm::prefilled(&user, &customer),
        user: Some(current),
        error: None,
    }
    .into_response())
}

/// Place the order.
///
/// Validation failures re-render the form with the submitted values.
#[instrument(skip_all, fields(user_id = %current.id, cart_id = %active.cart.id()))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    mut active: ActiveCart,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let customer = require_customer(&active)?;
    let rerender = |cart: &Cart, error: String| {
        (
            StatusCode::BAD_REQUEST,
            CheckoutTemplate {
                user: Some(current.clone()),
                cart: CartView::new(cart, &state),
                form: form.clone(),
                error: Some(error),
            },
        )
            .into_response()
    };

    let details = match form.details(Utc::now().date_naive()) {
        Ok(details) => details,
        Err(error) => return Ok(rerender(&active.cart, error)),
    };

    let placed = CheckoutService::new(state.store())
        .place_order(&customer, &mut active.cart, details)
        .await;
    let order = match placed {
        Ok(order) => order,
        Err(ShopError::Checkout(err)) => return Ok(rerender(&active.cart, err.to_string())),
        Err(err) => return Err(err.into()),
    };

    add_breadcrumb("checkout", "Order placed", &[("order_id", order.id.to_string())]);

    Ok(OrderPlacedTemplate {
        order_id: order.id.to_string(),
        status: order.status.label().to_string(),
        buying_type: order.buying_type.label().to_string(),
        order_date: order.order_date.format(DATE_FORMAT).to_string(),
        total: state.price(active.cart.total_price()),
        user: Some(current),
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> CheckoutForm {
        CheckoutForm {
            first_name: "Boris".to_string(),
            last_name: "G".to_string(),
            phone: "+7 812 000".to_string(),
            address: String::new(),
            buying_type: BuyingType::SelfPickup,
            comment: String::new(),
            order_date: "2026-10-20".to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_details_parse_date() {
        let details = form().details(today()).unwrap();
        assert_eq!(details.order_date, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
        assert_eq!(details.buying_type, BuyingType::SelfPickup);
    }

    #[test]
    fn test_blank_date_means_today() {
        let mut form = form();
        form.order_date = " ".to_string();
        assert_eq!(form.details(today()).unwrap().order_date, today());
    }

    #[test]
    fn test_bad_date_rejected() {
        let mut form = form();
        form.order_date = "20/10/2026".to_string();
        assert!(form.details(today()).unwrap_err().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_form_decodes_buying_type() {
        let form: CheckoutForm = serde_json::from_value(serde_json::json!({
            "first_name": "A",
            "last_name": "B",
            "phone": "1",
            "buying_type": "delivery",
        }))
        .unwrap();
        assert!(form.is_delivery());
        assert!(form.order_date.is_empty());
    }
}
