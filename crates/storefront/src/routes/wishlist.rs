//! Wishlist add/remove.
//!
//! Wish-listing a sold-out album is how a customer asks to be told when it
//! comes back; the restock notification removes the entry again.

use axum::{
    extract::{Path, State},
    response::Redirect,
};
use tracing::instrument;

use musicshop_core::{AlbumId, ProductRef};

use super::account::customer_for;
use crate::db::CatalogStore;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::{ShopError, WishlistService};
use crate::state::AppState;

/// Send the visitor back to the album page.
async fn back_to_album(state: &AppState, album: AlbumId) -> Result<Redirect> {
    let album = state
        .store()
        .album(album)
        .await?
        .ok_or(ShopError::ProductNotFound(ProductRef::Album(album)))?;
    Ok(Redirect::to(&album.url_path()))
}

#[instrument(skip_all, fields(user_id = %current.id, album_id = %album))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(album): Path<AlbumId>,
) -> Result<Redirect> {
    let customer = customer_for(&state, &current).await?;
    WishlistService::new(state.store())
        .add(customer.id, album)
        .await?;
    back_to_album(&state, album).await
}

#[instrument(skip_all, fields(user_id = %current.id, album_id = %album))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(album): Path<AlbumId>,
) -> Result<Redirect> {
    let customer = customer_for(&state, &current).await?;
    WishlistService::new(state.store())
        .remove(customer.id, album)
        .await?;
    Ok(Redirect::to("/account"))
}
