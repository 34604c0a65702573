//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use super::catalog::{AlbumCard, ArtistCard, GenreLink};
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::services::CatalogService;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub user: Option<CurrentUser>,
    pub genres: Vec<GenreLink>,
    pub artists: Vec<ArtistCard>,
    pub offers: Vec<AlbumCard>,
}

/// Genres, artists, and this week's offers.
#[instrument(skip(state, user))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<HomeTemplate> {
    let listing = CatalogService::new(state.store()).home().await?;
    Ok(HomeTemplate {
        user,
        genres: listing.genres.iter().map(GenreLink::from).collect(),
        artists: listing.artists.iter().map(ArtistCard::from).collect(),
        offers: AlbumCard::list(&listing.offers, &state),
    })
}
