//! Catalog pages: genres, artists, and albums.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;

use musicshop_core::{Album, Artist, Genre, Purchasable};

use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::services::CatalogService;
use crate::state::AppState;

/// Album display data for templates.
#[derive(Clone)]
pub struct AlbumCard {
    pub id: i32,
    /// `kind:id`, posted back by the add-to-cart form.
    pub product: String,
    pub name: String,
    pub artist_name: String,
    pub url: String,
    pub price: String,
    pub media_type: String,
    pub release_year: String,
    pub out_of_stock: bool,
}

impl AlbumCard {
    pub fn new(album: &Album, state: &AppState) -> Self {
        Self {
            id: album.id.as_i32(),
            product: album.product_ref().to_string(),
            name: album.name.clone(),
            artist_name: album.artist_name.clone(),
            url: album.url_path(),
            price: state.price(album.price),
            media_type: album.media_type.name.clone(),
            release_year: album.release_date.format("%Y").to_string(),
            out_of_stock: album.out_of_stock,
        }
    }

    pub fn list(albums: &[Album], state: &AppState) -> Vec<Self> {
        albums.iter().map(|album| Self::new(album, state)).collect()
    }
}

/// Artist display data for templates.
#[derive(Clone)]
pub struct ArtistCard {
    pub name: String,
    pub url: String,
    pub genre: String,
}

impl From<&Artist> for ArtistCard {
    fn from(artist: &Artist) -> Self {
        Self {
            name: artist.name.clone(),
            url: format!("/artists/{}", artist.slug),
            genre: artist.genre.name.clone(),
        }
    }
}

/// Genre link data for templates.
#[derive(Clone)]
pub struct GenreLink {
    pub name: String,
    pub url: String,
}

impl From<&Genre> for GenreLink {
    fn from(genre: &Genre) -> Self {
        Self {
            name: genre.name.clone(),
            url: format!("/genres/{}", genre.slug),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "catalog/genre.html")]
pub struct GenreTemplate {
    pub user: Option<CurrentUser>,
    pub genre: GenreLink,
    pub artists: Vec<ArtistCard>,
}

#[derive(Template, WebTemplate)]
#[template(path = "catalog/artist.html")]
pub struct ArtistTemplate {
    pub user: Option<CurrentUser>,
    pub artist: ArtistCard,
    pub genre: GenreLink,
    pub members: Vec<String>,
    pub albums: Vec<AlbumCard>,
}

#[derive(Template, WebTemplate)]
#[template(path = "catalog/album.html")]
pub struct AlbumTemplate {
    pub user: Option<CurrentUser>,
    pub album: AlbumCard,
    pub artist_url: String,
    pub description: String,
    pub tracks: Vec<String>,
}

/// Artists in a genre.
#[instrument(skip(state, user))]
pub async fn genre(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
) -> Result<GenreTemplate> {
    let (genre, artists) = CatalogService::new(state.store()).genre(&slug).await?;
    Ok(GenreTemplate {
        user,
        genre: GenreLink::from(&genre),
        artists: artists.iter().map(ArtistCard::from).collect(),
    })
}

/// Artist detail with members and albums.
#[instrument(skip(state, user))]
pub async fn artist(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(artist_slug): Path<String>,
) -> Result<ArtistTemplate> {
    let (artist, albums) = CatalogService::new(state.store())
        .artist(&artist_slug)
        .await?;
    Ok(ArtistTemplate {
        user,
        genre: GenreLink::from(&artist.genre),
        members: artist.members.iter().map(|m| m.name.clone()).collect(),
        artist: ArtistCard::from(&artist),
        albums: AlbumCard::list(&albums, &state),
    })
}

/// Album detail.
#[instrument(skip(state, user))]
pub async fn album(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path((artist_slug, album_slug)): Path<(String, String)>,
) -> Result<AlbumTemplate> {
    let album = CatalogService::new(state.store())
        .album(&artist_slug, &album_slug)
        .await?;
    Ok(AlbumTemplate {
        user,
        artist_url: format!("/artists/{}", album.artist_slug),
        description: album.description.clone(),
        tracks: album.tracks().map(String::from).collect(),
        album: AlbumCard::new(&album, &state),
    })
}
