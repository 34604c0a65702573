//! Catalog pages and import.

use tracing::{info, instrument};

use musicshop_core::{Album, Artist, Genre};

use super::ShopError;
use crate::db::{CatalogSeed, CatalogStore, ImportSummary};

/// Data for the home page.
#[derive(Debug, Clone)]
pub struct HomeListing {
    pub genres: Vec<Genre>,
    pub artists: Vec<Artist>,
    pub offers: Vec<Album>,
}

pub struct CatalogService<'a, S> {
    store: &'a S,
}

impl<'a, S: CatalogStore> CatalogService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn home(&self) -> Result<HomeListing, ShopError> {
        Ok(HomeListing {
            genres: self.store.genres().await?,
            artists: self.store.artists(None).await?,
            offers: self.store.offers_of_the_week().await?,
        })
    }

    /// A genre with its artists.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` for unknown slugs.
    pub async fn genre(&self, slug: &str) -> Result<(Genre, Vec<Artist>), ShopError> {
        let genre = self
            .store
            .genre_by_slug(slug)
            .await?
            .ok_or(ShopError::NotFound("genre"))?;
        let artists = self.store.artists(Some(genre.id)).await?;
        Ok((genre, artists))
    }

    /// An artist with members and albums.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` for unknown slugs.
    pub async fn artist(&self, slug: &str) -> Result<(Artist, Vec<Album>), ShopError> {
        let artist = self
            .store
            .artist_by_slug(slug)
            .await?
            .ok_or(ShopError::NotFound("artist"))?;
        let albums = self.store.albums_by_artist(artist.id).await?;
        Ok((artist, albums))
    }

    /// # Errors
    ///
    /// Returns `ShopError::NotFound` for unknown slugs.
    pub async fn album(&self, artist_slug: &str, album_slug: &str) -> Result<Album, ShopError> {
        self.store
            .album_by_slug(artist_slug, album_slug)
            .await?
            .ok_or(ShopError::NotFound("album"))
    }

    /// Validate and import a catalog document.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::InvalidSeed` listing every validation problem,
    /// or `ShopError::Repository` if the import fails.
    #[instrument(skip(self, seed))]
    pub async fn import(&self, seed: &CatalogSeed) -> Result<ImportSummary, ShopError> {
        let errors = seed.validate();
        if !errors.is_empty() {
            return Err(ShopError::InvalidSeed(errors));
        }
        let summary = self.store.import_catalog(seed).await?;
        info!(
            artists = summary.artists,
            albums_created = summary.albums_created,
            albums_updated = summary.albums_updated,
            "Catalog imported"
        );
        Ok(summary)
    }
}
