//! Catalog import format.
//!
//! The CLI reads a YAML document into [`CatalogSeed`] and hands it to
//! [`CatalogStore::import_catalog`](super::CatalogStore::import_catalog).
//! Records refer to each other by slug (media types by name), so the file
//! can be written by hand:
//!
//! ```yaml
//! genres:
//!   - { name: Post-punk, slug: post-punk }
//! media_types:
//!   - name: Vinyl
//! members:
//!   - { name: Viktor Tsoi, slug: viktor-tsoi }
//! artists:
//!   - { name: Kino, slug: kino, genre: post-punk, members: [viktor-tsoi] }
//! albums:
//!   - artist: kino
//!     name: Gruppa krovi
//!     slug: gruppa-krovi
//!     media_type: Vinyl
//!     release_date: 1988-01-04
//!     price: "29.99"
//!     stock: 5
//!     tracks: [Gruppa krovi, Zakrytaya dver]
//! ```

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

/// A whole catalog document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub genres: Vec<GenreSeed>,
    pub media_types: Vec<MediaTypeSeed>,
    pub members: Vec<MemberSeed>,
    pub artists: Vec<ArtistSeed>,
    pub albums: Vec<AlbumSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenreSeed {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaTypeSeed {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberSeed {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistSeed {
    pub name: String,
    pub slug: String,
    /// Genre slug.
    pub genre: String,
    /// Member slugs.
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumSeed {
    /// Artist slug.
    pub artist: String,
    pub name: String,
    pub slug: String,
    /// Media type name.
    pub media_type: String,
    pub release_date: NaiveDate,
    pub price: Decimal,
    /// Initial stock for new albums. Ignored for albums that already exist.
    #[serde(default = "default_stock")]
    pub stock: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub offer_of_the_week: bool,
}

const fn default_stock() -> i32 {
    1
}

impl AlbumSeed {
    /// Tracks in the one-per-line storage form.
    #[must_use]
    pub fn song_list(&self) -> String {
        self.tracks.join("\n")
    }
}

/// Counts from one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub genres: usize,
    pub media_types: usize,
    pub members: usize,
    pub artists: usize,
    pub albums_created: usize,
    pub albums_updated: usize,
}

impl CatalogSeed {
    /// Check cross-references and value ranges before touching storage.
    ///
    /// Returns one message per problem; an empty list means the seed is
    /// importable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let genres: HashSet<&str> = self.genres.iter().map(|g| g.slug.as_str()).collect();
        let media: HashSet<&str> = self.media_types.iter().map(|m| m.name.as_str()).collect();
        let members: HashSet<&str> = self.members.iter().map(|m| m.slug.as_str()).collect();
        let artists: HashSet<&str> = self.artists.iter().map(|a| a.slug.as_str()).collect();

        for artist in &self.artists {
            if !genres.contains(artist.genre.as_str()) {
                errors.push(format!(
                    "artist '{}' refers to unknown genre '{}'",
                    artist.slug, artist.genre
                ));
            }
            for member in &artist.members {
                if !members.contains(member.as_str()) {
                    errors.push(format!(
                        "artist '{}' refers to unknown member '{member}'",
                        artist.slug
                    ));
                }
            }
        }

        let mut album_keys = HashSet::new();
        for album in &self.albums {
            if !artists.contains(album.artist.as_str()) {
                errors.push(format!(
                    "album '{}' refers to unknown artist '{}'",
                    album.slug, album.artist
                ));
            }
            if !media.contains(album.media_type.as_str()) {
                errors.push(format!(
                    "album '{}' refers to unknown media type '{}'",
                    album.slug, album.media_type
                ));
            }
            if album.price.is_sign_negative() {
                errors.push(format!("album '{}' has a negative price", album.slug));
            }
            if album.stock < 0 {
                errors.push(format!("album '{}' has negative stock", album.slug));
            }
            if !album_keys.insert((album.artist.as_str(), album.slug.as_str())) {
                errors.push(format!(
                    "album '{}/{}' is listed twice",
                    album.artist, album.slug
                ));
            }
        }

        errors
    }
}
