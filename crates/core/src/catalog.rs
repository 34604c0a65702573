//! Catalog reference data: genres, members, media types, artists, albums.
//!
//! These records are read-mostly. The only field that changes during normal
//! operation is [`Album::stock`], and that goes through the inventory rules in
//! [`crate::inventory`].

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AlbumId, ArtistId, GenreId, MediaTypeId, MemberId};

/// A music genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
    pub slug: String,
}

/// A musician who plays in one or more artists' line-ups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub slug: String,
}

/// A physical or digital media carrier (vinyl, CD, cassette...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaType {
    pub id: MediaTypeId,
    pub name: String,
}

/// A performer or band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub genre: Genre,
    pub members: Vec<Member>,
    pub slug: String,
}

impl fmt::Display for Artist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.name, self.genre.name)
    }
}

/// An album release, the only purchasable product kind.
///
/// `out_of_stock` always mirrors `stock == 0`; storage recomputes it on every
/// stock write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub artist_id: ArtistId,
    /// Denormalized for display and cart line names.
    pub artist_name: String,
    /// Denormalized for building album URLs.
    pub artist_slug: String,
    pub name: String,
    pub media_type: MediaType,
    /// One track per line.
    pub song_list: String,
    pub release_date: NaiveDate,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub out_of_stock: bool,
    pub offer_of_the_week: bool,
}

impl Album {
    /// Track titles, skipping blank lines.
    pub fn tracks(&self) -> impl Iterator<Item = &str> {
        self.song_list
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }

    /// Public URL path of the album page.
    #[must_use]
    pub fn url_path(&self) -> String {
        format!("/artists/{}/{}", self.artist_slug, self.slug)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_skip_blank_lines() {
        let album = fixtures::album(1, Decimal::ONE);
        let tracks: Vec<&str> = album.tracks().collect();
        assert_eq!(tracks, ["Gruppa krovi", "Zvezda po imeni Solntse"]);
    }

    #[test]
    fn test_url_path() {
        let album = fixtures::album(3, Decimal::ONE);
        assert_eq!(album.url_path(), "/artists/kino/album-3");
    }

    #[test]
    fn test_artist_display_includes_genre() {
        let artist = Artist {
            id: ArtistId::new(1),
            name: "Kino".to_string(),
            genre: Genre {
                id: GenreId::new(1),
                name: "Post-punk".to_string(),
                slug: "post-punk".to_string(),
            },
            members: Vec::new(),
            slug: "kino".to_string(),
        };
        assert_eq!(artist.to_string(), "Kino | Post-punk");
    }
}
