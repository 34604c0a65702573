//! Catalog queries and import.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use tracing::{debug, instrument};

use musicshop_core::{
    Album, AlbumId, Artist, ArtistId, Genre, GenreId, MediaType, MediaTypeId, Member, MemberId,
};

use super::PgStore;
use crate::db::{CatalogSeed, CatalogStore, ImportSummary, RepositoryError};

pub(super) const ALBUM_COLUMNS: &str = r"
    al.id, al.artist_id, ar.name AS artist_name, ar.slug AS artist_slug, al.name,
    mt.id AS media_type_id, mt.name AS media_type_name, al.song_list, al.release_date,
    al.slug, al.description, al.price, al.stock, al.out_of_stock, al.offer_of_the_week
";

pub(super) const ALBUM_JOINS: &str = r"
    FROM shop.album al
    JOIN shop.artist ar ON ar.id = al.artist_id
    JOIN shop.media_type mt ON mt.id = al.media_type_id
";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct AlbumRow {
    id: AlbumId,
    artist_id: ArtistId,
    artist_name: String,
    artist_slug: String,
    name: String,
    media_type_id: MediaTypeId,
    media_type_name: String,
    song_list: String,
    release_date: NaiveDate,
    slug: String,
    description: String,
    price: Decimal,
    stock: i32,
    out_of_stock: bool,
    offer_of_the_week: bool,
}

impl From<AlbumRow> for Album {
    fn from(row: AlbumRow) -> Self {
        Self {
            id: row.id,
            artist_id: row.artist_id,
            artist_name: row.artist_name,
            artist_slug: row.artist_slug,
            name: row.name,
            media_type: MediaType {
                id: row.media_type_id,
                name: row.media_type_name,
            },
            song_list: row.song_list,
            release_date: row.release_date,
            slug: row.slug,
            description: row.description,
            price: row.price,
            stock: row.stock,
            out_of_stock: row.out_of_stock,
            offer_of_the_week: row.offer_of_the_week,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GenreRow {
    id: GenreId,
    name: String,
    slug: String,
}

impl From<GenreRow> for Genre {
    fn from(row: GenreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ArtistRow {
    id: ArtistId,
    name: String,
    slug: String,
    genre_id: GenreId,
    genre_name: String,
    genre_slug: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ArtistMemberRow {
    artist_id: ArtistId,
    id: MemberId,
    name: String,
    slug: String,
}

const ARTIST_SELECT: &str = r"
    SELECT ar.id, ar.name, ar.slug,
           g.id AS genre_id, g.name AS genre_name, g.slug AS genre_slug
    FROM shop.artist ar
    JOIN shop.genre g ON g.id = ar.genre_id
";

/// Load one album by id with any executor, so callers inside a transaction
/// see their own writes.
pub(super) async fn fetch_album<'e, E>(
    executor: E,
    id: AlbumId,
) -> Result<Option<Album>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let sql = format!("SELECT {ALBUM_COLUMNS} {ALBUM_JOINS} WHERE al.id = $1");
    let row = sqlx::query_as::<_, AlbumRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Album::from))
}

impl PgStore {
    async fn attach_members(&self, rows: Vec<ArtistRow>) -> Result<Vec<Artist>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|row| row.id.as_i32()).collect();
        let member_rows = sqlx::query_as::<_, ArtistMemberRow>(
            r"
            SELECT am.artist_id, m.id, m.name, m.slug
            FROM shop.artist_member am
            JOIN shop.member m ON m.id = am.member_id
            WHERE am.artist_id = ANY($1)
            ORDER BY m.name
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let mut members: HashMap<ArtistId, Vec<Member>> = HashMap::new();
        for row in member_rows {
            members.entry(row.artist_id).or_default().push(Member {
                id: row.id,
                name: row.name,
                slug: row.slug,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Artist {
                id: row.id,
                name: row.name,
                members: members.remove(&row.id).unwrap_or_default(),
                slug: row.slug,
                genre: Genre {
                    id: row.genre_id,
                    name: row.genre_name,
                    slug: row.genre_slug,
                },
            })
            .collect())
    }
}

impl CatalogStore for PgStore {
    async fn genres(&self) -> Result<Vec<Genre>, RepositoryError> {
        let rows = sqlx::query_as::<_, GenreRow>(
            "SELECT id, name, slug FROM shop.genre ORDER BY name",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Genre::from).collect())
    }

    async fn genre_by_slug(&self, slug: &str) -> Result<Option<Genre>, RepositoryError> {
        let row = sqlx::query_as::<_, GenreRow>(
            "SELECT id, name, slug FROM shop.genre WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Genre::from))
    }

    async fn media_types(&self) -> Result<Vec<MediaType>, RepositoryError> {
        let rows: Vec<(MediaTypeId, String)> =
            sqlx::query_as("SELECT id, name FROM shop.media_type ORDER BY name")
                .fetch_all(self.pool())
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| MediaType { id, name })
            .collect())
    }

    async fn artists(&self, genre: Option<GenreId>) -> Result<Vec<Artist>, RepositoryError> {
        let sql = format!("{ARTIST_SELECT} WHERE $1::int4 IS NULL OR ar.genre_id = $1 ORDER BY ar.name");
        let rows = sqlx::query_as::<_, ArtistRow>(&sql)
            .bind(genre)
            .fetch_all(self.pool())
            .await?;
        self.attach_members(rows).await
    }

    async fn artist_by_slug(&self, slug: &str) -> Result<Option<Artist>, RepositoryError> {
        let sql = format!("{ARTIST_SELECT} WHERE ar.slug = $1");
        let row = sqlx::query_as::<_, ArtistRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await?;
        match row {
            Some(row) => Ok(self.attach_members(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn albums_by_artist(&self, artist: ArtistId) -> Result<Vec<Album>, RepositoryError> {
        let sql = format!(
            "SELECT {ALBUM_COLUMNS} {ALBUM_JOINS} WHERE al.artist_id = $1 ORDER BY al.release_date DESC, al.id"
        );
        let rows = sqlx::query_as::<_, AlbumRow>(&sql)
            .bind(artist)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Album::from).collect())
    }

    async fn album(&self, id: AlbumId) -> Result<Option<Album>, RepositoryError> {
        fetch_album(self.pool(), id).await
    }

    async fn album_by_slug(
        &self,
        artist_slug: &str,
        album_slug: &str,
    ) -> Result<Option<Album>, RepositoryError> {
        let sql = format!("SELECT {ALBUM_COLUMNS} {ALBUM_JOINS} WHERE ar.slug = $1 AND al.slug = $2");
        let row = sqlx::query_as::<_, AlbumRow>(&sql)
            .bind(artist_slug)
            .bind(album_slug)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Album::from))
    }

    async fn offers_of_the_week(&self) -> Result<Vec<Album>, RepositoryError> {
        let sql = format!(
            "SELECT {ALBUM_COLUMNS} {ALBUM_JOINS} WHERE al.offer_of_the_week ORDER BY ar.name, al.name"
        );
        let rows = sqlx::query_as::<_, AlbumRow>(&sql)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Album::from).collect())
    }

    #[instrument(skip(self, seed), fields(albums = seed.albums.len()))]
    async fn import_catalog(&self, seed: &CatalogSeed) -> Result<ImportSummary, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let mut summary = ImportSummary::default();

        let mut genre_ids = HashMap::new();
        for genre in &seed.genres {
            let (id,): (i32,) = sqlx::query_as(
                r"
                INSERT INTO shop.genre (name, slug) VALUES ($1, $2)
                ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                ",
            )
            .bind(&genre.name)
            .bind(&genre.slug)
            .fetch_one(&mut *tx)
            .await?;
            genre_ids.insert(genre.slug.as_str(), id);
            summary.genres += 1;
        }

        let mut media_ids = HashMap::new();
        for media in &seed.media_types {
            let (id,): (i32,) = sqlx::query_as(
                r"
                INSERT INTO shop.media_type (name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                ",
            )
            .bind(&media.name)
            .fetch_one(&mut *tx)
            .await?;
            media_ids.insert(media.name.as_str(), id);
            summary.media_types += 1;
        }

        let mut member_ids = HashMap::new();
        for member in &seed.members {
            let (id,): (i32,) = sqlx::query_as(
                r"
                INSERT INTO shop.member (name, slug) VALUES ($1, $2)
                ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                ",
            )
            .bind(&member.name)
            .bind(&member.slug)
            .fetch_one(&mut *tx)
            .await?;
            member_ids.insert(member.slug.as_str(), id);
            summary.members += 1;
        }

        let mut artist_ids = HashMap::new();
        for artist in &seed.artists {
            let genre_id = *genre_ids
                .get(artist.genre.as_str())
                .ok_or(RepositoryError::NotFound)?;
            let (id,): (i32,) = sqlx::query_as(
                r"
                INSERT INTO shop.artist (name, slug, genre_id) VALUES ($1, $2, $3)
                ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, genre_id = EXCLUDED.genre_id
                RETURNING id
                ",
            )
            .bind(&artist.name)
            .bind(&artist.slug)
            .bind(genre_id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM shop.artist_member WHERE artist_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for member in &artist.members {
                let member_id = *member_ids
                    .get(member.as_str())
                    .ok_or(RepositoryError::NotFound)?;
                sqlx::query("INSERT INTO shop.artist_member (artist_id, member_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(member_id)
                    .execute(&mut *tx)
                    .await?;
            }

            artist_ids.insert(artist.slug.as_str(), id);
            summary.artists += 1;
        }

        for album in &seed.albums {
            let artist_id = *artist_ids
                .get(album.artist.as_str())
                .ok_or(RepositoryError::NotFound)?;
            let media_type_id = *media_ids
                .get(album.media_type.as_str())
                .ok_or(RepositoryError::NotFound)?;

            // Stock is only set on insert; restocks go through the reactor.
            let (inserted,): (bool,) = sqlx::query_as(
                r"
                INSERT INTO shop.album
                    (artist_id, name, media_type_id, song_list, release_date, slug,
                     description, price, stock, out_of_stock, offer_of_the_week)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9 = 0, $10)
                ON CONFLICT (artist_id, slug) DO UPDATE SET
                    name = EXCLUDED.name,
                    media_type_id = EXCLUDED.media_type_id,
                    song_list = EXCLUDED.song_list,
                    release_date = EXCLUDED.release_date,
                    description = EXCLUDED.description,
                    price = EXCLUDED.price,
                    offer_of_the_week = EXCLUDED.offer_of_the_week
                RETURNING (xmax = 0)
                ",
            )
            .bind(artist_id)
            .bind(&album.name)
            .bind(media_type_id)
            .bind(album.song_list())
            .bind(album.release_date)
            .bind(&album.slug)
            .bind(&album.description)
            .bind(album.price)
            .bind(album.stock)
            .bind(album.offer_of_the_week)
            .fetch_one(&mut *tx)
            .await?;

            if inserted {
                summary.albums_created += 1;
            } else {
                summary.albums_updated += 1;
            }
        }

        tx.commit().await?;
        debug!(?summary, "Imported catalog");
        Ok(summary)
    }
}
