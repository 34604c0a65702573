//! Importing the demo catalog and browsing it.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use musicshop_integration_tests::{album, demo_catalog, seeded_store};
use musicshop_storefront::db::{ImportSummary, MemoryStore};
use musicshop_storefront::services::{CatalogService, InventoryService, ShopError};

#[test]
fn test_demo_catalog_is_valid() {
    assert!(demo_catalog().validate().is_empty());
}

#[tokio::test]
async fn test_import_counts() {
    let store = MemoryStore::new();
    let summary = CatalogService::new(&store)
        .import(&demo_catalog())
        .await
        .unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            genres: 2,
            media_types: 2,
            members: 4,
            artists: 3,
            albums_created: 4,
            albums_updated: 0,
        }
    );
}

#[tokio::test]
async fn test_reimport_keeps_stock() {
    let store = seeded_store().await;
    let krovi = album(&store, "kino", "gruppa-krovi").await;
    InventoryService::new(&store)
        .set_stock(krovi.id, 42)
        .await
        .unwrap();

    let summary = CatalogService::new(&store)
        .import(&demo_catalog())
        .await
        .unwrap();
    assert_eq!(summary.albums_created, 0);
    assert_eq!(summary.albums_updated, 4);

    let after = album(&store, "kino", "gruppa-krovi").await;
    assert_eq!(after.id, krovi.id);
    assert_eq!(after.stock, 42);
}

#[tokio::test]
async fn test_browse_pages() {
    let store = seeded_store().await;
    let catalog = CatalogService::new(&store);

    let home = catalog.home().await.unwrap();
    assert_eq!(home.genres.len(), 2);
    assert_eq!(home.offers.len(), 2);

    let (genre, artists) = catalog.genre("rock").await.unwrap();
    assert_eq!(genre.name, "Rock");
    let names: Vec<&str> = artists.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Aquarium", "DDT"]);

    let (artist, albums) = catalog.artist("kino").await.unwrap();
    assert_eq!(artist.members.len(), 2);
    // Newest release first.
    assert_eq!(albums[0].slug, "zvezda-po-imeni-solntse");

    let page = catalog.album("kino", "gruppa-krovi").await.unwrap();
    assert_eq!(page.url_path(), "/artists/kino/gruppa-krovi");
    assert_eq!(page.tracks().count(), 3);

    assert!(matches!(
        catalog.album("ddt", "gruppa-krovi").await,
        Err(ShopError::NotFound(_))
    ));
}

#[test]
fn test_broken_reference_reported() {
    let mut seed = demo_catalog();
    seed.albums[0].artist = "nobody".to_string();
    let errors = seed.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("nobody"));
}
