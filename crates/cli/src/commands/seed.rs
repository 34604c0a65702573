//! Catalog import from YAML.
//!
//! The file is parsed and validated before any connection is made, so a
//! broken file never touches the database.

use std::path::Path;

use tracing::{error, info};

use musicshop_storefront::db::CatalogSeed;
use musicshop_storefront::services::CatalogService;

use super::CliError;

/// Import genres, media types, members, artists, and albums.
///
/// Re-importing the same file updates records in place; album stock is
/// never overwritten.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails
/// validation, or the import fails.
pub async fn catalog(file_path: &str) -> Result<(), CliError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(CliError::FileNotFound(file_path.to_string()));
    }

    info!(path = %file_path, "Loading catalog");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    let errors = seed.validate();
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CliError::InvalidCatalog(errors.len()));
    }
    info!(
        artists = seed.artists.len(),
        albums = seed.albums.len(),
        "Catalog validated"
    );

    let store = super::connect().await?;
    let summary = CatalogService::new(&store).import(&seed).await?;

    info!("Import complete!");
    info!("  Genres: {}", summary.genres);
    info!("  Media types: {}", summary.media_types);
    info!("  Members: {}", summary.members);
    info!("  Artists: {}", summary.artists);
    info!("  Albums created: {}", summary.albums_created);
    info!("  Albums updated: {}", summary.albums_updated);
    Ok(())
}
