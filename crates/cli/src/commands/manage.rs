//! Back-office commands: stock levels and order status.

use tracing::info;

use musicshop_core::{AlbumId, OrderId, OrderStatus};
use musicshop_storefront::services::{CheckoutService, InventoryService};

use super::CliError;

/// Set an album's stock level.
///
/// # Errors
///
/// Returns an error for negative stock, unknown albums, or storage failure.
pub async fn set_stock(album: AlbumId, stock: i32) -> Result<(), CliError> {
    let store = super::connect().await?;
    let update = InventoryService::new(&store).set_stock(album, stock).await?;

    info!(
        album = %update.album.name,
        previous = update.transition.previous,
        current = update.transition.current,
        "Stock set"
    );
    if !update.notified.is_empty() {
        info!(customers = update.notified.len(), "Back-in-stock notifications sent");
    }
    Ok(())
}

/// Move an order to `status`.
///
/// # Errors
///
/// Returns an error for unknown orders, backward moves, or storage failure.
pub async fn advance_order(
    order: OrderId,
    status: OrderStatus,
) -> Result<(), CliError> {
    let store = super::connect().await?;
    let order = CheckoutService::new(&store)
        .advance_status(order, status)
        .await?;

    info!(order_id = %order.id, status = %order.status, "Order updated");
    Ok(())
}
