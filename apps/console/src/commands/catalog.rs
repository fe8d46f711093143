use fleetops_core::AppError;
use fleetops_domain::PermissionCatalog;

use crate::console_services::ConsoleServices;

pub async fn show(services: &ConsoleServices, check_backend: bool) -> Result<(), AppError> {
    for category in PermissionCatalog::categories() {
        println!("{} ({})", category.name, category.len());
        for permission in category.permissions {
            println!("  {:<20} {}", permission.key, permission.description);
        }
    }

    if !check_backend {
        return Ok(());
    }

    let drift = services.roles.catalog_drift().await?;
    if drift.is_empty() {
        println!("\nBackend permissions match the catalog.");
        return Ok(());
    }

    if !drift.unknown_to_catalog.is_empty() {
        println!("\nOn the backend but not in the catalog (ignored):");
        for name in &drift.unknown_to_catalog {
            println!("  {name}");
        }
    }
    if !drift.missing_on_backend.is_empty() {
        println!("\nIn the catalog but missing on the backend:");
        for name in &drift.missing_on_backend {
            println!("  {name}");
        }
    }
    Ok(())
}
