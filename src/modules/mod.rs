pub mod catalog;

use atlas_db::Database;
use atlas_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, db: &Database) -> anyhow::Result<()> {
    registry.register(catalog::create_module(db.clone()))?;
    Ok(())
}
