//! Print the catalog listing the way contacts see it.

use anyhow::Result;

use balcao::bot::replies;
use balcao::catalog::{CatalogRepository, DirCatalogRepository};

pub async fn run(config_path: &str) -> Result<()> {
    let loaded = super::load_config(config_path).await?;
    let repository =
        DirCatalogRepository::new(&loaded.catalog_dir, &loaded.config.catalogs.extension);

    let items = repository.list().await?;
    if items.is_empty() {
        println!("{}", replies::NO_CATALOGS);
        println!("(looked in {})", repository.location().display());
        return Ok(());
    }

    println!("{}", replies::catalog_listing(&items));
    Ok(())
}
