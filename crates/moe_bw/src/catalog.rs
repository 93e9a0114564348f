use anyhow::{Context, Result};
use bw_engine::Catalog;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone, Default)]
pub struct CatalogArgs {
    /// Catalog JSON file replacing the built-in presets
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Directory of catalog JSON files merged over the selected catalog
    #[arg(long, global = true)]
    pub catalog_dir: Option<PathBuf>,
}

impl CatalogArgs {
    pub fn load(&self) -> Result<Catalog> {
        let base = match &self.catalog {
            Some(path) => Catalog::load(path)
                .with_context(|| format!("Failed to load catalog {:?}", path))?,
            None => Catalog::builtin().context("Built-in catalog is invalid")?,
        };

        let catalog = match &self.catalog_dir {
            Some(dir) => Catalog::load_dir(base, dir)
                .with_context(|| format!("Failed to merge catalog directory {:?}", dir))?,
            None => base,
        };

        info!(
            "Catalog ready: {} models, {} hardware presets, {} scenarios",
            catalog.models().count(),
            catalog.hardware_presets().len(),
            catalog.scenarios().len()
        );
        Ok(catalog)
    }
}
