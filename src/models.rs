use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::config::{ModelFile, VesselConfig};

/// Resolved on-disk locations of the vessel network's two artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub topology: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// Locates both files under the configured model directory. A missing
    /// file is a startup error.
    pub fn resolve(config: &VesselConfig) -> Result<Self> {
        let topology = config.model_dir.join(&config.topology.name);
        let weights = config.model_dir.join(&config.weights.name);

        for path in [&topology, &weights] {
            if !path.is_file() {
                bail!("Model file {} not found", path.display());
            }
        }

        Ok(ModelFiles { topology, weights })
    }

    /// Downloads whichever artifacts are missing, then resolves.
    pub fn fetch_missing(config: &VesselConfig) -> Result<Self> {
        fs::create_dir_all(&config.model_dir).with_context(|| {
            format!("Failed to create model directory {}", config.model_dir.display())
        })?;

        for model in [&config.topology, &config.weights] {
            let path = config.model_dir.join(&model.name);
            if !path.is_file() {
                download(model, &path)?;
            }
        }

        Self::resolve(config)
    }
}

fn download(model: &ModelFile, path: &Path) -> Result<()> {
    info!(url = %model.url, path = %path.display(), "downloading model file");

    let response = ureq::get(&model.url)
        .call()
        .with_context(|| format!("Failed to fetch {}", model.url))?;

    // Write beside the target first so an interrupted download never
    // leaves a truncated model behind.
    let partial = path.with_extension("part");
    let mut file = File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))?;
    io::copy(&mut response.into_reader(), &mut file)
        .with_context(|| format!("Failed to download {}", model.url))?;
    fs::rename(&partial, path)
        .with_context(|| format!("Failed to move model into {}", path.display()))?;

    Ok(())
}
