use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// Directory that receives rendered forecast charts.
///
/// Files are named only by currency, so a later forecast for the same
/// currency overwrites the earlier chart.
#[derive(Debug, Clone)]
pub struct ArtifactSink {
    dir: PathBuf,
}

impl ArtifactSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        ArtifactSink { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(currency_id: &str) -> String {
        format!("forecast_{currency_id}.png")
    }

    pub fn path_for(&self, currency_id: &str) -> Result<PathBuf> {
        if currency_id.is_empty()
            || currency_id.contains(['/', '\\'])
            || currency_id.contains("..")
        {
            bail!("Invalid currency id for artifact name: {currency_id:?}");
        }
        Ok(self.dir.join(Self::file_name(currency_id)))
    }

    /// Creates the output directory and returns the artifact path.
    pub fn prepare(&self, currency_id: &str) -> Result<PathBuf> {
        let path = self.path_for(currency_id)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;
        Ok(path)
    }
}
