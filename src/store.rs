use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::CatalogSource;
use crate::error::BirdcallError;
use crate::sanitize::sanitize_filename;

/// On-disk layout of a download root: `<root>/<XC|ML>/<species>/<file>`.
#[derive(Debug, Clone)]
pub struct DownloadLayout {
    root: Utf8PathBuf,
}

impl DownloadLayout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn source_dir(&self, source: CatalogSource) -> Utf8PathBuf {
        self.root.join(source.dir_name())
    }

    pub fn species_dir(&self, source: CatalogSource, species: &str) -> Utf8PathBuf {
        self.source_dir(source).join(sanitize_filename(species))
    }

    pub fn ensure_source_dir(&self, source: CatalogSource) -> Result<(), BirdcallError> {
        fs::create_dir_all(self.source_dir(source).as_std_path())
            .map_err(|err| BirdcallError::Filesystem(err.to_string()))
    }
}
