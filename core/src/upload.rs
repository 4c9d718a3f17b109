//! Handing generated files to object storage.

use crate::config::ExportConfig;
use crate::error::{ChargingError, ChargingResult};
use crate::types::FileKind;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

pub trait ObjectStore: Debug {
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> ChargingResult<()>;
}

/// Object store backed by a directory: `{root}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_of(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

impl ObjectStore for LocalObjectStore {
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> ChargingResult<()> {
        let target = self.path_of(bucket, key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ChargingError::Upload(format!("{}: {e}", parent.display())))?;
        }
        fs::write(&target, bytes)
            .map_err(|e| ChargingError::Upload(format!("{}: {e}", target.display())))
    }
}

/// `export/{regime}/{transaction|customer}/{filename}`
pub fn export_key(regime_slug: &str, kind: FileKind, filename: &str) -> String {
    format!("export/{regime_slug}/{}/{filename}", kind.folder())
}

/// Upload `path` to the export bucket, and to the archive bucket when
/// configured. The local file is removed afterwards either way. Returns
/// the object key.
pub fn send_file(
    objects: &dyn ObjectStore,
    export: &ExportConfig,
    regime_slug: &str,
    kind: FileKind,
    path: &Path,
) -> ChargingResult<String> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ChargingError::Upload(format!("no file name in {}", path.display())))?;
    let key = export_key(regime_slug, kind, filename);

    let result = fs::read(path).map_err(ChargingError::from).and_then(|bytes| {
        objects.put(&export.bucket, &key, &bytes)?;
        if export.copy_to_archive {
            objects.put(&export.archive_bucket, &key, &bytes)?;
        }
        Ok(())
    });

    if let Err(e) = fs::remove_file(path) {
        log::warn!("could not remove temp file: path={} error={e}", path.display());
    }

    result?;
    log::info!("file uploaded: bucket={} key={key}", export.bucket);
    Ok(key)
}
