//! Filesystem-backed content provider and volume catalog
//!
//! `content://<authority>/<segments>` maps onto `mounts[authority]/<segments>`.
//! `file://` handles map onto themselves. Row-id filters address a child of
//! the mapped directory.

use super::{
    ContentProvider, DATA_COLUMN, DISPLAY_NAME_COLUMN, ID_COLUMN, LAST_MODIFIED_COLUMN, ProviderError,
    RowFilter, SIZE_COLUMN, StorageVolume, VolumeCatalog,
};
use crate::config::PickrConfig;
use crate::handle::ContentHandle;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

/// Serves content handles from mounted directories
#[derive(Debug, Clone, Default)]
pub struct MountedProvider {
    mounts: BTreeMap<String, PathBuf>,
    data_column: Vec<String>,
}

impl MountedProvider {
    #[must_use]
    pub const fn new(mounts: BTreeMap<String, PathBuf>, data_column: Vec<String>) -> Self {
        Self {
            mounts,
            data_column,
        }
    }

    #[must_use]
    pub fn from_config(config: &PickrConfig) -> Self {
        Self::new(config.mounts.clone(), config.data_column.clone())
    }

    /// The file backing a handle
    ///
    /// # Errors
    ///
    /// `ProviderError::Unsupported` for unmounted authorities or paths that
    /// escape their mount.
    pub fn locate(&self, handle: &ContentHandle, filter: Option<&RowFilter>) -> Result<PathBuf, ProviderError> {
        let base = if let Some(path) = handle.file_path() {
            path
        } else if handle.is_content() {
            let root = self.mount(handle.authority())?;
            let mut path = root.to_path_buf();
            for segment in handle.segments() {
                push_relative(&mut path, &segment, handle)?;
            }
            path
        } else {
            return Err(ProviderError::Unsupported(handle.to_string()));
        };

        match filter {
            None => Ok(base),
            Some(filter) if filter.column == ID_COLUMN => {
                let mut path = base;
                push_relative(&mut path, &filter.value, handle)?;
                Ok(path)
            }
            Some(filter) => Err(ProviderError::Query(format!(
                "cannot filter on column '{}'",
                filter.column
            ))),
        }
    }

    fn mount(&self, authority: &str) -> Result<&Path, ProviderError> {
        self.mounts
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(authority))
            .map(|(_, root)| root.as_path())
            .ok_or_else(|| ProviderError::Unsupported(format!("no mount for authority '{authority}'")))
    }

    fn exposes_data(&self, handle: &ContentHandle) -> bool {
        handle.is_file()
            || self
                .data_column
                .iter()
                .any(|authority| authority.eq_ignore_ascii_case(handle.authority()))
    }
}

fn push_relative(path: &mut PathBuf, segment: &str, handle: &ContentHandle) -> Result<(), ProviderError> {
    for component in Path::new(segment).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ProviderError::Unsupported(format!(
                    "{handle} escapes its mount"
                )));
            }
        }
    }
    Ok(())
}

impl ContentProvider for MountedProvider {
    fn open_read(&self, handle: &ContentHandle) -> Result<Box<dyn Read + Send>, ProviderError> {
        let path = self.locate(handle, None)?;
        if !path.is_file() {
            return Err(ProviderError::NotFound(handle.to_string()));
        }
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ProviderError::NotFound(handle.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn query_column(
        &self,
        handle: &ContentHandle,
        column: &str,
        filter: Option<&RowFilter>,
    ) -> Result<Option<String>, ProviderError> {
        let path = self.locate(handle, filter)?;
        let Ok(metadata) = fs::metadata(&path) else {
            return Ok(None);
        };

        let value = match column {
            DISPLAY_NAME_COLUMN => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            SIZE_COLUMN => Some(metadata.len().to_string()),
            LAST_MODIFIED_COLUMN => metadata
                .modified()
                .ok()
                .map(|t| DateTime::<Utc>::from(t).timestamp_millis().to_string()),
            DATA_COLUMN if self.exposes_data(handle) => Some(path.to_string_lossy().into_owned()),
            _ => None,
        };
        Ok(value)
    }
}

/// Volumes taken from the configuration
#[derive(Debug, Clone)]
pub struct ConfiguredVolumes {
    primary: PathBuf,
    secondary: BTreeMap<String, PathBuf>,
}

impl ConfiguredVolumes {
    pub fn new(primary: impl Into<PathBuf>, secondary: BTreeMap<String, PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            secondary,
        }
    }

    #[must_use]
    pub fn from_config(config: &PickrConfig) -> Self {
        Self::new(config.primary_volume.clone(), config.volumes.clone())
    }
}

impl VolumeCatalog for ConfiguredVolumes {
    fn volumes(&self) -> Result<Vec<StorageVolume>, ProviderError> {
        let mut volumes = vec![StorageVolume::primary(self.primary.clone())];
        volumes.extend(
            self.secondary
                .iter()
                .map(|(uuid, root)| StorageVolume::secondary(uuid.clone(), root.clone())),
        );
        Ok(volumes)
    }
}
