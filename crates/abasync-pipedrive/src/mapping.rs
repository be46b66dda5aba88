//! File-backed store of field mappings and sync settings, one pair of JSON
//! files per company.

use abasync_core::{EntityKind, FieldMapping, SyncSettings};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{PipedriveError, PipedriveResult};

/// A mapping together with its position in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedMapping {
    pub index: usize,
    #[serde(flatten)]
    pub mapping: FieldMapping,
}

/// Mappings split by target entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingsByEntity {
    pub organization: Vec<IndexedMapping>,
    pub person: Vec<IndexedMapping>,
    pub deal: Vec<IndexedMapping>,
}

#[derive(Debug, Default)]
struct StoreState {
    mappings: Vec<FieldMapping>,
    settings: SyncSettings,
}

#[derive(Debug)]
pub struct MappingStore {
    mappings_path: PathBuf,
    settings_path: PathBuf,
    state: RwLock<StoreState>,
}

impl MappingStore {
    /// Opens the store of `company` under `dir`, creating the directory.
    ///
    /// Missing or unreadable files are replaced with defaults (no mappings,
    /// all settings on) and written back.
    pub fn open(dir: impl AsRef<Path>, company: &str) -> PipedriveResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| storage_error(dir, &e))?;

        let mappings_path = dir.join(format!("{company}_field_mappings.json"));
        let settings_path = dir.join(format!("{company}_sync_settings.json"));

        let mappings: Vec<FieldMapping> = load_or_default(&mappings_path)?;
        let settings: SyncSettings = load_or_default(&settings_path)?;
        info!(
            company,
            mappings = mappings.len(),
            path = %mappings_path.display(),
            "Loaded field mappings"
        );

        Ok(Self {
            mappings_path,
            settings_path,
            state: RwLock::new(StoreState { mappings, settings }),
        })
    }

    pub async fn mappings(&self) -> Vec<FieldMapping> {
        self.state.read().await.mappings.clone()
    }

    pub async fn mappings_for(&self, entity: EntityKind) -> Vec<FieldMapping> {
        self.state
            .read()
            .await
            .mappings
            .iter()
            .filter(|m| m.entity == entity)
            .cloned()
            .collect()
    }

    pub async fn mappings_by_entity(&self) -> MappingsByEntity {
        let state = self.state.read().await;
        let mut grouped = MappingsByEntity::default();
        for (index, mapping) in state.mappings.iter().enumerate() {
            let bucket = match mapping.entity {
                EntityKind::Organization => &mut grouped.organization,
                EntityKind::Person => &mut grouped.person,
                EntityKind::Deal => &mut grouped.deal,
            };
            bucket.push(IndexedMapping {
                index,
                mapping: mapping.clone(),
            });
        }
        grouped
    }

    pub async fn settings(&self) -> SyncSettings {
        self.state.read().await.settings
    }

    /// Appends a mapping and returns its index.
    pub async fn add_mapping(&self, mapping: FieldMapping) -> PipedriveResult<usize> {
        let mut state = self.state.write().await;
        ensure_unique(&state.mappings, &mapping, None)?;

        let mut mappings = state.mappings.clone();
        mappings.push(mapping);
        save_json(&self.mappings_path, &mappings).await?;
        state.mappings = mappings;
        Ok(state.mappings.len() - 1)
    }

    /// Replaces the mapping at `index`.
    pub async fn update_mapping(&self, index: usize, mapping: FieldMapping) -> PipedriveResult<()> {
        let mut state = self.state.write().await;
        if index >= state.mappings.len() {
            return Err(PipedriveError::MappingNotFound(index));
        }
        ensure_unique(&state.mappings, &mapping, Some(index))?;

        let mut mappings = state.mappings.clone();
        mappings[index] = mapping;
        save_json(&self.mappings_path, &mappings).await?;
        state.mappings = mappings;
        Ok(())
    }

    /// Removes and returns the mapping at `index`. Later indices shift down.
    pub async fn delete_mapping(&self, index: usize) -> PipedriveResult<FieldMapping> {
        let mut state = self.state.write().await;
        if index >= state.mappings.len() {
            return Err(PipedriveError::MappingNotFound(index));
        }

        let mut mappings = state.mappings.clone();
        let removed = mappings.remove(index);
        save_json(&self.mappings_path, &mappings).await?;
        state.mappings = mappings;
        Ok(removed)
    }

    pub async fn update_settings(&self, settings: SyncSettings) -> PipedriveResult<()> {
        let mut state = self.state.write().await;
        save_json(&self.settings_path, &settings).await?;
        state.settings = settings;
        Ok(())
    }
}

fn ensure_unique(
    mappings: &[FieldMapping],
    candidate: &FieldMapping,
    skip: Option<usize>,
) -> PipedriveResult<()> {
    let duplicate = mappings.iter().enumerate().any(|(i, m)| {
        Some(i) != skip && m.entity == candidate.entity && m.source == candidate.source
    });
    if duplicate {
        return Err(PipedriveError::DuplicateMapping {
            source_field: candidate.source.clone(),
            entity: candidate.entity,
        });
    }
    Ok(())
}

fn load_or_default<T>(path: &Path) -> PipedriveResult<T>
where
    T: DeserializeOwned + Serialize + Default,
{
    let loaded = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str::<T>(&raw).map_err(|e| e.to_string()));

    match loaded {
        Ok(value) => Ok(value),
        Err(reason) => {
            if path.exists() {
                warn!(path = %path.display(), %reason, "Replacing unreadable file with defaults");
            }
            let value = T::default();
            write_json(path, &value)?;
            Ok(value)
        }
    }
}

/// Startup write, before the runtime serves requests.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> PipedriveResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|e| storage_error(path, &e))
}

async fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> PipedriveResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| storage_error(path, &e))
}

fn storage_error(path: &Path, err: &std::io::Error) -> PipedriveError {
    PipedriveError::Storage {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
