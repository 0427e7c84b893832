//! Assistant catalog: every profile the server can start a session for

use super::document::ProfileDocument;
use super::{AssistantProfile, ScriptValidationError};
use crate::actions::ActionRegistry;
use rust_embed::Embed;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Profiles compiled into the binary
#[derive(Embed)]
#[folder = "assistants/"]
struct BuiltinProfiles;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse profile '{origin}': {source}")]
    Parse {
        origin: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ScriptValidationError),
    #[error("Duplicate assistant name '{0}'")]
    Duplicate(String),
    #[error("Assistant '{assistant}' references unhandled action '{action}'")]
    UnhandledAction { assistant: String, action: String },
    #[error("No assistant profiles found")]
    Empty,
}

/// Validated profiles keyed by assistant name
#[derive(Debug, Clone)]
pub struct AssistantCatalog {
    profiles: BTreeMap<String, Arc<AssistantProfile>>,
}

impl AssistantCatalog {
    pub fn from_profiles(profiles: impl IntoIterator<Item = AssistantProfile>) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for profile in profiles {
            if map.contains_key(&profile.name) {
                return Err(CatalogError::Duplicate(profile.name));
            }
            map.insert(profile.name.clone(), Arc::new(profile));
        }
        if map.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { profiles: map })
    }

    /// The profiles shipped with the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        let mut profiles = Vec::new();
        for file in BuiltinProfiles::iter().filter(|f| f.ends_with(".json")) {
            let Some(content) = BuiltinProfiles::get(&file) else {
                continue;
            };
            profiles.push(parse_profile(&file, &content.data)?);
        }
        tracing::debug!(count = profiles.len(), "Loaded built-in assistant profiles");
        Self::from_profiles(profiles)
    }

    /// Every `*.json` file in `dir`, in file-name order
    pub fn from_dir(dir: &Path) -> Result<Self, CatalogError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| CatalogError::Io { path, source }
        };

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_err(dir))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut profiles = Vec::with_capacity(paths.len());
        for path in &paths {
            let bytes = std::fs::read(path).map_err(io_err(path))?;
            profiles.push(parse_profile(&path.display().to_string(), &bytes)?);
        }
        tracing::info!(dir = %dir.display(), count = profiles.len(), "Loaded assistant profiles");
        Self::from_profiles(profiles)
    }

    /// Fail if any script offers an action the registry cannot open
    pub fn check_actions(&self, registry: &ActionRegistry) -> Result<(), CatalogError> {
        for profile in self.profiles.values() {
            if let Some(action) = profile
                .script
                .action_keys()
                .into_iter()
                .find(|key| !registry.contains(key))
            {
                return Err(CatalogError::UnhandledAction {
                    assistant: profile.name.clone(),
                    action: action.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<AssistantProfile>> {
        self.profiles.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssistantProfile> {
        self.profiles.values().map(AsRef::as_ref)
    }
}

fn parse_profile(origin: &str, bytes: &[u8]) -> Result<AssistantProfile, CatalogError> {
    let doc: ProfileDocument = serde_json::from_slice(bytes).map_err(|source| CatalogError::Parse {
        origin: origin.to_string(),
        source,
    })?;
    Ok(AssistantProfile::from_document(doc)?)
}
