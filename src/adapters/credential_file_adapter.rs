//! JSON credential store: a flat object of key → token, as the web portal
//! leaves behind in its local storage export.

use std::collections::HashMap;
use std::path::Path;

use crate::domain::error::GridError;
use crate::ports::credential_port::CredentialStore;

#[derive(Debug, Clone, Default)]
pub struct CredentialFileAdapter {
    entries: HashMap<String, String>,
}

impl CredentialFileAdapter {
    /// Read the store at `path`. A missing file is an empty store.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).map_err(|e| GridError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no credential store at {}", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(GridError::Io(e)),
        }
    }

    /// Parse a JSON object. Non-string values are kept in their JSON text
    /// form so numeric tokens still resolve.
    pub fn from_json(contents: &str) -> Result<Self, GridError> {
        let value: serde_json::Value = serde_json::from_str(contents).map_err(|e| GridError::Parse {
            reason: e.to_string(),
        })?;
        let object = value.as_object().ok_or_else(|| GridError::Parse {
            reason: "credential store must be a JSON object".to_string(),
        })?;

        let entries = object
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let text = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), text)
            })
            .collect();
        Ok(Self { entries })
    }
}

impl CredentialStore for CredentialFileAdapter {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}
