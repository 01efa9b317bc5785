use std::fs;

use serde_json::Value;

use super::{ModuleFile, ModuleSource};
use crate::error::BootstrapError;

/// Parses each scanned file as a JSON document.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFileSource;

impl ModuleSource for JsonFileSource {
    type Unit = Value;

    fn load(&self, file: &ModuleFile) -> Result<Option<Value>, BootstrapError> {
        let raw = fs::read_to_string(&file.path).map_err(|e| BootstrapError::load(&file.path, e))?;
        let value = serde_json::from_str(&raw).map_err(|e| BootstrapError::load(&file.path, e))?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let file = ModuleFile {
            path: path.clone(),
            relative: "broken.json".to_string(),
            properties: vec!["broken".to_string()],
        };
        let err = JsonFileSource.load(&file).unwrap_err();
        assert!(matches!(err, BootstrapError::Load { path: p, .. } if p == path));
    }
}
