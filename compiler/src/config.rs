//! Compiler configuration.
//!
//! Read from `adlc.json` in the working directory when present. Every field
//! is optional:
//!
//! ```json
//! {
//!   "searchPath": ["adl", "vendor/adl"],
//!   "outputDir": "generated",
//!   "targets": {
//!     "rust": { "moduleRoot": "crate::adl" },
//!     "typescript": { "includeAst": false }
//!   }
//! }
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{emit::{self, EmitOptions}, error::AdlError};

pub const CONFIG_FILE: &str = "adlc.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Directories searched for `a/b.adl` when module `a.b` is needed.
    pub search_path: Vec<PathBuf>,
    pub output_dir:  PathBuf,
    /// Enabled targets by emitter name.
    pub targets:     BTreeMap<String, EmitOptions>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            search_path: vec![PathBuf::from(".")],
            output_dir:  PathBuf::from("generated"),
            targets:     BTreeMap::from([("rust".to_string(), EmitOptions::default())]),
        }
    }
}

impl CompilerConfig {
    pub fn load_file(path: &Path) -> Result<Self, AdlError> {
        let text = std::fs::read_to_string(path)?;
        let config: CompilerConfig = serde_json::from_str(&text)
            .map_err(|e| AdlError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads `adlc.json` from `dir`, or the defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self, AdlError> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::load_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Enables `target` with default options unless it is already configured.
    pub fn enable_target(&mut self, target: &str) {
        self.targets.entry(target.to_string()).or_default();
    }

    pub fn validate(&self) -> Result<(), AdlError> {
        if self.targets.is_empty() {
            return Err(AdlError::Config("no targets configured".to_string()));
        }
        if self.search_path.is_empty() {
            return Err(AdlError::Config("search path is empty".to_string()));
        }
        for name in self.targets.keys() {
            emit::emitter(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.search_path, vec![PathBuf::from(".")]);
        assert!(config.targets.contains_key("rust"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_discover_reads_file() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILE)).unwrap();
        write!(
            file,
            r#"{{"searchPath": ["adl"], "targets": {{"typescript": {{"includeAst": false}}}}}}"#
        )
        .unwrap();

        let config = CompilerConfig::discover(dir.path()).unwrap();
        assert_eq!(config.search_path, vec![PathBuf::from("adl")]);
        assert_eq!(config.output_dir, PathBuf::from("generated"));
        assert_eq!(config.targets.len(), 1);
        assert!(!config.targets["typescript"].include_ast);
    }

    #[test]
    fn test_discover_without_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(CompilerConfig::discover(dir.path()).unwrap(), CompilerConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{\"searchPath\": 3}").unwrap();
        assert!(matches!(CompilerConfig::discover(dir.path()), Err(AdlError::Config(_))));

        let mut config = CompilerConfig::default();
        config.enable_target("cobol");
        assert!(matches!(config.validate(), Err(AdlError::UnknownTarget(_))));

        config.targets.clear();
        assert!(matches!(config.validate(), Err(AdlError::Config(_))));
    }
}
