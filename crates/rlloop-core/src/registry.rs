//! Model generation registry backed by the models directory.
//!
//! The training pipeline checkpoints each generation as
//! `<models>/<NNNNNN>-<name>.meta` (plus weight files this module ignores).
//! Any `.meta` file that does not follow that convention fails the scan with
//! [`LoopError::CorruptRegistry`]; non-`.meta` files are not registry entries.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LoopError, Result};
use crate::obs::emit_registry_scanned;

/// Extension of checkpoint metadata files.
pub const MODEL_META_EXTENSION: &str = "meta";

/// Name used before the first checkpoint exists.
pub const BOOTSTRAP_MODEL_NAME: &str = "000000-bootstrap";

fn meta_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<name>(?P<number>\d+)-[^.]+)\.meta$").expect("static pattern is valid")
    })
}

/// One trained model checkpoint.
///
/// Field order matters: the derived `Ord` sorts by `number`, then `name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelGeneration {
    pub number: u64,
    pub name: String,
}

impl ModelGeneration {
    /// The cold-start sentinel `{0, "000000-bootstrap"}`.
    pub fn bootstrap() -> Self {
        Self {
            number: 0,
            name: BOOTSTRAP_MODEL_NAME.to_string(),
        }
    }

    /// Parse a metadata file name such as `000013-mid.meta`.
    pub fn parse(file_name: &str) -> std::result::Result<Self, String> {
        let caps = meta_file_pattern()
            .captures(file_name)
            .ok_or_else(|| format!("expected <number>-<name>.{MODEL_META_EXTENSION}"))?;
        let number = caps["number"]
            .parse::<u64>()
            .map_err(|e| format!("generation number out of range: {e}"))?;
        Ok(Self {
            number,
            name: caps["name"].to_string(),
        })
    }
}

impl fmt::Display for ModelGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Read-only view of the model checkpoints under one directory.
pub struct ModelRegistry {
    models_dir: PathBuf,
}

impl ModelRegistry {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// All generations, ascending by `(number, name)`.
    ///
    /// A missing models directory is an empty registry.
    pub fn list_models(&self) -> Result<Vec<ModelGeneration>> {
        let entries = match fs::read_dir(&self.models_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                emit_registry_scanned(&self.models_dir, 0);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut models = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(MODEL_META_EXTENSION)
            {
                continue;
            }
            let file_name = entry.file_name();
            let file_name = file_name.to_str().ok_or_else(|| LoopError::CorruptRegistry {
                path: path.clone(),
                reason: "file name is not valid UTF-8".to_string(),
            })?;
            let model = ModelGeneration::parse(file_name)
                .map_err(|reason| LoopError::CorruptRegistry { path, reason })?;
            models.push(model);
        }
        models.sort();

        emit_registry_scanned(&self.models_dir, models.len());
        Ok(models)
    }

    /// The newest generation, or the bootstrap sentinel when none exist.
    pub fn get_latest_model(&self) -> Result<ModelGeneration> {
        Ok(self
            .list_models()?
            .pop()
            .unwrap_or_else(ModelGeneration::bootstrap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_registry(files: &[&str]) -> (tempfile::TempDir, ModelRegistry) {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            fs::write(dir.path().join(file), b"").unwrap();
        }
        let registry = ModelRegistry::new(dir.path());
        (dir, registry)
    }

    #[test]
    fn parse_valid_name() {
        let model = ModelGeneration::parse("000013-modelname.meta").unwrap();
        assert_eq!(model.number, 13);
        assert_eq!(model.name, "000013-modelname");
        assert_eq!(model.to_string(), "000013-modelname");
    }

    #[test]
    fn parse_rejects_nonconforming_names() {
        assert!(ModelGeneration::parse("modelname.meta").is_err());
        assert!(ModelGeneration::parse("000013.meta").is_err());
        assert!(ModelGeneration::parse("000013-.meta").is_err());
        assert!(ModelGeneration::parse("000013-name.index").is_err());
        assert!(ModelGeneration::parse("99999999999999999999999-big.meta").is_err());
    }

    #[test]
    fn bootstrap_sentinel() {
        let model = ModelGeneration::bootstrap();
        assert_eq!(model.number, 0);
        assert_eq!(model.name, "000000-bootstrap");
    }

    #[test]
    fn ordering_breaks_ties_on_name() {
        let mut models = vec![
            ModelGeneration {
                number: 2,
                name: "000002-b".to_string(),
            },
            ModelGeneration {
                number: 1,
                name: "000001-z".to_string(),
            },
            ModelGeneration {
                number: 2,
                name: "000002-a".to_string(),
            },
        ];
        models.sort();
        let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["000001-z", "000002-a", "000002-b"]);
    }

    #[test]
    fn list_sorted_by_generation_not_lexically() {
        let (_dir, registry) = make_registry(&["12-late.meta", "3-early.meta", "7-mid.meta"]);
        let numbers: Vec<_> = registry
            .list_models()
            .unwrap()
            .into_iter()
            .map(|m| m.number)
            .collect();
        assert_eq!(numbers, vec![3, 7, 12]);
    }

    #[test]
    fn list_ignores_non_meta_files() {
        let (dir, registry) = make_registry(&[
            "000001-a.meta",
            "000001-a.index",
            "000001-a.data-00000-of-00001",
            "checkpoint",
        ]);
        fs::create_dir(dir.path().join("000002-dir.meta")).unwrap();
        let models = registry.list_models().unwrap();
        assert_eq!(
            models,
            vec![ModelGeneration {
                number: 1,
                name: "000001-a".to_string()
            }]
        );
    }

    #[test]
    fn list_fails_on_corrupt_meta() {
        let (_dir, registry) = make_registry(&["000001-a.meta", "garbage.meta"]);
        match registry.list_models() {
            Err(LoopError::CorruptRegistry { path, .. }) => {
                assert!(path.ends_with("garbage.meta"));
            }
            other => panic!("expected CorruptRegistry, got {other:?}"),
        }
    }

    #[test]
    fn missing_dir_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().join("models"));
        assert!(registry.list_models().unwrap().is_empty());
        assert_eq!(registry.get_latest_model().unwrap(), ModelGeneration::bootstrap());
    }

    #[test]
    fn latest_on_empty_registry_is_bootstrap() {
        let (_dir, registry) = make_registry(&[]);
        assert_eq!(registry.get_latest_model().unwrap(), ModelGeneration::bootstrap());
    }

    #[test]
    fn latest_picks_highest_generation() {
        let (_dir, registry) = make_registry(&["000012-c.meta", "000003-a.meta", "000007-b.meta"]);
        let latest = registry.get_latest_model().unwrap();
        assert_eq!(latest.number, 12);
        assert_eq!(latest.name, "000012-c");
    }
}
