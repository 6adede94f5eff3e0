//! Attack definition loading.
//!
//! This module provides:
//! - Loading attacks from assets/attacks/*.toml (`[[attacks]]` tables)
//! - Validation on load, so the state machine only ever sees valid data
//! - An attack library with lookup by ID and case-insensitive name

use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use vanguard_common::{SchemaVersion, VersionParseError};

use crate::definition::{AttackDefinition, DefinitionError};

/// Default asset path for attacks.
pub const DEFAULT_ATTACK_PATH: &str = "assets/attacks";

/// Errors that can occur during attack loading.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Directory or file not found.
    #[error("Attack path not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read attack file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse attack TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// File declares a malformed version.
    #[error("Invalid attack file version: {0}")]
    VersionError(#[from] VersionParseError),

    /// File was written for an incompatible schema.
    #[error("Unsupported attack file version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: SchemaVersion,
        /// Version this build reads.
        expected: SchemaVersion,
    },

    /// Definition failed validation.
    #[error("Attack validation error: {0}")]
    ValidationError(#[from] DefinitionError),

    /// Duplicate attack ID.
    #[error("Duplicate attack ID: {0}")]
    DuplicateId(u32),

    /// Two attacks share a name (names are case-insensitive).
    #[error("Duplicate attack name: {0}")]
    DuplicateName(String),
}

/// Result type for attack loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// A collection of attacks from a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackFile {
    /// File format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Attacks in this file.
    #[serde(default)]
    pub attacks: Vec<AttackDefinition>,
}

fn default_version() -> String {
    SchemaVersion::ATTACK_DEFINITIONS.to_string()
}

/// Validated attack definitions.
#[derive(Debug, Default)]
pub struct AttackLibrary {
    /// Attacks by ID.
    by_id: AHashMap<u32, AttackDefinition>,
    /// Attack IDs by name (lowercase).
    by_name: AHashMap<String, u32>,
}

impl AttackLibrary {
    /// Creates a new empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered attacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Validates and registers an attack.
    pub fn register(&mut self, attack: AttackDefinition) -> LoadResult<()> {
        attack.validate()?;
        if self.by_id.contains_key(&attack.id) {
            return Err(LoadError::DuplicateId(attack.id));
        }
        let key = attack.name.to_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(LoadError::DuplicateName(attack.name));
        }

        self.by_name.insert(key, attack.id);
        self.by_id.insert(attack.id, attack);
        Ok(())
    }

    /// Gets an attack by ID.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&AttackDefinition> {
        self.by_id.get(&id)
    }

    /// Gets an attack by name (case-insensitive).
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&AttackDefinition> {
        self.by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.by_id.get(id))
    }

    /// Returns all attacks sorted by ID.
    #[must_use]
    pub fn sorted(&self) -> Vec<&AttackDefinition> {
        let mut attacks: Vec<_> = self.by_id.values().collect();
        attacks.sort_by_key(|a| a.id);
        attacks
    }

    /// Clears the library.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_name.clear();
    }

    /// Loads attacks from TOML text. Returns how many were added.
    pub fn load_str(&mut self, content: &str) -> LoadResult<usize> {
        let file: AttackFile = toml::from_str(content)?;

        let found: SchemaVersion = file.version.parse()?;
        let expected = SchemaVersion::ATTACK_DEFINITIONS;
        if !expected.can_read(&found) {
            return Err(LoadError::UnsupportedVersion { found, expected });
        }

        let mut count = 0;
        for attack in file.attacks {
            self.register(attack)?;
            count += 1;
        }
        Ok(count)
    }

    /// Loads attacks from a single file.
    pub fn load_file(&mut self, path: &Path) -> LoadResult<usize> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        self.load_str(&content)
    }

    /// Loads every `*.toml` file in a directory, in file name order.
    ///
    /// Files that fail to load are logged and skipped.
    pub fn load_dir(&mut self, dir: &Path) -> LoadResult<usize> {
        if !dir.is_dir() {
            return Err(LoadError::NotFound(dir.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                files.push(path);
            }
        }
        files.sort();

        let mut count = 0;
        for file_path in files {
            match self.load_file(&file_path) {
                Ok(n) => {
                    count += n;
                    debug!("Loaded {} attacks from {:?}", n, file_path);
                },
                Err(e) => {
                    warn!("Failed to load attack file {:?}: {}", file_path, e);
                },
            }
        }

        info!("Loaded {} attacks total", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
        version = "1.0.0"

        [[attacks]]
        id = 1
        name = "Slash"
        damage = 10.0
        range = 0.5
        attack_rate = 2.0

        [[attacks]]
        id = 2
        name = "Ground Slam"
        damage = 25.0
        attack_rate = 0.5
        windup_time = 0.4
        is_area_attack = true
        area_radius = 1.5
        has_knockback = true
    "#;

    #[test]
    fn test_load_str() {
        let mut library = AttackLibrary::new();
        assert_eq!(library.load_str(SAMPLE).expect("valid file"), 2);

        let slam = library.get(2).expect("slam registered");
        assert!(slam.is_area_attack);
        assert!((slam.windup_time - 0.4).abs() < f32::EPSILON);
        assert_eq!(library.get_by_name("SLASH").map(|a| a.id), Some(1));
        assert!(library.get_by_name("kick").is_none());
        assert_eq!(
            library.sorted().iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut library = AttackLibrary::new();
        library.load_str(SAMPLE).expect("valid file");
        let err = library
            .register(AttackDefinition::new(1, "Other"))
            .expect_err("duplicate");
        assert!(matches!(err, LoadError::DuplicateId(1)));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut library = AttackLibrary::new();
        library.load_str(SAMPLE).expect("valid file");
        let original = library.get_by_name("slash").map(|a| a.id);

        let err = library
            .register(AttackDefinition::new(9, "SLASH"))
            .expect_err("duplicate");
        assert!(matches!(err, LoadError::DuplicateName(ref name) if name == "SLASH"));
        assert!(library.get(9).is_none());
        assert_eq!(library.get_by_name("Slash").map(|a| a.id), original);
    }

    #[test]
    fn test_invalid_definition_rejected() {
        let mut library = AttackLibrary::new();
        let err = library
            .load_str("[[attacks]]\nid = 3\nname = \"Broken\"\ndamage = 1.0\nattack_rate = 0.0\n")
            .expect_err("invalid rate");
        assert!(matches!(
            err,
            LoadError::ValidationError(DefinitionError::NonPositiveAttackRate { .. })
        ));
        assert!(library.is_empty());
    }

    #[test]
    fn test_unsupported_version() {
        let mut library = AttackLibrary::new();
        let err = library
            .load_str("version = \"2.0\"\n")
            .expect_err("major mismatch");
        assert!(matches!(err, LoadError::UnsupportedVersion { .. }));

        let err = library
            .load_str("version = \"one\"\n")
            .expect_err("unparseable");
        assert!(matches!(err, LoadError::VersionError(_)));
    }

    #[test]
    fn test_load_dir_skips_bad_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("a_basic.toml"), SAMPLE).expect("write");
        fs::write(temp_dir.path().join("b_broken.toml"), "attacks = 3").expect("write");
        fs::write(temp_dir.path().join("notes.txt"), "ignored").expect("write");

        let mut library = AttackLibrary::new();
        assert_eq!(library.load_dir(temp_dir.path()).expect("dir exists"), 2);
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_missing_paths() {
        let mut library = AttackLibrary::new();
        assert!(matches!(
            library.load_dir(Path::new("/nonexistent/attacks")),
            Err(LoadError::NotFound(_))
        ));
        assert!(matches!(
            library.load_file(Path::new("/nonexistent/attacks/a.toml")),
            Err(LoadError::NotFound(_))
        ));
    }
}
