use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::MIN_ITERATIONS;
use crate::crypto::KdfParams;
use crate::errors::{Result, VaultError};
use crate::store::VaultLayout;

/// Project-level configuration, loaded from `.passvault.toml`.
///
/// Every field has a sensible default so PassVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) holding the vault.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// PBKDF2 iteration count for new credentials and collection secrets.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// How far ahead `card expiring` looks, in days.
    #[serde(default = "default_expiry_warning_days")]
    pub expiry_warning_days: i64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_dir() -> String {
    ".passvault".to_string()
}

fn default_kdf_iterations() -> u32 {
    KdfParams::default().iterations
}

fn default_expiry_warning_days() -> i64 {
    30
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            kdf_iterations: default_kdf_iterations(),
            expiry_warning_days: default_expiry_warning_days(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".passvault.toml";

    /// Load settings from `<project_dir>/.passvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.kdf_iterations < MIN_ITERATIONS {
            return Err(VaultError::Config(format!(
                "kdf_iterations must be at least {MIN_ITERATIONS} (got {})",
                settings.kdf_iterations
            )));
        }

        Ok(settings)
    }

    /// Layout of the vault directory under `project_dir`.
    ///
    /// Example: `project_dir/.passvault/store/vault.json`
    pub fn layout(&self, project_dir: &Path) -> VaultLayout {
        VaultLayout::new(project_dir.join(&self.vault_dir))
    }

    /// Work factor for newly created verifiers.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            iterations: self.kdf_iterations,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.vault_dir, ".passvault");
        assert_eq!(s.kdf_iterations, 100_000);
        assert_eq!(s.expiry_warning_days, 30);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_dir, ".passvault");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
vault_dir = "secrets"
kdf_iterations = 200000
expiry_warning_days = 60
"#;
        fs::write(tmp.path().join(".passvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_dir, "secrets");
        assert_eq!(settings.kdf_params().iterations, 200_000);
        assert_eq!(settings.expiry_warning_days, 60);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".passvault.toml"), "kdf_iterations = 10000\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.kdf_iterations, 10_000);
        assert_eq!(settings.vault_dir, ".passvault");
    }

    #[test]
    fn load_rejects_weak_work_factor() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".passvault.toml"), "kdf_iterations = 1000\n").unwrap();
        assert!(matches!(Settings::load(tmp.path()), Err(VaultError::Config(_))));
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".passvault.toml"), "not valid {{toml").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn layout_respects_custom_vault_dir() {
        let s = Settings {
            vault_dir: "secrets".to_string(),
            ..Settings::default()
        };
        let layout = s.layout(Path::new("/home/user/project"));
        assert_eq!(
            layout.document_path(),
            PathBuf::from("/home/user/project/secrets/store/vault.json")
        );
    }
}
