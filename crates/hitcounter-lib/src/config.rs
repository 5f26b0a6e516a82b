//! Application configuration.
//!
//! Configuration is a `cdk.json`-style JSON document. Every field is optional;
//! anything missing takes the workshop default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::iam::PolicyCatalog;
use crate::lambda::Runtime;
use crate::props::StackProps;
use crate::table_viewer::DEFAULT_VIEWER_ASSET;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "HITCOUNTER_CONFIG";
pub const DEFAULT_STACK_NAME: &str = "CdkWorkshopStack";
pub const DEFAULT_ASSET_PATH: &str = "lambda";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct AppConfig {
    pub stack_name: String,
    /// Code directory for the downstream and hit-counter handlers.
    pub asset_path: PathBuf,
    /// Code directory for the table viewer renderer.
    pub viewer_asset_path: PathBuf,
    pub runtime: Runtime,
    /// Managed policies available in the target account.
    pub policies: PolicyCatalog,
    /// Caller stack properties, merged over the default tags.
    pub props: StackProps,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            asset_path: PathBuf::from(DEFAULT_ASSET_PATH),
            viewer_asset_path: PathBuf::from(DEFAULT_VIEWER_ASSET),
            runtime: Runtime::default(),
            policies: PolicyCatalog::default(),
            props: StackProps::default(),
        }
    }
}

impl AppConfig {
    /// Load and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| Error::ConfigLoad {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let config: AppConfig = serde_json::from_str(&raw).map_err(|err| Error::ConfigLoad {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        config.validate()?;
        debug!(path = %path.display(), stack = %config.stack_name, "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration from an explicit path, then `HITCOUNTER_CONFIG`,
    /// then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::from_path(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.stack_name.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "stackName must not be empty".to_string(),
            });
        }
        for (field, path) in [
            ("assetPath", &self.asset_path),
            ("viewerAssetPath", &self.viewer_asset_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(Error::InvalidConfig {
                    message: format!("{field} must not be empty"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"stackName":"Other"}"#).unwrap();
        assert_eq!(config.stack_name, "Other");
        assert_eq!(config.asset_path, PathBuf::from(DEFAULT_ASSET_PATH));
        assert_eq!(config.policies, PolicyCatalog::default());
        assert_eq!(config.runtime, Runtime::Nodejs8_10);
    }

    #[test]
    fn parses_runtime_and_policies() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "runtime": "nodejs18.x",
                "policies": {"customerManaged": ["a"], "awsManaged": ["b"]}
            }"#,
        )
        .unwrap();
        assert_eq!(config.runtime, Runtime::Nodejs18x);
        assert!(config.policies.customer_managed.contains("a"));
        assert!(config.policies.aws_managed.contains("b"));
    }

    #[test]
    fn rejects_unknown_runtime_and_fields() {
        assert!(serde_json::from_str::<AppConfig>(r#"{"runtime":"cobol"}"#).is_err());
        assert!(serde_json::from_str::<AppConfig>(r#"{"stackname":"x"}"#).is_err());
    }

    #[test]
    fn from_path_reports_file_on_parse_error() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "{{not json").expect("write config");
        match AppConfig::from_path(file.path()) {
            Err(Error::ConfigLoad { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected config load error, got {other:?}"),
        }
    }

    #[test]
    fn empty_stack_name_is_invalid() {
        let config = AppConfig {
            stack_name: " ".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }
}
