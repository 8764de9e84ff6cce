use crate::error::{HelpdeskError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Where tickets live. `file` keeps YAML manifests under `.helpdesk/tickets`,
/// `http` talks to a running helpdesk server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    #[default]
    File,
    Http {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        /// Name of the environment variable holding a bearer token.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_env: Option<String>,
    },
}

impl StoreConfig {
    /// Bearer token resolved from the configured environment variable.
    pub fn token(&self) -> Option<String> {
        match self {
            StoreConfig::Http {
                token_env: Some(var),
                ..
            } => std::env::var(var).ok().filter(|t| !t.is_empty()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Environment variable holding the bearer token clients must present.
    /// Unset means the API is open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl ServerConfig {
    pub fn token(&self) -> Option<String> {
        self.token_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|t| !t.is_empty())
    }
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            token_env: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ListConfig
// ---------------------------------------------------------------------------

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

fn default_limit() -> u32 {
    20
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub list: ListConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
            },
            store: StoreConfig::default(),
            server: ServerConfig::default(),
            list: ListConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(HelpdeskError::NotInitialized);
        }
        crate::io::read_yaml(&path)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::config_path(root), self)
    }

    /// Page size to use when a query leaves `limit` unset, clamped to
    /// `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> u32 {
        self.list.default_limit.clamp(1, MAX_PAGE_SIZE)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if let StoreConfig::Http { url, token_env } = &self.store {
            match url.as_deref().map(str::trim) {
                None | Some("") => warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "store.type is 'http' but store.url is not set".to_string(),
                }),
                Some(u) if !(u.starts_with("http://") || u.starts_with("https://")) => {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!("store.url '{u}' is not an http(s) URL"),
                    })
                }
                Some(_) => {}
            }
            if let Some(var) = token_env {
                if std::env::var(var).is_err() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "store.token_env names '{var}' but it is not set; requests go unauthenticated"
                        ),
                    });
                }
            }
        }

        if self.list.default_limit == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "list.default_limit is 0; using 1".to_string(),
            });
        } else if self.list.default_limit > MAX_PAGE_SIZE {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "list.default_limit {} exceeds {MAX_PAGE_SIZE}; clamping",
                    self.list.default_limit
                ),
            });
        }

        if self.server.port == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "server.port is 0; an ephemeral port will be chosen".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::new("front-desk");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        assert!(yaml.contains("type: file"));
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.project.name, "front-desk");
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.store, StoreConfig::File);
        assert_eq!(parsed.list.default_limit, 20);
    }

    #[test]
    fn minimal_yaml_uses_defaults() {
        let yaml = "project:\n  name: desk\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.store, StoreConfig::File);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn http_store_tagged() {
        let yaml = "project:\n  name: desk\nstore:\n  type: http\n  url: http://localhost:5000\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            cfg.store,
            StoreConfig::Http {
                url: Some("http://localhost:5000".into()),
                token_env: None
            }
        );
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn http_store_without_url_is_an_error() {
        let mut cfg = Config::new("desk");
        cfg.store = StoreConfig::Http {
            url: None,
            token_env: None,
        };
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Error);
        assert!(warnings[0].message.contains("store.url"));
    }

    #[test]
    fn zero_page_size_warns_and_clamps() {
        let mut cfg = Config::new("desk");
        cfg.list.default_limit = 0;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("default_limit")));
        assert_eq!(cfg.page_size(), 1);
        cfg.list.default_limit = 500;
        assert_eq!(cfg.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(HelpdeskError::NotInitialized)
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("desk");
        cfg.server.port = 8080;
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.server.port, 8080);
        assert_eq!(loaded.project.name, "desk");
    }
}
