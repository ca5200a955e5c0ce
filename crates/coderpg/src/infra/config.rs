//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use serde::{Deserialize, Serialize};

static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".coderpg/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub github: Github,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    #[serde(default = "Server::default_bind")]
    pub bind: String,
}

impl Server {
    fn default_bind() -> String {
        "127.0.0.1:8787".to_owned()
    }
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Github {
    #[serde(default = "Github::default_api_base")]
    pub api_base: String,
    /// Only ever sourced from the environment, never from config files.
    #[serde(skip)]
    pub token: Option<String>,
}

impl Github {
    fn default_api_base() -> String {
        crate::infra::github::DEFAULT_API_BASE.to_owned()
    }
}

impl Default for Github {
    fn default() -> Self {
        Self {
            api_base: Self::default_api_base(),
            token: None,
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    bind: Option<String>,
    api_base: Option<String>,
    token: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            bind: env::var("CODERPG_BIND").ok(),
            api_base: env::var("CODERPG_GITHUB_API_BASE").ok(),
            token: env::var("CODERPG_GITHUB_TOKEN")
                .or_else(|_| env::var("GITHUB_TOKEN"))
                .ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(bind: &str) -> Self {
        Self {
            bind: Some(bind.to_owned()),
            api_base: None,
            token: Some("test-token".to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace
    /// config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut merged = Config::default();

        if let Some(global_path) = global.filter(|path| path.exists()) {
            merged = merged.merge(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            merged = merged.merge(Self::from_file(&workspace_path)?);
        }

        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            server: Server {
                bind: if other.server.bind != Server::default_bind() {
                    other.server.bind
                } else {
                    self.server.bind
                },
            },
            github: Github {
                api_base: if other.github.api_base != Github::default_api_base() {
                    other.github.api_base
                } else {
                    self.github.api_base
                },
                token: other.github.token.or(self.github.token),
            },
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("coderpg/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    Ok(Some(cwd.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(bind) = env.bind {
        config.server.bind = bind;
    }
    if let Some(api_base) = env.api_base {
        config.github.api_base = api_base;
    }
    if let Some(token) = env.token {
        config.github.token = Some(token);
    }
    config
}
