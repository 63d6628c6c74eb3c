// Copyright 2025 Central Dogma Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Layered process configuration: defaults, overridden by a TOML file,
/// overridden in turn by environment variables (SPEC_FULL.md §1.1).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DogmaConfig {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub mirror: MirrorSection,
    #[serde(default)]
    pub auth: AuthSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSection {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_watch_policy_max_ms")]
    pub watch_policy_max_ms: u64,
    #[serde(default)]
    pub enable_cors: bool,
}

impl ServerSection {
    pub fn enable_cors(&self) -> bool {
        self.enable_cors
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSection {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorSection {
    #[serde(default = "default_mirror_worker_pool_size")]
    pub worker_pool_size: usize,
    #[serde(default = "default_mirror_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_mirror_max_num_files")]
    pub max_num_files: usize,
    #[serde(default = "default_mirror_max_num_bytes")]
    pub max_num_bytes: u64,
    #[serde(default = "default_mirror_scratch_dir")]
    pub scratch_dir: PathBuf,
    /// This node's zone, if zone-aware deployment is configured.
    #[serde(default)]
    pub current_zone: Option<String>,
    /// Every zone declared for the deployment; empty means zoning is off.
    #[serde(default)]
    pub declared_zones: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthSection {
    #[serde(default)]
    pub enabled: bool,
    pub jwt_secret: Option<String>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:36462".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_watch_policy_max_ms() -> u64 {
    60_000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./dogma-data")
}

fn default_mirror_worker_pool_size() -> usize {
    4
}

fn default_mirror_tick_interval_secs() -> u64 {
    1
}

fn default_mirror_max_num_files() -> usize {
    8192
}

fn default_mirror_max_num_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_mirror_scratch_dir() -> PathBuf {
    PathBuf::from("./dogma-data/mirror-scratch")
}

impl Default for DogmaConfig {
    fn default() -> Self {
        Self {
            server: ServerSection {
                listen_addr: default_listen_addr(),
                request_timeout_secs: default_request_timeout_secs(),
                watch_policy_max_ms: default_watch_policy_max_ms(),
                enable_cors: false,
            },
            storage: StorageSection {
                data_dir: default_data_dir(),
            },
            mirror: MirrorSection {
                worker_pool_size: default_mirror_worker_pool_size(),
                tick_interval_secs: default_mirror_tick_interval_secs(),
                max_num_files: default_mirror_max_num_files(),
                max_num_bytes: default_mirror_max_num_bytes(),
                scratch_dir: default_mirror_scratch_dir(),
                current_zone: None,
                declared_zones: Vec::new(),
            },
            auth: AuthSection::default(),
        }
    }
}

impl DogmaConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads configuration with priority: env > file > defaults. Supported
    /// environment variables: `DOGMA_HTTP_ADDR`, `DOGMA_DATA_DIR`,
    /// `DOGMA_AUTH_ENABLED`, `DOGMA_JWT_SECRET`, `DOGMA_MIRROR_WORKERS`.
    pub fn load(config_file: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!(path = %path.display(), "loading configuration from file");
                Self::from_file(&path)?
            } else {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
        } else {
            Self::default()
        };

        if let Ok(addr) = std::env::var("DOGMA_HTTP_ADDR") {
            config.server.listen_addr = addr;
        }
        if let Ok(dir) = std::env::var("DOGMA_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Ok(enabled) = std::env::var("DOGMA_AUTH_ENABLED") {
            config.auth.enabled = enabled.parse().unwrap_or(false);
        }
        if let Ok(secret) = std::env::var("DOGMA_JWT_SECRET") {
            config.auth.jwt_secret = Some(secret);
        }
        if let Ok(workers) = std::env::var("DOGMA_MIRROR_WORKERS") {
            if let Ok(n) = workers.parse() {
                config.mirror.worker_pool_size = n;
            }
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.socket_addr()?;
        if self.auth.enabled && self.auth.jwt_secret.is_none() {
            anyhow::bail!("authentication enabled but no JWT secret configured");
        }
        if self.mirror.worker_pool_size == 0 {
            anyhow::bail!("mirror worker pool size must be > 0");
        }
        if !self.storage.data_dir.exists() {
            std::fs::create_dir_all(&self.storage.data_dir)?;
        }
        if !self.mirror.scratch_dir.exists() {
            std::fs::create_dir_all(&self.mirror.scratch_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_shape() {
        let config = DogmaConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:36462");
        assert!(!config.auth.enabled);
    }

    #[test]
    fn env_overrides_defaults() {
        std::env::set_var("DOGMA_HTTP_ADDR", "0.0.0.0:9000");
        let config = DogmaConfig::load(None).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:9000");
        std::env::remove_var("DOGMA_HTTP_ADDR");
    }
}
