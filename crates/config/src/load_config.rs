// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{yaml::load_yaml_with_env, NetworkConfig};
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use path_clean::clean;
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing::info;

pub const DEFAULT_CONFIG_NAME: &str = "fhevm.config.yaml";
pub const ENV_PREFIX: &str = "FHEVM_";

pub type FindInParent = fn(&Path, &str) -> Option<PathBuf>;

pub fn find_in_parent(path: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = PathBuf::from(path);

    loop {
        let file_path = current.join(filename);
        if file_path.exists() {
            return Some(file_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

pub fn resolve_config_path(
    find_in_parent: FindInParent,
    cwd: &Path,
    default_config_dir: &Path,
    default_filename: &str,
    cli_file: Option<&Path>,
) -> PathBuf {
    if let Some(cli_file) = cli_file {
        if cli_file.is_absolute() {
            return cli_file.to_path_buf();
        }
        return clean(cwd.join(cli_file));
    }

    if let Some(found) = find_in_parent(cwd, default_filename) {
        return found;
    }

    clean(default_config_dir.join(default_filename))
}

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fhevm")
}

/// Load the network configuration.
///
/// Values are layered: the Sepolia preset, then the YAML file (with `${ENV}` substitution),
/// then `FHEVM_*` environment variables (`FHEVM_CONTRACTS__ACL` style for nested keys).
/// An explicitly requested file must exist; when no file is requested and none is found the
/// preset is used as is.
pub fn load_config(config_file: Option<&Path>) -> Result<NetworkConfig> {
    let cwd = env::current_dir()?;
    let path = resolve_config_path(
        find_in_parent,
        &cwd,
        &default_config_dir(),
        DEFAULT_CONFIG_NAME,
        config_file,
    );

    let mut figment = Figment::from(Serialized::defaults(NetworkConfig::sepolia()));

    if config_file.is_some() || path.exists() {
        let yaml = load_yaml_with_env(&path)
            .with_context(|| format!("Configuration file not found: {}", path.display()))?;
        info!("Loading configuration from {}", path.display());
        figment = figment.merge(Yaml::string(&yaml));
    } else {
        info!("No configuration file found, using the built in Sepolia preset");
    }

    let config: NetworkConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("Could not parse configuration")?;

    config.validate()?;
    Ok(config)
}
