// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{Context, Result};
use std::{fs, path::Path};

/// Read a YAML file and substitute `$VAR` / `${VAR}` references from the environment.
pub fn load_yaml_with_env(file_path: &Path) -> Result<String> {
    let content = fs::read_to_string(file_path)?;
    Ok(shellexpand::env(&content)
        .with_context(|| format!("Undefined variable in {}", file_path.display()))?
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn substitutes_environment_variables() {
        Jail::expect_with(|jail| {
            jail.set_env("FHEVM_TEST_RELAYER", "http://localhost:3000");
            jail.create_file("net.yaml", "relayer_url: ${FHEVM_TEST_RELAYER}\n")?;

            let processed =
                load_yaml_with_env(&jail.directory().join("net.yaml")).map_err(|e| e.to_string())?;
            assert_eq!(processed, "relayer_url: http://localhost:3000\n");
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_yaml_with_env(Path::new("/definitely/not/here.yaml")).unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }
}
