// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::path::PathBuf;

use crate::handle::{self, HandleCommands};
use crate::helpers::telemetry::setup_simple_tracing;
use crate::{config_show, eip712, keyurl};
use anyhow::Result;
use clap::{command, ArgAction, Parser, Subcommand};
use fhevm_config::{load_config, NetworkConfig};
use tracing::{info, instrument, Level};

#[derive(Parser, Debug)]
#[command(name = "fhevm")]
#[command(about = "Offline and diagnostic tools for fhEVM clients", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,

    /// Indicate error levels by adding additional `-v` arguments. Eg. `fhevm -vvv` will give you
    /// trace level output
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true
    )]
    pub verbose: u8,

    /// Silence all output. This argument cannot be used alongside `-v`
    #[arg(
        short,
        long,
        action = ArgAction::SetTrue,
        conflicts_with = "verbose",
        global = true
    )]
    quiet: bool,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,  //
                1 => Level::INFO,  // -v
                2 => Level::DEBUG, // -vv
                _ => Level::TRACE, // -vvv
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn execute(self) -> Result<()> {
        setup_simple_tracing(self.log_level());
        let config = self.load_config()?;
        info!("Using network '{}'", config.name);

        match self.command {
            Commands::Handle { command } => handle::execute(command, &config)?,
            Commands::Eip712 {
                public_key,
                contracts,
                delegate,
                days,
                start,
            } => eip712::execute(
                &config,
                &public_key,
                &contracts,
                delegate.as_deref(),
                days,
                start,
            )?,
            Commands::Keyurl { key_id } => keyurl::execute(&config, key_id.as_deref()).await?,
            Commands::Config => config_show::execute(&config)?,
        }

        Ok(())
    }

    pub fn load_config(&self) -> Result<NetworkConfig> {
        load_config(self.config.as_deref())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect or derive ciphertext handles
    Handle {
        #[command(subcommand)]
        command: HandleCommands,
    },

    /// Print the EIP-712 message a user signs to authorize decryption
    Eip712 {
        /// The user's decryption public key, hex
        #[arg(long = "public-key")]
        public_key: String,

        /// Contract allowed to decrypt. May be given up to 10 times
        #[arg(long = "contract", required = true, action = ArgAction::Append)]
        contracts: Vec<String>,

        /// Account decrypting on behalf of the signer
        #[arg(long)]
        delegate: Option<String>,

        /// Validity in days
        #[arg(long, default_value_t = 1)]
        days: u64,

        /// Start of the validity window as unix seconds. Defaults to now
        #[arg(long)]
        start: Option<u64>,
    },

    /// Fetch the key material index from the relayer
    Keyurl {
        /// Public key id to select
        #[arg(long = "key-id")]
        key_id: Option<String>,
    },

    /// Print the resolved configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbosity() {
        let cli = Cli::try_parse_from(["fhevm", "-vv", "config"]).unwrap();
        assert_eq!(cli.log_level(), Level::DEBUG);

        let cli = Cli::try_parse_from(["fhevm", "--quiet", "config"]).unwrap();
        assert_eq!(cli.log_level(), Level::ERROR);

        assert!(Cli::try_parse_from(["fhevm", "-v", "--quiet", "config"]).is_err());
    }

    #[test]
    fn eip712_requires_a_contract() {
        assert!(Cli::try_parse_from(["fhevm", "eip712", "--public-key", "0x01"]).is_err());
        let cli = Cli::try_parse_from([
            "fhevm",
            "eip712",
            "--public-key",
            "0x01",
            "--contract",
            "0x8ba1f109551bd432803012645ac136ddd64dba72",
            "--contract",
            "0x687820221192c5b662b25367f70076a37bc79b6c",
        ])
        .unwrap();
        let Commands::Eip712 {
            contracts, days, ..
        } = cli.command
        else {
            panic!("expected eip712");
        };
        assert_eq!(contracts.len(), 2);
        assert_eq!(days, 1);
    }
}
