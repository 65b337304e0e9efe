//! Stakeline: stake lifecycle client for the staking contracts.

mod commands;
mod config;
mod error;
mod render;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use stakeline_types::{NetworkId, Period, StakingAddress, TokenAmount};
use stakeline_utils::{init_logging, LogFormat};

use crate::commands::{Action, PublishArgs};
use crate::config::StakerConfig;

/// Config file used when `--config` is not given.
const DEFAULT_CONFIG: &str = "stakeline.toml";

#[derive(Parser)]
#[command(name = "stakeline", version, about = "Stage, review and publish stake operations")]
struct Cli {
    /// Path to a TOML configuration file. Flags override values in the file.
    #[arg(long, env = "STAKELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Network to use (mainnet, testnet, dev).
    #[arg(long, env = "STAKELINE_NETWORK")]
    network: Option<NetworkId>,

    /// JSON-RPC provider URI.
    #[arg(long, env = "STAKELINE_PROVIDER")]
    provider: Option<String>,

    /// Staking address, or the preallocation contract when `--beneficiary` is set.
    #[arg(long, env = "STAKELINE_STAKING_ADDRESS")]
    staking_address: Option<StakingAddress>,

    /// Beneficiary of a preallocation contract; signs for it.
    #[arg(long, env = "STAKELINE_BENEFICIARY")]
    beneficiary: Option<StakingAddress>,

    /// Encrypted keystore file of the signing account.
    #[arg(long, env = "STAKELINE_KEYSTORE")]
    keystore: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "STAKELINE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format (human, json).
    #[arg(long, env = "STAKELINE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a configuration file from the current flags.
    Init {
        #[arg(long, default_value = "stakeline.toml")]
        output: PathBuf,
        /// Replace an existing file.
        #[arg(long)]
        overwrite: bool,
        /// Generate a new signing key into this keystore file.
        #[arg(long)]
        new_keystore: Option<PathBuf>,
    },
    /// Print the effective configuration.
    View,
    /// Delete the configuration file.
    Destroy {
        /// Delete without asking.
        #[arg(long)]
        force: bool,
        /// Also delete the keystore the config points at.
        #[arg(long)]
        include_keystore: bool,
    },
    /// Show the staker's stakes, worker, re-stake state and rewards.
    List,
    /// Lock tokens into a new stake.
    Create {
        /// Amount in base token units.
        #[arg(long)]
        value: u128,
        /// Lock duration in periods.
        #[arg(long)]
        duration: u64,
        #[command(flatten)]
        publish: PublishArgs,
    },
    /// Split a stake into two; the new part may lock longer.
    Divide {
        #[arg(long)]
        index: u32,
        /// Value moved into the new stake.
        #[arg(long)]
        value: u128,
        #[arg(long)]
        extra_periods: u64,
        #[command(flatten)]
        publish: PublishArgs,
    },
    /// Extend a stake's lock.
    Prolong {
        #[arg(long)]
        index: u32,
        #[arg(long)]
        extra_periods: u64,
        #[command(flatten)]
        publish: PublishArgs,
    },
    /// Let stakes count down (or stop them counting down).
    Winddown {
        #[command(flatten)]
        toggle: Toggle,
        #[command(flatten)]
        publish: PublishArgs,
    },
    /// Bond a worker to the staker.
    SetWorker {
        #[arg(long)]
        worker: StakingAddress,
        #[command(flatten)]
        publish: PublishArgs,
    },
    /// Unbond the current worker.
    DetachWorker {
        #[command(flatten)]
        publish: PublishArgs,
    },
    /// Turn re-staking of rewards on or off, optionally locking it on.
    Restake {
        #[command(flatten)]
        toggle: Toggle,
        /// Keep re-staking enabled until this period.
        #[arg(long)]
        lock_until: Option<u64>,
        #[command(flatten)]
        publish: PublishArgs,
    },
    /// Withdraw staking and policy rewards.
    CollectReward {
        #[arg(long)]
        no_staking: bool,
        #[arg(long)]
        no_policy: bool,
        /// Send policy rewards here instead of the staking address.
        #[arg(long)]
        withdraw_address: Option<StakingAddress>,
        #[command(flatten)]
        publish: PublishArgs,
    },
    /// Withdraw unlocked tokens from a preallocation contract.
    WithdrawTokens {
        #[arg(long)]
        value: u128,
        #[command(flatten)]
        publish: PublishArgs,
    },
}

#[derive(Args)]
struct Toggle {
    /// Turn the setting off instead of on.
    #[arg(long)]
    disable: bool,
}

impl Command {
    /// The stake operation this command stages, if any.
    fn into_action(self) -> Option<(Action, PublishArgs)> {
        let action = match self {
            Self::Init { .. } | Self::View | Self::Destroy { .. } | Self::List => return None,
            Self::Create {
                value,
                duration,
                publish,
            } => (
                Action::Create {
                    value: TokenAmount::new(value),
                    duration,
                },
                publish,
            ),
            Self::Divide {
                index,
                value,
                extra_periods,
                publish,
            } => (
                Action::Divide {
                    index,
                    target_value: TokenAmount::new(value),
                    extra_periods,
                },
                publish,
            ),
            Self::Prolong {
                index,
                extra_periods,
                publish,
            } => (
                Action::Prolong {
                    index,
                    extra_periods,
                },
                publish,
            ),
            Self::Winddown { toggle, publish } => (Action::WindDown(!toggle.disable), publish),
            Self::SetWorker { worker, publish } => (Action::SetWorker(worker), publish),
            Self::DetachWorker { publish } => (Action::DetachWorker, publish),
            Self::Restake {
                toggle,
                lock_until,
                publish,
            } => (
                Action::Restake {
                    enable: !toggle.disable,
                    lock_until: lock_until.map(Period::new),
                },
                publish,
            ),
            Self::CollectReward {
                no_staking,
                no_policy,
                withdraw_address,
                publish,
            } => (
                Action::CollectReward {
                    staking: !no_staking,
                    policy: !no_policy,
                    withdraw_address,
                },
                publish,
            ),
            Self::WithdrawTokens { value, publish } => {
                (Action::WithdrawTokens(TokenAmount::new(value)), publish)
            }
        };
        Some(action)
    }
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
}

/// Load the config file (if any) and apply flag overrides.
///
/// An explicit `--config` must exist except for `init`; the default file is
/// loaded only when present.
fn resolve_config(cli: &Cli) -> anyhow::Result<StakerConfig> {
    let path = config_path(cli);
    let required = cli.config.is_some() && !matches!(cli.command, Command::Init { .. });
    let mut config = if path.exists() || required {
        StakerConfig::from_toml_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
    } else {
        StakerConfig::default()
    };

    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(provider) = &cli.provider {
        config.provider_uri = Some(provider.clone());
    }
    if let Some(addr) = &cli.staking_address {
        config.staking_address = Some(addr.clone());
    }
    if let Some(addr) = &cli.beneficiary {
        config.beneficiary_address = Some(addr.clone());
    }
    if let Some(path) = &cli.keystore {
        config.keystore_path = Some(path.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let path = config_path(&cli);

    init_logging(config.log_format, &config.log_level)
        .context("failed to initialise logging")?;

    tracing::debug!(
        network = %config.network,
        provider = config.provider(),
        "configuration resolved"
    );

    match cli.command {
        Command::Init {
            output,
            overwrite,
            new_keystore,
        } => commands::init(config, &output, overwrite, new_keystore.as_deref()),
        Command::View => commands::view(&config),
        Command::Destroy {
            force,
            include_keystore,
        } => commands::destroy(&config, &path, include_keystore, force),
        Command::List => {
            config.validate()?;
            commands::list(&config).await
        }
        command => {
            config.validate()?;
            let Some((action, publish)) = command.into_action() else {
                return Ok(());
            };
            commands::publish(&config, action, &publish).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stakeline.toml");
        std::fs::write(&path, "network = \"testnet\"\nlog_level = \"warn\"\n").unwrap();

        let cli = Cli::parse_from([
            "stakeline",
            "--config",
            path.to_str().unwrap(),
            "--log-level",
            "debug",
            "list",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.network, NetworkId::Testnet);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn init_tolerates_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let init = Cli::parse_from(["stakeline", "--config", path.to_str().unwrap(), "init"]);
        assert!(resolve_config(&init).is_ok());

        let list = Cli::parse_from(["stakeline", "--config", path.to_str().unwrap(), "list"]);
        assert!(resolve_config(&list).is_err());
    }

    #[test]
    fn subcommands_map_to_actions() {
        let cli = Cli::parse_from([
            "stakeline",
            "restake",
            "--disable",
            "--lock-until",
            "90",
            "--dry-run",
        ]);
        let (action, publish) = cli.command.into_action().unwrap();
        assert_eq!(
            action,
            Action::Restake {
                enable: false,
                lock_until: Some(Period::new(90)),
            }
        );
        assert!(publish.dry_run);

        let cli = Cli::parse_from(["stakeline", "collect-reward", "--no-policy", "--force"]);
        let (action, publish) = cli.command.into_action().unwrap();
        assert_eq!(
            action,
            Action::CollectReward {
                staking: true,
                policy: false,
                withdraw_address: None,
            }
        );
        assert!(publish.force);
        assert!(Cli::parse_from(["stakeline", "list"]).command.into_action().is_none());
        assert!(Cli::parse_from(["stakeline", "view"]).command.into_action().is_none());

        let cli = Cli::parse_from(["stakeline", "destroy", "--force", "--include-keystore"]);
        assert!(matches!(
            cli.command,
            Command::Destroy {
                force: true,
                include_keystore: true
            }
        ));
        assert_eq!(config_path(&cli), PathBuf::from(DEFAULT_CONFIG));
    }
}
