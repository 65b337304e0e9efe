//! Subcommand execution: stage, review, publish.

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::Args;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use stakeline_client::{ClientError, HolderSession, StakerClient};
use stakeline_crypto::generate_keypair;
use stakeline_engine::TransactionPlan;
use stakeline_ledger_client::{HttpLedgerClient, LedgerClient, LedgerError, Signer};
use stakeline_types::{
    Period, SignedTransaction, StakingAddress, TokenAmount, UnsignedTransaction,
};
use stakeline_wallet::{KdfParams, KeystoreFile, KeystoreSigner};

use crate::config::StakerConfig;
use crate::render;

/// Environment variable holding the keystore password.
pub const PASSWORD_ENV: &str = "STAKELINE_KEYSTORE_PASSWORD";

#[derive(Args, Clone, Debug, Default)]
pub struct PublishArgs {
    /// Stage and print the plan without publishing it.
    #[arg(long)]
    pub dry_run: bool,
    /// Publish without the review prompt.
    #[arg(long)]
    pub force: bool,
}

/// A stake operation to stage against the configured holder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Create {
        value: TokenAmount,
        duration: u64,
    },
    Divide {
        index: u32,
        target_value: TokenAmount,
        extra_periods: u64,
    },
    Prolong {
        index: u32,
        extra_periods: u64,
    },
    WindDown(bool),
    SetWorker(StakingAddress),
    DetachWorker,
    Restake {
        enable: bool,
        lock_until: Option<Period>,
    },
    CollectReward {
        staking: bool,
        policy: bool,
        withdraw_address: Option<StakingAddress>,
    },
    WithdrawTokens(TokenAmount),
}

impl Action {
    pub fn stage<L: LedgerClient + ?Sized>(
        &self,
        session: &HolderSession<'_, L>,
    ) -> Result<TransactionPlan, ClientError> {
        match self {
            Self::Create { value, duration } => session.stage_create(*value, *duration),
            Self::Divide {
                index,
                target_value,
                extra_periods,
            } => session.stage_divide(*index, *target_value, *extra_periods),
            Self::Prolong {
                index,
                extra_periods,
            } => session.stage_prolong(*index, *extra_periods),
            Self::WindDown(enable) => session.stage_winddown(*enable),
            Self::SetWorker(worker) => session.stage_set_worker(Some(worker.clone())),
            Self::DetachWorker => session.stage_detach_worker(),
            Self::Restake { enable, lock_until } => session.stage_restake(*enable, *lock_until),
            Self::CollectReward {
                staking,
                policy,
                withdraw_address,
            } => session.stage_collect_reward(*staking, *policy, withdraw_address.clone()),
            Self::WithdrawTokens(amount) => session.stage_withdraw_tokens(*amount),
        }
    }
}

/// Signer for read-only runs. Refuses everything.
struct ReadOnlySigner;

#[async_trait]
impl Signer for ReadOnlySigner {
    async fn sign(
        &self,
        _tx: UnsignedTransaction,
        _account: &StakingAddress,
    ) -> Result<SignedTransaction, LedgerError> {
        Err(LedgerError::Signing("no keystore unlocked".into()))
    }

    fn accounts(&self) -> Vec<StakingAddress> {
        Vec::new()
    }
}

fn password() -> anyhow::Result<String> {
    std::env::var(PASSWORD_ENV).with_context(|| format!("{PASSWORD_ENV} is not set"))
}

fn unlock_signer(config: &StakerConfig) -> anyhow::Result<Arc<dyn Signer>> {
    let path = config
        .keystore_path
        .as_ref()
        .context("keystore_path is not set; pass --keystore")?;
    let signer = KeystoreSigner::open(path, &password()?)
        .with_context(|| format!("failed to unlock {}", path.display()))?;

    let holder = config.holder()?;
    if signer.address() != holder.signer() {
        bail!(
            "keystore holds {} but {} signs for this staker",
            signer.address(),
            holder.signer()
        );
    }
    tracing::info!(signer = %signer.address().short(), "keystore unlocked");
    Ok(Arc::new(signer))
}

fn connect(
    config: &StakerConfig,
    signer: Arc<dyn Signer>,
) -> anyhow::Result<StakerClient<HttpLedgerClient>> {
    let ledger = Arc::new(HttpLedgerClient::new(config.provider())?);
    Ok(StakerClient::new(ledger, signer, config.client_config())?)
}

pub fn init(
    mut config: StakerConfig,
    output: &Path,
    overwrite: bool,
    new_keystore: Option<&Path>,
) -> anyhow::Result<()> {
    if let Some(path) = new_keystore {
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        let keys = generate_keypair();
        let keystore = KeystoreFile::encrypt(&keys, &password()?, KdfParams::default())?;
        keystore.save(path)?;
        println!("new key {} written to {}", keystore.address, path.display());

        if config.staking_address.is_none() {
            config.staking_address = Some(keystore.address.clone());
        } else if config.beneficiary_address.is_none() {
            tracing::warn!(
                key = %keystore.address,
                "staking address already set; the new key is not its signer"
            );
        }
        config.keystore_path = Some(path.to_path_buf());
    }

    config.validate()?;
    config.save(output, overwrite)?;
    println!("config written to {}", output.display());
    Ok(())
}

pub fn view(config: &StakerConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

/// Remove the config file at `path`, and its keystore when asked.
pub fn destroy(
    config: &StakerConfig,
    path: &Path,
    include_keystore: bool,
    force: bool,
) -> anyhow::Result<()> {
    if !path.exists() {
        bail!("{} does not exist", path.display());
    }
    let keystore = if include_keystore {
        Some(
            config
                .keystore_path
                .as_deref()
                .context("keystore_path is not set")?,
        )
    } else {
        None
    };

    if !force {
        let target = match keystore {
            Some(k) => format!("{} and {}", path.display(), k.display()),
            None => path.display().to_string(),
        };
        if !confirm(&format!("Delete {target}?"))? {
            println!("nothing deleted");
            return Ok(());
        }
    }

    std::fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
    println!("removed {}", path.display());
    if let Some(keystore) = keystore {
        std::fs::remove_file(keystore)
            .with_context(|| format!("failed to remove {}", keystore.display()))?;
        println!("removed {}", keystore.display());
    }
    Ok(())
}

pub async fn list(config: &StakerConfig) -> anyhow::Result<()> {
    let client = connect(config, Arc::new(ReadOnlySigner))?;
    let session = client.holder(config.holder()?).await;
    let snapshot = session.sync().await.context("failed to read staker state")?;
    let current = session.current_period()?;
    print!(
        "{}",
        render::holder(&snapshot, current, client.engine().periods(), client.now())
    );
    Ok(())
}

pub async fn publish(
    config: &StakerConfig,
    action: Action,
    opts: &PublishArgs,
) -> anyhow::Result<()> {
    let signer = if opts.dry_run {
        Arc::new(ReadOnlySigner) as Arc<dyn Signer>
    } else {
        unlock_signer(config)?
    };
    let client = connect(config, signer)?;
    let session = client.holder(config.holder()?).await;
    session.sync().await.context("failed to read staker state")?;

    let plan = action.stage(&session)?;
    print!("{plan}");
    if plan.is_empty() {
        return Ok(());
    }
    if !plan.projected_stakes().is_empty() {
        print!(
            "{}",
            render::projected(
                plan.projected_stakes(),
                plan.staged_at(),
                client.engine().periods(),
                client.now()
            )
        );
    }

    if opts.dry_run {
        println!("dry run, nothing published");
        return Ok(());
    }
    if !opts.force && !confirm("Publish these transactions?")? {
        println!("plan discarded");
        return Ok(());
    }

    let report = session.submit(plan).await?;
    print!("{}", render::report(&report));
    report.into_result()?;
    Ok(())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{question} [y/N] ")?;
    stdout.flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(parse_answer(&answer))
}

fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeline_client::ClientConfig;
    use stakeline_engine::{PlanKind, StageError};
    use stakeline_nullables::{NullClock, NullLedger, NullSigner, SimStake};
    use stakeline_types::{StakeHolder, StakingParams};

    const PERIOD_SECS: u64 = 60;
    const START: u64 = 100;

    fn client(ledger: Arc<NullLedger>, signer: NullSigner) -> StakerClient<NullLedger> {
        let config = ClientConfig {
            params: StakingParams {
                period_length_secs: PERIOD_SECS,
                ..StakingParams::default()
            },
            confirmation_timeout: std::time::Duration::from_millis(200),
            poll_interval: std::time::Duration::from_millis(5),
        };
        StakerClient::new(ledger, Arc::new(signer), config)
            .unwrap()
            .with_clock(Arc::new(NullClock::new(START * PERIOD_SECS + 1)))
    }

    #[test]
    fn answers() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer(" YES "));
        assert!(!parse_answer("\n"));
        assert!(!parse_answer("no"));
    }

    #[tokio::test]
    async fn actions_stage_through_session() {
        let signer = NullSigner::from_seed([3; 32]);
        let staker = signer.address();
        let ledger = Arc::new(NullLedger::new(Period::new(START)));
        ledger.set_balance(&staker, TokenAmount::new(5_000));
        ledger.add_stake(&staker, SimStake::new(TokenAmount::new(1_000), 90, 140));
        let client = client(ledger, signer);
        let session = client.holder(StakeHolder::direct(staker)).await;
        session.sync().await.unwrap();

        let create = Action::Create {
            value: TokenAmount::new(2_000),
            duration: 30,
        }
        .stage(&session)
        .unwrap();
        assert_eq!(create.kind(), PlanKind::Create);

        let divide = Action::Divide {
            index: 0,
            target_value: TokenAmount::new(400),
            extra_periods: 5,
        }
        .stage(&session)
        .unwrap();
        assert_eq!(divide.kind(), PlanKind::Divide);
        assert_eq!(divide.projected_stakes().len(), 2);

        let err = Action::Prolong {
            index: 7,
            extra_periods: 1,
        }
        .stage(&session)
        .unwrap_err();
        assert!(matches!(err, ClientError::Stage(StageError::StakeNotFound(7))));
    }

    #[tokio::test]
    async fn read_only_signer_refuses() {
        let tx = UnsignedTransaction {
            from: StakingAddress::from_bytes([1; 20]),
            call: stakeline_types::ContractCall::new(
                stakeline_types::Contract::StakingEscrow,
                stakeline_types::StakingCall::SetWindDown { enabled: true },
            ),
            gas_limit: 1,
        };
        let err = ReadOnlySigner
            .sign(tx, &StakingAddress::from_bytes([1; 20]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Signing(_)));
        assert!(ReadOnlySigner.accounts().is_empty());
    }

    #[test]
    fn init_writes_keystore_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("stakeline.toml");
        let keystore = dir.path().join("key.json");
        std::env::set_var(PASSWORD_ENV, "correct horse");

        init(StakerConfig::default(), &output, false, Some(&keystore)).unwrap();

        let config = StakerConfig::from_toml_file(&output).unwrap();
        let file = KeystoreFile::load(&keystore).unwrap();
        assert_eq!(config.staking_address, Some(file.address));
        assert_eq!(config.keystore_path, Some(keystore.clone()));
        assert!(init(StakerConfig::default(), &output, true, Some(&keystore)).is_err());
    }

    #[test]
    fn destroy_removes_config_and_optionally_keystore() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("stakeline.toml");
        let keystore = dir.path().join("key.json");
        std::env::set_var(PASSWORD_ENV, "correct horse");
        init(StakerConfig::default(), &output, false, Some(&keystore)).unwrap();
        let config = StakerConfig::from_toml_file(&output).unwrap();

        destroy(&config, &output, false, true).unwrap();
        assert!(!output.exists());
        assert!(keystore.exists());
        assert!(destroy(&config, &output, false, true).is_err());

        config.save(&output, false).unwrap();
        destroy(&config, &output, true, true).unwrap();
        assert!(!output.exists());
        assert!(!keystore.exists());
    }

    #[test]
    fn destroy_keystore_needs_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("stakeline.toml");
        let config = StakerConfig::default();
        config.save(&output, false).unwrap();
        assert!(destroy(&config, &output, true, true).is_err());
        assert!(output.exists());
    }

    #[test]
    fn view_renders_saved_config() {
        let config = StakerConfig {
            staking_address: Some(StakingAddress::from_bytes([4; 20])),
            ..StakerConfig::default()
        };
        assert!(view(&config).is_ok());
        let toml = config.to_toml_string().unwrap();
        assert_eq!(StakerConfig::from_toml_str(&toml).unwrap(), config);
    }
}
