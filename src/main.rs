mod app;
mod config;
mod contracts;
mod error;
mod network;
mod preflight;
mod project;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use alloy::primitives::{Address, utils::parse_ether};
use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};

use crate::app::{Deployer, DeployRequest, InvokeRequest, PersistTarget, ReadRequest, Stage, TxResult};
use crate::config::{AppConfig, EnvStore, Overrides, RunConfig, address_key};
use crate::contracts::{
    ArtifactLoader, DEFAULT_CONFIRMATIONS, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL, SubmitOptions,
    WaitPolicy,
};
use crate::error::{DeployError, ErrorKind, classify};
use crate::report::ReportContext;

#[derive(Parser, Debug)]
#[command(name = "deployer")]
#[command(about = "Deploy and call smart contracts on EVM test networks")]
#[command(version)]
struct Cli {
    /// Env file holding PRIVATE_KEY, RPC_URL and deployed addresses
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    /// Network profile name (e.g. base-sepolia, anvil)
    #[arg(long, global = true)]
    network: Option<String>,

    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Expected chain id; the run stops if the endpoint disagrees
    #[arg(long, global = true)]
    chain_id: Option<u64>,

    /// Directory with compiled artifacts (detected from the project by default)
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Project root used for artifact layout detection
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    /// Blocks to wait for, counting the receipt's own block
    #[arg(long, global = true, default_value_t = DEFAULT_CONFIRMATIONS)]
    confirmations: u64,

    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval_ms: u64,

    /// Give up waiting for a receipt after this long; 0 waits forever
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_WAIT.as_secs())]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy a compiled contract and record its address
    Deploy {
        /// Artifact name, e.g. Token
        artifact: String,

        /// Constructor arguments
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,

        /// Env key for the address (default: <NAME>_CONTRACT_ADDRESS)
        #[arg(long)]
        persist_key: Option<String>,

        #[arg(long)]
        no_persist: bool,

        /// Reuse a nonce to replace an earlier, unconfirmed attempt
        #[arg(long)]
        nonce: Option<u64>,
    },

    /// Send a state-changing call to a deployed contract
    Call {
        /// Contract address, or an env key such as TOKEN_CONTRACT_ADDRESS
        contract: String,

        /// Function name or full signature
        function: String,

        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,

        /// Artifact providing the ABI
        #[arg(long)]
        artifact: String,

        /// Ether to send along, e.g. 0.01
        #[arg(long)]
        value: Option<String>,

        #[arg(long)]
        nonce: Option<u64>,

        /// Zero-argument view function to query after confirmation
        #[arg(long)]
        read_back: Option<String>,
    },

    /// Query a view function; no key needed
    Read {
        contract: String,

        function: String,

        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,

        #[arg(long)]
        artifact: String,
    },

    /// Show balance, nonce and chain for an account
    Wallet {
        /// Defaults to the PRIVATE_KEY account
        address: Option<String>,
    },
}

impl Cli {
    fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            confirmations: self.confirmations.max(1),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_wait: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        }
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            network: self.network.clone(),
            rpc_url: self.rpc_url.clone(),
            chain_id: self.chain_id,
            artifacts_dir: self.artifacts.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {}", e);
    }

    {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(report) => {
            let classified = classify(&report);
            tracing::debug!("{:?}", report);
            eprintln!("error [{}]: {}", classified.kind, classified.message);
            eprintln!("hint: {}", classified.hint);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    app::enter(Stage::Configuring);

    let store = EnvStore::load(&cli.env_file)?;
    let profiles = AppConfig::load().wrap_err("failed to load network profiles")?;
    let project_root = cli.project.canonicalize().unwrap_or_else(|_| cli.project.clone());
    let project = project::detect(&project_root)?;
    tracing::debug!(
        "{} project at {:?}, artifacts in {:?}",
        project.project_type,
        project.root,
        project.artifacts_dir
    );

    let config = RunConfig::resolve(
        &cli.overrides(),
        &store,
        &profiles,
        project.artifacts_dir,
        cli.wait_policy(),
    )?;
    let loader = ArtifactLoader::new(&config.artifacts_dir);
    tracing::debug!("Looking up artifacts under {:?}", loader.dir());

    match cli.command {
        Command::Deploy {
            artifact,
            args,
            persist_key,
            no_persist,
            nonce,
        } => {
            let account = config.account()?;
            let clients = network::connect(&config.endpoint, &account)?;

            let persist = (!no_persist).then(|| PersistTarget {
                path: config.env_path.clone(),
                key: persist_key.unwrap_or_else(|| address_key(&artifact)),
            });
            let request = DeployRequest {
                artifact,
                args,
                persist,
                options: SubmitOptions { nonce },
            };

            let outcome = Deployer::new(&clients, &loader, config.wait.clone())
                .expect_chain(config.endpoint.chain_id)
                .deploy(&request)
                .await?;

            let ctx = report_context(&config, clients.read.as_ref()).await;
            println!("{}", report::deploy_summary(&outcome, &ctx));

            if let Some(warning) = &outcome.persistence_warning {
                print_problem(ErrorKind::PersistenceWarning, warning);
            }
            Ok(exit_code(&outcome.result))
        }

        Command::Call {
            contract,
            function,
            args,
            artifact,
            value,
            nonce,
            read_back,
        } => {
            let address = config.contract_address(&store, &contract)?;
            let value = value
                .map(|v| {
                    parse_ether(&v).map_err(|e| DeployError::InvalidConfig {
                        field: "--value".to_string(),
                        reason: e.to_string(),
                    })
                })
                .transpose()?;

            let account = config.account()?;
            let clients = network::connect(&config.endpoint, &account)?;

            let request = InvokeRequest {
                artifact,
                address,
                function,
                args,
                value,
                options: SubmitOptions { nonce },
                read_back,
            };

            let outcome = Deployer::new(&clients, &loader, config.wait.clone())
                .expect_chain(config.endpoint.chain_id)
                .invoke(&request)
                .await?;

            let ctx = report_context(&config, clients.read.as_ref()).await;
            println!("{}", report::invoke_summary(&outcome, &ctx));
            Ok(exit_code(&outcome.result))
        }

        Command::Read {
            contract,
            function,
            args,
            artifact,
        } => {
            let address = config.contract_address(&store, &contract)?;
            let read = network::connect_read_only(&config.endpoint)?;
            network::verify_chain(read.as_ref(), config.endpoint.chain_id).await?;

            let values = app::read(
                read.as_ref(),
                &loader,
                &ReadRequest {
                    artifact,
                    address,
                    function,
                    args,
                },
            )
            .await?;

            for value in values {
                println!("{}", value);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Wallet { address } => {
            let address = match address {
                Some(raw) => raw.parse::<Address>().map_err(|e| DeployError::InvalidConfig {
                    field: "address".to_string(),
                    reason: e.to_string(),
                })?,
                None => config.account()?.address(),
            };

            let read = network::connect_read_only(&config.endpoint)?;
            network::verify_chain(read.as_ref(), config.endpoint.chain_id).await?;
            let info = preflight::inspect_wallet(read.as_ref(), address).await?;

            println!("{}", report::wallet_summary(&info));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn report_context(config: &RunConfig, read: &dyn network::ReadClient) -> ReportContext {
    let chain_id = match config.endpoint.chain_id {
        Some(id) => id,
        None => read.chain_id().await.unwrap_or_default(),
    };

    ReportContext {
        chain_id,
        explorer: report::explorer_base(chain_id, config.explorer_url.as_deref()),
    }
}

/// Reverts and time-outs are reported normally but still fail the process.
fn exit_code(result: &TxResult) -> ExitCode {
    let kind = match result {
        TxResult::Confirmed(_) => return ExitCode::SUCCESS,
        TxResult::Reverted(_) => ErrorKind::RevertedExecution,
        TxResult::TimedOut { .. } => ErrorKind::ReceiptWait,
    };

    print_problem(kind, "transaction did not confirm successfully");
    ExitCode::FAILURE
}

fn print_problem(kind: ErrorKind, message: impl std::fmt::Display) {
    let level = if kind.is_recoverable() { "warning" } else { "error" };
    eprintln!("{} [{}]: {}", level, kind, message);
    eprintln!("hint: {}", kind.hint());
}
