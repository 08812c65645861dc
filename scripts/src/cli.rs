//! Definitions of CLI arguments and commands for deploy scripts

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{deploy, deploy_all, get_address, list, register_router_address, validate_targets},
    config::{DeployConfig, RawConfig},
    constants::{
        CONFIRMATION_TIMEOUT_ENV_VAR, DEFAULT_ARTIFACTS_DIR, DEFAULT_DEPLOYMENTS_PATH,
        DEFAULT_RPC_URL, NUM_CONFIRMATIONS_ENV_VAR, TOTAL_SUPPLY_ENV_VAR, UNISWAP_V2_ADDR_ENV_VAR,
    },
    deployer::{setup_client, RpcDeployer},
    errors::ScriptError,
    registry::AddressRegistry,
    types::DeployTarget,
};

/// Deploy the SubscriptionManager and VestingToken contracts and record their addresses
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Private key of the deployer, required by commands that send transactions
    #[arg(short, long, env = "PKEY", hide_env_values = true)]
    pub priv_key: Option<String>,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Path to the file in which deployed addresses are recorded
    #[arg(short, long, default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments_path: PathBuf,

    /// Directory containing compiled contract artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// Deployment parameters
    #[command(flatten)]
    pub config: ConfigArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Deployment parameters, validated into a [`DeployConfig`] at startup
#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// Total supply passed to the SubscriptionManager constructor, in base 10
    #[arg(long, env = TOTAL_SUPPLY_ENV_VAR)]
    pub total_supply: Option<String>,

    /// Address of the Uniswap V2 router
    #[arg(long, env = UNISWAP_V2_ADDR_ENV_VAR)]
    pub router_address: Option<String>,

    /// Seconds to wait for a deployment to be confirmed
    #[arg(long, env = CONFIRMATION_TIMEOUT_ENV_VAR)]
    pub confirmation_timeout_secs: Option<u64>,

    /// Number of confirmations to wait for
    #[arg(long, env = NUM_CONFIRMATIONS_ENV_VAR)]
    pub confirmations: Option<u64>,
}

impl From<ConfigArgs> for RawConfig {
    fn from(args: ConfigArgs) -> Self {
        RawConfig {
            total_supply: args.total_supply,
            router_address: args.router_address,
            confirmation_timeout_secs: args.confirmation_timeout_secs,
            confirmations: args.confirmations,
        }
    }
}

/// The deploy script commands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy a single contract
    Deploy(DeployArgs),
    /// Deploy every contract, SubscriptionManager first
    DeployAll,
    /// Record the configured Uniswap V2 router address
    RegisterRouter,
    /// Print the address recorded under a name
    GetAddress(GetAddressArgs),
    /// Print every recorded address
    List,
}

/// Deploy a single contract
#[derive(Args)]
pub struct DeployArgs {
    /// The contract to deploy
    #[arg(short, long)]
    pub contract: DeployTarget,
}

/// Look up a recorded address
#[derive(Args)]
pub struct GetAddressArgs {
    /// The registry name, e.g. `SubscriptionManager`
    #[arg(short, long)]
    pub name: String,
}

impl Command {
    /// The contracts this command deploys
    fn targets(&self) -> Vec<DeployTarget> {
        match self {
            Command::Deploy(args) => vec![args.contract],
            Command::DeployAll => DeployTarget::ALL.to_vec(),
            _ => Vec::new(),
        }
    }

    /// Run the command, connecting to the network only if it sends transactions
    pub async fn run(
        self,
        priv_key: Option<&str>,
        rpc_url: &str,
        artifacts_dir: &Path,
        registry: &dyn AddressRegistry,
        config: &DeployConfig,
    ) -> Result<(), ScriptError> {
        // Fail on missing configuration before connecting to the network
        validate_targets(&self.targets(), config)?;

        match self {
            Command::Deploy(args) => {
                let deployer = connect(priv_key, rpc_url, artifacts_dir, config).await?;
                deploy(args, &deployer, registry, config).await
            }
            Command::DeployAll => {
                let deployer = connect(priv_key, rpc_url, artifacts_dir, config).await?;
                deploy_all(&deployer, registry, config).await
            }
            Command::RegisterRouter => register_router_address(registry, config),
            Command::GetAddress(args) => get_address(args, registry),
            Command::List => list(registry),
        }
    }
}

/// Build a deployer signing with `priv_key`
async fn connect(
    priv_key: Option<&str>,
    rpc_url: &str,
    artifacts_dir: &Path,
    config: &DeployConfig,
) -> Result<RpcDeployer<impl alloy::providers::Provider + Clone>, ScriptError> {
    let priv_key = priv_key.ok_or_else(|| {
        ScriptError::Configuration("a private key is required to deploy".to_string())
    })?;

    let (provider, deployer_address) = setup_client(priv_key, rpc_url).await?;
    Ok(RpcDeployer::new(provider, deployer_address, artifacts_dir, config))
}
