use clap::Parser;
use scripts::{cli::Cli, config::DeployConfig, errors::ScriptError, registry::FileRegistry};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let Cli {
        priv_key,
        rpc_url,
        deployments_path,
        artifacts_dir,
        config,
        command,
    } = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = DeployConfig::from_raw(config.into())?;
    let registry = FileRegistry::new(deployments_path);

    command
        .run(priv_key.as_deref(), &rpc_url, &artifacts_dir, &registry, &config)
        .await
}
