//! Implementations of the various deploy scripts

use itertools::Itertools;
use tracing::{info, warn};

use crate::{
    cli::{DeployArgs, GetAddressArgs},
    config::DeployConfig,
    deployer::ContractDeployer,
    errors::ScriptError,
    registry::AddressRegistry,
    router::register_router,
    steps::DeploymentStep,
    types::DeployTarget,
};

/// Check the configuration of every target before anything is submitted
pub fn validate_targets(
    targets: &[DeployTarget],
    config: &DeployConfig,
) -> Result<(), ScriptError> {
    targets
        .iter()
        .try_for_each(|target| target.validate(config).map_err(|e| e.in_step(target.id())))
}

/// Run the deployment steps for `targets` in order.
///
/// Duplicate targets run once, at their first position. The configuration of
/// every step is validated up front, so a missing value aborts the sequence
/// before any transaction is sent. Execution halts at the first failing step;
/// steps that already completed stay registered.
pub async fn run_steps(
    targets: &[DeployTarget],
    deployer: &impl ContractDeployer,
    registry: &dyn AddressRegistry,
    config: &DeployConfig,
) -> Result<Vec<DeploymentStep>, ScriptError> {
    let targets = targets.iter().copied().unique().collect_vec();
    validate_targets(&targets, config)?;

    let mut completed = Vec::with_capacity(targets.len());
    for target in targets {
        let mut step = DeploymentStep::new(target);
        step.run(deployer, registry, config)
            .await
            .map_err(|e| e.in_step(target.id()))?;
        completed.push(step);
    }

    info!(
        "deployed {}",
        completed.iter().map(|step| step.target().id()).join(", ")
    );
    Ok(completed)
}

/// Deploy a single contract
pub async fn deploy(
    args: DeployArgs,
    deployer: &impl ContractDeployer,
    registry: &dyn AddressRegistry,
    config: &DeployConfig,
) -> Result<(), ScriptError> {
    run_steps(&[args.contract], deployer, registry, config).await?;
    Ok(())
}

/// Deploy every contract
pub async fn deploy_all(
    deployer: &impl ContractDeployer,
    registry: &dyn AddressRegistry,
    config: &DeployConfig,
) -> Result<(), ScriptError> {
    run_steps(&DeployTarget::ALL, deployer, registry, config).await?;
    Ok(())
}

/// Record the configured router address in the registry
pub fn register_router_address(
    registry: &dyn AddressRegistry,
    config: &DeployConfig,
) -> Result<(), ScriptError> {
    register_router(registry, config)
        .map(|_| ())
        .map_err(|e| e.in_step("register-router"))
}

/// Print the address recorded under a name
pub fn get_address(
    args: GetAddressArgs,
    registry: &dyn AddressRegistry,
) -> Result<(), ScriptError> {
    let address = registry.get(&args.name)?;
    println!("{address}");
    Ok(())
}

/// Print every recorded address
pub fn list(registry: &dyn AddressRegistry) -> Result<(), ScriptError> {
    let entries = registry.entries()?;
    if entries.is_empty() {
        warn!("no deployments recorded");
    }

    for (name, address) in entries {
        println!("{name}: {address}");
    }
    Ok(())
}
