//! A single deployment step: deploy one contract and record its address

use alloy::dyn_abi::DynSolValue;
use tracing::{error, info};

use crate::{
    config::DeployConfig,
    deployer::{ContractDeployer, DeployedContract, DeploymentSpec},
    errors::ScriptError,
    registry::AddressRegistry,
    types::{DeployTarget, StepState},
};

impl DeployTarget {
    /// Check that every configuration value this target needs is present
    pub fn validate(&self, config: &DeployConfig) -> Result<(), ScriptError> {
        match self {
            DeployTarget::SubscriptionManager => config.total_supply().map(|_| ()),
            DeployTarget::VestingToken => Ok(()),
        }
    }

    /// Build the deployment spec for this target from the configuration
    pub fn deployment_spec(&self, config: &DeployConfig) -> Result<DeploymentSpec, ScriptError> {
        let spec = DeploymentSpec::new(self.contract_name());
        match self {
            DeployTarget::SubscriptionManager => {
                Ok(spec.with_arg(DynSolValue::Uint(config.total_supply()?, 256)))
            }
            DeployTarget::VestingToken => Ok(spec),
        }
    }
}

/// A deployment step for a single contract, tracking its lifecycle
#[derive(Debug)]
pub struct DeploymentStep {
    /// The contract this step deploys
    target: DeployTarget,
    /// The current state of the step
    state: StepState,
    /// The deployment, once confirmed
    deployed: Option<DeployedContract>,
}

impl DeploymentStep {
    /// A pending step for the given target
    pub fn new(target: DeployTarget) -> Self {
        Self {
            target,
            state: StepState::Pending,
            deployed: None,
        }
    }

    /// The contract this step deploys
    pub fn target(&self) -> DeployTarget {
        self.target
    }

    /// The current state of the step
    pub fn state(&self) -> StepState {
        self.state
    }

    /// The confirmed deployment, if the step got that far
    pub fn deployed(&self) -> Option<DeployedContract> {
        self.deployed
    }

    /// Move to the given state
    fn transition(&mut self, next: StepState) {
        info!("{}: {} -> {}", self.target.id(), self.state, next);
        self.state = next;
    }

    /// Run the step: deploy the contract, wait for confirmation, and record its address.
    ///
    /// Configuration is checked before anything is submitted. Any failure
    /// leaves the step `Failed` and nothing after the failure point runs; in
    /// particular a failed deployment is never registered.
    ///
    /// A step that already finished is not run again: a registered step
    /// returns its outcome and a failed step returns an error.
    pub async fn run(
        &mut self,
        deployer: &impl ContractDeployer,
        registry: &dyn AddressRegistry,
        config: &DeployConfig,
    ) -> Result<bool, ScriptError> {
        match self.state {
            StepState::Registered => return Ok(true),
            StepState::Failed => {
                return Err(ScriptError::ContractDeployment(format!(
                    "{} already failed and is not retried",
                    self.target.id()
                )))
            }
            _ => {}
        }

        match self.execute(deployer, registry, config).await {
            Ok(()) => Ok(true),
            Err(e) => {
                error!("{} failed: {}", self.target.id(), e);
                self.transition(StepState::Failed);
                Err(e)
            }
        }
    }

    /// The fallible body of `run`
    async fn execute(
        &mut self,
        deployer: &impl ContractDeployer,
        registry: &dyn AddressRegistry,
        config: &DeployConfig,
    ) -> Result<(), ScriptError> {
        self.target.validate(config)?;
        let spec = self.target.deployment_spec(config)?;

        self.transition(StepState::Submitted);
        let deployed = deployer.deploy(&spec).await?;
        self.deployed = Some(deployed);
        self.transition(StepState::Confirmed);

        registry.set(self.target.id(), deployed.address)?;
        self.transition(StepState::Registered);

        info!(
            "### {} deployed at {} (tx {}) by {}",
            self.target.id(),
            deployed.address,
            deployed.deployment_tx_hash,
            deployer.deployer_address()
        );
        Ok(())
    }
}
