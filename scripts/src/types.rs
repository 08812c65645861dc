//! Type definitions used throughout the scripts

use std::fmt::{self, Display};

use clap::ValueEnum;

use crate::constants::{SUBSCRIPTION_MANAGER_CONTRACT_KEY, VESTING_TOKEN_CONTRACT_KEY};

/// The possible contracts to deploy
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeployTarget {
    /// The subscription manager contract
    SubscriptionManager,
    /// The vesting token contract
    VestingToken,
}

impl DeployTarget {
    /// Every deployable contract, in the order `deploy-all` runs them
    pub const ALL: [DeployTarget; 2] = [
        DeployTarget::SubscriptionManager,
        DeployTarget::VestingToken,
    ];

    /// The stable identifier of the deployment step, also its registry name
    pub fn id(&self) -> &'static str {
        match self {
            DeployTarget::SubscriptionManager => SUBSCRIPTION_MANAGER_CONTRACT_KEY,
            DeployTarget::VestingToken => VESTING_TOKEN_CONTRACT_KEY,
        }
    }

    /// The name of the compiled contract
    pub fn contract_name(&self) -> &'static str {
        self.id()
    }
}

impl Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployTarget::SubscriptionManager => write!(f, "subscription-manager"),
            DeployTarget::VestingToken => write!(f, "vesting-token"),
        }
    }
}

/// The lifecycle of a single deployment step
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepState {
    /// The step has not started
    Pending,
    /// The creation transaction has been handed to the deployer
    Submitted,
    /// The deployment has been confirmed on-chain
    Confirmed,
    /// The deployed address has been recorded in the registry
    Registered,
    /// The step failed; no further side effects follow
    Failed,
}

impl Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepState::Pending => write!(f, "pending"),
            StepState::Submitted => write!(f, "submitted"),
            StepState::Confirmed => write!(f, "confirmed"),
            StepState::Registered => write!(f, "registered"),
            StepState::Failed => write!(f, "failed"),
        }
    }
}
