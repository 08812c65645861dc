//! Deployment configuration, parsed and validated once at startup

use std::{str::FromStr, time::Duration};

use alloy_primitives::{Address, U256};

use crate::{
    constants::{
        DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_NUM_CONFIRMATIONS, TOTAL_SUPPLY_ENV_VAR,
        UNISWAP_V2_ADDR_ENV_VAR,
    },
    errors::ScriptError,
};

/// Unvalidated configuration values, as they arrive from the CLI or environment
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    /// The SubscriptionManager total supply, in base-10
    pub total_supply: Option<String>,
    /// The Uniswap V2 router address, in hex
    pub router_address: Option<String>,
    /// The confirmation timeout, in seconds
    pub confirmation_timeout_secs: Option<u64>,
    /// The number of confirmations to wait for
    pub confirmations: Option<u64>,
}

/// The validated configuration passed to every deployment step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    /// The SubscriptionManager total supply
    total_supply: Option<U256>,
    /// The Uniswap V2 router address
    router_address: Option<Address>,
    /// How long to wait for a deployment to be confirmed
    pub confirmation_timeout: Duration,
    /// The number of confirmations to wait for
    pub required_confirmations: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            total_supply: None,
            router_address: None,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            required_confirmations: DEFAULT_NUM_CONFIRMATIONS,
        }
    }
}

impl DeployConfig {
    /// Parse and validate the raw configuration.
    ///
    /// Values that are present but malformed are rejected here, before any
    /// step runs. Values that are absent are only rejected by the steps that
    /// require them.
    pub fn from_raw(raw: RawConfig) -> Result<Self, ScriptError> {
        let total_supply = raw.total_supply.as_deref().map(parse_total_supply).transpose()?;
        let router_address =
            raw.router_address.as_deref().map(parse_router_address).transpose()?;

        let confirmation_timeout = match raw.confirmation_timeout_secs {
            Some(0) => {
                return Err(ScriptError::Configuration(
                    "confirmation timeout must be positive".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_CONFIRMATION_TIMEOUT,
        };

        // A deployment is confirmed once it is included in a block
        let required_confirmations = match raw.confirmations {
            Some(0) => {
                return Err(ScriptError::Configuration(
                    "at least one confirmation is required".to_string(),
                ))
            }
            Some(n) => n,
            None => DEFAULT_NUM_CONFIRMATIONS,
        };

        Ok(Self {
            total_supply,
            router_address,
            confirmation_timeout,
            required_confirmations,
        })
    }

    /// Set the total supply
    pub fn with_total_supply(mut self, total_supply: U256) -> Self {
        self.total_supply = Some(total_supply);
        self
    }

    /// Set the router address
    pub fn with_router_address(mut self, router_address: Address) -> Self {
        self.router_address = Some(router_address);
        self
    }

    /// The SubscriptionManager total supply, required by its deployment
    pub fn total_supply(&self) -> Result<U256, ScriptError> {
        self.total_supply.ok_or_else(|| not_set(TOTAL_SUPPLY_ENV_VAR))
    }

    /// The Uniswap V2 router address, required by router registration
    pub fn router_address(&self) -> Result<Address, ScriptError> {
        self.router_address.ok_or_else(|| not_set(UNISWAP_V2_ADDR_ENV_VAR))
    }
}

/// The error for a required value that was not provided
fn not_set(var: &str) -> ScriptError {
    ScriptError::Configuration(format!("{} is not set", var))
}

/// Parse a base-10 total supply.
///
/// Only plain digits are accepted, so signs, hex prefixes, and fractional
/// values are rejected rather than coerced.
fn parse_total_supply(value: &str) -> Result<U256, ScriptError> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScriptError::Configuration(format!(
            "{} must be a base-10 unsigned integer, got `{}`",
            TOTAL_SUPPLY_ENV_VAR, value
        )));
    }

    U256::from_str_radix(value, 10)
        .map_err(|e| ScriptError::Configuration(format!("{}: {}", TOTAL_SUPPLY_ENV_VAR, e)))
}

/// Parse a hex router address
fn parse_router_address(value: &str) -> Result<Address, ScriptError> {
    Address::from_str(value.trim()).map_err(|e| {
        ScriptError::Configuration(format!(
            "{} is not a valid address (`{}`): {}",
            UNISWAP_V2_ADDR_ENV_VAR, value, e
        ))
    })
}
