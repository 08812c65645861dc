//! Scripts for deploying the SubscriptionManager and VestingToken contracts
//! and recording their addresses.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod deployer;
pub mod errors;
pub mod registry;
pub mod router;
pub mod steps;
pub mod types;
