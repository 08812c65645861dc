//! Constants used in the deploy scripts

use std::time::Duration;

/// The registry name of the SubscriptionManager contract
pub const SUBSCRIPTION_MANAGER_CONTRACT_KEY: &str = "SubscriptionManager";

/// The registry name of the VestingToken contract
pub const VESTING_TOKEN_CONTRACT_KEY: &str = "VestingToken";

/// The registry name under which the Uniswap V2 router address is recorded
pub const UNISWAP_V2_ROUTER_KEY: &str = "UniswapV2Router";

/// The environment variable holding the SubscriptionManager total supply
pub const TOTAL_SUPPLY_ENV_VAR: &str = "TOTAL_SUPPLY";

/// The environment variable holding the Uniswap V2 router address
pub const UNISWAP_V2_ADDR_ENV_VAR: &str = "UNISWAP_V2_ADDR";

/// The environment variable holding the confirmation timeout, in seconds
pub const CONFIRMATION_TIMEOUT_ENV_VAR: &str = "CONFIRMATION_TIMEOUT_SECS";

/// The environment variable holding the number of confirmations to wait for
pub const NUM_CONFIRMATIONS_ENV_VAR: &str = "NUM_CONFIRMATIONS";

/// The default time to wait for a deployment transaction to be confirmed
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// The default number of confirmations to wait for the contract deployment transaction
pub const DEFAULT_NUM_CONFIRMATIONS: u64 = 1;

/// How often to poll the node while waiting on a deployment
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The default RPC URL, a local devnet node
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// The default path of the deployments file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";

/// The default directory containing compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The extension of a compiled contract artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// The extension of a Solidity source file, used as a directory name in artifact layouts
pub const SOLIDITY_EXTENSION: &str = "sol";

/// The directory holding source-mirrored artifacts in the hardhat layout
pub const HARDHAT_SOURCES_DIR: &str = "contracts";

/// The bytecode key in a compilation artifact
pub const BYTECODE_KEY: &str = "bytecode";

/// The key of the hex bytecode when the bytecode field is an object
pub const BYTECODE_OBJECT_KEY: &str = "object";
