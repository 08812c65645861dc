//! Contract creation against a live network

use std::{future::Future, path::PathBuf, str::FromStr, time::Duration};

use alloy::{
    dyn_abi::DynSolValue,
    network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
    providers::{Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use alloy_primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    artifacts::load_artifact, config::DeployConfig, constants::RECEIPT_POLL_INTERVAL,
    errors::ScriptError,
};

/// A contract to deploy, together with its constructor arguments
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentSpec {
    /// The name of the contract, used to resolve its artifact
    pub contract_name: String,
    /// The constructor arguments, in declaration order
    pub constructor_args: Vec<DynSolValue>,
}

impl DeploymentSpec {
    /// A spec for a contract with no constructor arguments
    pub fn new(contract_name: impl Into<String>) -> Self {
        Self {
            contract_name: contract_name.into(),
            constructor_args: Vec::new(),
        }
    }

    /// Append a constructor argument
    pub fn with_arg(mut self, arg: DynSolValue) -> Self {
        self.constructor_args.push(arg);
        self
    }

    /// The creation code: the contract bytecode followed by the ABI-encoded
    /// constructor arguments
    pub fn creation_code(&self, bytecode: &Bytes) -> Bytes {
        let mut code = bytecode.to_vec();
        if !self.constructor_args.is_empty() {
            code.extend(DynSolValue::Tuple(self.constructor_args.clone()).abi_encode_params());
        }

        code.into()
    }
}

/// A confirmed contract deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedContract {
    /// The address of the deployed contract
    pub address: Address,
    /// The hash of the contract creation transaction
    pub deployment_tx_hash: TxHash,
}

/// The execution context of a deployment: a signing identity and the
/// ability to create contracts
#[async_trait]
pub trait ContractDeployer: Send + Sync {
    /// The address of the account signing deployments
    fn deployer_address(&self) -> Address;

    /// Submit a contract creation transaction and wait for it to be confirmed
    async fn deploy(&self, spec: &DeploymentSpec) -> Result<DeployedContract, ScriptError>;
}

/// Await `fut`, failing with a deployment error if it does not resolve within `timeout`
pub async fn with_confirmation_timeout<T, F>(
    contract_name: &str,
    timeout: Duration,
    fut: F,
) -> Result<T, ScriptError>
where
    F: Future<Output = Result<T, ScriptError>>,
{
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        ScriptError::ContractDeployment(format!(
            "{} was not confirmed within {}s",
            contract_name,
            timeout.as_secs_f64()
        ))
    })?
}

// ----------------
// | RPC Deployer |
// ----------------

/// Sets up a provider that signs with the given private key and sends to the given RPC url
pub async fn setup_client(
    priv_key: &str,
    rpc_url: &str,
) -> Result<(impl Provider + Clone, Address), ScriptError> {
    let signer = PrivateKeySigner::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let deployer_address = signer.address();
    let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .on_http(url);

    let chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    info!("connected to chain {chain_id} at {rpc_url} as {deployer_address}");

    Ok((provider, deployer_address))
}

/// Deploys contracts over JSON-RPC, reading creation bytecode from compiled artifacts
pub struct RpcDeployer<P> {
    /// The signing provider
    provider: P,
    /// The address of the signing account
    deployer_address: Address,
    /// The directory holding compiled contract artifacts
    artifacts_dir: PathBuf,
    /// How long to wait for a deployment to be confirmed
    confirmation_timeout: Duration,
    /// The number of confirmations to wait for
    required_confirmations: u64,
    /// How long to sleep between polls of the node
    poll_interval: Duration,
}

impl<P: Provider> RpcDeployer<P> {
    /// Create a deployer using the given signing provider
    pub fn new(
        provider: P,
        deployer_address: Address,
        artifacts_dir: impl Into<PathBuf>,
        config: &DeployConfig,
    ) -> Self {
        Self {
            provider,
            deployer_address,
            artifacts_dir: artifacts_dir.into(),
            confirmation_timeout: config.confirmation_timeout,
            required_confirmations: config.required_confirmations,
            poll_interval: RECEIPT_POLL_INTERVAL,
        }
    }

    /// Send the creation transaction and wait for it to be confirmed.
    ///
    /// Submission, the receipt, and any further confirmations all run under
    /// the confirmation timeout.
    async fn send_and_confirm(
        &self,
        contract_name: &str,
        creation_code: Bytes,
    ) -> Result<DeployedContract, ScriptError> {
        with_confirmation_timeout(contract_name, self.confirmation_timeout, async {
            let tx = TransactionRequest::default()
                .with_from(self.deployer_address)
                .with_deploy_code(creation_code);

            let pending_tx = self
                .provider
                .send_transaction(tx)
                .await
                .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;
            let tx_hash = *pending_tx.tx_hash();
            info!("submitted {contract_name} deployment in tx {tx_hash}");

            let receipt = self.wait_for_receipt(tx_hash).await?;
            let address = deployed_address(contract_name, &receipt)?;
            self.wait_for_confirmations(&receipt).await?;

            Ok(DeployedContract {
                address,
                deployment_tx_hash: tx_hash,
            })
        })
        .await
    }

    /// Poll the node until the transaction has a receipt
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt, ScriptError> {
        // Watching the pending transaction through alloy does not reliably
        // resolve, so poll for the receipt instead
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

            match receipt {
                Some(receipt) => return Ok(receipt),
                None => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }

    /// Wait until the block including the receipt is buried under enough
    /// blocks to meet the required confirmations
    async fn wait_for_confirmations(
        &self,
        receipt: &TransactionReceipt,
    ) -> Result<(), ScriptError> {
        // Inclusion in a block is the first confirmation
        if self.required_confirmations <= 1 {
            return Ok(());
        }

        let tx_hash = receipt.transaction_hash;
        let mined_in = receipt.block_number().ok_or_else(|| {
            ScriptError::ContractDeployment(format!("receipt for tx {tx_hash} has no block number"))
        })?;
        let target = mined_in + self.required_confirmations - 1;

        loop {
            let head = self
                .provider
                .get_block_number()
                .await
                .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;
            if head >= target {
                debug!("tx {tx_hash} has {} confirmations", head - mined_in + 1);
                return Ok(());
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Check that a deployment receipt succeeded and return the created address
fn deployed_address(
    contract_name: &str,
    receipt: &TransactionReceipt,
) -> Result<Address, ScriptError> {
    let tx_hash = receipt.transaction_hash;
    if !receipt.status() {
        return Err(ScriptError::ContractDeployment(format!(
            "{contract_name} deployment reverted in tx {tx_hash}"
        )));
    }

    receipt.contract_address().ok_or_else(|| {
        ScriptError::ContractDeployment(format!("receipt for tx {tx_hash} has no contract address"))
    })
}

#[async_trait]
impl<P: Provider> ContractDeployer for RpcDeployer<P> {
    fn deployer_address(&self) -> Address {
        self.deployer_address
    }

    async fn deploy(&self, spec: &DeploymentSpec) -> Result<DeployedContract, ScriptError> {
        let artifact = load_artifact(&self.artifacts_dir, &spec.contract_name)?;
        let creation_code = spec.creation_code(&artifact.bytecode);
        debug!(
            "deploying {} with {} constructor args ({} bytes)",
            spec.contract_name,
            spec.constructor_args.len(),
            creation_code.len()
        );

        self.send_and_confirm(&spec.contract_name, creation_code).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, HashSet, VecDeque},
        fs,
        path::Path,
        sync::{Arc, Mutex},
        task::{Context, Poll},
    };

    use alloy::{
        providers::RootProvider,
        rpc::{
            client::RpcClient,
            json_rpc::{
                ErrorPayload, RequestPacket, Response, ResponsePacket, ResponsePayload,
                SerializedRequest,
            },
        },
        transports::{TransportError, TransportFut},
    };
    use alloy_primitives::{address, b256, U256};
    use serde_json::{json, Value};
    use tower::Service;

    use super::*;
    use crate::{
        registry::{AddressRegistry, MemoryRegistry},
        steps::DeploymentStep,
        types::{DeployTarget, StepState},
    };

    /// The signing account
    const DEPLOYER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    /// The address the node reports for the created contract
    const CREATED: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");
    /// The hash of the creation transaction
    const TX_HASH: TxHash =
        b256!("1111111111111111111111111111111111111111111111111111111111111111");

    /// Canned responses, keyed by JSON-RPC method
    #[derive(Default)]
    struct Canned {
        /// Responses returned in order; the last one repeats once the rest are used
        responses: HashMap<String, VecDeque<Value>>,
        /// Methods whose requests never get an answer
        hung: HashSet<String>,
    }

    /// A transport that answers from canned responses instead of a node
    #[derive(Clone, Default)]
    struct CannedRpc(Arc<Mutex<Canned>>);

    impl CannedRpc {
        /// Queue a response to `method`
        fn push(&self, method: &str, response: Value) {
            let mut canned = self.0.lock().unwrap();
            canned.responses.entry(method.to_string()).or_default().push_back(response);
        }

        /// Never answer `method`
        fn hang(&self, method: &str) {
            self.0.lock().unwrap().hung.insert(method.to_string());
        }

        /// Whether `method` is never answered
        fn is_hung(&self, method: &str) -> bool {
            self.0.lock().unwrap().hung.contains(method)
        }

        /// The next response to a request
        fn respond(&self, req: &SerializedRequest) -> Response {
            let mut canned = self.0.lock().unwrap();
            let next = canned.responses.get_mut(req.method()).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            });

            let payload = match next {
                Some(value) => {
                    ResponsePayload::Success(serde_json::value::to_raw_value(&value).unwrap())
                }
                None => ResponsePayload::Failure(ErrorPayload {
                    code: -32601,
                    message: format!("method {} not found", req.method()).into(),
                    data: None,
                }),
            };
            Response { id: req.id().clone(), payload }
        }
    }

    impl Service<RequestPacket> for CannedRpc {
        type Response = ResponsePacket;
        type Error = TransportError;
        type Future = TransportFut<'static>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: RequestPacket) -> Self::Future {
            let rpc = self.clone();
            Box::pin(async move {
                match req {
                    RequestPacket::Single(req) => {
                        if rpc.is_hung(req.method()) {
                            std::future::pending::<()>().await;
                        }
                        Ok(ResponsePacket::Single(rpc.respond(&req)))
                    }
                    RequestPacket::Batch(reqs) => {
                        Ok(ResponsePacket::Batch(reqs.iter().map(|req| rpc.respond(req)).collect()))
                    }
                }
            })
        }
    }

    /// A mined contract creation receipt in block 0x10
    fn creation_receipt(success: bool, contract_address: Option<Address>) -> Value {
        let status = if success { "0x1" } else { "0x0" };
        json!({
            "type": "0x2",
            "status": status,
            "cumulativeGasUsed": "0x1e8480",
            "logs": [],
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "transactionHash": TX_HASH,
            "transactionIndex": "0x0",
            "blockHash": b256!("2222222222222222222222222222222222222222222222222222222222222222"),
            "blockNumber": "0x10",
            "gasUsed": "0x1e8480",
            "effectiveGasPrice": "0x3b9aca00",
            "from": DEPLOYER,
            "to": null,
            "contractAddress": contract_address,
        })
    }

    /// A deployer talking to `rpc`, with a `VestingToken` artifact in `artifacts_dir`
    fn rpc_deployer(rpc: &CannedRpc, artifacts_dir: &Path) -> RpcDeployer<RootProvider> {
        let artifact = r#"{ "contractName": "VestingToken", "bytecode": "0x6080604052" }"#;
        fs::write(artifacts_dir.join("VestingToken.json"), artifact).unwrap();

        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .on_client(RpcClient::new(rpc.clone(), true));
        let config = DeployConfig::default();

        RpcDeployer {
            poll_interval: Duration::from_millis(10),
            ..RpcDeployer::new(provider, DEPLOYER, artifacts_dir, &config)
        }
    }

    #[test]
    fn test_creation_code_without_args() {
        let bytecode = Bytes::from_static(&[0x60, 0x80]);
        let spec = DeploymentSpec::new("VestingToken");

        assert_eq!(spec.creation_code(&bytecode), bytecode);
    }

    #[test]
    fn test_creation_code_appends_encoded_args() {
        let bytecode = Bytes::from_static(&[0x60, 0x80]);
        let spec = DeploymentSpec::new("SubscriptionManager")
            .with_arg(DynSolValue::Uint(U256::from(1_000_000u64), 256));

        let code = spec.creation_code(&bytecode);
        assert_eq!(code.len(), 2 + 32);
        assert_eq!(&code[..2], bytecode.as_ref());
        assert_eq!(U256::from_be_slice(&code[2..]), U256::from(1_000_000u64));
    }

    #[tokio::test]
    async fn test_confirmation_timeout() {
        let res: Result<(), _> = with_confirmation_timeout(
            "VestingToken",
            Duration::from_millis(10),
            std::future::pending(),
        )
        .await;

        assert!(matches!(
            res,
            Err(ScriptError::ContractDeployment(msg)) if msg.contains("not confirmed")
        ));
    }

    #[tokio::test]
    async fn test_confirmation_within_timeout() {
        let res = with_confirmation_timeout("VestingToken", Duration::from_secs(5), async {
            Ok::<_, ScriptError>(7)
        })
        .await;

        assert_eq!(res.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_setup_client_rejects_bad_key() {
        let res = setup_client("not-a-key", "http://127.0.0.1:8545").await;
        assert!(matches!(res, Err(ScriptError::ClientInitialization(_))));
    }

    #[tokio::test]
    async fn test_rpc_deployment_registered() {
        let dir = tempfile::tempdir().unwrap();
        let rpc = CannedRpc::default();
        rpc.push("eth_sendTransaction", json!(TX_HASH));
        // Not mined on the first poll
        rpc.push("eth_getTransactionReceipt", Value::Null);
        rpc.push("eth_getTransactionReceipt", creation_receipt(true, Some(CREATED)));

        let deployer = rpc_deployer(&rpc, dir.path());
        let registry = MemoryRegistry::new();
        let mut step = DeploymentStep::new(DeployTarget::VestingToken);
        assert!(step.run(&deployer, &registry, &DeployConfig::default()).await.unwrap());

        let deployed = step.deployed().unwrap();
        assert_eq!(deployed.address, CREATED);
        assert_eq!(deployed.deployment_tx_hash, TX_HASH);
        assert_eq!(registry.get("VestingToken").unwrap(), CREATED);
    }

    #[tokio::test]
    async fn test_rpc_reverted_deployment_not_registered() {
        let dir = tempfile::tempdir().unwrap();
        let rpc = CannedRpc::default();
        rpc.push("eth_sendTransaction", json!(TX_HASH));
        rpc.push("eth_getTransactionReceipt", creation_receipt(false, None));

        let deployer = rpc_deployer(&rpc, dir.path());
        let registry = MemoryRegistry::new();
        let mut step = DeploymentStep::new(DeployTarget::VestingToken);
        let res = step.run(&deployer, &registry, &DeployConfig::default()).await;

        assert!(matches!(
            res,
            Err(ScriptError::ContractDeployment(msg)) if msg.contains("reverted")
        ));
        assert_eq!(step.state(), StepState::Failed);
        assert_eq!(registry.num_writes(), 0);
    }

    #[tokio::test]
    async fn test_rpc_receipt_without_contract_address() {
        let dir = tempfile::tempdir().unwrap();
        let rpc = CannedRpc::default();
        rpc.push("eth_sendTransaction", json!(TX_HASH));
        rpc.push("eth_getTransactionReceipt", creation_receipt(true, None));

        let deployer = rpc_deployer(&rpc, dir.path());
        let res = deployer.deploy(&DeploymentSpec::new("VestingToken")).await;

        assert!(matches!(
            res,
            Err(ScriptError::ContractDeployment(msg)) if msg.contains("no contract address")
        ));
    }

    #[tokio::test]
    async fn test_rpc_unmined_deployment_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let rpc = CannedRpc::default();
        rpc.push("eth_sendTransaction", json!(TX_HASH));
        rpc.push("eth_getTransactionReceipt", Value::Null);

        let deployer = RpcDeployer {
            confirmation_timeout: Duration::from_millis(100),
            ..rpc_deployer(&rpc, dir.path())
        };
        let res = deployer.deploy(&DeploymentSpec::new("VestingToken")).await;

        assert!(matches!(
            res,
            Err(ScriptError::ContractDeployment(msg)) if msg.contains("not confirmed")
        ));
    }

    #[tokio::test]
    async fn test_rpc_unresponsive_submission_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let rpc = CannedRpc::default();
        rpc.hang("eth_sendTransaction");

        let deployer = RpcDeployer {
            confirmation_timeout: Duration::from_millis(100),
            ..rpc_deployer(&rpc, dir.path())
        };
        let registry = MemoryRegistry::new();
        let mut step = DeploymentStep::new(DeployTarget::VestingToken);
        let res = step.run(&deployer, &registry, &DeployConfig::default()).await;

        assert!(matches!(res, Err(ScriptError::ContractDeployment(_))));
        assert_eq!(registry.num_writes(), 0);
    }

    #[tokio::test]
    async fn test_rpc_waits_for_confirmations() {
        let dir = tempfile::tempdir().unwrap();
        let rpc = CannedRpc::default();
        rpc.push("eth_sendTransaction", json!(TX_HASH));
        rpc.push("eth_getTransactionReceipt", creation_receipt(true, Some(CREATED)));
        for head in ["0x10", "0x11", "0x12"] {
            rpc.push("eth_blockNumber", json!(head));
        }

        // Mined in 0x10, so the third confirmation is block 0x12
        let deployer = RpcDeployer {
            required_confirmations: 3,
            ..rpc_deployer(&rpc, dir.path())
        };
        let deployed = deployer.deploy(&DeploymentSpec::new("VestingToken")).await.unwrap();

        assert_eq!(deployed.address, CREATED);
    }

    #[tokio::test]
    async fn test_rpc_too_few_confirmations_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let rpc = CannedRpc::default();
        rpc.push("eth_sendTransaction", json!(TX_HASH));
        rpc.push("eth_getTransactionReceipt", creation_receipt(true, Some(CREATED)));
        // The chain never gets past the second confirmation
        rpc.push("eth_blockNumber", json!("0x11"));

        let deployer = RpcDeployer {
            required_confirmations: 3,
            confirmation_timeout: Duration::from_millis(200),
            ..rpc_deployer(&rpc, dir.path())
        };
        let registry = MemoryRegistry::new();
        let mut step = DeploymentStep::new(DeployTarget::VestingToken);
        let res = step.run(&deployer, &registry, &DeployConfig::default()).await;

        assert!(matches!(res, Err(ScriptError::ContractDeployment(_))));
        assert_eq!(registry.num_writes(), 0);
    }
}
