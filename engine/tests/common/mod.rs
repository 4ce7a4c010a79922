//! Shared test helpers for integration tests.
//!
//! Provides deterministic keypairs, a scriptable native processor whose
//! contract methods are closures calling back into the VM, fake external
//! collaborators, and a `Harness` wiring them into a `VirtualMachine`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use basalt_engine::{
    CollaboratorError, ContextParams, ContractInfo, CrosschainConnector,
    EthereumCallInput, EthereumLogsInput, EthereumLogsOutput, ExecutionContextId, IpfsConnector,
    ManagementProvider, MemStateStorage, ProcessCallInput, ProcessCallOutput, Processor,
    ProcessorFault, SdkCallHandler, SdkCallRequest, SdkError, VirtualMachine, VmConfig,
};
use basalt_engine::context::SharedContext;
use basalt_primitives::codec::{decode_argument_array, encode_argument_array};
use basalt_primitives::crypto::client_address_from_public_key;
use basalt_primitives::{
    AccessScope, Argument, ArgumentArray, ClientAddress, ContractStateDiff,
    ExecutionResult, PermissionScope, ProcessorType, Query, SignedTransaction, Signer,
    TimestampNano, TimestampSeconds, Transaction, PROTOCOL_VERSION,
};
use parking_lot::Mutex;

pub use basalt_engine::Deadline;

pub const TOKEN: &str = "BenchmarkToken";
pub const SECOND: u64 = 1_000_000_000;
/// Block timestamp used by most tests, in nanoseconds.
pub const BLOCK_TIMESTAMP: TimestampNano = 1_700_000_000 * SECOND;
/// Reference time matching `BLOCK_TIMESTAMP`, in seconds.
pub const REFERENCE_TIME: TimestampSeconds = 1_700_000_000;

// ── Deterministic Keypairs ──

/// Create a deterministic Ed25519 signing key from a single seed byte.
///
/// The secret key is `[seed; 32]`, giving reproducible keys across machines.
pub fn deterministic_keypair(seed: u8) -> (ed25519_dalek::VerifyingKey, ed25519_dalek::SigningKey) {
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&[seed; 32]);
    let verifying_key = signing_key.verifying_key();
    (verifying_key, signing_key)
}

/// A test account: its signer, signing key and client address.
pub struct Account {
    pub signer: Signer,
    pub signing_key: ed25519_dalek::SigningKey,
    pub address: ClientAddress,
}

pub fn account(seed: u8) -> Account {
    let (vk, sk) = deterministic_keypair(seed);
    Account {
        signer: Signer::ed25519(vk.to_bytes()),
        signing_key: sk,
        address: client_address_from_public_key(vk.as_bytes()),
    }
}

/// Alice: seed=1.
pub fn alice() -> Account {
    account(1)
}

/// Bob: seed=2.
pub fn bob() -> Account {
    account(2)
}

// ── Sdk: contract-side view of the SDK boundary ──

/// What a fake contract method sees: the VM's SDK handler bound to the
/// context and permission scope of the running call.
pub struct Sdk {
    handler: Arc<dyn SdkCallHandler>,
    pub context_id: ExecutionContextId,
    pub permission_scope: PermissionScope,
}

impl Sdk {
    pub fn call(&self, operation: &str, method: &str, args: ArgumentArray) -> Result<ArgumentArray, SdkError> {
        self.handler.handle_sdk_call(SdkCallRequest::new(
            self.context_id,
            operation,
            method,
            args,
            self.permission_scope,
        ))
    }

    pub fn state_read(&self, key: &[u8]) -> Result<Vec<u8>, String> {
        let out = self
            .call("Sdk.State", "read", ArgumentArray::single(key))
            .map_err(|e| e.to_string())?;
        Ok(out.get(0).and_then(Argument::as_bytes).unwrap_or_default().to_vec())
    }

    pub fn state_write(&self, key: &[u8], value: &[u8]) -> Result<(), String> {
        self.call(
            "Sdk.State",
            "write",
            ArgumentArray::from(vec![Argument::from(key), Argument::from(value)]),
        )
        .map(|_| ())
        .map_err(|e| e.to_string())
    }

    pub fn read_u64(&self, key: &[u8]) -> Result<u64, String> {
        Ok(decode_u64(&self.state_read(key)?))
    }

    pub fn write_u64(&self, key: &[u8], value: u64) -> Result<(), String> {
        self.state_write(key, &value.to_le_bytes())
    }

    pub fn emit(&self, event_name: &str, args: &ArgumentArray) -> Result<(), String> {
        self.call(
            "Sdk.Events",
            "emitEvent",
            ArgumentArray::from(vec![Argument::from(event_name), Argument::Bytes(encode_argument_array(args))]),
        )
        .map(|_| ())
        .map_err(|e| e.to_string())
    }

    /// Nested call through `Sdk.Service.callMethod`.
    pub fn call_service(&self, service: &str, method: &str, args: &ArgumentArray) -> Result<ArgumentArray, SdkError> {
        let out = self.call(
            "Sdk.Service",
            "callMethod",
            ArgumentArray::from(vec![
                Argument::from(service),
                Argument::from(method),
                Argument::Bytes(encode_argument_array(args)),
            ]),
        )?;
        let packed = out.get(0).and_then(Argument::as_bytes).unwrap_or_default();
        Ok(decode_argument_array(packed)?)
    }

    pub fn address(&self, method: &str) -> Result<Vec<u8>, SdkError> {
        let out = self.call("Sdk.Address", method, ArgumentArray::new())?;
        Ok(out.get(0).and_then(Argument::as_bytes).unwrap_or_default().to_vec())
    }
}

pub fn decode_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[..len].copy_from_slice(&bytes[..len]);
    u64::from_le_bytes(buf)
}

// ── FakeProcessor: scriptable native processor ──

pub type MethodFn = Arc<dyn Fn(&Sdk, &ArgumentArray) -> Result<ArgumentArray, String> + Send + Sync>;

struct FakeContract {
    permission_scope: PermissionScope,
    methods: HashMap<String, MethodFn>,
}

/// A processor whose contracts are registered at runtime.
///
/// A method returning `Err(message)` fails with `ERROR_SMART_CONTRACT` and
/// the message as its only output. Every call is counted and its input
/// recorded.
#[derive(Default)]
pub struct FakeProcessor {
    handler: Mutex<Option<Weak<dyn SdkCallHandler>>>,
    contracts: Mutex<HashMap<String, FakeContract>>,
    calls: Mutex<HashMap<(String, String), usize>>,
    inputs: Mutex<Vec<ProcessCallInput>>,
}

impl FakeProcessor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn contract(&self, name: &str, permission_scope: PermissionScope) {
        self.contracts.lock().insert(
            name.to_owned(),
            FakeContract { permission_scope, methods: HashMap::new() },
        );
    }

    /// Register a method, creating a SERVICE-scoped contract if needed.
    pub fn method<F>(&self, contract: &str, method: &str, f: F)
    where
        F: Fn(&Sdk, &ArgumentArray) -> Result<ArgumentArray, String> + Send + Sync + 'static,
    {
        self.contracts
            .lock()
            .entry(contract.to_owned())
            .or_insert_with(|| FakeContract {
                permission_scope: PermissionScope::Service,
                methods: HashMap::new(),
            })
            .methods
            .insert(method.to_owned(), Arc::new(f));
    }

    pub fn calls(&self, contract: &str, method: &str) -> usize {
        self.calls
            .lock()
            .get(&(contract.to_owned(), method.to_owned()))
            .copied()
            .unwrap_or(0)
    }

    /// Recorded inputs of one contract method, in call order.
    pub fn inputs_of(&self, contract: &str, method: &str) -> Vec<ProcessCallInput> {
        self.inputs
            .lock()
            .iter()
            .filter(|input| input.contract_name == contract && input.method_name == method)
            .cloned()
            .collect()
    }
}

impl Processor for FakeProcessor {
    fn process_call(&self, input: ProcessCallInput) -> Result<ProcessCallOutput, ProcessorFault> {
        *self
            .calls
            .lock()
            .entry((input.contract_name.clone(), input.method_name.clone()))
            .or_insert(0) += 1;
        self.inputs.lock().push(input.clone());

        let (method, permission_scope) = {
            let contracts = self.contracts.lock();
            let contract = contracts
                .get(&input.contract_name)
                .ok_or_else(|| ProcessorFault(format!("unknown contract {}", input.contract_name)))?;
            match contract.methods.get(&input.method_name) {
                Some(method) => (Arc::clone(method), contract.permission_scope),
                None => {
                    return Ok(ProcessCallOutput::failure(
                        ExecutionResult::ErrorSmartContract,
                        format!("method {} not found", input.method_name),
                    ))
                }
            }
        };

        let handler = self
            .handler
            .lock()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| ProcessorFault("sdk handler not registered".into()))?;
        let sdk = Sdk {
            handler,
            context_id: input.context_id,
            permission_scope,
        };

        Ok(match method(&sdk, &input.input_arguments) {
            Ok(output) => ProcessCallOutput::success(output),
            Err(message) => ProcessCallOutput::failure(ExecutionResult::ErrorSmartContract, message),
        })
    }

    fn get_contract_info(&self, contract_name: &str) -> Result<ContractInfo, ProcessorFault> {
        self.contracts
            .lock()
            .get(contract_name)
            .map(|contract| ContractInfo { permission_scope: contract.permission_scope })
            .ok_or_else(|| ProcessorFault(format!("unknown contract {}", contract_name)))
    }

    fn register_sdk_call_handler(&self, handler: Weak<dyn SdkCallHandler>) {
        *self.handler.lock() = Some(handler);
    }
}

// ── System and sample contracts ──

/// `_Deployments` keeps one entry per contract: key = contract name,
/// value = processor type as u32 LE.
pub fn install_deployments(native: &FakeProcessor) {
    native.contract("_Deployments", PermissionScope::System);
    native.method("_Deployments", "getInfo", |sdk, args| {
        let name = args.get(0).and_then(Argument::as_str).ok_or("expected contract name")?;
        let value = sdk.state_read(name.as_bytes())?;
        if value.is_empty() {
            return Err(format!("contract {} not deployed", name));
        }
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&value[..4]);
        Ok(ArgumentArray::single(u32::from_le_bytes(tag)))
    });
    native.method("_Deployments", "deployService", |sdk, args| {
        let name = args.get(0).and_then(Argument::as_str).ok_or("expected contract name")?;
        let tag = args.get(1).and_then(Argument::as_uint32).ok_or("expected processor type")?;
        if !sdk.state_read(name.as_bytes())?.is_empty() {
            return Err(format!("contract {} already deployed", name));
        }
        sdk.state_write(name.as_bytes(), &tag.to_le_bytes())?;
        Ok(ArgumentArray::new())
    });
}

/// `_GlobalPreOrder.approve` succeeds unless `reject` is set.
pub fn install_global_pre_order(native: &FakeProcessor, reject: bool) {
    native.contract("_GlobalPreOrder", PermissionScope::System);
    native.method("_GlobalPreOrder", "approve", move |_sdk, _args| {
        if reject {
            Err("batch not approved".into())
        } else {
            Ok(ArgumentArray::new())
        }
    });
}

/// Token with balances stored as u64 LE under the holder's address.
///
/// - `transfer(u64 amount, bytes to)` moves from the caller
/// - `getBalance(bytes address) -> u64`
pub fn install_token(native: &FakeProcessor) {
    native.contract(TOKEN, PermissionScope::Service);
    native.method(TOKEN, "transfer", |sdk, args| {
        let amount = args.get(0).and_then(Argument::as_uint64).ok_or("expected amount")?;
        let to = args.get(1).and_then(Argument::as_bytes).ok_or("expected target")?.to_vec();
        let from = sdk.address("getCallerAddress").map_err(|e| e.to_string())?;

        let from_balance = sdk.read_u64(&from)?;
        if amount > from_balance {
            return Err(format!("transfer of {} exceeds balance {}", amount, from_balance));
        }
        sdk.write_u64(&from, from_balance - amount)?;
        let to_balance = sdk.read_u64(&to)?;
        sdk.write_u64(&to, to_balance + amount)?;

        sdk.emit(
            "Transfer",
            &ArgumentArray::from(vec![Argument::from(from), Argument::from(to), Argument::Uint64(amount)]),
        )?;
        Ok(ArgumentArray::new())
    });
    native.method(TOKEN, "getBalance", |sdk, args| {
        let address = args.get(0).and_then(Argument::as_bytes).ok_or("expected address")?;
        Ok(ArgumentArray::single(sdk.read_u64(address)?))
    });
}

// ── Fake external collaborators ──

pub struct FakeEthereum {
    pub call_output: Mutex<Result<Vec<u8>, CollaboratorError>>,
    pub logs: Mutex<EthereumLogsOutput>,
    pub block_number: Mutex<u64>,
    pub call_inputs: Mutex<Vec<EthereumCallInput>>,
    pub log_inputs: Mutex<Vec<EthereumLogsInput>>,
    pub block_number_references: Mutex<Vec<TimestampNano>>,
}

impl FakeEthereum {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            call_output: Mutex::new(Ok(Vec::new())),
            logs: Mutex::new(EthereumLogsOutput::default()),
            block_number: Mutex::new(0),
            call_inputs: Mutex::new(Vec::new()),
            log_inputs: Mutex::new(Vec::new()),
            block_number_references: Mutex::new(Vec::new()),
        })
    }
}

impl CrosschainConnector for FakeEthereum {
    fn ethereum_call_contract(&self, input: &EthereumCallInput, _deadline: Deadline) -> Result<Vec<u8>, CollaboratorError> {
        self.call_inputs.lock().push(input.clone());
        self.call_output.lock().clone()
    }

    fn ethereum_get_transaction_logs(
        &self,
        input: &EthereumLogsInput,
        _deadline: Deadline,
    ) -> Result<EthereumLogsOutput, CollaboratorError> {
        self.log_inputs.lock().push(input.clone());
        Ok(self.logs.lock().clone())
    }

    fn ethereum_get_block_number(&self, reference_timestamp: TimestampNano, _deadline: Deadline) -> Result<u64, CollaboratorError> {
        self.block_number_references.lock().push(reference_timestamp);
        Ok(*self.block_number.lock())
    }
}

#[derive(Default)]
pub struct FakeIpfs {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
}

impl IpfsConnector for FakeIpfs {
    fn read(&self, hash: &str, _deadline: Deadline) -> Result<Vec<u8>, CollaboratorError> {
        self.files
            .lock()
            .get(hash)
            .cloned()
            .ok_or_else(|| CollaboratorError::Ipfs(format!("{} not found", hash)))
    }
}

pub struct FakeManagement {
    pub status: Mutex<Result<bool, CollaboratorError>>,
}

impl Default for FakeManagement {
    fn default() -> Self {
        Self { status: Mutex::new(Ok(true)) }
    }
}

impl ManagementProvider for FakeManagement {
    fn get_subscription_status(&self, _reference_time: TimestampSeconds) -> Result<bool, CollaboratorError> {
        self.status.lock().clone()
    }
}

// ── Harness ──

pub struct Harness {
    pub vm: Arc<VirtualMachine>,
    pub storage: Arc<MemStateStorage>,
    pub native: Arc<FakeProcessor>,
    pub ethereum: Arc<FakeEthereum>,
    pub ipfs: Arc<FakeIpfs>,
    pub management: Arc<FakeManagement>,
}

impl Harness {
    /// Default config, `_Deployments`, an approving `_GlobalPreOrder` and
    /// the token contract.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let storage = Arc::new(MemStateStorage::new());
        let native = FakeProcessor::new();
        install_deployments(&native);
        install_global_pre_order(&native, false);
        install_token(&native);

        let ethereum = FakeEthereum::new();
        let ipfs = Arc::new(FakeIpfs::default());
        let management = Arc::new(FakeManagement::default());

        let vm = VirtualMachine::builder(config, storage.clone())
            .processor(ProcessorType::Native, native.clone())
            .crosschain_connector(ethereum.clone())
            .ipfs_connector(ipfs.clone())
            .management(management.clone())
            .build();

        Self { vm, storage, native, ethereum, ipfs, management }
    }

    /// Record a committed deployment of `contract`.
    pub fn deploy_committed(&self, contract: &str, processor_type: u32) {
        self.storage
            .set_committed("_Deployments", contract.as_bytes(), &processor_type.to_le_bytes());
    }

    pub fn set_balance(&self, address: &ClientAddress, balance: u64) {
        self.storage.set_committed(TOKEN, address, &balance.to_le_bytes());
    }

    pub fn transaction(&self, from: &Account, contract: &str, method: &str, args: ArgumentArray) -> SignedTransaction {
        let tx = Transaction {
            protocol_version: PROTOCOL_VERSION,
            virtual_chain_id: self.vm.config().virtual_chain_id,
            timestamp: BLOCK_TIMESTAMP,
            signer: from.signer.clone(),
            contract_name: contract.to_owned(),
            method_name: method.to_owned(),
            input_arguments: args,
        };
        SignedTransaction::sign_ed25519(tx, &from.signing_key)
    }

    pub fn transfer(&self, from: &Account, amount: u64, to: &ClientAddress) -> SignedTransaction {
        self.transaction(
            from,
            TOKEN,
            "transfer",
            ArgumentArray::from(vec![Argument::Uint64(amount), Argument::from(&to[..])]),
        )
    }

    pub fn query(&self, from: &Account, contract: &str, method: &str, args: ArgumentArray) -> Query {
        Query {
            protocol_version: PROTOCOL_VERSION,
            virtual_chain_id: self.vm.config().virtual_chain_id,
            timestamp: BLOCK_TIMESTAMP,
            signer: from.signer.clone(),
            contract_name: contract.to_owned(),
            method_name: method.to_owned(),
            input_arguments: args,
        }
    }

    /// Register a context directly, with `stack` pushed in order, for
    /// driving the SDK router without a processor in between.
    pub fn open_context(
        &self,
        access_scope: AccessScope,
        signer: Option<Signer>,
        stack: &[&str],
    ) -> (ExecutionContextId, SharedContext) {
        let (id, context) = self.vm.contexts().allocate(ContextParams {
            last_committed_block_height: 9,
            block_height: 10,
            block_timestamp: BLOCK_TIMESTAMP,
            access_scope,
            signer,
            batch_state: None,
            deadline: Deadline::none(),
        });
        {
            let mut ctx = context.lock();
            for contract in stack {
                ctx.push_service(contract);
            }
        }
        (id, context)
    }

    /// Issue an SDK call as a SERVICE-scoped contract.
    pub fn sdk_call(
        &self,
        context_id: ExecutionContextId,
        operation: &str,
        method: &str,
        args: ArgumentArray,
    ) -> Result<ArgumentArray, SdkError> {
        self.vm.handle_sdk_call(SdkCallRequest::new(
            context_id,
            operation,
            method,
            args,
            PermissionScope::Service,
        ))
    }
}

/// Diff entries of one contract as (key, value) pairs.
pub fn diff_of(diffs: &[ContractStateDiff], contract: &str) -> Vec<(Vec<u8>, Vec<u8>)> {
    diffs
        .iter()
        .filter(|diff| diff.contract_name == contract)
        .flat_map(|diff| diff.state_diffs.iter().map(|r| (r.key.clone(), r.value.clone())))
        .collect()
}

pub fn u64_entry(key: &[u8], value: u64) -> (Vec<u8>, Vec<u8>) {
    (key.to_vec(), value.to_le_bytes().to_vec())
}
