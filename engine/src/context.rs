//! Execution contexts and the registry that tracks them.
//!
//! A context lives for exactly one top-level call chain (a transaction, a
//! query, a system contract call or an auto-deployment). Processors only
//! ever see its id; SDK calls carry the id back so the router can recover
//! the context.
//!
//! The registry hands out `Arc<Mutex<ExecutionContext>>` handles. Callers
//! must not hold the context lock across a processor invocation, since the
//! processor re-enters the router on the same context.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use basalt_primitives::{
    AccessScope, BlockHeight, ContractName, Event, Signer, TimestampNano, TransientState,
};
use parking_lot::{Mutex, RwLock};

use crate::error::SdkError;
use crate::host::Deadline;

/// Handle of a live execution context.
///
/// Unique among simultaneously live contexts only: the counter wraps and
/// ids may be reused over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionContextId(pub u64);

impl fmt::Display for ExecutionContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Block-wide overlay shared by all transactions of one transaction set.
pub type BatchState = Arc<RwLock<TransientState>>;

/// Shared handle to a registered context.
pub type SharedContext = Arc<Mutex<ExecutionContext>>;

/// Parameters of a new context.
#[derive(Debug, Clone)]
pub struct ContextParams {
    /// Height storage reads are served at.
    pub last_committed_block_height: BlockHeight,
    /// Height reported to contracts through `Env`.
    pub block_height: BlockHeight,
    pub block_timestamp: TimestampNano,
    pub access_scope: AccessScope,
    pub signer: Option<Signer>,
    pub batch_state: Option<BatchState>,
    pub deadline: Deadline,
}

/// Mutable state of one in-flight call chain.
#[derive(Debug)]
pub struct ExecutionContext {
    id: ExecutionContextId,
    last_committed_block_height: BlockHeight,
    block_height: BlockHeight,
    block_timestamp: TimestampNano,
    access_scope: AccessScope,
    signer: Option<Signer>,
    service_stack: Vec<ContractName>,
    /// This call chain's own overlay: read-through cache plus dirty writes.
    pub transient_state: TransientState,
    batch_state: Option<BatchState>,
    events: Vec<Event>,
    deadline: Deadline,
}

impl ExecutionContext {
    fn new(id: ExecutionContextId, params: ContextParams) -> Self {
        Self {
            id,
            last_committed_block_height: params.last_committed_block_height,
            block_height: params.block_height,
            block_timestamp: params.block_timestamp,
            access_scope: params.access_scope,
            signer: params.signer,
            service_stack: Vec::new(),
            transient_state: TransientState::new(),
            batch_state: params.batch_state,
            events: Vec::new(),
            deadline: params.deadline,
        }
    }

    pub fn id(&self) -> ExecutionContextId {
        self.id
    }

    pub fn last_committed_block_height(&self) -> BlockHeight {
        self.last_committed_block_height
    }

    pub fn block_height(&self) -> BlockHeight {
        self.block_height
    }

    pub fn block_timestamp(&self) -> TimestampNano {
        self.block_timestamp
    }

    pub fn access_scope(&self) -> AccessScope {
        self.access_scope
    }

    pub fn signer(&self) -> Option<&Signer> {
        self.signer.as_ref()
    }

    pub fn batch_state(&self) -> Option<&BatchState> {
        self.batch_state.as_ref()
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    // ── Service stack ──

    pub fn push_service(&mut self, contract_name: &str) {
        self.service_stack.push(contract_name.to_owned());
    }

    /// Pop the top of the stack. Popping an empty stack is a no-op.
    pub fn pop_service(&mut self) {
        self.service_stack.pop();
    }

    /// Currently executing contract.
    pub fn current_service(&self) -> Option<&str> {
        self.service_stack.last().map(String::as_str)
    }

    /// Contract one below the top; `None` at depth 0 or 1.
    pub fn calling_service(&self) -> Option<&str> {
        let depth = self.service_stack.len();
        if depth < 2 {
            return None;
        }
        Some(self.service_stack[depth - 2].as_str())
    }

    pub fn stack_depth(&self) -> usize {
        self.service_stack.len()
    }

    // ── Events ──

    /// Record an event for the contract on top of the stack.
    pub fn add_event(&mut self, event_name: &str, packed_arguments: Vec<u8>) -> Result<(), SdkError> {
        let contract_name = self.current_service().ok_or(SdkError::EmptyServiceStack)?.to_owned();
        self.events.push(Event {
            contract_name,
            event_name: event_name.to_owned(),
            packed_arguments,
        });
        Ok(())
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    last_id: u64,
    contexts: HashMap<ExecutionContextId, SharedContext>,
}

/// Thread-safe allocator and lookup table for execution contexts.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    inner: RwLock<RegistryInner>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a fresh context with an empty stack and a fresh
    /// transient state.
    pub fn allocate(&self, params: ContextParams) -> (ExecutionContextId, SharedContext) {
        let mut inner = self.inner.write();
        inner.last_id = inner.last_id.wrapping_add(1);
        let id = ExecutionContextId(inner.last_id);
        let context = Arc::new(Mutex::new(ExecutionContext::new(id, params)));
        inner.contexts.insert(id, Arc::clone(&context));
        (id, context)
    }

    /// Like [`allocate`](Self::allocate), but the context is destroyed when
    /// the returned guard drops, on every exit path.
    pub fn allocate_scoped(&self, params: ContextParams) -> ContextGuard<'_> {
        let (id, context) = self.allocate(params);
        ContextGuard { registry: self, id, context }
    }

    /// Remove a context. Destroying an unknown id is a no-op.
    pub fn destroy(&self, id: ExecutionContextId) {
        self.inner.write().contexts.remove(&id);
    }

    pub fn lookup(&self, id: ExecutionContextId) -> Result<SharedContext, SdkError> {
        self.inner
            .read()
            .contexts
            .get(&id)
            .cloned()
            .ok_or(SdkError::UnknownContext(id))
    }

    /// Number of live contexts.
    pub fn len(&self) -> usize {
        self.inner.read().contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps a context registered for as long as it lives.
pub struct ContextGuard<'a> {
    registry: &'a ContextRegistry,
    id: ExecutionContextId,
    context: SharedContext,
}

impl ContextGuard<'_> {
    pub fn id(&self) -> ExecutionContextId {
        self.id
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.registry.destroy(self.id);
    }
}
