//! The `VirtualMachine` service and its builder.
//!
//! The virtual machine owns the context registry and the handles to its
//! collaborators. Its public operations are spread over the modules that
//! implement them:
//!
//! - [`process_transaction_set`](VirtualMachine::process_transaction_set) in `executor`
//! - [`transaction_set_pre_order`](VirtualMachine::transaction_set_pre_order) in `validation`
//! - [`run_local_method`](VirtualMachine::run_local_method) in `query`
//! - [`call_system_contract`](VirtualMachine::call_system_contract) in `system_contract`
//! - [`handle_sdk_call`](crate::SdkCallHandler::handle_sdk_call) in `sdk`

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use basalt_primitives::ProcessorType;

use crate::config::VmConfig;
use crate::context::ContextRegistry;
use crate::error::DeploymentError;
use crate::host::{CrosschainConnector, IpfsConnector, ManagementProvider, StateStorage};
use crate::processor::{Processor, SdkCallHandler};

/// Transaction execution core of a node.
pub struct VirtualMachine {
    pub(crate) config: VmConfig,
    pub(crate) contexts: ContextRegistry,
    pub(crate) processors: HashMap<ProcessorType, Arc<dyn Processor>>,
    pub(crate) state_storage: Arc<dyn StateStorage>,
    pub(crate) crosschain: Option<Arc<dyn CrosschainConnector>>,
    pub(crate) ipfs: Option<Arc<dyn IpfsConnector>>,
    pub(crate) management: Option<Arc<dyn ManagementProvider>>,
}

impl VirtualMachine {
    pub fn builder(config: VmConfig, state_storage: Arc<dyn StateStorage>) -> VirtualMachineBuilder {
        VirtualMachineBuilder::new(config, state_storage)
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Registry of live execution contexts.
    pub fn contexts(&self) -> &ContextRegistry {
        &self.contexts
    }

    pub(crate) fn processor(&self, processor_type: ProcessorType) -> Result<Arc<dyn Processor>, DeploymentError> {
        self.processors
            .get(&processor_type)
            .cloned()
            .ok_or(DeploymentError::UnknownProcessorType(processor_type.as_u32()))
    }

    /// System contracts always run on the native processor.
    pub(crate) fn native_processor(&self) -> Result<Arc<dyn Processor>, DeploymentError> {
        self.processors
            .get(&ProcessorType::Native)
            .cloned()
            .ok_or(DeploymentError::ProcessorNotRegistered(ProcessorType::Native))
    }
}

/// Assembles a [`VirtualMachine`] and attaches its processors.
pub struct VirtualMachineBuilder {
    config: VmConfig,
    state_storage: Arc<dyn StateStorage>,
    processors: HashMap<ProcessorType, Arc<dyn Processor>>,
    crosschain: Option<Arc<dyn CrosschainConnector>>,
    ipfs: Option<Arc<dyn IpfsConnector>>,
    management: Option<Arc<dyn ManagementProvider>>,
}

impl VirtualMachineBuilder {
    pub fn new(config: VmConfig, state_storage: Arc<dyn StateStorage>) -> Self {
        Self {
            config,
            state_storage,
            processors: HashMap::new(),
            crosschain: None,
            ipfs: None,
            management: None,
        }
    }

    pub fn processor(mut self, processor_type: ProcessorType, processor: Arc<dyn Processor>) -> Self {
        self.processors.insert(processor_type, processor);
        self
    }

    pub fn crosschain_connector(mut self, connector: Arc<dyn CrosschainConnector>) -> Self {
        self.crosschain = Some(connector);
        self
    }

    pub fn ipfs_connector(mut self, connector: Arc<dyn IpfsConnector>) -> Self {
        self.ipfs = Some(connector);
        self
    }

    pub fn management(mut self, management: Arc<dyn ManagementProvider>) -> Self {
        self.management = Some(management);
        self
    }

    /// Build the virtual machine and hand every processor a weak reference
    /// to it as its SDK call handler.
    pub fn build(self) -> Arc<VirtualMachine> {
        Arc::new_cyclic(|vm: &Weak<VirtualMachine>| {
            let handler: Weak<dyn SdkCallHandler> = vm.clone();
            for processor in self.processors.values() {
                processor.register_sdk_call_handler(handler.clone());
            }
            tracing::debug!(
                processors = self.processors.len(),
                virtual_chain_id = self.config.virtual_chain_id,
                "virtual machine created"
            );
            VirtualMachine {
                config: self.config,
                contexts: ContextRegistry::new(),
                processors: self.processors,
                state_storage: self.state_storage,
                crosschain: self.crosschain,
                ipfs: self.ipfs,
                management: self.management,
            }
        })
    }
}
