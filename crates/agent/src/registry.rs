//! Static tool registry: name -> execution binding + parameter contract.
//!
//! Built once at process start. A lookup miss is a programming error
//! (`UnknownTool`), distinct from a user-facing unsupported intent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use shopmate_core::errors::{AgentError, ChannelError};
use shopmate_core::intent::ParamType;
use shopmate_transport::ToolChannel;

use crate::tools;

/// The one seam between the orchestrator and a tool-server subprocess.
/// `ToolChannel` is the production implementation; tests substitute fakes.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    async fn call(
        &self,
        method: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<Value, ChannelError>;

    fn is_degraded(&self) -> bool;
}

#[async_trait]
impl ToolTransport for ToolChannel {
    async fn call(
        &self,
        method: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<Value, ChannelError> {
        self.call_with_timeout(method, args, timeout).await
    }

    fn is_degraded(&self) -> bool {
        ToolChannel::is_degraded(self)
    }
}

/// Pure in-process tool: argument validation is its only failure mode.
pub type InProcessTool = fn(&Value) -> Result<Value, AgentError>;

pub enum ToolBinding {
    Channel { transport: Arc<dyn ToolTransport>, method: &'static str },
    InProcess(InProcessTool),
}

#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub required: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct ToolContract {
    pub name: &'static str,
    pub params: &'static [ParamSpec],
}

pub struct RegisteredTool {
    pub contract: ToolContract,
    pub binding: ToolBinding,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, RegisteredTool>,
}

const LIST_PRODUCTS: ToolContract = ToolContract {
    name: "list_products",
    params: &[ParamSpec { name: "category", param_type: ParamType::Text, required: false }],
};

const GET_PRODUCT: ToolContract = ToolContract {
    name: "get_product",
    params: &[ParamSpec { name: "id", param_type: ParamType::Integer, required: true }],
};

const ADD_PRODUCT: ToolContract = ToolContract {
    name: "add_product",
    params: &[
        ParamSpec { name: "name", param_type: ParamType::Text, required: true },
        ParamSpec { name: "price", param_type: ParamType::Decimal, required: true },
        ParamSpec { name: "category", param_type: ParamType::Text, required: true },
        ParamSpec { name: "in_stock", param_type: ParamType::Flag, required: false },
    ],
};

const STATISTICS: ToolContract = ToolContract { name: "statistics", params: &[] };

const CREATE_ORDER: ToolContract = ToolContract {
    name: "create_order",
    params: &[
        ParamSpec { name: "product_id", param_type: ParamType::Integer, required: true },
        ParamSpec { name: "quantity", param_type: ParamType::Integer, required: true },
    ],
};

const DISCOUNT: ToolContract = ToolContract {
    name: "discount",
    params: &[
        ParamSpec { name: "price", param_type: ParamType::Decimal, required: true },
        ParamSpec { name: "percent", param_type: ParamType::Integer, required: true },
    ],
};

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The production registry: catalog tools on the products channel, order
    /// creation on the orders channel, discount computed in-process.
    pub fn standard(
        products: Arc<dyn ToolTransport>,
        orders: Arc<dyn ToolTransport>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register_channel(LIST_PRODUCTS, Arc::clone(&products), "list_products");
        registry.register_channel(GET_PRODUCT, Arc::clone(&products), "get_product");
        registry.register_channel(ADD_PRODUCT, Arc::clone(&products), "add_product");
        registry.register_channel(STATISTICS, products, "statistics");
        registry.register_channel(CREATE_ORDER, orders, "create_order");
        registry.register_in_process(DISCOUNT, tools::discount_tool);
        registry
    }

    pub fn register_channel(
        &mut self,
        contract: ToolContract,
        transport: Arc<dyn ToolTransport>,
        method: &'static str,
    ) {
        self.tools
            .insert(contract.name, RegisteredTool { contract, binding: ToolBinding::Channel { transport, method } });
    }

    pub fn register_in_process(&mut self, contract: ToolContract, tool: InProcessTool) {
        self.tools
            .insert(contract.name, RegisteredTool { contract, binding: ToolBinding::InProcess(tool) });
    }

    pub fn lookup(&self, name: &str) -> Result<&RegisteredTool, AgentError> {
        self.tools.get(name).ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
