use {
    crate::domain::{error::PaymentError, gateway::GatewayClient, id::PaymentMethod},
    std::{collections::HashMap, sync::Arc},
};

/// Maps a payment method to the gateway that serves it.
#[derive(Default, Clone)]
pub struct GatewayRegistry {
    gateways: HashMap<PaymentMethod, Arc<dyn GatewayClient>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, gateway: Arc<dyn GatewayClient>) -> Self {
        self.register(gateway);
        self
    }

    pub fn register(&mut self, gateway: Arc<dyn GatewayClient>) {
        self.gateways.insert(gateway.method().clone(), gateway);
    }

    pub fn get(&self, method: &PaymentMethod) -> Result<Arc<dyn GatewayClient>, PaymentError> {
        self.gateways
            .get(method)
            .cloned()
            .ok_or_else(|| PaymentError::Validation(format!("unsupported payment method: {method}")))
    }
}
