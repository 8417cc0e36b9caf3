pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    services::{orchestrator::PaymentOrchestrator, webhook_handler::WebhookHandler},
    std::sync::Arc,
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub webhooks: Arc<WebhookHandler>,
}
