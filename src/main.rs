use {
    checkout_pay::{
        AppState,
        adapters::{
            hosted_gateway::HostedCheckoutGateway,
            http::router,
            mock_gateway::MockGateway,
            order_client::{HttpOrderService, LogOrderService},
        },
        config::Config,
        domain::{id::PaymentMethod, order::OrderService, store::TransactionStore},
        infra::{memory::InMemoryTransactionStore, postgres::PgTransactionStore},
        services::{
            gateway_registry::GatewayRegistry,
            orchestrator::{OrchestratorSettings, PaymentOrchestrator},
            webhook_handler::WebhookHandler,
            webhook_verifier::WebhookVerifier,
        },
    },
    sqlx::postgres::PgPoolOptions,
    std::{error::Error, sync::Arc, time::Duration},
    tokio::signal,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let store: Arc<dyn TransactionStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(20)
                .acquire_timeout(config.store_timeout)
                .connect(url)
                .await?;
            let store = PgTransactionStore::new(pool, config.store_timeout);
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; transactions will not survive a restart");
            Arc::new(InMemoryTransactionStore::new())
        }
    };

    let mut gateways = GatewayRegistry::new();
    let mut hosted = HostedCheckoutGateway::new(
        PaymentMethod::new(config.gateway.method.clone())?,
        &config.gateway.base_url,
        &config.gateway.key_id,
        &config.gateway.key_secret,
        config.gateway_timeout,
    )?;
    if let Some(exponent) = config.gateway.amount_exponent {
        hosted = hosted.with_amount_exponent(exponent);
    }
    gateways.register(Arc::new(hosted));
    if config.mock_gateway {
        tracing::warn!("mock gateway enabled for method \"mock\"");
        gateways.register(Arc::new(MockGateway::new(PaymentMethod::new("mock")?)));
    }

    let orders: Arc<dyn OrderService> = match &config.order_service_url {
        Some(url) => Arc::new(HttpOrderService::new(url, config.gateway_timeout)?),
        None => Arc::new(LogOrderService),
    };

    let settings = OrchestratorSettings {
        public_base_url: config.public_base_url.clone(),
        gateway_timeout: config.gateway_timeout,
        store_timeout: config.store_timeout,
        max_creation_retries: config.max_creation_retries,
        retry_backoff: config.retry_backoff,
    };
    // Checkout is the slowest route; leave headroom over its own budget.
    let request_timeout = settings.checkout_budget() + Duration::from_secs(5);

    let orchestrator =
        PaymentOrchestrator::new(store.clone(), gateways, orders.clone(), settings);
    let webhooks = WebhookHandler::new(
        store,
        orders,
        WebhookVerifier::new(config.webhook_secret.clone(), config.webhook_tolerance),
        config.store_timeout,
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        webhooks: Arc::new(webhooks),
    };

    let app = router(state, request_timeout);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
