//! Calorie Compass backend entry point.

use std::sync::Arc;

use axum::{middleware, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use calorie_compass::adapters::auth::{GoTrueAuthAdapter, GoTrueConfig};
use calorie_compass::adapters::http::account::{account_routes, AccountAppState};
use calorie_compass::adapters::http::billing::{billing_routes, webhook_routes, BillingAppState};
use calorie_compass::adapters::http::middleware::{auth_middleware, AuthState};
use calorie_compass::adapters::postgres::{
    PostgresEventLog, PostgresSubscriptionStore, PostgresUserDataStore,
};
use calorie_compass::adapters::stripe::{StripeConfig, StripeGateway};
use calorie_compass::application::billing::ProcessWebhookHandler;
use calorie_compass::config::AppConfig;
use calorie_compass::domain::billing::{
    EventDispatcher, EventRecorder, SubscriptionReconciler, WebhookVerifier,
};
use calorie_compass::ports::{
    IdentityProvider, PaymentProvider, SubscriptionEventLog, SubscriptionStore, UserDataStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        stripe_test_mode = config.payment.is_test_mode(),
        "Starting calorie-compass backend"
    );

    // Database
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    // Adapters
    let store: Arc<dyn SubscriptionStore> =
        Arc::new(PostgresSubscriptionStore::new(pool.clone()));
    let event_log: Arc<dyn SubscriptionEventLog> = Arc::new(PostgresEventLog::new(pool.clone()));
    let user_data: Arc<dyn UserDataStore> = Arc::new(PostgresUserDataStore::new(pool));

    let payment_provider: Arc<dyn PaymentProvider> = Arc::new(StripeGateway::new(
        StripeConfig::new(config.payment.stripe_api_key.clone())?,
    ));

    let gotrue = Arc::new(GoTrueAuthAdapter::new(GoTrueConfig::new(
        config.auth.base_url.clone(),
        config.auth.jwt_secret.clone(),
        config.auth.service_role_key.clone(),
    )?));
    let session_validator: AuthState = gotrue.clone();
    let identity_provider: Arc<dyn IdentityProvider> = gotrue;

    // Webhook pipeline, assembled once at startup
    let verifier = WebhookVerifier::new(config.payment.stripe_webhook_secret.clone())?;
    let dispatcher = EventDispatcher::new()
        .register(Arc::new(SubscriptionReconciler::new(store.clone())));
    let recorder = EventRecorder::new(event_log.clone(), store.clone());
    let webhook = Arc::new(ProcessWebhookHandler::new(verifier, dispatcher, recorder));

    let billing_state = BillingAppState {
        store: store.clone(),
        payment_provider: payment_provider.clone(),
        webhook,
    };

    let account_state = AccountAppState {
        store,
        event_log,
        user_data,
        payment_provider,
        identity_provider,
    };

    // Webhooks stay outside the auth middleware; they are signature-verified
    let app = Router::new()
        .nest(
            "/api/billing",
            billing_routes()
                .with_state(billing_state.clone())
                .layer(middleware::from_fn_with_state(
                    session_validator.clone(),
                    auth_middleware,
                )),
        )
        .nest(
            "/api/account",
            account_routes()
                .with_state(account_state)
                .layer(middleware::from_fn_with_state(
                    session_validator,
                    auth_middleware,
                )),
        )
        .nest("/api/webhooks", webhook_routes().with_state(billing_state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
