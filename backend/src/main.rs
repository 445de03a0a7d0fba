use axum::{
    http::Method,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod jobs;
mod notifications;
mod pagination;
mod services;

pub use error::{ApiError, ApiResult, AppError};
pub use pagination::{PaginatedResponse, PaginationMeta, PaginationParams};

use notifications::{MailGateway, SmsGateway};
use services::{CacheService, EmailService, TwilioSmsGateway};

pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub config: config::Config,
    pub cache: CacheService,
    pub sms: Arc<dyn SmsGateway>,
    pub mail: Arc<dyn MailGateway>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env()?;
    let db_pool = database::create_pool(&config.database_url).await?;

    database::migrate(&db_pool).await?;

    if !config.smtp.is_configured() {
        tracing::warn!("SMTP is not configured, email notifications will fail");
    }
    if !config.twilio.is_configured() {
        tracing::warn!("Twilio is not configured, SMS notifications will fail");
    }

    let cache = CacheService::new(db_pool.clone());
    let sms: Arc<dyn SmsGateway> = Arc::new(TwilioSmsGateway::new(&config.twilio));
    let mail: Arc<dyn MailGateway> = Arc::new(EmailService::new(&config.smtp));

    let app_state = Arc::new(AppState {
        db_pool,
        config: config.clone(),
        cache,
        sms,
        mail,
    });

    let scheduler = jobs::JobScheduler::new(app_state.clone()).await?;
    scheduler.start().await?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(|| async { "DueTrack API v1.0.0" }))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1/auth", auth::auth_routes())
        .nest("/api/v1/customers", handlers::customer_routes())
        .nest("/api/v1/templates", handlers::template_routes())
        .nest("/api/v1/logs", handlers::log_routes())
        .nest("/api/v1/users", handlers::user_routes())
        .nest("/api/v1/notifications", handlers::notification_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Server running on {}", config.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
