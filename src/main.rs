mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod services;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::db::db::DBClient;

// Import the services
use service::{
    booking_service::BookingService,
    decision_service::DecisionService,
    match_service::MatchService,
    notification_service::NotificationService,
    payment_provider::PaymentProviderService,
    rate_limiter::RateLimiter,
};
use services::recommendation_service::RecommendationService;

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    // Services
    pub rate_limiter: Arc<RateLimiter>,
    pub match_service: Arc<MatchService>,
    pub decision_service: Arc<DecisionService>,
    pub booking_service: Arc<BookingService>,
    pub notification_service: Arc<NotificationService>,
    pub payment_provider: Arc<PaymentProviderService>,
    pub recommendation_service: Arc<RecommendationService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client_arc = Arc::new(db_client);

        // Initialize all services
        let rate_limiter = Arc::new(RateLimiter::new(db_client_arc.clone()));
        let match_service = Arc::new(MatchService::new(db_client_arc.clone()));
        let notification_service = Arc::new(NotificationService::new(db_client_arc.clone()));
        let payment_provider = Arc::new(PaymentProviderService::new(&config));
        let recommendation_service = Arc::new(RecommendationService::new(
            db_client_arc.clone(),
            config.feed_cache_ttl_seconds,
        ));

        let decision_service = Arc::new(DecisionService::new(
            db_client_arc.clone(),
            rate_limiter.clone(),
            match_service.clone(),
            notification_service.clone(),
        ));

        let booking_service = Arc::new(BookingService::new(
            db_client_arc.clone(),
            payment_provider.clone(),
            notification_service.clone(),
        ));

        Self {
            env: config,
            db_client: db_client_arc,
            rate_limiter,
            match_service,
            decision_service,
            booking_service,
            notification_service,
            payment_provider,
            recommendation_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    // Connect to PostgreSQL
    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");

            // Background task watching pool saturation
            let max_connections = 20;
            let pool_for_monitoring = pool.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
                loop {
                    interval.tick().await;
                    let size = pool_for_monitoring.size();
                    let idle = pool_for_monitoring.num_idle();
                    tracing::debug!(
                        "pool status - active: {}, idle: {}, total: {}",
                        size - idle as u32,
                        idle,
                        size
                    );

                    if size >= max_connections * 8 / 10 {
                        tracing::warn!(
                            "connection pool at 80% capacity, consider raising max_connections"
                        );
                    }
                }
            });

            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    // Initialize DBClient with optional Redis
    let db_client = if let Some(ref redis_url) = config.redis_url {
        match DBClient::with_redis(pool.clone(), redis_url).await {
            Ok(client) => {
                if client.is_redis_available() {
                    tracing::info!("Redis feed caching is active");
                } else {
                    tracing::warn!("Redis connection failed, running without cache");
                }
                client
            }
            Err(e) => {
                tracing::warn!("Redis initialization error: {}, running without cache", e);
                DBClient::new(pool)
            }
        }
    } else {
        tracing::info!("Redis not configured, running without cache (set REDIS_URL to enable)");
        DBClient::new(pool)
    };

    let allowed_origins = vec![
        "http://localhost:5173".parse::<HeaderValue>().unwrap(),
        "http://localhost:8000".parse::<HeaderValue>().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    let app = create_router(app_state.clone()).layer(cors);

    tracing::info!("Server is running on http://localhost:{}", config.port);
    tracing::info!("Cache status: {}", app_state.db_client.cache_status());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
