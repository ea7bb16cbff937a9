// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    // Payment gateway configuration
    pub payment_api_key: String,
    pub payment_base_url: String,
    pub payment_webhook_secret: String,
    // Discovery feed cache
    pub feed_cache_ttl_seconds: usize,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");

        let redis_url = std::env::var("REDIS_URL").ok();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        // Payment gateway configuration (with defaults for local testing)
        let payment_api_key = std::env::var("PAYMENT_API_KEY")
            .unwrap_or_else(|_| "sk_test_key".to_string());
        let payment_base_url = std::env::var("PAYMENT_BASE_URL")
            .unwrap_or_else(|_| "https://api.stripe.com".to_string());
        let payment_webhook_secret = std::env::var("PAYMENT_WEBHOOK_SECRET")
            .unwrap_or_else(|_| "whsec_test".to_string());

        let feed_cache_ttl_seconds = std::env::var("FEED_CACHE_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(60);

        Config {
            database_url,
            redis_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            port,
            payment_api_key,
            payment_base_url,
            payment_webhook_secret,
            feed_cache_ttl_seconds,
        }
    }
}
