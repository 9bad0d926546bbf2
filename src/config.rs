use dotenv::dotenv;
use std::env;

pub struct Config {
    /// Absent selects the in-memory store.
    pub database_url: Option<String>,
    pub server_address: String,
    pub cors_origin: String,
    /// Base URL baked into the served tracker snippet.
    pub public_url: String,
    pub retention_days: i64,
}

pub fn load_config() -> anyhow::Result<Config> {
    dotenv().ok();

    let database_url = env::var("DATABASE_URL").ok();
    let server_address = env::var("SERVER_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
    let cors_origin = env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string());
    let public_url = env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3001".to_string());
    let retention_days = env::var("RETENTION_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(90);

    Ok(Config {
        database_url,
        server_address,
        cors_origin,
        public_url,
        retention_days,
    })
}
