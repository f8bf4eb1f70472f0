use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    /// Shared secret for webhook signature verification. Absence is not a
    /// boot error - inbound webhooks are rejected with a configuration error
    /// until it is set.
    pub creem_webhook_secret: Option<String>,
    pub creem_api_key: Option<String>,
    pub creem_api_base: String,
    /// Days to keep processed webhook event records (0 = never purge).
    pub webhook_retention_days: i64,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("PAYSYNC_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "paysync.db".to_string()),
            base_url,
            creem_webhook_secret: env::var("CREEM_WEBHOOK_SECRET").ok(),
            creem_api_key: env::var("CREEM_API_KEY").ok(),
            creem_api_base: env::var("CREEM_API_BASE")
                .unwrap_or_else(|_| "https://api.creem.io/v1".to_string()),
            webhook_retention_days: env::var("WEBHOOK_RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(90),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
