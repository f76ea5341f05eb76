use std::env;
use std::path::PathBuf;

const DEV_JWT_SECRET: &str = "beauty-shop-dev-secret-change-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Registering with this email grants the administrator flag, in
    /// addition to the first-registrant rule.
    pub bootstrap_admin_email: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        let bootstrap_admin_email = env::var("BOOTSTRAP_ADMIN_EMAIL")
            .ok()
            .filter(|email| !email.is_empty());
        Ok(Self {
            host,
            port,
            data_dir,
            bootstrap_admin_email,
        })
    }
}

/// Signing key for session tokens. The fallback is for local development
/// only; set JWT_SECRET in any real deployment.
pub fn jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string())
}
