use serde::Deserialize;

/// Server settings read from the environment (after `.env` is loaded).
///
/// | variable             | default     |
/// |----------------------|-------------|
/// | `DATABASE_URL`       | unset: in-memory store |
/// | `SESSION_SECRET`     | required    |
/// | `HOST`               | `127.0.0.1` |
/// | `PORT`               | `8080`      |
/// | `DATABASE_POOL_SIZE` | `10`        |
/// | `ADMIN_EMAILS`       | empty, comma separated |
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: Option<String>,
    pub session_secret: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_pool_size")]
    pub database_pool_size: u32,
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_pool_size() -> u32 {
    10
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        Self::from_iter(std::env::vars())
    }

    pub fn from_iter<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::from_iter(vars)?;
        if config.session_secret.trim().is_empty() {
            return Err(envy::Error::Custom("SESSION_SECRET must not be empty".to_string()));
        }
        Ok(config)
    }
}
