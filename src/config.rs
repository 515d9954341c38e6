use std::env;

/// GateConfig
///
/// Holds the gateway's configuration. Immutable once loaded and pulled into handlers
/// and middleware via FromRef, the same way every other piece of shared state is.
#[derive(Clone, Debug)]
pub struct GateConfig {
    // Base URL of the Makerspace backend (Identity Service and CRUD API).
    pub api_base_url: String,
    // Socket address the gateway listens on.
    pub bind_addr: String,
    // Name of the cookie carrying the credential token.
    pub token_cookie: String,
    // Runtime environment marker. Controls the log format.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context: human-readable logs and local defaults versus
/// JSON logs and mandatory settings.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_TOKEN_COOKIE: &str = "accessToken";

impl Default for GateConfig {
    /// default
    ///
    /// Provides a safe, non-panicking configuration for test setup, without touching
    /// environment variables.
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            token_cookie: DEFAULT_TOKEN_COOKIE.to_string(),
            env: Env::Local,
        }
    }
}

impl GateConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup, failing fast.
    ///
    /// # Panics
    /// Panics in production when `API_BASE_URL` is not set.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = match env {
            Env::Production => {
                env::var("API_BASE_URL").expect("FATAL: API_BASE_URL must be set in production.")
            }
            Env::Local => {
                env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
            }
        };

        Self {
            // A trailing slash would produce `//` when joining upstream paths.
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            bind_addr: env::var("GATE_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            token_cookie: env::var("ACCESS_TOKEN_COOKIE")
                .unwrap_or_else(|_| DEFAULT_TOKEN_COOKIE.to_string()),
            env,
        }
    }
}
