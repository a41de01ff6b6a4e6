use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub eviction: EvictionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Which storage backend serves container documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    File,
    Postgres,
}

impl StorageKind {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "file" | "fs" => Some(StorageKind::File),
            "postgres" | "postgresql" | "pg" => Some(StorageKind::Postgres),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageKind,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub max_request_size_bytes: usize,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
    pub max_containers_per_workspace: usize,
    pub max_records_per_table: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub default_session_ttl_ms: i64,
    pub max_session_ttl_ms: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionConfig {
    pub enabled: bool,
    pub idle_secs: u64,
    pub sweep_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Storage overrides
        if let Ok(v) = env::var("STORAGE_BACKEND") {
            self.storage.backend = StorageKind::parse(&v).unwrap_or(self.storage.backend);
        }
        if let Ok(v) = env::var("STORAGE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.storage.database_url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.storage.max_connections = v.parse().unwrap_or(self.storage.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.storage.connection_timeout = v.parse().unwrap_or(self.storage.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_REQUESTS") {
            self.api.rate_limit_requests = v.parse().unwrap_or(self.api.rate_limit_requests);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_DEFAULT_PAGE_LIMIT") {
            self.api.default_page_limit = v.parse().unwrap_or(self.api.default_page_limit);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_LIMIT") {
            self.api.max_page_limit = v.parse().unwrap_or(self.api.max_page_limit);
        }
        if let Ok(v) = env::var("API_MAX_CONTAINERS_PER_WORKSPACE") {
            self.api.max_containers_per_workspace =
                v.parse().unwrap_or(self.api.max_containers_per_workspace);
        }
        if let Ok(v) = env::var("API_MAX_RECORDS_PER_TABLE") {
            self.api.max_records_per_table = v.parse().unwrap_or(self.api.max_records_per_table);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_DEFAULT_SESSION_TTL_MS") {
            self.security.default_session_ttl_ms = v.parse().unwrap_or(self.security.default_session_ttl_ms);
        }
        if let Ok(v) = env::var("SECURITY_MAX_SESSION_TTL_MS") {
            self.security.max_session_ttl_ms = v.parse().unwrap_or(self.security.max_session_ttl_ms);
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_NAME") {
            self.security.cookie_name = v;
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_SECURE") {
            self.security.cookie_secure = v.parse().unwrap_or(self.security.cookie_secure);
        }

        // Eviction overrides
        if let Ok(v) = env::var("EVICTION_ENABLED") {
            self.eviction.enabled = v.parse().unwrap_or(self.eviction.enabled);
        }
        if let Ok(v) = env::var("EVICTION_IDLE_SECS") {
            self.eviction.idle_secs = v.parse().unwrap_or(self.eviction.idle_secs);
        }
        if let Ok(v) = env::var("EVICTION_SWEEP_INTERVAL_SECS") {
            self.eviction.sweep_interval_secs = v.parse().unwrap_or(self.eviction.sweep_interval_secs);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            storage: StorageConfig {
                backend: StorageKind::File,
                data_dir: PathBuf::from("./data"),
                database_url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                enable_rate_limiting: false,
                rate_limit_requests: 1000,
                rate_limit_window_secs: 60,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                default_page_limit: 20,
                max_page_limit: 1000,
                max_containers_per_workspace: 100,
                max_records_per_table: 10_000,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: String::new(),
                default_session_ttl_ms: 24 * 60 * 60 * 1000, // 1 day
                max_session_ttl_ms: 30 * 24 * 60 * 60 * 1000, // 30 days
                cookie_name: "mockdb_token".to_string(),
                cookie_secure: false,
            },
            eviction: EvictionConfig {
                enabled: false,
                idle_secs: 7 * 24 * 60 * 60,
                sweep_interval_secs: 60 * 60,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            storage: StorageConfig {
                backend: StorageKind::File,
                data_dir: PathBuf::from("/var/lib/mockdb"),
                database_url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 300,
                rate_limit_window_secs: 60,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
                default_page_limit: 20,
                max_page_limit: 500,
                max_containers_per_workspace: 50,
                max_records_per_table: 5_000,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                default_session_ttl_ms: 12 * 60 * 60 * 1000,
                max_session_ttl_ms: 7 * 24 * 60 * 60 * 1000,
                cookie_name: "mockdb_token".to_string(),
                cookie_secure: true,
            },
            eviction: EvictionConfig {
                enabled: true,
                idle_secs: 3 * 24 * 60 * 60,
                sweep_interval_secs: 30 * 60,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            storage: StorageConfig {
                backend: StorageKind::Postgres,
                data_dir: PathBuf::from("/var/lib/mockdb"),
                database_url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 120,
                rate_limit_window_secs: 60,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
                default_page_limit: 20,
                max_page_limit: 100,
                max_containers_per_workspace: 20,
                max_records_per_table: 2_000,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
                default_session_ttl_ms: 4 * 60 * 60 * 1000,
                max_session_ttl_ms: 24 * 60 * 60 * 1000,
                cookie_name: "mockdb_token".to_string(),
                cookie_secure: true,
            },
            eviction: EvictionConfig {
                enabled: true,
                idle_secs: 24 * 60 * 60,
                sweep_interval_secs: 15 * 60,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
