use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub slow_statement_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// 单次导入的总超时（秒），超时按系统错误返回并回滚
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/invoice_import".to_string(),
                max_connections: 20,
                acquire_timeout_secs: 10,
                slow_statement_secs: 5,
            },
            import: ImportConfig { timeout_secs: 60 },
        }
    }
}

/// 环境变量 -> 配置键
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("SERVER_HOST", "server.host"),
    ("SERVER_PORT", "server.port"),
    ("DATABASE_URL", "database.url"),
    ("DATABASE_MAX_CONNECTIONS", "database.max_connections"),
    ("IMPORT_TIMEOUT_SECS", "import.timeout_secs"),
];

impl AppConfig {
    /// 加载配置: 默认值 -> config/app.toml (可选) -> 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&AppConfig::default())?;
        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name("config/app").required(false));

        for (var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, env(var))?;
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::load_with(|_| None).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.import.timeout_secs, 60);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AppConfig::load_with(|key| match key {
            "SERVER_PORT" => Some("9090".to_string()),
            "DATABASE_URL" => Some("postgres://db/test".to_string()),
            "IMPORT_TIMEOUT_SECS" => Some("5".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.url, "postgres://db/test");
        assert_eq!(config.import.timeout_secs, 5);
    }
}
