use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub kafka: Option<KafkaConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
    #[serde(default)]
    pub cors_origin: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_hold_seconds")]
    pub seat_hold_seconds: u64,
    #[serde(default = "default_max_seats")]
    pub max_seats_per_booking: usize,
    #[serde(default = "default_attempts")]
    pub reservation_attempts: u32,
    #[serde(default = "default_sweep_interval")]
    pub hold_sweep_interval_seconds: u64,
    #[serde(default = "default_tracking_interval")]
    pub tracking_interval_seconds: u64,
}

fn default_hold_seconds() -> u64 { 600 }
fn default_max_seats() -> usize { 6 }
fn default_attempts() -> u32 { 3 }
fn default_sweep_interval() -> u64 { 30 }
fn default_tracking_interval() -> u64 { 7 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            seat_hold_seconds: default_hold_seconds(),
            max_seats_per_booking: default_max_seats(),
            reservation_attempts: default_attempts(),
            hold_sweep_interval_seconds: default_sweep_interval(),
            tracking_interval_seconds: default_tracking_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_seconds: u64,
}

// Seven days.
fn default_jwt_expiration() -> u64 { 7 * 24 * 60 * 60 }

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default)]
    pub seed_demo_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

fn default_rate_limit() -> i64 { 100 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Developer overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // BUSLINE__AUTH__JWT_SECRET=... sets auth.jwt_secret
            .add_source(config::Environment::with_prefix("BUSLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let s = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 5000

                [auth]
                jwt_secret = "secret"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let cfg: Config = s.try_deserialize().unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert!(cfg.database.is_none());
        assert!(cfg.redis.is_none());
        assert_eq!(cfg.auth.jwt_expiration_seconds, 604_800);
        assert_eq!(cfg.business_rules.seat_hold_seconds, 600);
        assert_eq!(cfg.business_rules.max_seats_per_booking, 6);
        assert_eq!(cfg.business_rules.tracking_interval_seconds, 7);
    }

    #[test]
    fn test_default_file_parses() {
        let s = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let cfg: Config = s.try_deserialize().unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.cors_origin.as_deref(), Some("http://localhost:5173"));
    }
}
