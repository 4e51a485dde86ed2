use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Interval between server-initiated WebSocket pings.
    pub ws_heartbeat: Duration,
    /// A connection that has not answered within this window is dropped.
    pub ws_client_timeout: Duration,
    pub db_max_connections: usize,
}

impl Config {
    fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
        env::var(key)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    }

    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;

        let port = Self::parse_env("PORT", 3000);
        let ws_heartbeat = Duration::from_secs(Self::parse_env("WS_HEARTBEAT_SECS", 5));
        let ws_client_timeout = Duration::from_secs(Self::parse_env("WS_CLIENT_TIMEOUT_SECS", 30));
        let db_max_connections = Self::parse_env("DB_MAX_CONNECTIONS", 16);

        if ws_client_timeout <= ws_heartbeat {
            return Err(crate::error::AppError::Config(
                "WS_CLIENT_TIMEOUT_SECS must exceed WS_HEARTBEAT_SECS".into(),
            ));
        }

        Ok(Self {
            database_url,
            port,
            ws_heartbeat,
            ws_client_timeout,
            db_max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_falls_back_on_missing_or_garbage() {
        assert_eq!(Config::parse_env("CONFIG_TEST_MISSING_KEY", 42u16), 42);

        env::set_var("CONFIG_TEST_GARBAGE_KEY", "not-a-number");
        assert_eq!(Config::parse_env("CONFIG_TEST_GARBAGE_KEY", 7usize), 7);
        env::remove_var("CONFIG_TEST_GARBAGE_KEY");
    }

    #[test]
    fn parse_env_reads_valid_values() {
        env::set_var("CONFIG_TEST_PORT_KEY", "8088");
        assert_eq!(Config::parse_env("CONFIG_TEST_PORT_KEY", 3000u16), 8088);
        env::remove_var("CONFIG_TEST_PORT_KEY");
    }
}
