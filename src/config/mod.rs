use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Result, RoomError};

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 3001;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

pub struct Config {
    pub server: ServerConfig,
    pub game: GameConfig,
    pub logging: LoggingConfig,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin, or `*` for any
    pub cors_origin: String,
}

/// Room engine behaviour switches
#[derive(Debug, Clone, Serialize)]
pub struct GameConfig {
    /// Drop a room from the store once its last participant leaves
    pub evict_empty_rooms: bool,
    /// Whether StartGame on a room that is already playing reassigns roles
    pub reshuffle_on_restart: bool,
    /// Fixed seed for role selection
    #[serde(skip)]
    pub role_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            evict_empty_rooms: true,
            reshuffle_on_restart: true,
            role_seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = RoomError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(RoomError::invalid_configuration(format!(
                "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                other
            ))),
        }
    }
}

pub struct LoggingConfig {
    pub format: LogFormat,
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Reads an optional `.env` file first. Every variable has a default;
    /// a variable that is present but unparseable is an error.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: parse_var("SERVER_PORT", DEFAULT_SERVER_PORT)?,
                cors_origin: env::var("CORS_ALLOWED_ORIGIN")
                    .unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string()),
            },
            game: GameConfig {
                evict_empty_rooms: parse_var("ROOM_EVICT_EMPTY", true)?,
                reshuffle_on_restart: parse_var("ROOM_RESHUFFLE_ON_RESTART", true)?,
                role_seed: parse_optional_var("ROOM_ROLE_SEED")?,
            },
            logging: LoggingConfig {
                format: parse_var("LOG_FORMAT", LogFormat::Pretty)?,
                filter: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let origin = self.server.cors_origin.as_str();
        let scheme_ok = origin.starts_with("http://") || origin.starts_with("https://");
        let host = origin.split("://").nth(1).unwrap_or("");

        if origin != "*" && (!scheme_ok || host.is_empty() || host.contains('/')) {
            return Err(RoomError::invalid_configuration(format!(
                "CORS_ALLOWED_ORIGIN must be '*' or a scheme://host[:port] origin, got '{}'",
                origin
            )));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> ([u8; 4], u16) {
        let ip_addr = self.parse_host_to_ipv4();
        (ip_addr.octets(), self.server.port)
    }

    fn parse_host_to_ipv4(&self) -> Ipv4Addr {
        if let Ok(addr) = self.server.host.parse::<IpAddr>() {
            match addr {
                IpAddr::V4(ipv4) => return ipv4,
                IpAddr::V6(_) => {
                    tracing::warn!(
                        host = %self.server.host,
                        "IPv6 address provided but only IPv4 supported, using 0.0.0.0"
                    );
                    return Ipv4Addr::UNSPECIFIED;
                }
            }
        }

        match self.server.host.as_str() {
            "localhost" => Ipv4Addr::LOCALHOST,
            "" | "0.0.0.0" => Ipv4Addr::UNSPECIFIED,
            _ => {
                tracing::warn!(
                    host = %self.server.host,
                    "Unable to parse host as IPv4, using 0.0.0.0"
                );
                Ipv4Addr::UNSPECIFIED
            }
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(name, &raw),
        _ => Ok(default),
    }
}

fn parse_optional_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(name, &raw).map(Some),
        _ => Ok(None),
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| RoomError::invalid_configuration(format!("{}='{}' could not be parsed", name, raw)))
}
