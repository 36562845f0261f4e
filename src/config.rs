use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 5000;

/// The whole configuration surface: one port, read from the environment.
/// Log verbosity rides RUST_LOG via the tracing subscriber.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: parse_port(std::env::var("PORT").ok()),
        }
    }

    pub fn figment(&self) -> Figment {
        rocket::Config::figment()
            .merge(("address", "0.0.0.0"))
            .merge(("port", self.port))
            .merge(("limits", Limits::default().limit("string", 1.mebibytes())))
    }
}

fn parse_port(raw: Option<String>) -> u16 {
    match raw {
        None => DEFAULT_PORT,
        Some(s) => s.parse().unwrap_or_else(|_| {
            warn!("invalid PORT value `{s}`, falling back to {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_port_uses_default() {
        assert_eq!(parse_port(None), 5000);
    }

    #[test]
    fn valid_port_is_used() {
        assert_eq!(parse_port(Some("8080".to_string())), 8080);
    }

    #[test]
    fn garbage_port_falls_back_to_default() {
        assert_eq!(parse_port(Some("not-a-port".to_string())), 5000);
        assert_eq!(parse_port(Some("70000".to_string())), 5000);
    }
}
