// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory tree to serve
    pub root: PathBuf,

    /// Address to bind the server to
    pub bind_addr: SocketAddr,

    /// Prefix under which API routes live
    pub api_prefix: String,

    /// Origins allowed by the CORS layer
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            bind_addr: "0.0.0.0:8080".parse().expect("valid socket address"),
            api_prefix: "/api".to_string(),
            cors_allowed_origins: vec!["http://localhost:8080".to_string()],
        }
    }
}

/// Parse a listen address, accepting the `:8080` shorthand for
/// all-interfaces binding.
pub fn parse_listen_addr(raw: &str) -> Result<SocketAddr, std::net::AddrParseError> {
    match raw.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port).parse(),
        None => raw.parse(),
    }
}

/// Split a comma-separated origin list, dropping empty entries.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_environment() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.cors_allowed_origins, ["http://localhost:8080"]);
    }

    #[test]
    fn listen_addr_accepts_port_shorthand() {
        assert_eq!(
            parse_listen_addr(":9090").unwrap(),
            "0.0.0.0:9090".parse().unwrap()
        );
        assert_eq!(
            parse_listen_addr("127.0.0.1:8081").unwrap(),
            "127.0.0.1:8081".parse().unwrap()
        );
        assert!(parse_listen_addr("not-an-address").is_err());
    }

    #[test]
    fn origins_split_on_commas() {
        assert_eq!(
            parse_origins("http://localhost:8080, https://example.com,"),
            ["http://localhost:8080", "https://example.com"]
        );
    }
}
