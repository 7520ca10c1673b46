use serde::Serialize;
use std::net::SocketAddr;

use crate::config::ServerConfig;

/// Where a second device can reach this server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkAddresses {
    pub origin: String,
    pub suggested_join_base: String,
    pub lan_urls: Vec<String>,
}

impl NetworkAddresses {
    /// Builds the answer from the request's `Host` and `X-Forwarded-Proto`.
    ///
    /// A page opened as `localhost` is useless to a phone, so in that case
    /// the first LAN address is suggested instead of the origin.
    pub fn resolve(host: Option<&str>, forwarded_proto: Option<&str>, config: &ServerConfig) -> Self {
        let proto = forwarded_proto
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("http");
        let host = host
            .map(str::to_string)
            .unwrap_or_else(|| format!("localhost:{}", config.port));
        let origin = format!("{}://{}", proto, host);

        let lan_urls: Vec<String> = config
            .lan_addresses
            .iter()
            .map(|ip| format!("{}://{}", proto, SocketAddr::new(*ip, config.port)))
            .collect();

        let is_loopback = host.starts_with("localhost") || host.starts_with("127.0.0.1");
        let suggested_join_base = match lan_urls.first() {
            Some(lan) if is_loopback => lan.clone(),
            _ => origin.clone(),
        };

        Self {
            origin,
            suggested_join_base,
            lan_urls,
        }
    }
}
