use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface the HTTP/WebSocket listener binds to.
    pub host: IpAddr,
    pub port: u16,
    /// Addresses advertised by `/api/network-addresses` so a phone on the
    /// same network can reach a server opened as `localhost` on the laptop.
    pub lan_addresses: Vec<IpAddr>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            lan_addresses: Vec::new(),
        }
    }
}
