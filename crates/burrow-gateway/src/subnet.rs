use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Client address as reported by the proxy in front of the server.
pub const REAL_IP_HEADER: &str = "x-real-ip";

#[derive(Debug, Error, PartialEq)]
pub enum SubnetError {
    #[error("expected <address>/<prefix>, got {0:?}")]
    Format(String),
    #[error("invalid network address {0:?}")]
    Address(String),
    #[error("invalid prefix length {0:?}")]
    Prefix(String),
}

/// CIDR block allowed to read the internal endpoints, e.g. `10.0.0.0/8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustedSubnet {
    network: IpAddr,
    prefix: u8,
}

impl TrustedSubnet {
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = u32::MAX.checked_shl(32 - u32::from(self.prefix)).unwrap_or(0);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix))
                    .unwrap_or(0);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

impl FromStr for TrustedSubnet {
    type Err = SubnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (network, prefix) = s
            .split_once('/')
            .ok_or_else(|| SubnetError::Format(s.to_string()))?;
        let network: IpAddr = network
            .parse()
            .map_err(|_| SubnetError::Address(network.to_string()))?;
        let max = if network.is_ipv4() { 32 } else { 128 };
        let prefix = prefix
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= max)
            .ok_or_else(|| SubnetError::Prefix(prefix.to_string()))?;

        Ok(Self { network, prefix })
    }
}

impl Display for TrustedSubnet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

/// Lets a request through only when `X-Real-IP` lies inside the trusted
/// subnet. Without a configured subnet nothing gets through.
pub async fn require_trusted(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(subnet) = state.trusted_subnet() else {
        warn!("no trusted subnet configured, refusing internal request");
        return Err(AppError::Forbidden);
    };

    let ip = request
        .headers()
        .get(REAL_IP_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse::<IpAddr>().ok());

    match ip {
        Some(ip) if subnet.contains(ip) => Ok(next.run(request).await),
        Some(ip) => {
            warn!(%ip, %subnet, "client outside the trusted subnet");
            Err(AppError::Forbidden)
        }
        None => {
            warn!("missing or invalid x-real-ip header");
            Err(AppError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn parses_cidr_blocks() {
        let subnet: TrustedSubnet = "192.168.1.0/24".parse().unwrap();
        assert_eq!(subnet.to_string(), "192.168.1.0/24");

        assert!(matches!(
            "192.168.1.0".parse::<TrustedSubnet>(),
            Err(SubnetError::Format(_))
        ));
        assert!(matches!(
            "not-an-ip/8".parse::<TrustedSubnet>(),
            Err(SubnetError::Address(_))
        ));
        assert!(matches!(
            "10.0.0.0/33".parse::<TrustedSubnet>(),
            Err(SubnetError::Prefix(_))
        ));
        assert!("".parse::<TrustedSubnet>().is_err());
    }

    #[test]
    fn v4_membership() {
        let subnet: TrustedSubnet = "10.1.0.0/16".parse().unwrap();

        assert!(subnet.contains(ip("10.1.0.1")));
        assert!(subnet.contains(ip("10.1.255.255")));
        assert!(!subnet.contains(ip("10.2.0.1")));
        assert!(!subnet.contains(ip("::1")));
    }

    #[test]
    fn zero_prefix_matches_every_address_of_the_family() {
        let any: TrustedSubnet = "0.0.0.0/0".parse().unwrap();
        assert!(any.contains(ip("203.0.113.9")));

        let host: TrustedSubnet = "127.0.0.1/32".parse().unwrap();
        assert!(host.contains(ip("127.0.0.1")));
        assert!(!host.contains(ip("127.0.0.2")));
    }

    #[test]
    fn v6_membership() {
        let subnet: TrustedSubnet = "fd00::/8".parse().unwrap();

        assert!(subnet.contains(ip("fd12:3456::1")));
        assert!(!subnet.contains(ip("fe80::1")));
        assert!(!subnet.contains(ip("10.0.0.1")));
    }
}
