//! Client address resolution behind trusted proxies.
//!
//! The gateway trusts a fixed number of proxy hops in front of it. The
//! client IP is read from `X-Forwarded-For` walking right to left past the
//! trusted hops; the protocol comes from `X-Forwarded-Proto` only when at
//! least one hop is trusted.

use std::net::IpAddr;

use axum::http::HeaderMap;

use crate::security::headers::{X_FORWARDED_FOR, X_FORWARDED_PROTO};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proto {
    Http,
    Https,
}

impl Proto {
    pub fn as_str(&self) -> &'static str {
        match self {
            Proto::Http => "http",
            Proto::Https => "https",
        }
    }
}

/// Who sent the request, as far as the trusted hops let us tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Address of the TCP peer.
    pub peer_ip: IpAddr,
    /// Resolved client address.
    pub ip: IpAddr,
    pub proto: Proto,
}

impl ClientInfo {
    pub fn resolve(headers: &HeaderMap, peer_ip: IpAddr, trusted_hops: usize) -> Self {
        if trusted_hops == 0 {
            return Self {
                peer_ip,
                ip: peer_ip,
                proto: Proto::Http,
            };
        }

        // Nearest first: the peer, then X-Forwarded-For right to left.
        let forwarded: Vec<IpAddr> = headers
            .get_all(&X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map_while(|s| s.parse().ok())
            .collect();

        let ip = if forwarded.is_empty() {
            peer_ip
        } else {
            forwarded[(trusted_hops - 1).min(forwarded.len() - 1)]
        };

        let proto = headers
            .get(&X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().eq_ignore_ascii_case("https"))
            .map_or(Proto::Http, |https| if https { Proto::Https } else { Proto::Http });

        Self { peer_ip, ip, proto }
    }
}
