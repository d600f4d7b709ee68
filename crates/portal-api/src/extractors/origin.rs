//! Best-effort client origin: user agent and network address.
//!
//! The address keys connection rate limiting, so it comes from the socket
//! peer. `X-Forwarded-For` is only read when the peer is a configured
//! trusted proxy, and then from the right, skipping further trusted hops.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;

use portal_realtime::ChannelMetadata;

use crate::state::AppState;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Origin metadata of the calling client, for diagnostics and rate limiting.
#[derive(Debug, Clone, Default)]
pub struct ClientOrigin {
    /// `User-Agent` header.
    pub user_agent: Option<String>,
    /// Client address as seen through any trusted proxies.
    pub remote_addr: Option<String>,
}

impl ClientOrigin {
    /// Converts into channel metadata.
    pub fn into_metadata(self) -> ChannelMetadata {
        ChannelMetadata {
            user_agent: self.user_agent,
            remote_addr: self.remote_addr,
        }
    }
}

/// Resolves the client address from the socket peer and, for trusted
/// peers only, the forwarded chain.
pub fn resolve_client_addr(
    peer: Option<IpAddr>,
    forwarded_for: Option<&str>,
    trusted: &[IpAddr],
) -> Option<IpAddr> {
    let peer = peer?;
    if !trusted.contains(&peer) {
        return Some(peer);
    }
    let Some(chain) = forwarded_for else {
        return Some(peer);
    };

    for hop in chain.rsplit(',').map(str::trim) {
        match hop.parse::<IpAddr>() {
            Ok(addr) if trusted.contains(&addr) => continue,
            Ok(addr) => return Some(addr),
            Err(_) => break,
        }
    }
    Some(peer)
}

impl FromRequestParts<AppState> for ClientOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let forwarded_for = parts
            .headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok());

        let remote_addr = resolve_client_addr(peer, forwarded_for, &state.trusted_proxies)
            .map(|addr| addr.to_string());

        Ok(Self {
            user_agent,
            remote_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarded_header() {
        let resolved = resolve_client_addr(Some(ip("203.0.113.9")), Some("1.2.3.4"), &[]);
        assert_eq!(resolved, Some(ip("203.0.113.9")));
    }

    #[test]
    fn test_trusted_peer_uses_rightmost_untrusted_hop() {
        let trusted = [ip("10.0.0.254"), ip("10.0.0.253")];
        let resolved = resolve_client_addr(
            Some(ip("10.0.0.254")),
            Some("6.6.6.6, 198.51.100.7, 10.0.0.253"),
            &trusted,
        );
        assert_eq!(resolved, Some(ip("198.51.100.7")));
    }

    #[test]
    fn test_trusted_peer_without_usable_hop_falls_back_to_peer() {
        let trusted = [ip("10.0.0.254")];
        assert_eq!(
            resolve_client_addr(Some(ip("10.0.0.254")), None, &trusted),
            Some(ip("10.0.0.254"))
        );
        assert_eq!(
            resolve_client_addr(Some(ip("10.0.0.254")), Some("garbage"), &trusted),
            Some(ip("10.0.0.254"))
        );
    }

    #[test]
    fn test_missing_peer_is_unknown() {
        assert_eq!(resolve_client_addr(None, Some("1.2.3.4"), &[]), None);
    }
}
