//! Management access guard
//!
//! Allows: 192.168.0.0/16, 10.0.0.0/8, 172.16.0.0/12, 127.0.0.0/8, ::1, fc00::/7
//! Denies everything else with 403. The webhook route is not behind this
//! guard since Simbase calls it from the internet.
//!
//! Forwarding headers are only honoured when the socket peer is itself a
//! trusted proxy; otherwise anyone could claim a private address.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};

use crate::error::AppError;

/// Middleware that rejects management calls from non-private networks.
pub async fn require_private_network(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match client_ip(req.headers(), addr) {
        Some(ip) if is_trusted(ip) => next.run(req).await,
        ip => {
            tracing::warn!(
                "[Guard] Management access denied for {:?} (path: {})",
                ip,
                req.uri().path()
            );
            AppError::Forbidden("Management API is only reachable from private networks".into())
                .into_response()
        }
    }
}

fn is_trusted(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        // unique local addresses, fc00::/7
        IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

/// The socket peer, unless it is a trusted proxy: then the first
/// X-Forwarded-For hop, then X-Real-IP. A forwarded header that is present
/// but unparseable yields None.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> Option<IpAddr> {
    let peer = addr.ip();
    if !is_trusted(peer) {
        return Some(peer);
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()));

    match forwarded {
        Some(raw) => raw.trim().parse().ok(),
        None => Some(peer),
    }
}
