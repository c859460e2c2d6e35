//! Resolution of the originating client address for a request.
//!
//! Order of preference: first entry of `X-Forwarded-For`, then `X-Real-IP`,
//! then the transport peer recorded by `ConnectInfo`. Header values that do
//! not parse as an IP address are skipped. IPv4-mapped IPv6 addresses are
//! reported as plain IPv4.

use axum::{extract::ConnectInfo, http::HeaderMap, http::request::Parts};
use std::net::{IpAddr, SocketAddr};

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Resolve the client address from request headers and the peer address.
pub fn resolve_client_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').map(str::trim).find(|s| !s.is_empty()))
        .and_then(|s| s.parse::<IpAddr>().ok());

    let real_ip = || {
        headers
            .get(REAL_IP_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    forwarded
        .or_else(real_ip)
        .or_else(|| peer.map(|addr| addr.ip()))
        .map(|ip| ip.to_canonical())
}

/// Resolve the client address of a request whose parts are at hand.
pub fn client_addr_from_parts(parts: &Parts) -> Option<IpAddr> {
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    resolve_client_addr(&parts.headers, peer)
}

/// Resolve the client address of a full request.
pub fn client_addr_from_request<B>(request: &axum::http::Request<B>) -> Option<IpAddr> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    resolve_client_addr(request.headers(), peer)
}
