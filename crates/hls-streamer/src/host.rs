//! Address advertised in the registry.

use std::net::{IpAddr, Ipv4Addr};
use sysinfo::System;
use tracing::{debug, warn};

/// Fallback when the host name cannot be resolved.
pub const FALLBACK_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Pick the IP to advertise.
///
/// `configured` wins when set. Otherwise the machine's host name is resolved
/// and the first IPv4 address is used, falling back to 127.0.0.1.
pub async fn advertised_ip(configured: Option<IpAddr>) -> IpAddr {
    if let Some(ip) = configured {
        return ip;
    }

    let Some(host) = System::host_name() else {
        warn!(target: "hls.discovery", "Host name unavailable, advertising {}", FALLBACK_IP);
        return FALLBACK_IP;
    };

    match resolve_ipv4(&host).await {
        Some(ip) => {
            debug!(target: "hls.discovery", host = %host, ip = %ip, "Resolved advertised address");
            ip
        }
        None => {
            warn!(
                target: "hls.discovery",
                host = %host,
                "Host name has no IPv4 address, advertising {}",
                FALLBACK_IP
            );
            FALLBACK_IP
        }
    }
}

/// First IPv4 address `host` resolves to.
pub async fn resolve_ipv4(host: &str) -> Option<IpAddr> {
    match tokio::net::lookup_host((host, 0)).await {
        Ok(addrs) => addrs.map(|addr| addr.ip()).find(IpAddr::is_ipv4),
        Err(e) => {
            debug!(target: "hls.discovery", host = %host, error = %e, "Host lookup failed");
            None
        }
    }
}
