//! HTTP server layer for tilegate.
//!
//! A thin axum layer over the tile resolver and the statistics exporters:
//! the tile surface is the router's fallback (every path that is not a
//! monitoring route goes through tile resolution), and the monitoring
//! routes are restricted to callers on the host itself.
//!
//! ```text
//! GET {prefix}/{project}/{zoom}/{col}/{row}.{format}   tile surface
//! GET {prefix}/statistics.json                         JSON statistics (local only)
//! GET {prefix}/munin                                   munin values (local only)
//! GET {prefix}/munin/config                            munin config (local only)
//! GET {prefix}/munin/average_size                      munin sizes (local only)
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;

use std::collections::HashSet;
use std::net::IpAddr;

/// Addresses considered "the host itself" for the monitoring surface.
///
/// Loopback plus whatever the configured bind hostname and the machine's
/// own hostname resolve to. Built once at startup.
pub async fn local_address_set(bind_hostname: &str) -> HashSet<IpAddr> {
    let mut addresses: HashSet<IpAddr> = HashSet::new();
    addresses.insert(IpAddr::from([127, 0, 0, 1]));
    addresses.insert(IpAddr::from([0u16, 0, 0, 0, 0, 0, 0, 1]));

    let own_hostname = gethostname::gethostname().to_string_lossy().into_owned();
    for host in [bind_hostname, own_hostname.as_str()] {
        if let Ok(resolved) = tokio::net::lookup_host((host, 0)).await {
            for addr in resolved {
                addresses.insert(addr.ip());
            }
        }
    }

    addresses
}

// =============================================================================
// Tests
// =============================================================================
