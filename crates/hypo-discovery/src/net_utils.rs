use local_ip_address::list_afinet_netifas;
use std::net::{IpAddr, Ipv4Addr};
use tracing::{info, warn};

/// Detect the best physical LAN IPv4 address to advertise and listen on.
///
/// Filtering rules: exclude loopback and link-local addresses, tunnel
/// interfaces (utun/tun/tap), and Clash's TUN range (198.18.0.0/15); keep
/// only RFC 1918 private addresses.
pub fn get_physical_lan_ip() -> Option<Ipv4Addr> {
    let interfaces = match list_afinet_netifas() {
        Ok(ifaces) => ifaces,
        Err(e) => {
            warn!(error = %e, "failed to enumerate network interfaces");
            return None;
        }
    };

    for (iface_name, ip) in interfaces {
        if let IpAddr::V4(v4) = ip {
            if v4.is_loopback() || v4.is_link_local() {
                continue;
            }
            if is_tunnel_interface(&iface_name) {
                continue;
            }
            if is_clash_tun_address(v4) {
                continue;
            }
            if is_private_ipv4(v4) {
                info!(ip = %v4, interface = %iface_name, "detected physical LAN IP");
                return Some(v4);
            }
        }
    }

    warn!("no suitable physical LAN IP found");
    None
}

fn is_tunnel_interface(name: &str) -> bool {
    name.contains("utun") || name.contains("tun") || name.contains("tap")
}

fn is_clash_tun_address(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    octets[0] == 198 && octets[1] >= 18
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    match octets[0] {
        10 => true,
        172 => (16..=31).contains(&octets[1]),
        192 => octets[1] == 168,
        _ => false,
    }
}
