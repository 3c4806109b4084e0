// Node identity derived from the host's outbound address.

use std::net::IpAddr;

/// Label used when the outbound address is unknown or not dotted-quad.
pub const UNKNOWN_NODE_LABEL: &str = "node:0";

/// `node<last octet>` for an IPv4 address, `node:0` otherwise.
pub fn node_label(ip: Option<IpAddr>) -> String {
    match ip {
        Some(ip) => node_label_from_str(&ip.to_string()),
        None => UNKNOWN_NODE_LABEL.to_string(),
    }
}

/// Same as [`node_label`] but from the textual address form.
pub fn node_label_from_str(ip: &str) -> String {
    let parts: Vec<&str> = ip.split('.').collect();
    match parts.as_slice() {
        [_, _, _, last] if !last.is_empty() => format!("node{last}"),
        _ => UNKNOWN_NODE_LABEL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn ipv4_uses_last_octet() {
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 23));
        assert_eq!(node_label(Some(ip)), "node23");
        assert_eq!(node_label_from_str("192.168.10.54"), "node54");
    }

    #[test]
    fn ipv6_is_unknown() {
        assert_eq!(node_label(Some(IpAddr::V6(Ipv6Addr::LOCALHOST))), "node:0");
    }

    #[test]
    fn missing_or_malformed_is_unknown() {
        assert_eq!(node_label(None), "node:0");
        assert_eq!(node_label_from_str("10.0.23"), "node:0");
        assert_eq!(node_label_from_str("10.0.0."), "node:0");
        assert_eq!(node_label_from_str(""), "node:0");
    }
}
