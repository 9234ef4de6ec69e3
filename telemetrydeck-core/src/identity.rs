//! Pseudo-anonymous user identity
//!
//! A client that is not given an explicit user ID falls back to a
//! fingerprint of the local machine and OS account. Whatever ID is used,
//! only its salted SHA-256 hash ever leaves the process.

use sha2::{Digest, Sha256};

/// Source of the machine characteristics that make up a fallback user ID.
///
/// Every lookup is allowed to fail; a failed lookup returns `None` and
/// contributes an empty segment.
pub trait MachineProbe {
    /// Local host name
    fn hostname(&self) -> Option<String>;
    /// Hardware addresses of the local network interfaces, in any order
    fn mac_addresses(&self) -> Option<Vec<String>>;
    /// Numeric OS user ID
    fn uid(&self) -> Option<u32>;
    /// Numeric OS group ID
    fn gid(&self) -> Option<u32>;
    /// Environment variable lookup
    fn env(&self, name: &str) -> Option<String>;
}

/// Probe backed by the running process and host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl MachineProbe for SystemProbe {
    fn hostname(&self) -> Option<String> {
        hostname::get().ok().and_then(|h| h.into_string().ok())
    }

    fn mac_addresses(&self) -> Option<Vec<String>> {
        system_mac_addresses()
    }

    #[cfg(unix)]
    fn uid(&self) -> Option<u32> {
        // SAFETY: getuid has no preconditions and cannot fail
        Some(unsafe { libc::getuid() })
    }

    #[cfg(not(unix))]
    fn uid(&self) -> Option<u32> {
        None
    }

    #[cfg(unix)]
    fn gid(&self) -> Option<u32> {
        // SAFETY: getgid has no preconditions and cannot fail
        Some(unsafe { libc::getgid() })
    }

    #[cfg(not(unix))]
    fn gid(&self) -> Option<u32> {
        None
    }

    fn env(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

fn system_mac_addresses() -> Option<Vec<String>> {
    let interfaces = mac_address::MacAddressIterator::new().ok()?;
    Some(interfaces.map(|mac| format_mac(&mac.bytes())).collect())
}

/// Lower-case, colon-separated hex
fn format_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Loopback and virtual interfaces report an all-zero address, which
/// carries no information.
fn is_hardware_address(addr: &str) -> bool {
    !addr.is_empty() && addr.chars().any(|c| c.is_ascii_hexdigit() && c != '0')
}

/// Returns a pseudo-unique user identifier for this machine and OS user.
///
/// Never fails: lookups that fail leave their segment empty.
pub fn generate_fallback_user_id() -> String {
    fallback_user_id_from(&SystemProbe)
}

/// Builds the fallback user identifier from an arbitrary probe.
///
/// Layout: `|os|arch|hostname|macs|uid|gid|user`. MAC addresses are
/// sorted and space-joined so interface enumeration order cannot change
/// the result.
pub fn fallback_user_id_from(probe: &dyn MachineProbe) -> String {
    let mut segments: Vec<String> = vec![
        std::env::consts::OS.to_string(),
        std::env::consts::ARCH.to_string(),
        probe.hostname().unwrap_or_default(),
    ];

    let macs = probe
        .mac_addresses()
        .map(|addrs| {
            let mut addrs: Vec<String> = addrs
                .into_iter()
                .filter(|a| is_hardware_address(a))
                .collect();
            addrs.sort();
            addrs.join(" ")
        })
        .unwrap_or_default();
    segments.push(macs);

    segments.push(probe.uid().map(|u| u.to_string()).unwrap_or_default());
    segments.push(probe.gid().map(|g| g.to_string()).unwrap_or_default());

    let user = ["USER", "USERNAME"]
        .iter()
        .filter_map(|name| probe.env(name))
        .find(|value| !value.is_empty())
        .unwrap_or_default();
    segments.push(user);

    segments.iter().map(|s| format!("|{}", s)).collect()
}

/// Returns the hex-encoded SHA-256 digest of `id` with `salt` appended.
pub fn hash_user_id(id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}
