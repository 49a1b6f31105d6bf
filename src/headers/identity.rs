//! Process-wide runtime identity.
//!
//! # Responsibilities
//! - Compute the runtime descriptor (`<pid>@<hostname>`)
//! - Derive the host name and process id, with fallbacks
//! - Expose the result as immutable process-wide state
//!
//! # Design Decisions
//! - Computed once on first use, never fails
//! - Each derivation is a pure function over its sources so the
//!   fallback chains can be exercised without touching the OS

use std::fs;
use std::sync::OnceLock;

static IDENTITY: OnceLock<RuntimeIdentity> = OnceLock::new();

/// Host name used when no source can provide one.
pub const UNKNOWN_HOST: &str = "unknown";

/// Identity facts about the running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeIdentity {
    /// Runtime descriptor, `<pid>@<hostname>`, or `<pid>@` without a host.
    pub raw_name: String,
    /// Local host name, `"unknown"` if undeterminable.
    pub host_name: String,
    /// Process id, `0` if undeterminable.
    pub pid: u32,
}

impl RuntimeIdentity {
    /// The identity of the current process, computed on first call.
    pub fn current() -> &'static RuntimeIdentity {
        IDENTITY.get_or_init(|| {
            let identity = Self::detect();
            tracing::debug!(
                raw_name = %identity.raw_name,
                host_name = %identity.host_name,
                pid = identity.pid,
                "Runtime identity detected"
            );
            identity
        })
    }

    /// Query the OS for every source and run the fallback chains.
    pub fn detect() -> Self {
        let os_host = os_host_name();
        let raw_name = runtime_descriptor(std::process::id(), os_host.as_deref());
        Self::from_sources(os_host, os_pid(), raw_name)
    }

    /// Build an identity from already-collected sources.
    pub fn from_sources(os_host: Option<String>, os_pid: Option<u32>, raw_name: String) -> Self {
        let host_name = derive_host_name(os_host, &raw_name);
        let pid = derive_pid(os_pid, &raw_name);
        Self {
            raw_name,
            host_name,
            pid,
        }
    }
}

/// `<pid>@<hostname>`. The pid is always present; the host part is empty
/// when unknown.
pub fn runtime_descriptor(pid: u32, host: Option<&str>) -> String {
    format!("{}@{}", pid, host.unwrap_or_default())
}

/// OS host name, else the part of `raw_name` after `'@'`, else `"unknown"`.
pub fn derive_host_name(os_host: Option<String>, raw_name: &str) -> String {
    if let Some(host) = os_host.filter(|h| !h.is_empty()) {
        return host;
    }
    match raw_name.find('@') {
        Some(index) if index >= 1 && index + 1 < raw_name.len() => {
            raw_name[index + 1..].to_string()
        }
        _ => UNKNOWN_HOST.to_string(),
    }
}

/// OS process id, else the part of `raw_name` before `'@'`, else `0`.
pub fn derive_pid(os_pid: Option<u32>, raw_name: &str) -> u32 {
    if let Some(pid) = os_pid {
        return pid;
    }
    match raw_name.find('@') {
        Some(index) if index >= 1 => raw_name[..index].parse().unwrap_or(0),
        _ => 0,
    }
}

fn os_host_name() -> Option<String> {
    system_host_name().or_else(fallback_host_name)
}

#[cfg(unix)]
fn system_host_name() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for `buf.len()` bytes for the whole call.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..end]).trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(not(unix))]
fn system_host_name() -> Option<String> {
    None
}

fn fallback_host_name() -> Option<String> {
    ["/proc/sys/kernel/hostname", "/etc/hostname"]
        .iter()
        .find_map(|path| fs::read_to_string(path).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|s| !s.is_empty()))
        .or_else(|| std::env::var("COMPUTERNAME").ok().filter(|s| !s.is_empty()))
}

// Linux exposes the pid as the target of the /proc/self link.
fn os_pid() -> Option<u32> {
    let target = fs::read_link("/proc/self").ok()?;
    target.file_name()?.to_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_format() {
        assert_eq!(runtime_descriptor(42, Some("web-1")), "42@web-1");
        assert_eq!(runtime_descriptor(42, None), "42@");
        assert_eq!(runtime_descriptor(42, Some("")), "42@");
    }

    #[test]
    fn test_pid_survives_missing_host() {
        let identity = RuntimeIdentity::from_sources(None, None, runtime_descriptor(4242, None));
        assert_eq!(identity.pid, 4242);
        assert_eq!(identity.host_name, "unknown");
    }

    #[test]
    fn test_host_name_fallbacks() {
        assert_eq!(derive_host_name(Some("os-host".into()), "1@raw-host"), "os-host");
        assert_eq!(derive_host_name(None, "1@raw-host"), "raw-host");
        // '@' must not be the first character
        assert_eq!(derive_host_name(None, "@raw-host"), "unknown");
        assert_eq!(derive_host_name(None, "1@"), "unknown");
        assert_eq!(derive_host_name(None, ""), "unknown");
        assert_eq!(derive_host_name(Some(String::new()), ""), "unknown");
    }

    #[test]
    fn test_pid_fallbacks() {
        assert_eq!(derive_pid(Some(77), "1@host"), 77);
        assert_eq!(derive_pid(None, "1234@host"), 1234);
        assert_eq!(derive_pid(None, "abc@host"), 0);
        assert_eq!(derive_pid(None, "host-only"), 0);
        assert_eq!(derive_pid(None, ""), 0);
    }

    #[test]
    fn test_from_sources_degraded() {
        let identity = RuntimeIdentity::from_sources(None, None, String::new());
        assert_eq!(identity.host_name, "unknown");
        assert_eq!(identity.pid, 0);
        assert_eq!(identity.raw_name, "");
    }

    #[test]
    fn test_current_is_stable() {
        let first = RuntimeIdentity::current();
        let second = RuntimeIdentity::current();
        assert!(std::ptr::eq(first, second));
        assert!(!first.host_name.is_empty());
        assert_eq!(first.pid, std::process::id());
    }
}
