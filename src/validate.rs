//! URL validation that runs before any network access.
//!
//! Only `http`/`https` URLs with a non-local host are accepted. Loopback and
//! unspecified addresses are refused so a fetch can never be pointed back at
//! the machine running it.

use std::net::IpAddr;

use tracing::debug;
use url::{Host, ParseError, Url};

use crate::fetch::RejectReason;

/// Host names refused regardless of what they resolve to.
const LOCAL_HOST_NAMES: &[&str] = &["localhost", "localhost.localdomain"];

/// Validation switches applied by [`validate_url`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlPolicy {
    /// Accept loopback and unspecified hosts.
    pub allow_local_addresses: bool,
}

/// Validates a URL string, returning the parsed URL when it may be fetched.
///
/// Rules are applied in order: the string must parse, the scheme must be
/// exactly `http` or `https`, and the host must not be a local address.
///
/// # Errors
///
/// Returns [`RejectReason::Malformed`], [`RejectReason::Scheme`] or
/// [`RejectReason::LocalAddress`] for the first rule that fails.
pub fn validate_url(raw: &str, policy: UrlPolicy) -> Result<Url, RejectReason> {
    let url = match Url::parse(raw.trim()) {
        Ok(url) => url,
        // "example.com/cat.png" parses as a relative reference: it has no scheme.
        Err(ParseError::RelativeUrlWithoutBase) => return Err(RejectReason::Scheme),
        Err(error) => {
            debug!(url = %raw, %error, "URL failed to parse");
            return Err(RejectReason::Malformed);
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RejectReason::Scheme);
    }

    let Some(host) = url.host() else {
        return Err(RejectReason::Malformed);
    };

    if !policy.allow_local_addresses && is_local_host(&host) {
        return Err(RejectReason::LocalAddress);
    }

    Ok(url)
}

/// Returns true when `url` points at a loopback or unspecified host.
pub(crate) fn is_local_url(url: &Url) -> bool {
    url.host().is_some_and(|host| is_local_host(&host))
}

/// Returns true for loopback/unspecified IP literals and local host names.
fn is_local_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            LOCAL_HOST_NAMES.contains(&name.as_str()) || name.ends_with(".localhost")
        }
        Host::Ipv4(addr) => is_local_ip(IpAddr::V4(*addr)),
        Host::Ipv6(addr) => is_local_ip(IpAddr::V6(*addr)),
    }
}

fn is_local_ip(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || v6
                    .to_ipv4_mapped()
                    .is_some_and(|v4| is_local_ip(IpAddr::V4(v4)))
        }
    }
}
