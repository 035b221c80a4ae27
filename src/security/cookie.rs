//! Session cookie scoping.
//!
//! Logging in through a proxied subdomain should also log the user into
//! every sibling, so the cookie domain is narrowed to the matching entry
//! of the proxy-domain allowlist.

use crate::security::auth::SESSION_COOKIE;

/// `Domain=<host>` directive for the session cookie, or `None` when the
/// browser would reject a domain cookie for this host.
pub fn cookie_domain(host: &str, proxy_domains: &[String]) -> Option<String> {
    let mut host = match host.rfind(':') {
        Some(idx) => &host[..idx],
        None => host,
    };

    let unusable = host.is_empty()
        // Domain names never contain ':', so this is IPv6.
        || host.contains(':')
        // All digits and dots is IPv4.
        || host.chars().all(|c| c.is_ascii_digit() || c == '.')
        || host.ends_with(".localhost")
        || host == "localhost";
    if unusable {
        tracing::debug!(host = %host, "No valid cookie domain");
        return None;
    }

    for domain in proxy_domains {
        if host.ends_with(domain.as_str()) && domain.len() < host.len() {
            host = domain;
        }
    }

    tracing::debug!(host = %host, "Got cookie domain");
    if host.is_empty() {
        None
    } else {
        Some(format!("Domain={host}"))
    }
}

/// `Set-Cookie` value that stores the hashed password.
pub fn session_cookie(hashed_password: &str, domain: Option<&str>) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={hashed_password}; Path=/; SameSite=Lax");
    if let Some(domain) = domain {
        cookie.push_str("; ");
        cookie.push_str(domain);
    }
    cookie
}
