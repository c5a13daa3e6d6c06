//! Target validation for notification channels
//!
//! Webhook URLs are validated at alert creation time, never at delivery
//! time: the threat model is a user injecting alert config that exfiltrates
//! to internal services (SSRF).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

use crate::error::{Error, Result};

/// Validate a webhook URL against SSRF targets
///
/// Pure function, no DNS lookups and no I/O. Rejects non-http(s) schemes
/// and any host that is a loopback, link-local (including the cloud
/// metadata endpoint 169.254.169.254), or private-range address literal,
/// plus the `localhost` name.
pub fn validate_webhook_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::validation(format!("invalid webhook URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::security(format!(
                "webhook URL scheme '{other}' is not allowed (use http or https)"
            )));
        }
    }

    let host = url
        .host()
        .ok_or_else(|| Error::validation("webhook URL has no host"))?;

    match host {
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            if domain == "localhost" || domain.ends_with(".localhost") {
                return Err(Error::security("webhook URL resolves to localhost"));
            }
        }
        Host::Ipv4(addr) => reject_blocked_ip(IpAddr::V4(addr))?,
        Host::Ipv6(addr) => reject_blocked_ip(IpAddr::V6(addr))?,
    }

    Ok(url)
}

fn reject_blocked_ip(addr: IpAddr) -> Result<()> {
    let blocked = match addr {
        IpAddr::V4(v4) => blocked_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => blocked_v4(v4),
            None => blocked_v6(v6),
        },
    };

    match blocked {
        Some(reason) => Err(Error::security(format!(
            "webhook URL host {addr} is a {reason} address"
        ))),
        None => Ok(()),
    }
}

fn blocked_v4(addr: Ipv4Addr) -> Option<&'static str> {
    if addr.is_loopback() {
        Some("loopback")
    } else if addr.is_link_local() {
        // 169.254.0.0/16, which covers the 169.254.169.254 metadata endpoint
        Some("link-local")
    } else if addr.is_private() {
        Some("private-range")
    } else if addr.is_unspecified() {
        Some("unspecified")
    } else {
        None
    }
}

fn blocked_v6(addr: Ipv6Addr) -> Option<&'static str> {
    let first = addr.segments()[0];
    if addr.is_loopback() {
        Some("loopback")
    } else if addr.is_unspecified() {
        Some("unspecified")
    } else if first & 0xfe00 == 0xfc00 {
        // fc00::/7 unique local
        Some("private-range")
    } else if first & 0xffc0 == 0xfe80 {
        // fe80::/10 link-local
        Some("link-local")
    } else {
        None
    }
}

/// Basic syntax check for an email target
///
/// Delivery is delegated to an SMTP sender, so this only rejects obviously
/// malformed addresses at creation time.
pub fn validate_email(address: &str) -> Result<()> {
    let reject = |reason: &str| Err(Error::validation(format!("invalid email '{address}': {reason}")));

    if address.chars().any(char::is_whitespace) {
        return reject("contains whitespace");
    }

    let Some((local, domain)) = address.split_once('@') else {
        return reject("missing @");
    };

    if local.is_empty() {
        return reject("empty local part");
    }
    if domain.is_empty() || domain.contains('@') {
        return reject("malformed domain");
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return reject("domain is not a dotted name");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_security(result: Result<Url>) -> bool {
        matches!(result, Err(Error::Security(_)))
    }

    #[test]
    fn rejects_loopback_and_localhost() {
        assert!(is_security(validate_webhook_url("http://127.0.0.1/x")));
        assert!(is_security(validate_webhook_url("http://127.1.2.3:8080/x")));
        assert!(is_security(validate_webhook_url("http://localhost/hook")));
        assert!(is_security(validate_webhook_url("http://LOCALHOST:3000/hook")));
        assert!(is_security(validate_webhook_url("http://[::1]/hook")));
    }

    #[test]
    fn rejects_cloud_metadata_endpoint() {
        assert!(is_security(validate_webhook_url(
            "http://169.254.169.254/latest/meta-data"
        )));
        assert!(is_security(validate_webhook_url("http://169.254.0.99/")));
    }

    #[test]
    fn rejects_private_ranges() {
        assert!(is_security(validate_webhook_url("http://10.0.0.5/")));
        assert!(is_security(validate_webhook_url("http://172.16.4.2/hook")));
        assert!(is_security(validate_webhook_url("http://192.168.1.1/hook")));
    }

    #[test]
    fn rejects_ipv4_mapped_ipv6() {
        assert!(is_security(validate_webhook_url(
            "http://[::ffff:10.0.0.5]/hook"
        )));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(is_security(validate_webhook_url("ftp://example.com/x")));
        assert!(is_security(validate_webhook_url("file:///etc/passwd")));
        assert!(is_security(validate_webhook_url("gopher://example.com/")));
    }

    #[test]
    fn rejects_unparseable_urls() {
        assert!(matches!(
            validate_webhook_url("not a url"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn accepts_public_https_hosts() {
        validate_webhook_url("https://hooks.slack.com/services/T00/B00/XXXX").unwrap();
        validate_webhook_url("https://example.com:8443/alerts").unwrap();
        validate_webhook_url("http://203.0.113.10/hook").unwrap();
    }

    #[test]
    fn email_syntax_check() {
        validate_email("ops@example.com").unwrap();
        validate_email("first.last+alerts@sub.example.org").unwrap();

        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ops@").is_err());
        assert!(validate_email("ops@nodots").is_err());
        assert!(validate_email("ops person@example.com").is_err());
    }
}
