//! Repository URL normalization and web-to-API translation.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::error::{Result, SyncError};

/// Hosts and endpoints of the remote repository service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSource {
    /// Host substring every repository page URL must contain.
    pub web_host: String,
    /// Replacement for `web_host` that yields the repository API URL.
    pub api_host: String,
    /// Endpoint reporting the request budget.
    pub rate_limit_url: String,
    /// Branch used when resolving relative README image paths.
    pub raw_branch: String,
}

impl Default for DataSource {
    fn default() -> Self {
        Self {
            web_host: "github.com".to_string(),
            api_host: "api.github.com/repos".to_string(),
            rate_limit_url: "https://api.github.com/rate_limit".to_string(),
            raw_branch: "master".to_string(),
        }
    }
}

impl DataSource {
    /// Translate a user-entered repository page URL into its API URL.
    ///
    /// Fails with `InvalidParameter` when the URL is empty or does not
    /// reference `web_host`. URLs that already point at the API are returned
    /// sanitized.
    pub fn make_api_url(&self, raw: &str) -> Result<String> {
        let url = sanitize_url(raw)?;
        let url = url.trim_end_matches('/');
        if find_ignore_case(url, &self.api_host).is_some() {
            return Ok(url.to_string());
        }
        let at = find_ignore_case(url, &self.web_host).ok_or_else(|| {
            SyncError::invalid_parameter(format!("{url} is not a {} URL", self.web_host))
        })?;
        let mut api = String::with_capacity(url.len() + self.api_host.len());
        api.push_str(&url[..at]);
        api.push_str(&self.api_host);
        api.push_str(&url[at + self.web_host.len()..]);
        Ok(api)
    }

    /// Inverse of [`make_api_url`](Self::make_api_url).
    #[must_use]
    pub fn web_url_from_api(&self, api_url: &str) -> String {
        replace_ignore_case(api_url, &self.api_host, &self.web_host)
    }
}

/// Normalize a repository URL: trim, drop leading `www.` labels, force `https://`.
///
/// Idempotent. Blank input is an `InvalidParameter` error.
pub fn sanitize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SyncError::invalid_parameter("repository URL is empty"));
    }
    let mut rest = strip_prefix_ignore_case(trimmed, "https://")
        .or_else(|| strip_prefix_ignore_case(trimmed, "http://"))
        .unwrap_or(trimmed);
    while let Some(stripped) = strip_prefix_ignore_case(rest, "www.") {
        rest = stripped;
    }
    if rest.is_empty() {
        return Err(SyncError::invalid_parameter(format!("{trimmed} has no host")));
    }
    Ok(format!("https://{rest}"))
}

/// Whether a URL may be fetched: http(s), a public host, a standard port.
#[must_use]
pub fn is_safe_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    if !matches!(url.port(), None | Some(80 | 443 | 8080)) {
        return false;
    }
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            !domain.is_empty() && domain != "localhost" && !domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_public_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_public_ip(IpAddr::V6(ip)),
        None => false,
    }
}

fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast())
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || unique_local || link_local)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| strip_prefix_ignore_case(&haystack[i..], needle).is_some())
}

/// Replace every occurrence of `needle`, ignoring ASCII case.
#[must_use]
pub fn replace_ignore_case(haystack: &str, needle: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(at) = find_ignore_case(rest, needle) {
        out.push_str(&rest[..at]);
        out.push_str(replacement);
        rest = &rest[at + needle.len()..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn api(source: &DataSource, raw: &str) -> String {
        source.make_api_url(raw).expect("repository url")
    }

    #[test]
    fn sanitize_forces_https_and_strips_www() {
        assert_eq!(
            sanitize_url("http://www.github.com/rust-lang/rust").unwrap(),
            "https://github.com/rust-lang/rust"
        );
        assert_eq!(
            sanitize_url("  WWW.GitHub.com/a/b ").unwrap(),
            "https://GitHub.com/a/b"
        );
        assert_eq!(
            sanitize_url("HTTPS://github.com/a/b").unwrap(),
            "https://github.com/a/b"
        );
        assert_eq!(
            sanitize_url("http://www.Example.com/x").unwrap(),
            "https://Example.com/x"
        );
        assert_eq!(
            sanitize_url("http://www.www.example.com").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in [
            "github.com/a/b",
            "http://www.github.com/a/b",
            "https://github.com/a/b/",
            "www.example.org",
            "http://www.www.example.com",
        ] {
            let once = sanitize_url(raw).unwrap();
            assert_eq!(sanitize_url(&once).unwrap(), once, "input {raw:?}");
        }
    }

    #[test]
    fn sanitize_rejects_blank_and_hostless_input() {
        for raw in ["", "   ", "https://", "http://www."] {
            let err = sanitize_url(raw).expect_err(raw);
            assert_eq!(err.kind(), ErrorKind::InvalidParameter, "input {raw:?}");
        }
    }

    #[test]
    fn make_api_url_substitutes_host_and_keeps_path() {
        let source = DataSource::default();
        assert_eq!(
            api(&source, "http://www.github.com/serde-rs/serde"),
            "https://api.github.com/repos/serde-rs/serde"
        );
        assert_eq!(
            api(&source, "github.com/tokio-rs/tokio/"),
            "https://api.github.com/repos/tokio-rs/tokio"
        );
    }

    #[test]
    fn make_api_url_rejects_other_hosts() {
        let source = DataSource::default();
        for raw in ["https://gitlab.com/a/b", ""] {
            let err = source.make_api_url(raw).expect_err(raw);
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }
    }

    #[test]
    fn make_api_url_leaves_api_urls_alone() {
        let source = DataSource::default();
        assert_eq!(
            api(&source, "https://api.github.com/repos/a/b"),
            "https://api.github.com/repos/a/b"
        );
    }

    #[test]
    fn make_api_url_only_replaces_the_host() {
        let source = DataSource::default();
        assert_eq!(
            api(&source, "https://github.com/owner/github.com-mirror"),
            "https://api.github.com/repos/owner/github.com-mirror"
        );
    }

    #[test]
    fn web_url_from_api_reverses_translation() {
        let source = DataSource::default();
        assert_eq!(
            source.web_url_from_api("https://API.github.com/repos/a/b"),
            "https://github.com/a/b"
        );
    }

    #[test]
    fn safe_url_accepts_public_https() {
        assert!(is_safe_url("https://api.github.com/repos/a/b"));
        assert!(is_safe_url("http://example.com:8080/x"));
        assert!(is_safe_url("https://8.8.8.8/"));
    }

    #[test]
    fn safe_url_rejects_local_and_odd_targets() {
        for url in [
            "ftp://github.com/a",
            "https://localhost/a",
            "https://api.localhost/a",
            "http://127.0.0.1/",
            "http://10.0.0.4/",
            "http://192.168.1.1/",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/",
            "http://[fd00::1]/",
            "http://[::ffff:127.0.0.1]/",
            "https://github.com:2222/a",
            "not a url",
        ] {
            assert!(!is_safe_url(url), "{url} should be rejected");
        }
    }

    #[test]
    fn replace_ignore_case_replaces_all_occurrences() {
        assert_eq!(replace_ignore_case("a/BLOB/b/blob/c", "/blob/", "/raw/"), "a/raw/b/raw/c");
        assert_eq!(replace_ignore_case("nothing", "x", "y"), "nothing");
    }
}
