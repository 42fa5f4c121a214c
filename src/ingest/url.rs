/// Strip a single leading `www.` so "www.example.com" and "example.com"
/// register, match, and aggregate as one tracked domain.
pub fn normalize_domain(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Extract the normalized, lowercased hostname from a page URL.
///
/// Returns `None` for anything without an http(s) scheme or a host, which
/// the beacon handler reports as a malformed URL.
pub fn hostname(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    let host = normalize_domain(&host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Truncate to `max_len` characters and drop control characters.
pub fn sanitize(input: &str, max_len: usize) -> String {
    input
        .chars()
        .filter(|c| !c.is_control())
        .take(max_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_www() {
        assert_eq!(normalize_domain("www.example.com"), "example.com");
        assert_eq!(normalize_domain("example.com"), "example.com");
    }

    #[test]
    fn test_normalize_strips_only_one_leading_www() {
        assert_eq!(normalize_domain("www.www.example.com"), "www.example.com");
        assert_eq!(normalize_domain("wwwexample.com"), "wwwexample.com");
    }

    #[test]
    fn test_hostname_basic() {
        assert_eq!(
            hostname("https://example.com/blog/post?x=1#top"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_hostname_normalizes_www_and_case() {
        assert_eq!(
            hostname("https://WWW.Example.COM/"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_hostname_strips_port() {
        assert_eq!(
            hostname("http://localhost:3000/page"),
            Some("localhost".to_string())
        );
    }

    #[test]
    fn test_hostname_rejects_missing_scheme() {
        assert_eq!(hostname("example.com/page"), None);
        assert_eq!(hostname("ftp://example.com/"), None);
    }

    #[test]
    fn test_hostname_rejects_empty_host() {
        assert_eq!(hostname("https:///path"), None);
        assert_eq!(hostname("https://"), None);
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(500);
        assert_eq!(sanitize(&long, 256).len(), 256);
    }

    #[test]
    fn test_sanitize_drops_control_chars() {
        assert_eq!(sanitize("hello\x00world\x01", 256), "helloworld");
    }
}
