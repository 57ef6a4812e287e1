//! Same-site link classification and resolution

use url::Url;

/// True when `url` and `base_url` share a network location (host and port).
///
/// Scheme and path are ignored. Ports are compared as the URL parser reports
/// them, so an explicit default port is equal to an omitted one.
pub fn is_internal(url: &Url, base_url: &Url) -> bool {
    url.host_str() == base_url.host_str() && url.port() == base_url.port()
}

/// Resolve an `href` against the page it was found on.
///
/// Returns `None` for hrefs that do not resolve or that point at a non-web
/// scheme (`mailto:`, `javascript:`, ...).
pub fn resolve_link(href: &str, page_url: &Url) -> Option<Url> {
    let resolved = page_url.join(href.trim()).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_host_is_internal() {
        let base = url("https://example.com/");
        assert!(is_internal(&url("https://example.com/about"), &base));
        assert!(is_internal(&url("https://example.com/a/b?c=d#e"), &base));
    }

    #[test]
    fn test_scheme_is_not_compared() {
        let base = url("https://example.com/");
        assert!(is_internal(&url("http://example.com/"), &base));
    }

    #[test]
    fn test_other_hosts_are_external() {
        let base = url("https://example.com/");
        assert!(!is_internal(&url("https://blog.example.com/"), &base));
        assert!(!is_internal(&url("https://other.org/"), &base));
    }

    #[test]
    fn test_port_is_part_of_the_location() {
        let base = url("http://127.0.0.1:8080/");
        assert!(is_internal(&url("http://127.0.0.1:8080/page"), &base));
        assert!(!is_internal(&url("http://127.0.0.1:9090/page"), &base));
        assert!(!is_internal(&url("http://127.0.0.1/page"), &base));
    }

    #[test]
    fn test_explicit_default_port_is_same_site() {
        let base = url("https://example.com/");
        assert!(is_internal(&url("https://example.com:443/a"), &base));
        assert!(!is_internal(&url("https://example.com:8443/a"), &base));

        let base = url("https://example.com:443/");
        assert!(is_internal(&url("https://example.com/a"), &base));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let page = url("https://example.com/docs/intro");
        assert_eq!(
            resolve_link("setup", &page).unwrap().as_str(),
            "https://example.com/docs/setup"
        );
        assert_eq!(
            resolve_link("/pricing", &page).unwrap().as_str(),
            "https://example.com/pricing"
        );
        assert_eq!(
            resolve_link("https://other.org/x", &page).unwrap().as_str(),
            "https://other.org/x"
        );
    }

    #[test]
    fn test_resolve_skips_non_web_schemes() {
        let page = url("https://example.com/");
        assert!(resolve_link("mailto:hi@example.com", &page).is_none());
        assert!(resolve_link("javascript:void(0)", &page).is_none());
    }
}
