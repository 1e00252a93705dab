use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use doc_harvest::url::extract_domain;
///
/// let url = Url::parse("https://Docs.Example.COM/guide").unwrap();
/// assert_eq!(extract_domain(&url), Some("docs.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether `candidate` is the seed host or one of its subdomains
///
/// A leading `www.` on the seed is ignored, so a crawl seeded at
/// `www.example.com` also accepts `docs.example.com`.
///
/// ```
/// use doc_harvest::url::is_same_site;
///
/// assert!(is_same_site("example.com", "example.com"));
/// assert!(is_same_site("example.com", "api.v2.example.com"));
/// assert!(!is_same_site("example.com", "notexample.com"));
/// ```
pub fn is_same_site(seed_host: &str, candidate: &str) -> bool {
    let seed = seed_host.to_lowercase();
    let candidate = candidate.to_lowercase();
    let base = seed.strip_prefix("www.").unwrap_or(&seed);

    candidate == seed || candidate == base || candidate.ends_with(&format!(".{}", base))
}
