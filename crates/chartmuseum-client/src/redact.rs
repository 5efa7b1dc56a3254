//! URL sanitizing for logs and error messages

use url::Url;

const SENSITIVE_PARAMS: &[&str] = &["password", "passwd", "token", "secret", "key", "signature"];

fn is_sensitive(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_PARAMS.iter().any(|p| lower.contains(p))
}

/// Strip userinfo and mask secret-looking query values
pub fn sanitize_url(url: &Url) -> String {
    let mut clean = url.clone();
    // Only fails for cannot-be-a-base URLs, which never carry credentials
    let _ = clean.set_username("");
    let _ = clean.set_password(None);
    clean.set_fragment(None);

    if clean.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let value = if is_sensitive(&k) {
                    "REDACTED".to_string()
                } else {
                    v.into_owned()
                };
                (k.into_owned(), value)
            })
            .collect();
        clean.query_pairs_mut().clear().extend_pairs(pairs);
    }

    clean.to_string()
}

/// Sanitize a URL given as a string
///
/// Input that does not parse as a hierarchical URL still loses anything that
/// looks like userinfo: everything before the last `@` of the authority.
pub fn sanitize_url_str(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) if !parsed.cannot_be_a_base() => sanitize_url(&parsed),
        _ => strip_userinfo(raw),
    }
}

fn strip_userinfo(raw: &str) -> String {
    let start = raw.find("://").map_or(0, |i| i + 3);
    match raw[start..].rfind('@') {
        Some(at) => format!("{}{}", &raw[..start], &raw[start + at + 1..]),
        None => raw.to_string(),
    }
}
