//! Redaction applied before anything reaches history or logs

use url::Url;

/// Typed text is never stored; only its length survives.
pub fn redact_text(text: &str) -> String {
    format!("[redacted: {} chars]", text.chars().count())
}

/// Keeps scheme, host and path; every query value becomes `***` and the fragment is dropped.
pub fn redact_url(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw.trim()) else {
        // unparseable: keep what precedes the query
        return raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
    };
    let mut redacted = format!("{}://", parsed.scheme());
    if let Some(host) = parsed.host_str() {
        redacted.push_str(host);
    }
    if let Some(port) = parsed.port() {
        redacted.push(':');
        redacted.push_str(&port.to_string());
    }
    let path = parsed.path();
    if path != "/" {
        redacted.push_str(path);
    }
    let keys: Vec<String> = parsed
        .query_pairs()
        .map(|(key, _)| format!("{key}=***"))
        .collect();
    if !keys.is_empty() {
        redacted.push('?');
        redacted.push_str(&keys.join("&"));
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_text_keeps_only_length() {
        assert_eq!(redact_text("hunter2"), "[redacted: 7 chars]");
        assert_eq!(redact_text(""), "[redacted: 0 chars]");
    }

    #[test]
    fn query_values_are_masked() {
        assert_eq!(
            redact_url("https://example.com/search?q=secret&page=2#top"),
            "https://example.com/search?q=***&page=***"
        );
        assert_eq!(redact_url("https://example.com/"), "https://example.com");
        assert_eq!(
            redact_url("http://localhost:8080/a"),
            "http://localhost:8080/a"
        );
    }

    #[test]
    fn unparseable_urls_lose_their_query() {
        assert_eq!(redact_url("example.com/login?token=abc"), "example.com/login");
    }
}
