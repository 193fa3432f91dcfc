use axum::http::HeaderMap;

use audit_domain::RuntimeConfig;

/// Shared-token check. With no token configured every request is allowed,
/// matching a trusted-network deployment.
pub fn authorize(config: &RuntimeConfig, headers: &HeaderMap) -> bool {
    if let Some(api_token) = &config.api_token {
        return extract_bearer(headers)
            .map(|v| v == *api_token)
            .unwrap_or(false);
    }
    true
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("Authorization")?.to_str().ok()?.trim();
    let prefix = "Bearer ";
    if !value.starts_with(prefix) {
        return None;
    }
    let token = value[prefix.len()..].trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn config(token: Option<&str>) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            api_token: token.map(str::to_string),
            alert_webhook_url: None,
            alert_webhook_template: None,
            thresholds_path: "./thresholds.yaml".to_string(),
            max_body_bytes: 1024,
            request_timeout_seconds: 5,
        }
    }

    fn headers_with(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert("Authorization", HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn no_configured_token_allows_everything() {
        assert!(authorize(&config(None), &headers_with(None)));
        assert!(authorize(&config(None), &headers_with(Some("Bearer anything"))));
    }

    #[test]
    fn configured_token_requires_matching_bearer() {
        let config = config(Some("s3cret"));
        assert!(authorize(&config, &headers_with(Some("Bearer s3cret"))));
        assert!(!authorize(&config, &headers_with(Some("Bearer wrong"))));
        assert!(!authorize(&config, &headers_with(Some("s3cret"))));
        assert!(!authorize(&config, &headers_with(Some("Bearer "))));
        assert!(!authorize(&config, &headers_with(None)));
    }
}
