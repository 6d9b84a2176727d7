//! Client address resolution shared by rate limiting and audit records.

use actix_web::HttpRequest;

/// Placeholder used when neither a forwarded nor a peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the client IP for `req`.
///
/// With `trust_proxy`, the first `X-Forwarded-For` entry wins. Otherwise
/// the socket peer address is used, falling back to [`UNKNOWN_CLIENT`].
#[must_use]
pub fn client_ip(req: &HttpRequest, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_owned();
        }
    }
    req.peer_addr()
        .map_or_else(|| UNKNOWN_CLIENT.to_owned(), |addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    #[rstest]
    #[case(true, "203.0.113.7")]
    #[case(false, "10.0.0.2")]
    fn forwarded_header_needs_trusted_proxy(#[case] trust: bool, #[case] expected: &str) {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .peer_addr("10.0.0.2:4000".parse().expect("socket addr"))
            .to_http_request();
        assert_eq!(client_ip(&req, trust), expected);
    }

    #[rstest]
    fn blank_forwarded_header_falls_back_to_peer() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", " "))
            .peer_addr("10.0.0.2:4000".parse().expect("socket addr"))
            .to_http_request();
        assert_eq!(client_ip(&req, true), "10.0.0.2");
    }

    #[rstest]
    fn missing_addresses_read_as_unknown() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(client_ip(&req, false), UNKNOWN_CLIENT);
    }
}
