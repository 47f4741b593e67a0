//! Parsing of `Set-Cookie` header values.
//!
//! ```text
//! set-cookie = name "=" value *( ";" OWS attribute )
//! attribute  = flag | key "=" value
//! ```
//!
//! Parsing is lenient: a malformed attribute is skipped, never reported as an error.
use crate::cookie_record::{is_domain_or_subdomain, normalize_domain, CookieRecord, EmptyKeyError};
use crate::date::parse_http_date;

/// Parse the value of a `Set-Cookie` header received from `host`.
///
/// Attributes are handled as follows, with attribute names matched ignoring ASCII case:
///
/// - `HttpOnly` and `Secure` set the respective flags.
/// - `Expires` is parsed as an HTTP-date. If the date is invalid, the cookie has no expiry.
/// - `Max-Age` is parsed as a signed number of seconds. Invalid values are ignored.
/// - `Domain` is normalized and kept only if it is `host` itself or a subdomain of it.
///   The cookie falls back to `host` as its domain otherwise.
/// - `Path` is kept verbatim.
/// - Everything else is ignored.
///
/// # Errors
///
/// Fails only if the cookie name is empty.
///
/// # Example
///
/// ```rust
/// use cantuccio::parse_set_cookie;
///
/// let cookie = parse_set_cookie(
///     "www.example.com",
///     "session=abc; Domain=.example.com; Path=/; HttpOnly",
/// ).unwrap();
/// assert_eq!(cookie.key(), "session");
/// assert_eq!(cookie.value(), "abc");
/// assert_eq!(cookie.domain(), "example.com");
/// assert_eq!(cookie.path(), "/");
/// assert!(cookie.http_only());
/// assert!(!cookie.secure());
/// ```
pub fn parse_set_cookie(host: &str, header: &str) -> Result<CookieRecord, EmptyKeyError> {
    let mut segments = header.split(';');
    let pair = segments.next().unwrap_or_default();
    let (key, value) = match pair.split_once('=') {
        Some((key, value)) => (key.trim(), value.trim()),
        None => (pair.trim(), ""),
    };
    let mut cookie = CookieRecord::new(key, value)?;

    let host = host.to_lowercase();
    let mut domain = None;
    for segment in segments {
        let segment = segment.trim();
        match segment.split_once('=') {
            None => apply_flag(&mut cookie, segment),
            Some((name, value)) => {
                apply_attribute(&mut cookie, &mut domain, &host, name.trim(), value.trim())
            }
        }
    }
    cookie.domain = domain.unwrap_or_else(|| normalize_domain(&host));
    Ok(cookie)
}

fn apply_flag(cookie: &mut CookieRecord, flag: &str) {
    if flag.eq_ignore_ascii_case("HttpOnly") {
        cookie.http_only = true;
    } else if flag.eq_ignore_ascii_case("Secure") {
        cookie.secure = true;
    }
}

fn apply_attribute(
    cookie: &mut CookieRecord,
    domain: &mut Option<String>,
    host: &str,
    name: &str,
    value: &str,
) {
    if name.eq_ignore_ascii_case("Expires") {
        cookie.expires = parse_http_date(value);
        if cookie.expires.is_none() {
            tracing::debug!(cookie = %cookie.key, value, "ignoring unparseable `Expires` attribute");
        }
    } else if name.eq_ignore_ascii_case("Max-Age") {
        match value.parse::<i32>() {
            Ok(max_age) => cookie.max_age = Some(max_age),
            Err(e) => {
                tracing::debug!(cookie = %cookie.key, value, error = %e, "ignoring invalid `Max-Age` attribute")
            }
        }
    } else if name.eq_ignore_ascii_case("Domain") {
        let candidate = normalize_domain(value);
        if is_domain_or_subdomain(&candidate, host) {
            *domain = Some(candidate);
        } else {
            tracing::debug!(
                cookie = %cookie.key,
                domain = %candidate,
                host,
                "discarding `Domain` attribute that doesn't match the request host"
            );
        }
    } else if name.eq_ignore_ascii_case("Path") {
        cookie.path = value.to_owned();
    }
}

#[cfg(test)]
mod tests {
    use googletest::assert_that;
    use googletest::prelude::{displays_as, eq};

    use super::parse_set_cookie;

    #[test]
    fn scoped_session_cookie() {
        let c = parse_set_cookie(
            "www.example.com",
            "session=abc; Domain=.example.com; Path=/; HttpOnly",
        )
        .unwrap();
        assert_eq!(c.key(), "session");
        assert_eq!(c.value(), "abc");
        assert_eq!(c.domain(), "example.com");
        assert_eq!(c.path(), "/");
        assert!(c.http_only());
        assert!(!c.secure());
        assert_eq!(c.expires(), None);
        assert_eq!(c.max_age(), None);
        assert!(c.applies_to_domain("example.com"));
        assert!(c.applies_to_domain("sub.example.com"));
    }

    #[test]
    fn name_value_pair() {
        let cases = [
            ("a=1", "a", "1", false),
            ("  a = 1  ", "a", "1", false),
            ("a=b=c", "a", "b=c", false),
            ("a=", "a", "deleted", true),
            ("a", "a", "deleted", true),
            ("a=deleted; Max-Age=0", "a", "deleted", true),
            ("a=\"quoted\"", "a", "\"quoted\"", false),
        ];
        for (raw, key, value, deleted) in cases {
            let c = parse_set_cookie("example.com", raw).unwrap();
            assert_eq!(c.key(), key, "Failed for {raw}");
            assert_eq!(c.value(), value, "Failed for {raw}");
            assert_eq!(c.is_deleted(), deleted, "Failed for {raw}");
        }
    }

    #[test]
    fn empty_name_is_an_error() {
        let err = parse_set_cookie("example.com", "=value; Path=/").unwrap_err();
        assert_that!(
            err,
            displays_as(eq(
                "The key of a cookie cannot be empty, but found an empty key with `value` as value"
            ))
        );
    }

    #[test]
    fn flags_are_case_insensitive() {
        let c = parse_set_cookie("example.com", "a=1; SECURE; httponly").unwrap();
        assert!(c.secure());
        assert!(c.http_only());

        let c = parse_set_cookie("example.com", "a=1; Secured; HttpOnly=yes").unwrap();
        assert!(!c.secure());
        assert!(!c.http_only());
    }

    #[test]
    fn expires() {
        let c = parse_set_cookie("example.com", "a=1; expires=Sun, 06 Nov 1994 08:49:37 GMT")
            .unwrap();
        assert_eq!(c.expires(), Some(784_111_777_000));

        let c = parse_set_cookie("example.com", "a=1; Expires=Sun Nov  6 08:49:37 1994").unwrap();
        assert_eq!(c.expires(), Some(784_111_777_000));

        let c = parse_set_cookie("example.com", "a=1; Expires=whenever").unwrap();
        assert_eq!(c.expires(), None);
        assert_eq!(c.value(), "1");
    }

    #[test]
    fn max_age() {
        let cases = [
            ("a=1; Max-Age=3600", Some(3600)),
            ("a=1; max-age=-5", Some(-5)),
            ("a=1; Max-Age=soon", None),
            ("a=1; Max-Age=99999999999", None),
            ("a=1; Max-Age=60; Max-Age=oops", Some(60)),
        ];
        for (raw, expected) in cases {
            let c = parse_set_cookie("example.com", raw).unwrap();
            assert_eq!(c.max_age(), expected, "Failed for {raw}");
        }
    }

    #[test]
    fn domain_must_match_the_host() {
        let cases = [
            // (host, header, expected domain)
            ("example.com", "a=1; Domain=example.com", "example.com"),
            ("example.com", "a=1; Domain=.EXAMPLE.com", "example.com"),
            ("example.com", "a=1; Domain=sub.example.com", "sub.example.com"),
            ("example.com", "a=1; Domain=other.com", "example.com"),
            ("example.com", "a=1; Domain=notexample.com", "example.com"),
            ("sub.example.com", "a=1; Domain=example.com", "sub.example.com"),
            ("www.example.com", "a=1; Domain=.example.com", "example.com"),
            ("WWW.Example.COM", "a=1", "example.com"),
            ("example.com", "a=1; Domain=", "example.com"),
        ];
        for (host, raw, expected) in cases {
            let c = parse_set_cookie(host, raw).unwrap();
            assert_eq!(c.domain(), expected, "Failed for {raw} from {host}");
        }
    }

    #[test]
    fn path_is_verbatim() {
        let c = parse_set_cookie("example.com", "a=1; Path=/Some/Path ").unwrap();
        assert_eq!(c.path(), "/Some/Path");

        let c = parse_set_cookie("example.com", "a=1").unwrap();
        assert_eq!(c.path(), "");
    }

    #[test]
    fn unknown_and_empty_attributes_are_ignored() {
        let c = parse_set_cookie(
            "example.com",
            "a=1;; SameSite=Lax; Priority=High; ; Partitioned;",
        )
        .unwrap();
        assert_eq!(c.value(), "1");
        assert_eq!(c.domain(), "example.com");
        assert!(!c.secure());
        assert!(!c.http_only());
    }

    #[test]
    fn a_bad_attribute_does_not_affect_the_others() {
        let c = parse_set_cookie(
            "example.com",
            "id=42; Expires=garbage; Max-Age=x; Domain=evil.org; Path=/a; Secure",
        )
        .unwrap();
        assert_eq!(c.value(), "42");
        assert_eq!(c.expires(), None);
        assert_eq!(c.max_age(), None);
        assert_eq!(c.domain(), "example.com");
        assert_eq!(c.path(), "/a");
        assert!(c.secure());
    }
}
