//! Priming a [`Jar`] from a `Cookie`-style string held by the client.
use std::borrow::Cow;

use anyhow::Context;
use percent_encoding::percent_decode_str;

use crate::config::Config;
use crate::cookie_record::CookieRecord;
use crate::Jar;

impl Jar {
    /// Parse a `"name=value; name2=value2"` string into a new [`Jar`].
    ///
    /// The string is trimmed and stripped of surrounding single quotes before being
    /// split on `;`. Fragments that aren't made of exactly one `=` separating a name
    /// from a non-empty value are skipped.
    ///
    /// If [`Config::percent_decode`] is `true`, names and values are form-decoded:
    /// `+` is turned into a space, then percent-decoding is applied.
    ///
    /// The parsed cookies have no domain: they are sent to every host.
    ///
    /// ```rust
    /// use cantuccio::Jar;
    /// use cantuccio::config::Config;
    ///
    /// let jar = Jar::parse_header("'theme=dark%20mode; lang=en+GB; broken'", &Config::default()).unwrap();
    /// assert_eq!(jar.get("theme"), Some("dark mode"));
    /// assert_eq!(jar.get("lang"), Some("en GB"));
    /// assert_eq!(jar.len(), 2);
    /// ```
    pub fn parse_header(header: &str, config: &Config) -> Result<Jar, ParseError> {
        let mut jar = Jar::new();
        jar.extend_from_header(header, config)?;
        Ok(jar)
    }

    /// [`Jar::parse_header`], without decoding names and values.
    pub fn parse_header_raw(header: &str) -> Result<Jar, ParseError> {
        let config = Config {
            percent_decode: false,
        };
        Jar::parse_header(header, &config)
    }

    /// Parse a `"name=value; name2=value2"` string and store its cookies into `self`.
    ///
    /// See [`Jar::parse_header`] for the accepted format.
    ///
    /// On error, the cookies that precede the faulty fragment have already been stored.
    pub fn extend_from_header(&mut self, header: &str, config: &Config) -> Result<(), ParseError> {
        let header = header.trim().trim_matches('\'');
        for fragment in header.split(';') {
            let mut pieces = fragment.split('=');
            let (name, value) = match (pieces.next(), pieces.next(), pieces.next()) {
                (Some(name), Some(value), None) => (name.trim(), value.trim()),
                _ => {
                    if !fragment.trim().is_empty() {
                        tracing::debug!(fragment, "skipping malformed cookie fragment");
                    }
                    continue;
                }
            };
            if value.is_empty() {
                tracing::debug!(cookie = name, "skipping cookie fragment without a value");
                continue;
            }
            if name.is_empty() {
                let e = EmptyNameError {
                    value: value.to_string(),
                };
                return Err(ParseError::EmptyName(e));
            }

            let (name, value) = if config.percent_decode {
                let name = form_decode(name)
                    .context("Failed to percent-decode the cookie name")
                    .map_err(|e| {
                        ParseError::Decoding(DecodingError {
                            raw_value: name.to_string(),
                            source: e,
                        })
                    })?;
                let decoded_value = form_decode(value)
                    .with_context(|| {
                        format!("Failed to percent-decode the value of the `{name}` cookie")
                    })
                    .map_err(|e| {
                        ParseError::Decoding(DecodingError {
                            raw_value: value.to_string(),
                            source: e,
                        })
                    })?;
                (name, decoded_value)
            } else {
                (Cow::Borrowed(name), Cow::Borrowed(value))
            };

            let cookie = CookieRecord::new(name.into_owned(), value.into_owned()).map_err(|e| {
                ParseError::EmptyName(EmptyNameError { value: e.value })
            })?;
            self.upsert(cookie);
        }
        Ok(())
    }
}

/// `application/x-www-form-urlencoded` decoding.
fn form_decode(s: &str) -> Result<Cow<'_, str>, std::str::Utf8Error> {
    if s.contains('+') {
        let spaced = s.replace('+', " ");
        let decoded = percent_decode_str(&spaced).decode_utf8()?;
        Ok(Cow::Owned(decoded.into_owned()))
    } else {
        percent_decode_str(s).decode_utf8()
    }
}

#[derive(Debug)]
#[non_exhaustive]
/// The error returned by [`Jar::parse_header()`].
pub enum ParseError {
    EmptyName(EmptyNameError),
    Decoding(DecodingError),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse cookies out of a header value")
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::EmptyName(e) => Some(e),
            ParseError::Decoding(e) => Some(e),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("The name of a cookie cannot be empty, but found an empty name with `{value}` as value")]
/// An error that occurs when a fragment of a header value has an empty name (e.g. `=value`).
pub struct EmptyNameError {
    value: String,
}

#[derive(Debug, thiserror::Error)]
#[error("{source}: `{raw_value}`")]
/// An error that occurred while decoding a percent-encoded cookie name or value.
pub struct DecodingError {
    raw_value: String,
    #[source]
    source: anyhow::Error,
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use googletest::assert_that;
    use googletest::prelude::eq;

    use crate::config::Config;
    use crate::Jar;

    fn pairs(jar: &Jar) -> Vec<(&str, &str)> {
        jar.iter().map(|c| (c.key(), c.value())).collect()
    }

    #[test]
    fn parse_raw() {
        let cases: &[(&str, &[(&str, &str)])] = &[
            ("", &[]),
            (";;", &[]),
            ("name=value", &[("name", "value")]),
            ("  name = value  ", &[("name", "value")]),
            ("'name=value'", &[("name", "value")]),
            ("''a=1; b=2''", &[("a", "1"), ("b", "2")]),
            ("a=%20", &[("a", "%20")]),
            ("a=1+2", &[("a", "1+2")]),
            ("a=1;; b=2 ; ", &[("a", "1"), ("b", "2")]),
            ("a=1; b=; c=3", &[("a", "1"), ("c", "3")]),
            ("a=1; yo; c=3", &[("a", "1"), ("c", "3")]),
            ("a=1; c===; d=x=y", &[("a", "1")]),
            ("a=1; b=2; a=3", &[("a", "3"), ("b", "2")]),
            ("a=1; b=2; a=deleted", &[("b", "2")]),
        ];
        for (header, expected) in cases {
            let jar = Jar::parse_header_raw(header).unwrap();
            assert_eq!(pairs(&jar), *expected, "Failed for {header:?}");
            assert!(jar.iter().all(|c| c.domain().is_empty()));
        }
    }

    #[test]
    fn parse_decoded() {
        let cases: &[(&str, &[(&str, &str)])] = &[
            ("a=%20", &[("a", " ")]),
            ("a=1+2", &[("a", "1 2")]),
            ("a%20or+b=1", &[("a or b", "1")]),
            ("a=%2B", &[("a", "+")]),
            ("a=d#$%^&*()_", &[("a", "d#$%^&*()_")]),
        ];
        for (header, expected) in cases {
            let jar = Jar::parse_header(header, &Config::default()).unwrap();
            assert_eq!(pairs(&jar), *expected, "Failed for {header:?}");
        }
    }

    #[test]
    fn empty_name() {
        for header in ["a=1; =v", " ; =v ; c=3", "'=v'"] {
            let err = Jar::parse_header_raw(header).unwrap_err();
            assert_that!(
                err.source().unwrap().to_string(),
                eq("The name of a cookie cannot be empty, but found an empty name with `v` as value")
            );
        }
    }

    #[test]
    fn invalid_utf8() {
        let err = Jar::parse_header("a=%F1%F2%F3%C0%C1%C2", &Config::default()).unwrap_err();
        assert_that!(err.to_string(), eq("Failed to parse cookies out of a header value"));
        assert_that!(
            err.source().unwrap().to_string(),
            eq("Failed to percent-decode the value of the `a` cookie: `%F1%F2%F3%C0%C1%C2`")
        );

        // Left untouched when decoding is disabled.
        let jar = Jar::parse_header_raw("a=%F1%F2").unwrap();
        assert_eq!(jar.get("a"), Some("%F1%F2"));
    }

    #[test]
    fn extend_keeps_existing_cookies() {
        let mut jar = Jar::parse_header_raw("a=1; b=2").unwrap();
        jar.extend_from_header("b=20; c=30", &Config::default())
            .unwrap();
        assert_eq!(pairs(&jar), [("a", "1"), ("b", "20"), ("c", "30")]);
    }

    #[test]
    fn outbound_value_round_trips() {
        let mut jar = Jar::new();
        jar.apply_response("example.com", ["a=1", "b=two", "c=x%20y"]);
        for cookie in jar.iter().cloned().collect::<Vec<_>>() {
            let mut unscoped = cookie;
            unscoped.set_domain("");
            jar.upsert(unscoped);
        }
        let parsed = Jar::parse_header_raw(&jar.to_outbound_value()).unwrap();
        assert_eq!(pairs(&parsed), pairs(&jar));
    }
}
