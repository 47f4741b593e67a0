//! A crate to keep track of HTTP cookies on the client side.
//!
//! # Overview
//!
//! You can use `cantuccio` to remember the cookies a server sets on your
//! HTTP client, and to send them back on later requests.
//!
//! It has support for:
//!
//! - Parsing `Set-Cookie` header values, via [`parse_set_cookie`]
//! - Storing cookies across exchanges and filtering out unwanted ones, via [`Jar`]
//! - Reporting what each response changed, via [`ChangeList`]
//! - Building the `Cookie` header for a given host, via [`Jar::outbound_value_for`]
//!
//! In particular:
//!
//! - Parsing is lenient: a malformed attribute never causes a whole cookie to be dropped
//! - The `Expires` attribute accepts RFC 1123 dates, `asctime` dates and RFC 2822 dates
//! - A cookie whose value is empty or `deleted` removes the stored cookie with the same name
//!
//! # Non-goals
//!
//! `cantuccio` is not a general-purpose browser cookie store.
//! Cookies are identified by their name alone, paths are not matched and the `Secure`
//! flag is not enforced. Nothing is persisted to disk.
//!
//! # Quickstart
//!
//! ```rust
//! use cantuccio::Jar;
//!
//! let mut jar = Jar::new();
//!
//! // Feed the `Set-Cookie` header values you received from a host...
//! let changes = jar.apply_response(
//!     "www.example.com",
//!     [
//!         "session=abc; Domain=.example.com; Path=/; HttpOnly",
//!         "theme=dark; Max-Age=3600",
//!     ],
//! );
//! assert!(changes.was_added("session"));
//! assert_eq!(changes.added_or_changed_value("theme"), Some("dark"));
//!
//! // ...then ask for the `Cookie` header value of your next request.
//! assert_eq!(
//!     jar.outbound_value_for("api.example.com").as_deref(),
//!     Some("session=abc; theme=dark")
//! );
//! // Nothing to send to unrelated hosts.
//! assert_eq!(jar.outbound_value_for("rust-lang.org"), None);
//!
//! // The server can delete a cookie.
//! let changes = jar.apply_response("www.example.com", ["theme=deleted"]);
//! assert!(changes.was_deleted("theme"));
//! assert_eq!(jar.get("theme"), None);
//! ```
//!
//! ## Filtering cookies
//!
//! ```rust
//! use cantuccio::Jar;
//!
//! let mut jar = Jar::with_predicate(|cookie| !cookie.key().starts_with("_ga"));
//! let changes = jar.apply_response("example.com", ["_ga=GA1.1.123", "id=42"]);
//!
//! assert_eq!(changes.ignored()[0].key(), "_ga");
//! assert_eq!(jar.to_outbound_value(), "id=42");
//! ```
//!
//! ## Priming a jar
//!
//! ```rust
//! use cantuccio::Jar;
//! use cantuccio::config::Config;
//!
//! let jar = Jar::parse_header("id=42; name=Jane+Doe", &Config::default()).unwrap();
//! assert_eq!(jar.get("name"), Some("Jane Doe"));
//! ```

mod bootstrap;
mod change;
pub mod config;
mod cookie_record;
pub mod date;
mod jar;
mod set_cookie;

pub use change::{ChangeList, CookieChange};
pub use cookie_record::{is_deletion_value, normalize_domain, CookieRecord, DELETED};
pub use jar::{CookiePredicate, Jar};
pub use set_cookie::parse_set_cookie;
pub use time;

/// Errors that can occur when using `cantuccio`.
pub mod errors {
    pub use crate::bootstrap::{DecodingError, EmptyNameError, ParseError};
    pub use crate::cookie_record::{EmptyKeyError, KeyMismatchError};
}
