use std::fmt;

use time::OffsetDateTime;

/// The canonical value stored for a cookie that the server asked to delete.
pub const DELETED: &str = "deleted";

/// A cookie held by the client, as received from a server via `Set-Cookie`
/// or primed manually.
///
/// ## Constructing a `CookieRecord`
///
/// ```rust
/// use cantuccio::CookieRecord;
///
/// let cookie = CookieRecord::new("name", "value").unwrap();
/// assert_eq!(cookie.key(), "name");
/// assert_eq!(cookie.value(), "value");
/// // No domain: the cookie is sent to every host.
/// assert_eq!(cookie.domain(), "");
///
/// let scoped = CookieRecord::with_domain("name", "value", ".www.Example.com").unwrap();
/// assert_eq!(scoped.domain(), "example.com");
/// ```
///
/// ## Deletion
///
/// A value that is empty or equal to `deleted` (in any casing) turns the record
/// into a tombstone: [`CookieRecord::is_deleted`] returns `true` and the value
/// reads back as `deleted`.
///
/// ```rust
/// use cantuccio::CookieRecord;
///
/// let tombstone = CookieRecord::new("name", "").unwrap();
/// assert!(tombstone.is_deleted());
/// assert_eq!(tombstone.value(), "deleted");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CookieRecord {
    pub(crate) key: String,
    pub(crate) value: String,
    pub(crate) deleted: bool,
    /// Epoch milliseconds.
    pub(crate) created: i64,
    /// Epoch milliseconds.
    pub(crate) expires: Option<i64>,
    /// Seconds since `created`.
    pub(crate) max_age: Option<i32>,
    /// Normalized, see [`normalize_domain`].
    pub(crate) domain: String,
    pub(crate) path: String,
    pub(crate) secure: bool,
    pub(crate) http_only: bool,
}

impl CookieRecord {
    /// Creates a new [`CookieRecord`] without a domain, stamped with the current time.
    ///
    /// A record without a domain matches every host. Prefer
    /// [`CookieRecord::with_domain`] unless that's what you want.
    ///
    /// # Errors
    ///
    /// Fails if `key` is empty.
    ///
    /// ```rust
    /// use cantuccio::CookieRecord;
    ///
    /// let err = CookieRecord::new("", "value").unwrap_err();
    /// assert_eq!(err.to_string(), "The key of a cookie cannot be empty, but found an empty key with `value` as value");
    /// ```
    pub fn new<K, V>(key: K, value: V) -> Result<CookieRecord, EmptyKeyError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        let value = value.into();
        if key.is_empty() {
            return Err(EmptyKeyError { value });
        }
        let deleted = is_deletion_value(&value);
        Ok(CookieRecord {
            key,
            value: if deleted { DELETED.to_owned() } else { value },
            deleted,
            created: now_millis(),
            expires: None,
            max_age: None,
            domain: String::new(),
            path: String::new(),
            secure: false,
            http_only: false,
        })
    }

    /// Creates a new [`CookieRecord`] scoped to `domain`.
    ///
    /// The domain is normalized before being stored, see [`normalize_domain`].
    pub fn with_domain<K, V, D>(key: K, value: V, domain: D) -> Result<CookieRecord, EmptyKeyError>
    where
        K: Into<String>,
        V: Into<String>,
        D: AsRef<str>,
    {
        let mut cookie = CookieRecord::new(key, value)?;
        cookie.set_domain(domain);
        Ok(cookie)
    }

    /// Overwrites every field of `self`, except the key, with the ones of `other`.
    ///
    /// # Errors
    ///
    /// Fails, leaving `self` untouched, if `other` has a different key.
    ///
    /// ```rust
    /// use cantuccio::CookieRecord;
    ///
    /// let mut current = CookieRecord::new("id", "1").unwrap();
    /// let newer = CookieRecord::with_domain("id", "2", "example.com").unwrap();
    /// current.update(&newer).unwrap();
    /// assert_eq!(current.value(), "2");
    /// assert_eq!(current.domain(), "example.com");
    ///
    /// let other = CookieRecord::new("other", "3").unwrap();
    /// assert!(current.update(&other).is_err());
    /// assert_eq!(current.value(), "2");
    /// ```
    pub fn update(&mut self, other: &CookieRecord) -> Result<(), KeyMismatchError> {
        if self.key != other.key {
            return Err(KeyMismatchError {
                expected: self.key.clone(),
                found: other.key.clone(),
            });
        }
        self.value.clone_from(&other.value);
        self.deleted = other.deleted;
        self.created = other.created;
        self.expires = other.expires;
        self.max_age = other.max_age;
        self.domain.clone_from(&other.domain);
        self.path.clone_from(&other.path);
        self.secure = other.secure;
        self.http_only = other.http_only;
        Ok(())
    }

    /// Returns the key of `self`.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the value of `self`. Tombstones read back as [`DELETED`].
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Sets the value of `self`, classifying it as a tombstone if needed.
    pub fn set_value<V: Into<String>>(&mut self, value: V) {
        let value = value.into();
        self.deleted = is_deletion_value(&value);
        self.value = if self.deleted {
            DELETED.to_owned()
        } else {
            value
        };
    }

    /// Returns `true` if the value of `self` asks for the cookie to be deleted.
    ///
    /// This doesn't take expiry into account, see [`CookieRecord::is_expired`].
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// The time at which `self` was set, in milliseconds since the Unix epoch.
    #[inline]
    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn set_created(&mut self, created: i64) {
        self.created = created;
    }

    /// The `Expires` attribute, in milliseconds since the Unix epoch.
    #[inline]
    pub fn expires(&self) -> Option<i64> {
        self.expires
    }

    pub fn set_expires<T: Into<Option<i64>>>(&mut self, expires: T) {
        self.expires = expires.into();
    }

    /// The `Max-Age` attribute, in seconds relative to [`CookieRecord::created`].
    #[inline]
    pub fn max_age(&self) -> Option<i32> {
        self.max_age
    }

    pub fn set_max_age<T: Into<Option<i32>>>(&mut self, max_age: T) {
        self.max_age = max_age.into();
    }

    #[inline]
    pub fn is_expires_set(&self) -> bool {
        self.expires.is_some()
    }

    #[inline]
    pub fn is_max_age_set(&self) -> bool {
        self.max_age.is_some()
    }

    /// The hosts `self` is sent to. An empty domain matches every host.
    #[inline]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Sets the domain of `self`, normalizing it first.
    ///
    /// ```rust
    /// use cantuccio::CookieRecord;
    ///
    /// let mut c = CookieRecord::new("name", "value").unwrap();
    /// c.set_domain(".example.com");
    /// assert_eq!(c.domain(), "example.com");
    /// c.set_domain("www.example.com");
    /// assert_eq!(c.domain(), "example.com");
    /// c.set_domain("eXamPle.com");
    /// assert_eq!(c.domain(), "example.com");
    /// ```
    pub fn set_domain<D: AsRef<str>>(&mut self, domain: D) {
        self.domain = normalize_domain(domain.as_ref());
    }

    /// The `Path` attribute, verbatim. Empty if none was specified.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path<P: Into<String>>(&mut self, path: P) {
        self.path = path.into();
    }

    /// Whether the cookie must only be sent over secure channels.
    #[inline]
    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn set_secure(&mut self, secure: bool) {
        self.secure = secure;
    }

    /// Whether the cookie is hidden from client-side scripts.
    #[inline]
    pub fn http_only(&self) -> bool {
        self.http_only
    }

    pub fn set_http_only(&mut self, http_only: bool) {
        self.http_only = http_only;
    }

    /// Returns `true` if `Max-Age` or `Expires` is set and `now` (epoch milliseconds)
    /// is past the corresponding deadline.
    ///
    /// ```rust
    /// use cantuccio::CookieRecord;
    ///
    /// let mut c = CookieRecord::new("name", "value").unwrap();
    /// c.set_created(10_000);
    /// c.set_max_age(1);
    /// assert!(!c.is_expired_at(10_500));
    /// assert!(c.is_expired_at(11_500));
    /// ```
    pub fn is_expired_at(&self, now: i64) -> bool {
        let max_age_elapsed = self
            .max_age
            .is_some_and(|max_age| self.created.saturating_add(i64::from(max_age) * 1000) < now);
        let expires_passed = self.expires.is_some_and(|expires| expires < now);
        max_age_elapsed || expires_passed
    }

    /// [`CookieRecord::is_expired_at`], using the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Returns `true` if either `Max-Age` or `Expires` is set.
    ///
    /// **Warning:** this is the opposite of what a session cookie conventionally is
    /// (a cookie with neither attribute, discarded when the client shuts down).
    /// The behavior is kept as-is since callers may rely on it.
    pub fn is_session_cookie(&self) -> bool {
        self.is_max_age_set() || self.is_expires_set()
    }

    /// Returns `true` if `self` should be sent to `host`.
    ///
    /// That's the case if `host` is the cookie domain or one of its subdomains.
    /// A cookie without a domain doesn't apply to any host through this method:
    /// [`Jar::outbound_value_for`] treats it as a wildcard separately.
    ///
    /// ```rust
    /// use cantuccio::CookieRecord;
    ///
    /// let c = CookieRecord::with_domain("name", "value", "example.com").unwrap();
    /// assert!(c.applies_to_domain("example.com"));
    /// assert!(c.applies_to_domain("sub.Example.com"));
    /// assert!(!c.applies_to_domain("notexample.com"));
    /// ```
    ///
    /// [`Jar::outbound_value_for`]: crate::Jar::outbound_value_for
    pub fn applies_to_domain(&self, host: &str) -> bool {
        !self.domain.is_empty() && is_domain_or_subdomain(&host.to_lowercase(), &self.domain)
    }
}

impl fmt::Display for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn unset_or<T: fmt::Display>(v: Option<T>) -> String {
            v.map_or_else(|| "-1".to_owned(), |v| v.to_string())
        }

        write!(
            f,
            "{{key='{}', value='{}', created={}, expires={}, maxAge={}, domain='{}', path='{}', secure={}, httpOnly={}}}",
            self.key,
            self.value,
            self.created,
            unset_or(self.expires),
            unset_or(self.max_age),
            self.domain,
            self.path,
            self.secure,
            self.http_only
        )
    }
}

#[cfg(feature = "serde")]
mod deser {
    use serde::Deserializer;

    use super::CookieRecord;

    /// The serialized shape of a [`CookieRecord`]. `deleted` is recomputed from `value`.
    #[derive(serde::Deserialize)]
    struct RawCookieRecord {
        key: String,
        value: String,
        created: i64,
        #[serde(default)]
        expires: Option<i64>,
        #[serde(default)]
        max_age: Option<i32>,
        #[serde(default)]
        domain: String,
        #[serde(default)]
        path: String,
        #[serde(default)]
        secure: bool,
        #[serde(default)]
        http_only: bool,
    }

    impl<'de> serde::Deserialize<'de> for CookieRecord {
        fn deserialize<D>(deserializer: D) -> Result<CookieRecord, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = RawCookieRecord::deserialize(deserializer)?;
            let mut cookie = CookieRecord::with_domain(raw.key, raw.value, raw.domain)
                .map_err(serde::de::Error::custom)?;
            cookie.set_created(raw.created);
            cookie.set_expires(raw.expires);
            cookie.set_max_age(raw.max_age);
            cookie.set_path(raw.path);
            cookie.set_secure(raw.secure);
            cookie.set_http_only(raw.http_only);
            Ok(cookie)
        }
    }
}

/// Returns `true` if `value` asks for a cookie to be deleted: it is empty or
/// equal to `deleted`, ignoring ASCII case.
///
/// ```rust
/// use cantuccio::is_deletion_value;
///
/// assert!(is_deletion_value(""));
/// assert!(is_deletion_value("DeLeTeD"));
/// assert!(!is_deletion_value("false"));
/// ```
pub fn is_deletion_value(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case(DELETED)
}

/// Normalizes a cookie domain: a single leading `.` is removed, then a single
/// leading `www.`, and the result is lowercased.
///
/// ```rust
/// use cantuccio::normalize_domain;
///
/// assert_eq!(normalize_domain(".example.com"), "example.com");
/// assert_eq!(normalize_domain("www.example.com"), "example.com");
/// assert_eq!(normalize_domain(".www.example.com"), "example.com");
/// assert_eq!(normalize_domain("eXamPle.com"), "example.com");
/// ```
pub fn normalize_domain(raw: &str) -> String {
    let domain = raw.strip_prefix('.').unwrap_or(raw);
    let domain = domain.strip_prefix("www.").unwrap_or(domain);
    domain.to_lowercase()
}

/// `candidate` equals `domain` or is a strict, dot-delimited subdomain of it.
pub(crate) fn is_domain_or_subdomain(candidate: &str, domain: &str) -> bool {
    candidate == domain
        || candidate
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

pub(crate) fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("The key of a cookie cannot be empty, but found an empty key with `{value}` as value")]
/// The error returned when building a [`CookieRecord`] with an empty key.
pub struct EmptyKeyError {
    pub(crate) value: String,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Cannot update the `{expected}` cookie with the `{found}` cookie: keys must match")]
/// The error returned by [`CookieRecord::update`] when the two records have different keys.
pub struct KeyMismatchError {
    expected: String,
    found: String,
}
