use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::change::{ChangeList, ChangeTracker};
use crate::cookie_record::CookieRecord;
use crate::set_cookie::parse_set_cookie;

/// Decides whether a cookie received from a server is admitted into a [`Jar`].
pub type CookiePredicate = Arc<dyn Fn(&CookieRecord) -> bool + Send + Sync>;

/// The cookies a client has collected over a sequence of HTTP exchanges.
///
/// A `Jar` holds at most one cookie per key, in insertion order.
///
/// # Keys
///
/// Cookies are identified by their key **alone**. Two cookies with the same
/// key but different domains or paths replace each other, unlike what a
/// general-purpose browser cookie store would do.
///
/// # Usage
///
/// ```rust
/// use cantuccio::Jar;
///
/// let mut jar = Jar::new();
///
/// // Feed the `Set-Cookie` headers of a response, in the order they were received...
/// let changes = jar.apply_response(
///     "www.example.com",
///     ["session=abc; Domain=.example.com; Path=/; HttpOnly", "lang=en"],
/// );
/// assert!(changes.was_added("session"));
///
/// // ...and build the `Cookie` header of the next request.
/// assert_eq!(
///     jar.outbound_value_for("api.example.com").as_deref(),
///     Some("session=abc; lang=en")
/// );
/// assert_eq!(jar.outbound_value_for("rust-lang.org"), None);
/// ```
///
/// # Concurrency
///
/// A `Jar` is meant to be owned by a single client session and mutated inline
/// with response processing. There is no internal synchronization. Wrap it in a
/// lock if it must be shared.
pub struct Jar {
    /// Invariant: no two records share a key.
    cookies: Vec<CookieRecord>,
    predicate: CookiePredicate,
}

impl Default for Jar {
    fn default() -> Self {
        Jar {
            cookies: Vec::new(),
            predicate: accept_all(),
        }
    }
}

fn accept_all() -> CookiePredicate {
    Arc::new(|_: &CookieRecord| true)
}

impl Jar {
    /// Creates a new, empty [`Jar`] that admits every cookie.
    pub fn new() -> Jar {
        Default::default()
    }

    /// Creates a new, empty [`Jar`] that only admits the cookies matched by `predicate`.
    pub fn with_predicate<P>(predicate: P) -> Jar
    where
        P: Fn(&CookieRecord) -> bool + Send + Sync + 'static,
    {
        Jar {
            cookies: Vec::new(),
            predicate: Arc::new(predicate),
        }
    }

    /// Replaces the predicate used by [`Jar::apply_response`].
    pub fn set_predicate<P>(&mut self, predicate: P)
    where
        P: Fn(&CookieRecord) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
    }

    /// Restores the default predicate, which admits every cookie.
    pub fn reset_predicate(&mut self) {
        self.predicate = accept_all();
    }

    /// Returns `true` if the jar predicate admits `cookie`.
    pub fn admits(&self, cookie: &CookieRecord) -> bool {
        (self.predicate)(cookie)
    }

    /// Stores `cookie`, replacing the cookie with the same key if there is one.
    ///
    /// If `cookie` is a tombstone (see [`CookieRecord::is_deleted`]), the cookie
    /// with the same key is removed instead.
    ///
    /// An updated cookie keeps its position in the jar.
    ///
    /// # Return value
    ///
    /// The value of the cookie that was replaced or removed, if any.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cantuccio::{CookieRecord, Jar};
    ///
    /// let mut jar = Jar::new();
    /// assert_eq!(jar.upsert(CookieRecord::new("id", "1").unwrap()), None);
    /// assert_eq!(jar.upsert(CookieRecord::new("id", "2").unwrap()).as_deref(), Some("1"));
    /// assert_eq!(jar.get("id"), Some("2"));
    ///
    /// assert_eq!(jar.upsert(CookieRecord::new("id", "deleted").unwrap()).as_deref(), Some("2"));
    /// assert_eq!(jar.get("id"), None);
    /// ```
    pub fn upsert(&mut self, cookie: CookieRecord) -> Option<String> {
        if cookie.is_deleted() {
            return self.remove(cookie.key());
        }
        match self.cookies.iter_mut().find(|c| c.key == cookie.key) {
            Some(existing) => {
                let previous = existing.value.clone();
                // Keys are equal, `update` can't fail.
                existing.update(&cookie).ok()?;
                Some(previous)
            }
            None => {
                self.cookies.push(cookie);
                None
            }
        }
    }

    /// Get the value of a cookie by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_record(key).map(CookieRecord::value)
    }

    /// Get a cookie by key.
    pub fn get_record(&self, key: &str) -> Option<&CookieRecord> {
        self.cookies.iter().find(|c| c.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_record(key).is_some()
    }

    /// Removes a cookie by key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.cookies.iter().position(|c| c.key == key)?;
        Some(self.cookies.remove(index).value)
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Iterates over the cookies in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, CookieRecord> {
        self.cookies.iter()
    }

    /// Stores a copy of every cookie of `other` into `self`.
    ///
    /// `other` wins when both jars hold a cookie with the same key.
    pub fn merge(&mut self, other: &Jar) {
        for cookie in other {
            self.upsert(cookie.clone());
        }
    }

    /// Copies the cookies of `self` into a new [`Jar`] with the same predicate.
    pub fn deep_copy(&self) -> Jar {
        Jar {
            cookies: self.cookies.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }

    /// Renders every cookie in the jar as a `Cookie` header value, ignoring domains.
    ///
    /// Returns an empty string if the jar is empty. Do not send an empty
    /// `Cookie` header in that case.
    ///
    /// ```rust
    /// use cantuccio::{CookieRecord, Jar};
    ///
    /// let mut jar = Jar::new();
    /// assert_eq!(jar.to_outbound_value(), "");
    ///
    /// jar.upsert(CookieRecord::new("a", "1").unwrap());
    /// jar.upsert(CookieRecord::with_domain("b", "2", "example.com").unwrap());
    /// assert_eq!(jar.to_outbound_value(), "a=1; b=2");
    /// ```
    pub fn to_outbound_value(&self) -> String {
        join_pairs(self.cookies.iter())
    }

    /// Renders the cookies that should be sent to `host` as a `Cookie` header value.
    ///
    /// A cookie is sent if it has no domain or if [`CookieRecord::applies_to_domain`]
    /// holds for `host`. Returns `None` if no cookie qualifies: the request should
    /// then carry no `Cookie` header at all.
    pub fn outbound_value_for(&self, host: &str) -> Option<String> {
        let mut matching = self
            .cookies
            .iter()
            .filter(|c| c.domain.is_empty() || c.applies_to_domain(host))
            .peekable();
        matching.peek()?;
        Some(join_pairs(matching))
    }

    /// Applies the `Set-Cookie` header values of a response received from `host`,
    /// using the jar predicate to decide which cookies to admit.
    ///
    /// See [`Jar::apply_response_with`].
    pub fn apply_response<I, S>(&mut self, host: &str, set_cookie_values: I) -> ChangeList
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let predicate = Arc::clone(&self.predicate);
        self.apply_response_with(host, set_cookie_values, |c: &CookieRecord| predicate(c))
    }

    /// Applies the `Set-Cookie` header values of a response received from `host`.
    ///
    /// Values must be provided in the order the headers were received. Each one is
    /// parsed into a candidate cookie (see [`parse_set_cookie`]):
    ///
    /// - if `predicate` admits it, it is [upserted](Jar::upsert) and listed in
    ///   [`ChangeList::changed`]. When a response sets the same cookie more than once,
    ///   the last value wins and a single change is reported.
    /// - otherwise the jar is left untouched and the candidate is listed in
    ///   [`ChangeList::ignored`], along with the value the jar held before the response.
    ///
    /// Headers without a cookie name are skipped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cantuccio::Jar;
    ///
    /// let mut jar = Jar::new();
    /// let changes = jar.apply_response_with(
    ///     "example.com",
    ///     ["a=1", "tracking=yes", "a=2"],
    ///     |c| c.key() != "tracking",
    /// );
    /// assert_eq!(changes.changed().len(), 1);
    /// assert_eq!(changes.changed()[0].new_value(), "2");
    /// assert_eq!(changes.ignored()[0].key(), "tracking");
    /// assert_eq!(jar.get("a"), Some("2"));
    /// assert!(!jar.contains("tracking"));
    /// ```
    ///
    /// [`parse_set_cookie`]: crate::parse_set_cookie
    pub fn apply_response_with<I, S, P>(
        &mut self,
        host: &str,
        set_cookie_values: I,
        predicate: P,
    ) -> ChangeList
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        P: Fn(&CookieRecord) -> bool,
    {
        let mut tracker = ChangeTracker::default();
        // Values held before this response, for the keys it touched.
        let mut original_values: HashMap<String, Option<String>> = HashMap::new();

        for header in set_cookie_values {
            let header = header.as_ref();
            let candidate = match parse_set_cookie(host, header) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(host, header, error = %e, "skipping `Set-Cookie` header");
                    continue;
                }
            };
            let key = candidate.key.clone();
            let new_value = candidate.value.clone();
            let original = original_values
                .entry(key.clone())
                .or_insert_with(|| self.get(&key).map(str::to_owned))
                .clone();

            if predicate(&candidate) {
                let previous = self.upsert(candidate);
                tracing::debug!(host, cookie = %key, value = %new_value, "cookie stored");
                tracker.changed(&key, previous, &new_value);
            } else {
                tracing::debug!(host, cookie = %key, value = %new_value, "cookie rejected by predicate");
                tracker.ignored(&key, original, &new_value);
            }
        }
        tracker.finish()
    }

    /// Renders every cookie in the jar with all of its attributes, one per line.
    pub fn to_string_full(&self) -> String {
        self.cookies
            .iter()
            .map(CookieRecord::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn join_pairs<'a>(cookies: impl Iterator<Item = &'a CookieRecord>) -> String {
    let mut output = String::new();
    for cookie in cookies {
        if !output.is_empty() {
            output.push_str("; ");
        }
        output.push_str(&cookie.key);
        output.push('=');
        output.push_str(&cookie.value);
    }
    output
}

impl Clone for Jar {
    fn clone(&self) -> Self {
        self.deep_copy()
    }
}

impl fmt::Debug for Jar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jar")
            .field("cookies", &self.cookies)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Jar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cookie) in self.cookies.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} = {}", cookie.key, cookie.value)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Jar {
    type Item = &'a CookieRecord;
    type IntoIter = std::slice::Iter<'a, CookieRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<CookieRecord> for Jar {
    fn extend<T: IntoIterator<Item = CookieRecord>>(&mut self, iter: T) {
        for cookie in iter {
            self.upsert(cookie);
        }
    }
}

impl FromIterator<CookieRecord> for Jar {
    fn from_iter<T: IntoIterator<Item = CookieRecord>>(iter: T) -> Self {
        let mut jar = Jar::new();
        jar.extend(iter);
        jar
    }
}
