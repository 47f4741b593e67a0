use std::fmt;

use crate::cookie_record::is_deletion_value;

/// A cookie update carried by a `Set-Cookie` header.
///
/// Found in the [`ChangeList`] returned by [`Jar::apply_response`].
///
/// [`Jar::apply_response`]: crate::Jar::apply_response
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CookieChange {
    pub(crate) key: String,
    pub(crate) old_value: Option<String>,
    pub(crate) new_value: String,
}

impl CookieChange {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value stored in the jar before the response, if any.
    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    /// The value carried by the response.
    pub fn new_value(&self) -> &str {
        &self.new_value
    }

    /// Returns `true` if there was no cookie with this key before the response.
    pub fn is_new(&self) -> bool {
        self.old_value.is_none()
    }
}

/// What happened to a [`Jar`] when a response was applied to it.
///
/// - [`ChangeList::changed`] lists the cookies that were admitted: they've been
///   added, updated or removed.
/// - [`ChangeList::ignored`] lists the cookies that were rejected by the jar
///   predicate and left the jar untouched.
///
/// Both lists follow the order of the `Set-Cookie` headers in the response.
///
/// ```rust
/// use cantuccio::Jar;
///
/// let mut jar = Jar::new();
/// jar.upsert(cantuccio::CookieRecord::new("theme", "dark").unwrap());
///
/// let changes = jar.apply_response(
///     "example.com",
///     ["session=abc", "theme=deleted"],
/// );
/// assert!(changes.was_added("session"));
/// assert!(changes.was_deleted("theme"));
/// assert!(changes.ignored().is_empty());
/// ```
///
/// [`Jar`]: crate::Jar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeList {
    changed: Vec<CookieChange>,
    ignored: Vec<CookieChange>,
}

impl ChangeList {
    /// Cookies that were added, updated or deleted.
    pub fn changed(&self) -> &[CookieChange] {
        &self.changed
    }

    /// Cookies that were rejected by the jar predicate.
    pub fn ignored(&self) -> &[CookieChange] {
        &self.ignored
    }

    /// Total number of changed and ignored cookies.
    pub fn len(&self) -> usize {
        self.changed.len() + self.ignored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn was_changed(&self, key: &str) -> bool {
        self.changed.iter().any(|c| c.key == key)
    }

    /// Returns `true` if the cookie was removed from the jar.
    pub fn was_deleted(&self, key: &str) -> bool {
        self.changed
            .iter()
            .any(|c| c.key == key && is_deletion_value(&c.new_value))
    }

    /// Returns `true` if the cookie wasn't in the jar before the response.
    pub fn was_added(&self, key: &str) -> bool {
        self.changed
            .iter()
            .any(|c| c.key == key && c.old_value.is_none() && !is_deletion_value(&c.new_value))
    }

    /// The new value of a cookie that was added or updated, if any.
    pub fn added_or_changed_value(&self, key: &str) -> Option<&str> {
        self.changed
            .iter()
            .find(|c| c.key == key && !is_deletion_value(&c.new_value))
            .map(|c| c.new_value.as_str())
    }

    /// The change to a cookie, looking up its key ignoring ASCII case.
    pub fn change_for(&self, key: &str) -> Option<&CookieChange> {
        self.changed.iter().find(|c| c.key.eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for ChangeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn fmt_value(value: Option<&str>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match value {
                Some(value) => write!(f, "'{value}'"),
                None => f.write_str("NULL"),
            }
        }

        for (title, changes, separator) in [
            ("Changed", &self.changed, " -> "),
            ("Ignored", &self.ignored, " X "),
        ] {
            if changes.is_empty() {
                continue;
            }
            writeln!(f, "{title}:")?;
            for change in changes {
                write!(f, "{}: ", change.key)?;
                fmt_value(change.old_value(), f)?;
                f.write_str(separator)?;
                fmt_value(Some(change.new_value()), f)?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Builds the [`ChangeList`] of a single response.
#[derive(Debug, Default)]
pub(crate) struct ChangeTracker {
    changes: ChangeList,
}

impl ChangeTracker {
    /// Record an admitted cookie.
    ///
    /// A key can only appear once among the changed cookies: a later change to the
    /// same key replaces the new value of the earlier one, whose old value is kept.
    pub(crate) fn changed(&mut self, key: &str, old_value: Option<String>, new_value: &str) {
        match self.changes.changed.iter_mut().find(|c| c.key == key) {
            Some(existing) => existing.new_value = new_value.to_owned(),
            None => self.changes.changed.push(CookieChange {
                key: key.to_owned(),
                old_value,
                new_value: new_value.to_owned(),
            }),
        }
    }

    /// Record a cookie rejected by the jar predicate.
    pub(crate) fn ignored(&mut self, key: &str, old_value: Option<String>, new_value: &str) {
        self.changes.ignored.push(CookieChange {
            key: key.to_owned(),
            old_value,
            new_value: new_value.to_owned(),
        });
    }

    pub(crate) fn finish(self) -> ChangeList {
        self.changes
    }
}
