//! # Topic names and topic expressions.
//!
//! A topic is a dotted string: `"sensors.kitchen.temp"`. Each `.`-separated
//! segment is one *generation*; `"sensors"` is an ancestor of
//! `"sensors.kitchen"` which is an ancestor of `"sensors.kitchen.temp"`.
//! The empty string is the root and is an ancestor of every topic.
//!
//! Topics are not normalized: `"a."` and `"a"` are distinct (the former has
//! a trailing empty generation).
//!
//! A *topic expression* is a comma-separated list of topics with optional
//! surrounding whitespace per element, e.g. `"alerts, alerts.disk"`.
//!
//! ```
//! use arbor::Topic;
//!
//! let t = Topic::from("a.b.c");
//! assert!(Topic::from("a").is_ancestor_of(&t));
//! assert!(Topic::root().is_ancestor_of(&t));
//! assert!(!Topic::from("a.bb").is_ancestor_of(&t));
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A dotted topic name. Cheap to clone (shared string).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Topic(Arc<str>);

impl Topic {
    /// The root topic (empty string). Ancestor of every topic.
    #[must_use]
    pub fn root() -> Self {
        Topic(Arc::from(""))
    }

    /// The full dotted name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the root (empty) topic.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `self` names `other` or a proper prefix of it in the
    /// generation sense: equality, or `other` continues with a `.` right
    /// after `self`. The root matches everything.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Topic) -> bool {
        ancestor_of(&self.0, &other.0)
    }
}

/// Prefix match in the generation sense over raw strings.
pub(crate) fn ancestor_of(prefix: &str, topic: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match topic.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

/// Iterates the generation-prefixes of a topic, shallowest first.
///
/// `"a.b.c"` yields `"a"`, `"a.b"`, `"a.b.c"`. The root yields nothing.
/// A trailing dot carries an empty final generation: `"a."` yields `"a"`,
/// `"a."`.
pub(crate) fn prefixes(topic: &str) -> impl Iterator<Item = &str> {
    let full = (!topic.is_empty()).then_some(topic);
    topic
        .match_indices('.')
        .map(move |(i, _)| &topic[..i])
        .chain(full)
}

/// Splits a topic expression into its topics.
///
/// Always splits on `,` and trims surrounding whitespace per element; a
/// plain topic comes back as a single-element list.
pub(crate) fn split_expression(expr: &str) -> Vec<Topic> {
    expr.split(',').map(|t| Topic::from(t.trim())).collect()
}

impl Deref for Topic {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Topic(Arc::from(s))
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Topic(Arc::from(s.as_str()))
    }
}

impl From<&Topic> for Topic {
    fn from(t: &Topic) -> Self {
        t.clone()
    }
}

impl PartialEq<str> for Topic {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Topic {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({:?})", &*self.0)
    }
}
