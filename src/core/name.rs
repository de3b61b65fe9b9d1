//! Interned package names.
//!
//! Workspace packages are keyed by name everywhere (graph nodes, selection
//! results, classification records), so names are interned once and compared
//! by pointer afterwards. Scoped names (`@scope/pkg`) are first-class.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{LazyLock, RwLock};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Global name interner
static INTERNER: LazyLock<RwLock<HashSet<&'static str>>> =
    LazyLock::new(|| RwLock::new(HashSet::new()));

/// Registry-style package name grammar: lowercase, optionally scoped.
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(@[a-z0-9\-~][a-z0-9\-._~]*/)?[a-z0-9\-~][a-z0-9\-._~]*$")
        .expect("name pattern is valid")
});

/// Check whether a string is a well-formed package name.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 214 && NAME_PATTERN.is_match(name)
}

/// An interned package name with O(1) equality and zero-cost cloning.
///
/// All names with the same content share one allocation, so equality is a
/// pointer comparison. Ordering is lexical over the underlying string, which
/// is what deterministic tie-breaking in selection relies on.
#[derive(Clone, Copy)]
pub struct PackageName {
    inner: &'static str,
}

impl PackageName {
    /// Intern a name.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();

        // Fast path: already interned (read lock only)
        {
            let interner = INTERNER.read().unwrap();
            if let Some(&interned) = interner.get(name) {
                return PackageName { inner: interned };
            }
        }

        let mut interner = INTERNER.write().unwrap();

        // Double-check after acquiring the write lock
        if let Some(&interned) = interner.get(name) {
            return PackageName { inner: interned };
        }

        let leaked: &'static str = Box::leak(name.to_string().into_boxed_str());
        interner.insert(leaked);

        PackageName { inner: leaked }
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.inner
    }

    /// Whether this is a scoped name (`@scope/pkg`).
    pub fn is_scoped(&self) -> bool {
        self.inner.starts_with('@')
    }

    /// The scope, without the leading `@`, if the name is scoped.
    pub fn scope(&self) -> Option<&'static str> {
        if !self.is_scoped() {
            return None;
        }
        self.inner.split('/').next().map(|s| &s[1..])
    }

    /// The name with any scope prefix removed.
    pub fn unscoped(&self) -> &'static str {
        match self.inner.split_once('/') {
            Some((_, rest)) if self.is_scoped() => rest,
            _ => self.inner,
        }
    }
}

impl Deref for PackageName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        self.inner
    }
}

impl AsRef<str> for PackageName {
    #[inline]
    fn as_ref(&self) -> &str {
        self.inner
    }
}

impl Borrow<str> for PackageName {
    #[inline]
    fn borrow(&self) -> &str {
        self.inner
    }
}

impl PartialEq for PackageName {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for PackageName {}

impl PartialOrd for PackageName {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageName {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(other.inner)
    }
}

impl Hash for PackageName {
    // Hash the contents, not the pointer: maps keyed by PackageName must
    // support lookup through Borrow<str>.
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state)
    }
}

impl fmt::Debug for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.inner, f)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner, f)
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        PackageName::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        PackageName::new(s)
    }
}

impl Serialize for PackageName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.inner.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(PackageName::new(s))
    }
}
