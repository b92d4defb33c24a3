//! `Set-Cookie` headers and `Cookie` header tokenizing.

use std::fmt;

/// A `Set-Cookie` header for the auth cookie.
///
/// Always `Secure; Path=/`, as the `__Host-` prefix requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    max_age: Option<u32>,
}

impl SetCookie {
    /// Session-scoped cookie; the server decides when it expires.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
        }
    }

    /// Cookie the client must drop immediately.
    pub fn expired(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: Some(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn max_age(&self) -> Option<u32> {
        self.max_age
    }

    /// The full header line, `Set-Cookie: ...`.
    pub fn header_line(&self) -> String {
        format!("Set-Cookie: {self}")
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Secure; Path=/", self.name, self.value)?;
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        Ok(())
    }
}

/// Split a `Cookie` header into `(name, value)` pairs.
///
/// Entries are separated by `;` and trimmed. An entry without `=` or with an
/// empty name is skipped; the rest of the header is still scanned.
pub fn cookie_pairs(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|entry| {
        let (name, value) = entry.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some((name, value.trim()))
    })
}
