use std::fmt;

use crate::Error;

/// An input identifier that is safe to splice into a file path and to pass
/// as a single whitespace-delimited argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validate `s`; `index` is its position in the manifest, used for the error.
    pub fn new(index: usize, s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        if is_safe(&s) {
            Ok(Self(s))
        } else {
            Err(Error::UnsafeIdentifier {
                index,
                identifier: s,
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a whole manifest's worth of identifiers, failing at the first bad one.
pub fn validate_all(ids: Vec<String>) -> Result<Vec<Identifier>, Error> {
    ids.into_iter()
        .enumerate()
        .map(|(i, s)| Identifier::new(i, s))
        .collect()
}

fn is_safe(s: &str) -> bool {
    match s.chars().next() {
        None | Some('-') | Some('.') => false,
        Some(_) => s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+')),
    }
}
