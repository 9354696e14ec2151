use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for personal data (emails, names) that must not leak into logs.
///
/// `Debug` and `Display` render a redacted form; `Serialize` writes the real
/// value because API responses need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> Masked<T> {
    /// Redacted rendering: first character kept, the rest of the local part
    /// hidden, domain kept for emails.
    pub fn redacted(&self) -> String {
        let value = self.0.as_ref();
        let (local, domain) = match value.split_once('@') {
            Some((local, domain)) => (local, Some(domain)),
            None => (value, None),
        };

        let mut out = String::new();
        if let Some(first) = local.chars().next() {
            out.push(first);
        }
        out.push_str("***");
        if let Some(domain) = domain {
            out.push('@');
            out.push_str(domain);
        }
        out
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}
