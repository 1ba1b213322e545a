use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for customer data that must not leak into logs.
///
/// `Debug` and `Display` keep only the first character, so
/// `tracing::info!(customer = %Masked(&name))` stays useful for support
/// without recording the full name. Serialization is untouched; API responses
/// still carry the real value.
#[derive(Clone, Deserialize)]
pub struct Masked<T>(pub T);

impl<T: fmt::Display> Masked<T> {
    fn redacted(&self) -> String {
        match self.0.to_string().chars().next() {
            Some(initial) => format!("{}***", initial),
            None => String::new(),
        }
    }
}

impl<T: fmt::Display> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

impl<T: fmt::Display> fmt::Display for Masked<T> {
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
