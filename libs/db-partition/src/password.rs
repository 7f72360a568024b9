//! The database password.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Password of the migration user.
///
/// Taken as-is from the command line (any string, including empty or
/// `-`-prefixed ones), handed to the driver once per connection, wiped on
/// drop. Formatting never shows it.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Password(String);

impl Password {
    /// Value for the driver's connect options.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}
