use std::fmt;

/// A wrapper type for sensitive information like API keys
///
/// `Secret<T>` hides the inner value in debug output and display implementations
/// so an API key never ends up in a log line or an error message.
///
/// # Examples
///
/// ```
/// use chatstream_core::Secret;
///
/// let api_key = Secret::new("sk-my-secret-key");
/// assert_eq!(format!("{}", api_key), "••••••");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret<T>(T);

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("••••••")
    }
}

impl<T> Secret<T> {
    /// Creates a new Secret wrapper around a value
    pub fn new(value: T) -> Self {
        Secret(value)
    }

    /// Gets a reference to the inner value
    ///
    /// Only the transport should need this, when it builds the
    /// `Authorization` header.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatstream_core::Secret;
    ///
    /// let api_key = Secret::new("sk-my-secret-key");
    /// assert_eq!(api_key.expose(), &"sk-my-secret-key");
    /// ```
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Secret(value)
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Secret(value.to_string())
    }
}
