/// Cache trait for storing and retrieving answer texts by key.
///
/// Implementations should handle errors gracefully without panicking.
pub trait Cache {
    /// Retrieves a cached answer for the given key.
    ///
    /// # Returns
    /// * `Some(String)` - The cached answer text if found
    /// * `None` - If the key doesn't exist or retrieval fails
    fn get(&self, key: &str) -> Option<String>;

    /// Stores an answer under the given key.
    ///
    /// Failures are logged, never returned.
    fn set(&self, key: &str, value: &str);
}
