use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = pushcast_common::id::prefixed_ulid("sid");
/// assert!(id.starts_with("sid_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new().to_string())
}

/// Well-known ID prefixes.
pub mod prefix {
    /// WebSocket session handed out on connect.
    pub const SESSION: &str = "sid";
}
