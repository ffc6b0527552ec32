//! Name-keyed registries built once per session
//!
//! A registry is populated through its builder while a session starts and is
//! read-only afterwards. Lookups are by exact name; there is no fuzzy search
//! and nothing is re-registered while files are being processed.

/// A read-only, name-keyed lookup table
pub trait Registry {
    /// The value stored under each name
    type Value;

    /// Value registered under `name`
    fn lookup(&self, name: &str) -> Option<&Self::Value>;

    /// Whether `name` is registered
    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Registered names, in registration order
    fn names(&self) -> impl Iterator<Item = &str>;

    /// Number of entries
    fn len(&self) -> usize;

    /// Whether the registry has no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accumulates registrations, then `build()` freezes them
///
/// When the same name is registered twice the first registration is kept,
/// matching how hosts resolve a plugin name to the first plugin carrying it.
pub trait RegistryBuilder: Default {
    /// The frozen registry
    type Registry: Registry<Value = Self::Value>;

    /// The value stored under each name
    type Value;

    /// Register `value` under `name`
    fn register(self, name: impl Into<String>, value: Self::Value) -> Self;

    /// Freeze the registrations
    fn build(self) -> Self::Registry;
}
