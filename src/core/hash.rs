/// Hash map used across the crate, keyed with ahash.
pub type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;

/// Hash set used across the crate, keyed with ahash.
pub type HashSet<V> = std::collections::HashSet<V, ahash::RandomState>;
