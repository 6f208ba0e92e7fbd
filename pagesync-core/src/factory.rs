//! Type-keyed builder registry shared by every entity factory.
//!
//! Each factory maps a discriminator to a builder function. New node kinds are
//! added with `register` instead of extending a closed match.

use std::collections::HashMap;
use std::hash::Hash;

/// A `discriminator → builder` table.
pub struct Registry<K, B> {
    builders: HashMap<K, B>,
}

impl<K: Eq + Hash, B> Registry<K, B> {
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Register `builder` for `key`, replacing any previous builder.
    pub fn register(&mut self, key: K, builder: B) -> &mut Self {
        self.builders.insert(key, builder);
        self
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&B>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.builders.get(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.builders.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

impl<K: Eq + Hash, B> Default for Registry<K, B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry: Registry<String, fn(i32) -> i32> = Registry::new();
        registry
            .register("double".to_string(), |x| x * 2)
            .register("negate".to_string(), |x| -x);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("double").map(|f| f(4)), Some(8));
        assert!(registry.contains("negate"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry: Registry<&'static str, i32> = Registry::default();
        assert!(registry.is_empty());
        registry.register("a", 1);
        registry.register("a", 2);
        assert_eq!(registry.get("a"), Some(&2));
        assert_eq!(registry.len(), 1);
    }
}
