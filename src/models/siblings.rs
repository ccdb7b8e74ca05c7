//! Ordered collections with unique member identities.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;

use crate::{Error, Result};

/// A node that carries an identity.
pub trait Identified {
    /// The identity type.
    type Id: Copy + Eq + Hash + fmt::Display;

    /// Returns the node's identity.
    fn id(&self) -> Self::Id;
}

/// An ordered list of sibling nodes in which no two members share an identity.
///
/// Order is the caller's insertion/edit order and is what the store
/// reproduces on read. Constructing a list with a repeated identity is a
/// caller error and fails with [`Error::InvalidInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Siblings<T>(Vec<T>);

impl<T> Siblings<T> {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns the members as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    /// Consumes the list, returning the members in order.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.0
    }

    /// Mutable access to every member.
    ///
    /// Identities must not be changed through this iterator.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.0.iter_mut()
    }
}

impl<T: Identified> Siblings<T> {
    /// Builds a list from `items`, rejecting repeated identities.
    pub fn try_from_vec(items: Vec<T>) -> Result<Self> {
        let mut siblings = Self::new();
        for item in items {
            siblings.push(item)?;
        }
        Ok(siblings)
    }

    /// Appends a member, rejecting an identity already present.
    pub fn push(&mut self, item: T) -> Result<()> {
        let id = item.id();
        if self.contains(id) {
            return Err(Error::InvalidInput(format!(
                "duplicate sibling identity '{id}'"
            )));
        }
        self.0.push(item);
        Ok(())
    }

    /// Returns `true` if a member with `id` is present.
    pub fn contains(&self, id: T::Id) -> bool {
        self.0.iter().any(|item| item.id() == id)
    }

    /// Returns the member with `id`.
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.0.iter().find(|item| item.id() == id)
    }

    /// Removes and returns the member with `id`, keeping the order of the rest.
    pub fn remove(&mut self, id: T::Id) -> Option<T> {
        let index = self.0.iter().position(|item| item.id() == id)?;
        Some(self.0.remove(index))
    }
}

impl<T> Default for Siblings<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for Siblings<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a, T> IntoIterator for &'a Siblings<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T> IntoIterator for Siblings<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: Identified> TryFrom<Vec<T>> for Siblings<T> {
    type Error = Error;

    fn try_from(items: Vec<T>) -> Result<Self> {
        Self::try_from_vec(items)
    }
}

impl<T: Serialize> Serialize for Siblings<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Siblings<T>
where
    T: Deserialize<'de> + Identified,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Self::try_from_vec(items).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Node {
        id: u32,
        label: &'static str,
    }

    impl Identified for Node {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }
    }

    const fn node(id: u32, label: &'static str) -> Node {
        Node { id, label }
    }

    #[test]
    fn test_preserves_order() {
        let list = Siblings::try_from_vec(vec![node(3, "c"), node(1, "a"), node(2, "b")]).unwrap();
        let ids: Vec<u32> = list.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_rejects_duplicate_identity() {
        let err = Siblings::try_from_vec(vec![node(1, "a"), node(1, "b")]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("duplicate")));

        let mut list = Siblings::new();
        list.push(node(7, "x")).unwrap();
        assert!(list.push(node(7, "y")).is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut list =
            Siblings::try_from_vec(vec![node(1, "a"), node(2, "b"), node(3, "c")]).unwrap();
        assert_eq!(list.remove(2).map(|n| n.label), Some("b"));
        assert_eq!(list.remove(9), None);
        let labels: Vec<&str> = list.iter().map(|n| n.label).collect();
        assert_eq!(labels, vec!["a", "c"]);
    }

    #[test]
    fn test_deserialize_rejects_duplicates() {
        let ok: std::result::Result<Siblings<NodeOwned>, _> =
            serde_json::from_str(r#"[{"id":1},{"id":2}]"#);
        assert_eq!(ok.unwrap().len(), 2);

        let dup: std::result::Result<Siblings<NodeOwned>, _> =
            serde_json::from_str(r#"[{"id":1},{"id":1}]"#);
        assert!(dup.is_err());
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct NodeOwned {
        id: u32,
    }

    impl Identified for NodeOwned {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }
    }
}
