// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generation-stamped immutable snapshots.
//!
//! Entity and object state is owned by the external store and replaced, never
//! mutated in place. Each replacement is wrapped in a [`Versioned`], which
//! carries a process-unique [`Generation`]. Adapters and renderers compare
//! generations to decide whether anything needs repainting.

use core::fmt;
use core::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// A monotonically increasing snapshot stamp.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    fn next() -> Self {
        Self(NEXT_GENERATION.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// An immutable value stamped with a [`Generation`].
///
/// Cloning shares the value and keeps the generation. Producing a changed
/// value always goes through [`Versioned::new`] or [`Versioned::map`], both
/// of which stamp a fresh generation.
pub struct Versioned<T> {
    generation: Generation,
    value: Arc<T>,
}

impl<T> Versioned<T> {
    /// Wraps `value` with a fresh generation.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            generation: Generation::next(),
            value: Arc::new(value),
        }
    }

    /// Returns the generation stamp of this snapshot.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Returns `true` if both handles refer to the same snapshot.
    #[inline]
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        self.generation == other.generation
    }

    /// Returns the wrapped value.
    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }
}

impl<T: Clone> Versioned<T> {
    /// Returns a new snapshot produced by applying `f` to a copy of the value.
    #[must_use]
    pub fn map(&self, f: impl FnOnce(&mut T)) -> Self {
        let mut value = T::clone(&self.value);
        f(&mut value);
        Self::new(value)
    }
}

impl<T> Clone for Versioned<T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Deref for Versioned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Snapshots compare by generation only.
impl<T> PartialEq for Versioned<T> {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl<T> Eq for Versioned<T> {}

impl<T: fmt::Debug> fmt::Debug for Versioned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Versioned")
            .field("generation", &self.generation)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> From<T> for Versioned<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_keeps_generation() {
        let a = Versioned::new(3_u32);
        let b = a.clone();
        assert!(a.is_same(&b));
        assert_eq!(a.generation(), b.generation());
    }

    #[test]
    fn equal_values_get_distinct_generations() {
        let a = Versioned::new(3_u32);
        let b = Versioned::new(3_u32);
        assert!(!a.is_same(&b), "identical payloads are still distinct snapshots");
    }

    #[test]
    fn map_stamps_newer_generation() {
        let a = Versioned::new(vec![1, 2]);
        let b = a.map(|v| v.push(3));
        assert!(b.generation() > a.generation());
        assert_eq!(*a, vec![1, 2]);
        assert_eq!(*b, vec![1, 2, 3]);
    }
}
