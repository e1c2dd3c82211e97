// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! `OptionalCell` convenience type.

use core::cell::Cell;

/// A `Cell` around an `Option`, for fields that may hold a value (such as a
/// registered client reference) and are shared behind `&self`.
pub struct OptionalCell<T: Copy> {
    value: Cell<Option<T>>,
}

impl<T: Copy> OptionalCell<T> {
    /// Create a cell holding `val`.
    pub const fn new(val: T) -> OptionalCell<T> {
        OptionalCell {
            value: Cell::new(Some(val)),
        }
    }

    /// Create a cell holding `None`.
    pub const fn empty() -> OptionalCell<T> {
        OptionalCell {
            value: Cell::new(None),
        }
    }

    /// Store a value, replacing any previous one.
    pub fn set(&self, val: T) {
        self.value.set(Some(val));
    }

    /// Reset the cell to `None`.
    pub fn clear(&self) {
        self.value.set(None);
    }

    /// Whether the cell currently holds a value.
    pub fn is_some(&self) -> bool {
        self.value.get().is_some()
    }

    /// Whether the cell is empty.
    pub fn is_none(&self) -> bool {
        self.value.get().is_none()
    }

    /// Return a copy of the contents, if any.
    pub fn extract(&self) -> Option<T> {
        self.value.get()
    }

    /// Remove and return the contents, leaving `None` behind.
    pub fn take(&self) -> Option<T> {
        self.value.take()
    }

    /// Call `closure` on the contained value, if there is one.
    pub fn map<F, R>(&self, closure: F) -> Option<R>
    where
        F: FnOnce(T) -> R,
    {
        self.value.get().map(closure)
    }
}
