// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Wrapper type for references to statically allocated memory.

use core::ops::Deref;

/// A pointer to statically allocated mutable data, such as a memory mapped
/// register block.
///
/// Wraps a raw pointer so that the unsafe dereference happens in exactly one
/// place. Construction is unsafe; everything after that is an ordinary
/// shared reference.
#[derive(Debug)]
pub struct StaticRef<T> {
    ptr: *const T,
}

impl<T> StaticRef<T> {
    /// Create a new `StaticRef` from a raw pointer.
    ///
    /// ## Safety
    ///
    /// `ptr` must point to a valid, statically allocated `T` that does not
    /// overlap any other Rust object.
    pub const unsafe fn new(ptr: *const T) -> StaticRef<T> {
        StaticRef { ptr }
    }
}

impl<T> Clone for StaticRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StaticRef<T> {}

impl<T> Deref for StaticRef<T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.ptr }
    }
}
