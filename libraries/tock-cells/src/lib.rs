// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Cell types for sharing state between drivers and their clients without
//! `&mut` references.

#![no_std]

pub mod optional_cell;

pub use crate::optional_cell::OptionalCell;
