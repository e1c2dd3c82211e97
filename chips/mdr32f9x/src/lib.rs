// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Peripheral implementations for the Milandr MDR32F9Qx family.
//!
//! Currently covers the μDMA controller (ARM PL230). Peripheral drivers that
//! want DMA service build a [`dma::TransferConfig`] naming their data
//! register and a buffer, and are themselves responsible for setting their
//! own DMA-request-enable bit.

#![no_std]

// Host-run unit tests allocate their fake MMIO blocks and control tables.
#[cfg(test)]
extern crate std;

pub mod dma;

mod static_ref;
pub use crate::static_ref::StaticRef;
