// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Channel control data structures.
//!
//! The controller has no per-channel configuration registers. It holds one
//! base pointer and computes the address of channel `n`'s structure as
//! `base + n * 16`, so the primary table, and the alternate table the
//! hardware places at `base + 0x200`, must live in a single contiguous
//! block whose alignment covers the whole table. The block must never move
//! while any transfer is in flight: the base pointer register is written
//! once, at [`super::Dma::reset_all`] time.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::InMemoryRegister;
use tock_registers::LocalRegisterCopy;

use crate::dma::control::{ControlData, ControlWord, CHNL_CTRL};
use crate::dma::DMA_CHANNELS;

/// One channel control data structure, read by the engine.
///
/// Four naturally-aligned words: source end address, destination end
/// address, control word, and one unused word the engine skips over. Also
/// the element type of caller-owned scatter-gather task arrays; the 16-byte
/// alignment the engine requires of tasks comes with the type.
#[repr(align(16))]
pub struct ChannelControl {
    src_end: InMemoryRegister<u32>,
    dst_end: InMemoryRegister<u32>,
    ctrl: InMemoryRegister<u32, CHNL_CTRL::Register>,
    _unused: InMemoryRegister<u32>,
}

// InMemoryRegister does not implement Copy and Default cannot be const, so
// zeroed structures are built by hand (and arrays of them from a const).
impl ChannelControl {
    pub const fn const_default() -> Self {
        Self {
            src_end: InMemoryRegister::new(0),
            dst_end: InMemoryRegister::new(0),
            ctrl: InMemoryRegister::new(0),
            _unused: InMemoryRegister::new(0),
        }
    }

    /// Overwrite the structure in place. The structure of an enabled channel
    /// may be mid-read by the engine; callers disable the channel first.
    pub fn set(&self, data: &ControlData) {
        self.src_end.set(data.src_end);
        self.dst_end.set(data.dst_end);
        self.ctrl.set(data.ctrl.get());
    }

    /// Invalidate the structure (cycle control = stop).
    pub fn clear(&self) {
        self.src_end.set(0);
        self.dst_end.set(0);
        self.ctrl.set(0);
    }

    /// Snapshot of the live control word. The engine decrements N_MINUS_1
    /// and rewrites CYCLE_CTRL to stop as it works, so this is the only
    /// software-visible progress indicator.
    pub fn control(&self) -> ControlWord {
        LocalRegisterCopy::new(self.ctrl.get())
    }

    pub fn src_end(&self) -> u32 {
        self.src_end.get()
    }

    pub fn dst_end(&self) -> u32 {
        self.dst_end.get()
    }

    /// Address of this structure as the engine sees it.
    pub fn address(&self) -> u32 {
        self as *const ChannelControl as usize as u32
    }
}

/// Which of the two per-channel structures an operation targets.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Table {
    Primary,
    Alternate,
}

/// The block of channel control data structures handed to the engine.
///
/// Primary structures for channels 0..32 in the first half, alternate
/// structures in the second half, exactly the layout the engine derives
/// from the single base pointer. 1 KiB alignment keeps the engine's
/// base-plus-offset address computation inside the block.
#[repr(align(1024))]
pub struct DmaControlBlock([ChannelControl; 2 * DMA_CHANNELS]);

// The block is handed to the DMA engine, an independent bus master, and all
// software access goes through interior-mutable registers behind &self.
unsafe impl Sync for DmaControlBlock {}

impl DmaControlBlock {
    pub const fn const_default() -> Self {
        const EMPTY: ChannelControl = ChannelControl::const_default();
        DmaControlBlock([EMPTY; 2 * DMA_CHANNELS])
    }

    /// The structure for `channel` in the selected table.
    ///
    /// `channel` must be below [`DMA_CHANNELS`]; passing a larger index is a
    /// caller bug and panics.
    pub fn channel_control(&self, table: Table, channel: usize) -> &ChannelControl {
        match table {
            Table::Primary => &self.0[channel],
            Table::Alternate => &self.0[DMA_CHANNELS + channel],
        }
    }

    /// Base address written to the engine's control base pointer register.
    pub fn base_address(&self) -> u32 {
        self.0.as_ptr() as usize as u32
    }
}
