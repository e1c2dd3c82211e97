// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Channel control-word codec.
//!
//! The μDMA controller keeps no per-channel configuration registers; it
//! reads a four-word control data structure from RAM for every cycle. This
//! module translates a [`TransferConfig`] into the three meaningful words of
//! that structure: the source end address, the destination end address and
//! the packed control word.
//!
//! The translation functions here are pure and perform no validation.
//! Callers must run [`TransferConfig::validate`] first; the channel
//! configurator in [`super`] does so before anything reaches hardware.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::InMemoryRegister;
use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::dma::Error;

register_bitfields![u32,
    /// Control word of a channel control data structure (word 2).
    pub CHNL_CTRL [
        /// Operating mode of the DMA cycle. The controller rewrites this
        /// field to `Stop` when a cycle completes.
        CYCLE_CTRL OFFSET(0) NUMBITS(3) [
            /// Structure is invalid; channel will not respond to requests
            Stop = 0,
            /// One cycle per request, rearbitrating per R_POWER
            Basic = 1,
            /// A single request moves the whole cycle
            Auto = 2,
            /// Alternate between the primary and alternate structures
            PingPong = 3,
            /// Memory scatter-gather, primary structure (the task loader)
            MemoryScatterGatherPrimary = 4,
            /// Memory scatter-gather, alternate structure (a chained task)
            MemoryScatterGatherAlternate = 5,
            /// Peripheral scatter-gather, primary structure
            PeripheralScatterGatherPrimary = 6,
            /// Peripheral scatter-gather, alternate structure
            PeripheralScatterGatherAlternate = 7
        ],
        /// Forces the channel's useburst bit to be set when the alternate
        /// structure is loaded during scatter-gather.
        NEXT_USEBURST OFFSET(3) NUMBITS(1) [],
        /// Total number of transfers in the cycle, minus one. The controller
        /// decrements this field as it moves data.
        N_MINUS_1 OFFSET(4) NUMBITS(10) [],
        /// log2 of the number of transfers performed before the controller
        /// rearbitrates the bus. 1024 transfers -> 10.
        R_POWER OFFSET(14) NUMBITS(4) [],
        /// HPROT[3:1] driven while the controller reads source data.
        SRC_PROT_CTRL OFFSET(18) NUMBITS(3) [],
        /// HPROT[3:1] driven while the controller writes destination data.
        DST_PROT_CTRL OFFSET(21) NUMBITS(3) [],
        /// Source data size. Must equal DST_SIZE.
        SRC_SIZE OFFSET(24) NUMBITS(2) [
            Byte = 0,
            HalfWord = 1,
            Word = 2
        ],
        /// Source address increment applied after each transfer.
        SRC_INC OFFSET(26) NUMBITS(2) [
            Byte = 0,
            HalfWord = 1,
            Word = 2,
            NoIncrement = 3
        ],
        /// Destination data size. Must equal SRC_SIZE.
        DST_SIZE OFFSET(28) NUMBITS(2) [
            Byte = 0,
            HalfWord = 1,
            Word = 2
        ],
        /// Destination address increment applied after each transfer.
        DST_INC OFFSET(30) NUMBITS(2) [
            Byte = 0,
            HalfWord = 1,
            Word = 2,
            NoIncrement = 3
        ]
    ]
];

/// A decoded copy of a channel control word.
pub type ControlWord = LocalRegisterCopy<u32, CHNL_CTRL::Register>;

/// The controller moves at most 1024 units per arm of a channel.
pub const MAX_CYCLE_LEN: usize = 1024;

/// Operating mode of one DMA cycle.
///
/// Chained scatter-gather tasks use `MemoryScatterGatherAlternate`; the
/// final task of a chain uses `AutoRequest` (or `Basic`) so the engine stops
/// and clears the channel enable bit after it.
#[repr(u32)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TransferMode {
    Basic = 1,
    AutoRequest = 2,
    PingPong = 3,
    MemoryScatterGatherPrimary = 4,
    MemoryScatterGatherAlternate = 5,
    PeripheralScatterGatherPrimary = 6,
    PeripheralScatterGatherAlternate = 7,
}

/// Size of one transferred unit.
#[repr(u32)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DataSize {
    Byte = 0,
    HalfWord = 1,
    Word = 2,
}

/// Address increment applied after each transferred unit. Independent of
/// [`DataSize`], except that an increment smaller than the unit size is
/// rejected by validation.
#[repr(u32)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AddressIncrement {
    Byte = 0,
    HalfWord = 1,
    Word = 2,
    NoIncrement = 3,
}

/// Everything needed to describe one transfer cycle on one channel.
///
/// Built by the caller (typically a peripheral driver wanting DMA service)
/// and handed to [`super::Dma::configure`] or [`super::Dma::build_task`].
#[derive(Copy, Clone)]
pub struct TransferConfig {
    /// Source base address.
    pub src: u32,
    /// Destination base address.
    pub dst: u32,
    pub src_inc: AddressIncrement,
    pub dst_inc: AddressIncrement,
    pub size: DataSize,
    pub mode: TransferMode,
    /// Number of transfers per arm, 1..=1024.
    pub cycle_len: usize,
    /// Transfers between bus rearbitrations. Power of two, <= cycle_len.
    pub arbitration: usize,
    /// HPROT[3:1] for source reads. The MDR32F9Qx bus fabric honors the
    /// privileged bit; the cacheable/bufferable bits are ignored.
    pub src_prot: u32,
    /// HPROT[3:1] for destination writes.
    pub dst_prot: u32,
    /// Respond only to burst requests on this channel.
    pub use_burst: bool,
    /// Arbitrate this channel in the high-priority group.
    pub high_priority: bool,
}

impl TransferConfig {
    /// Check every field against the ranges the hardware can encode.
    ///
    /// Runs before any register or control-structure write, so a failed
    /// configuration leaves hardware state untouched.
    pub fn validate(&self) -> Result<(), Error> {
        if self.cycle_len == 0 || self.cycle_len > MAX_CYCLE_LEN {
            return Err(Error::InvalidParameter);
        }
        if self.arbitration == 0
            || self.arbitration > self.cycle_len
            || !self.arbitration.is_power_of_two()
        {
            return Err(Error::InvalidParameter);
        }
        // Incrementing by less than one unit would re-cover bytes already
        // moved; the engine cannot encode it meaningfully.
        if !increment_legal(self.src_inc, self.size) || !increment_legal(self.dst_inc, self.size) {
            return Err(Error::InvalidParameter);
        }
        if self.src_prot > 0b111 || self.dst_prot > 0b111 {
            return Err(Error::InvalidParameter);
        }
        Ok(())
    }
}

fn increment_legal(inc: AddressIncrement, size: DataSize) -> bool {
    match inc {
        AddressIncrement::NoIncrement => true,
        _ => inc as u32 >= size as u32,
    }
}

/// Compute the end address the controller expects for a base address covered
/// by `count` transfers under `inc`.
///
/// With no increment the controller reads or writes the same address every
/// beat and the end address equals the base; this is a hardware contract,
/// not a degenerate case of the general formula.
pub fn end_address(base: u32, inc: AddressIncrement, count: u32) -> u32 {
    match inc {
        AddressIncrement::NoIncrement => base,
        _ => base.wrapping_add((count - 1) << (inc as u32)),
    }
}

/// Pack a validated `TransferConfig` into a control word.
pub fn control_word(config: &TransferConfig) -> ControlWord {
    let ctrl = InMemoryRegister::<u32, CHNL_CTRL::Register>::new(0);
    ctrl.write(
        CHNL_CTRL::DST_INC.val(config.dst_inc as u32)
            + CHNL_CTRL::DST_SIZE.val(config.size as u32)
            + CHNL_CTRL::SRC_INC.val(config.src_inc as u32)
            + CHNL_CTRL::SRC_SIZE.val(config.size as u32)
            + CHNL_CTRL::DST_PROT_CTRL.val(config.dst_prot)
            + CHNL_CTRL::SRC_PROT_CTRL.val(config.src_prot)
            + CHNL_CTRL::R_POWER.val(config.arbitration.trailing_zeros())
            + CHNL_CTRL::N_MINUS_1.val(config.cycle_len as u32 - 1)
            + CHNL_CTRL::CYCLE_CTRL.val(config.mode as u32),
    );
    LocalRegisterCopy::new(ctrl.get())
}

/// The three meaningful words of a channel control data structure.
#[derive(Copy, Clone)]
pub struct ControlData {
    pub src_end: u32,
    pub dst_end: u32,
    pub ctrl: ControlWord,
}

impl ControlData {
    /// Derive the control data structure for a validated `TransferConfig`.
    ///
    /// In memory scatter-gather primary mode the destination is the
    /// channel's alternate structure, which the engine fills one 4-word task
    /// at a time; its end address is pinned to the structure's last word
    /// (`dst + 12`) no matter what the destination increment says.
    pub fn from_config(config: &TransferConfig) -> ControlData {
        let count = config.cycle_len as u32;
        let dst_end = match config.mode {
            TransferMode::MemoryScatterGatherPrimary => config.dst.wrapping_add(12),
            _ => end_address(config.dst, config.dst_inc, count),
        };
        ControlData {
            src_end: end_address(config.src, config.src_inc, count),
            dst_end,
            ctrl: control_word(config),
        }
    }
}
