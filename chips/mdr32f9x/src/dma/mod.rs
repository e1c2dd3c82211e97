// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! μDMA controller (ARM PL230) of the MDR32F9Qx.
//!
//! The controller is an independent bus master: software builds a channel
//! control data structure in RAM, flips a handful of per-channel bits, and
//! the engine then moves data on its own, decrementing the transfer count
//! inside the live structure and clearing the channel enable bit when the
//! cycle (or, for scatter-gather, the whole task chain) completes. The only
//! things software ever observes are the status bits, the live control word
//! and the shared completion interrupt.
//!
//! Channels are independent: configuring different channels concurrently
//! touches disjoint structures and distinct set/clear registers. A single
//! channel must have a single owner; reconfiguring a channel whose enable
//! bit is still set is undefined and callers must go through
//! [`Dma::disable_channel`] first.

pub mod control;
pub mod table;

use core::cell::Cell;

use tock_cells::optional_cell::OptionalCell;
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::{register_bitfields, register_structs};
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};

use crate::static_ref::StaticRef;

pub use self::control::{
    AddressIncrement, ControlData, DataSize, TransferConfig, TransferMode, MAX_CYCLE_LEN,
};
pub use self::table::{ChannelControl, DmaControlBlock, Table};

/// The MDR32F9Qx μDMA exposes 32 channels.
pub const DMA_CHANNELS: usize = 32;

/// A scatter-gather chain is limited by the 1024-transfer cycle ceiling:
/// each task is four words of control data.
pub const MAX_CHAIN_TASKS: usize = MAX_CYCLE_LEN / 4;

pub const DMA_BASE: StaticRef<DmaRegisters> =
    unsafe { StaticRef::new(0x4002_8000 as *const DmaRegisters) };

register_structs! {
    pub DmaRegisters {
        /// Controller status (read-only)
        (0x000 => status: ReadOnly<u32, STATUS::Register>),
        /// Controller configuration (write-only)
        (0x004 => cfg: WriteOnly<u32, CFG::Register>),
        /// Channel control data base pointer
        (0x008 => ctrl_base_ptr: ReadWrite<u32>),
        /// Alternate structure base pointer, computed by hardware
        (0x00C => alt_ctrl_base_ptr: ReadOnly<u32>),
        /// Channel wait-on-request status
        (0x010 => waitonreq_status: ReadOnly<u32>),
        /// Channel software request
        (0x014 => chnl_sw_request: WriteOnly<u32>),
        /// Channel useburst set; reads back the useburst status
        (0x018 => chnl_useburst_set: ReadWrite<u32>),
        /// Channel useburst clear
        (0x01C => chnl_useburst_clr: WriteOnly<u32>),
        /// Channel request mask set; reads back the mask status
        (0x020 => chnl_req_mask_set: ReadWrite<u32>),
        /// Channel request mask clear
        (0x024 => chnl_req_mask_clr: WriteOnly<u32>),
        /// Channel enable set; reads back the enable status
        (0x028 => chnl_enable_set: ReadWrite<u32>),
        /// Channel enable clear
        (0x02C => chnl_enable_clr: WriteOnly<u32>),
        /// Channel primary/alternate set; reads back the selection
        (0x030 => chnl_pri_alt_set: ReadWrite<u32>),
        /// Channel primary/alternate clear
        (0x034 => chnl_pri_alt_clr: WriteOnly<u32>),
        /// Channel priority set; reads back the priority status
        (0x038 => chnl_priority_set: ReadWrite<u32>),
        /// Channel priority clear
        (0x03C => chnl_priority_clr: WriteOnly<u32>),
        (0x040 => _reserved0),
        /// Bus error status; write one to clear
        (0x04C => err_clr: ReadWrite<u32, ERR_CLR::Register>),
        (0x050 => @END),
    }
}

register_bitfields![u32,
    STATUS [
        /// Enable status of the controller
        MASTER_ENABLE OFFSET(0) NUMBITS(1) [],
        /// Current state of the control state machine
        STATE OFFSET(4) NUMBITS(4) [
            Idle = 0,
            ReadingChannelControllerData = 1,
            ReadingSourceEndPointer = 2,
            ReadingDestinationEndPointer = 3,
            ReadingSourceData = 4,
            WritingDestinationData = 5,
            WaitingForRequestToClear = 6,
            WritingChannelControllerData = 7,
            Stalled = 8,
            Done = 9,
            PeripheralScatterGatherTransition = 10
        ],
        /// Number of available channels minus one
        CHNLS_MINUS_1 OFFSET(16) NUMBITS(5) []
    ],
    CFG [
        /// Enable for the controller
        MASTER_ENABLE OFFSET(0) NUMBITS(1) [],
        /// HPROT[3:1] driven when the controller fetches control data
        CHNL_PROT_CTRL OFFSET(5) NUMBITS(3) []
    ],
    ERR_CLR [
        /// Sticky bus error flag; set by hardware on any channel's bus
        /// error, with no per-channel attribution. Write one to clear.
        ERR OFFSET(0) NUMBITS(1) []
    ]
];

/// Errors reported synchronously, before any hardware state changes.
///
/// Bus errors during a running transfer never surface here: by the time the
/// engine latches one, the configuration call has long returned. They are
/// observed through [`Flag::GlobalError`] or the shared interrupt.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    InvalidParameter,
}

/// Status bits readable through [`Dma::query_flag`].
///
/// `MasterEnabled` and `GlobalError` are controller-wide; the channel
/// argument is ignored for them.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Flag {
    MasterEnabled,
    GlobalError,
    ChannelEnabled,
    ChannelMasked,
    WaitingOnRequest,
    UseBurst,
    UsingAlternate,
    HighPriority,
}

/// Callback interface for the shared completion interrupt.
pub trait DmaClient {
    /// The engine finished the cycle (or task chain) on `channel` and
    /// cleared its enable bit.
    fn transfer_done(&self, channel: usize);
}

pub struct Dma<'a> {
    registers: StaticRef<DmaRegisters>,
    control: &'a DmaControlBlock,
    clients: [OptionalCell<&'a dyn DmaClient>; DMA_CHANNELS],
    // Channels armed by software and not yet reported complete; consulted by
    // the interrupt handler so one completion fires one callback.
    armed: Cell<u32>,
}

impl<'a> Dma<'a> {
    pub fn new(registers: StaticRef<DmaRegisters>, control: &'a DmaControlBlock) -> Dma<'a> {
        Dma {
            registers,
            control,
            clients: core::array::from_fn(|_| OptionalCell::empty()),
            armed: Cell::new(0),
        }
    }

    /// Cold-reset the controller into a known state and register the control
    /// block base pointer. Call once during system bring-up.
    ///
    /// Aborts any in-flight transfer with no completion notification, so it
    /// must not be called while a channel is mid-cycle or mid-chain. The
    /// base pointer must not be rewritten afterwards while any channel is
    /// active; the hardware has no busy guard for that register.
    pub fn reset_all(&self) {
        self.registers.cfg.write(CFG::MASTER_ENABLE::CLEAR);

        self.registers.chnl_useburst_clr.set(0xFFFF_FFFF);
        self.registers.chnl_req_mask_clr.set(0xFFFF_FFFF);
        self.registers.chnl_enable_clr.set(0xFFFF_FFFF);
        self.registers.chnl_pri_alt_clr.set(0xFFFF_FFFF);
        self.registers.chnl_priority_clr.set(0xFFFF_FFFF);
        self.registers.err_clr.write(ERR_CLR::ERR::SET);

        self.registers.ctrl_base_ptr.set(self.control.base_address());
        self.registers.cfg.write(CFG::MASTER_ENABLE::SET);

        self.armed.set(0);
    }

    pub fn is_enabled(&self) -> bool {
        self.registers.status.is_set(STATUS::MASTER_ENABLE)
    }

    /// Enable the controller without touching per-channel state.
    pub fn enable(&self) {
        self.registers.cfg.write(CFG::MASTER_ENABLE::SET);
    }

    /// Disable the controller. Completes the current transfer first only if
    /// one is mid-arbitration; treat as an abort.
    pub fn disable(&self) {
        self.registers.cfg.write(CFG::MASTER_ENABLE::CLEAR);
    }

    /// Alternate table base address, computed by hardware from the primary
    /// base pointer. Read-only; useful for bring-up sanity checks.
    pub fn alternate_base(&self) -> u32 {
        self.registers.alt_ctrl_base_ptr.get()
    }

    /// Register the completion client for one channel.
    pub fn set_client(&self, channel: usize, client: &'a dyn DmaClient) {
        self.clients[channel].set(client);
    }

    /// Build the channel's control data structure and arm the channel.
    ///
    /// Validation failures leave both the control block and every register
    /// untouched. On success the writes happen in a fixed order, the enable
    /// bit strictly last: all accesses are volatile, so on this single-core
    /// part the structure is observable by the engine before the channel can
    /// consume it.
    ///
    /// Once enabled and unmasked the channel is armed and moves data on the
    /// next qualifying request without further software action.
    pub fn configure(
        &self,
        channel: usize,
        table: Table,
        config: &TransferConfig,
    ) -> Result<(), Error> {
        config.validate()?;

        let data = ControlData::from_config(config);
        self.control.channel_control(table, channel).set(&data);

        self.arm(channel, table, config.use_burst, config.high_priority);
        Ok(())
    }

    /// Build one task of a memory scatter-gather chain into a caller-owned
    /// task array.
    ///
    /// Tasks are ordinary control data structures: the engine copies them
    /// into the channel's alternate structure one by one and executes each.
    /// Every task that continues the chain must use
    /// [`TransferMode::MemoryScatterGatherAlternate`]; the final task uses
    /// `AutoRequest` (or `Basic`), which is what stops the engine after it.
    /// The array must stay valid and unmodified until the chain completes.
    pub fn build_task(
        &self,
        task_index: usize,
        tasks: &[ChannelControl],
        config: &TransferConfig,
    ) -> Result<(), Error> {
        config.validate()?;
        tasks[task_index].set(&ControlData::from_config(config));
        Ok(())
    }

    /// Point the channel's primary structure at a task array and start the
    /// chain.
    ///
    /// The primary structure is set up in memory scatter-gather mode: its
    /// source walks the task array, its destination is the channel's own
    /// alternate structure, and it moves four words per bus grant, one task
    /// at a time. The engine then alternates between loading a task and
    /// executing it, with no software intervention per task, and clears the
    /// channel enable bit after the final task completes.
    pub fn arm_chain(&self, channel: usize, tasks: &[ChannelControl]) -> Result<(), Error> {
        if tasks.is_empty() || tasks.len() > MAX_CHAIN_TASKS {
            return Err(Error::InvalidParameter);
        }

        let alt = self.control.channel_control(Table::Alternate, channel);
        let config = TransferConfig {
            src: tasks.as_ptr() as usize as u32,
            dst: alt.address(),
            src_inc: AddressIncrement::Word,
            dst_inc: AddressIncrement::Word,
            size: DataSize::Word,
            mode: TransferMode::MemoryScatterGatherPrimary,
            cycle_len: 4 * tasks.len(),
            arbitration: 4,
            src_prot: 0,
            dst_prot: 0,
            use_burst: false,
            high_priority: false,
        };

        let data = ControlData::from_config(&config);
        self.control.channel_control(Table::Primary, channel).set(&data);

        // The chain starts from the primary structure; the engine flips the
        // selection to alternate by itself for each task.
        self.arm(channel, Table::Primary, config.use_burst, config.high_priority);
        Ok(())
    }

    // Per-channel control bits, enable strictly last. The set registers read
    // back as status and writing zero bits to them is a no-op, so
    // read-modify-write leaves the other channels alone.
    fn arm(&self, channel: usize, table: Table, use_burst: bool, high_priority: bool) {
        let regs = self.registers;
        let bit = 1 << channel;

        if use_burst {
            regs.chnl_useburst_set.set(regs.chnl_useburst_set.get() | bit);
        } else {
            regs.chnl_useburst_clr.set(bit);
        }

        // Unmask the channel's request line.
        regs.chnl_req_mask_clr.set(bit);

        match table {
            Table::Primary => regs.chnl_pri_alt_clr.set(bit),
            Table::Alternate => regs.chnl_pri_alt_set.set(regs.chnl_pri_alt_set.get() | bit),
        }

        if high_priority {
            regs.chnl_priority_set.set(regs.chnl_priority_set.get() | bit);
        } else {
            regs.chnl_priority_clr.set(bit);
        }

        self.armed.set(self.armed.get() | bit);
        regs.chnl_enable_set.set(regs.chnl_enable_set.get() | bit);
    }

    /// Stop a channel by clearing its enable bit.
    ///
    /// Takes effect immediately at the register level but may cut a transfer
    /// mid-beat; the data moved up to that point stays moved. Callers that
    /// need a clean stop poll [`Dma::remaining_count`] and accept one final
    /// partial cycle. Required before reconfiguring a still-enabled channel.
    pub fn disable_channel(&self, channel: usize) {
        let bit = 1 << channel;
        self.registers.chnl_enable_clr.set(bit);
        self.armed.set(self.armed.get() & !bit);
    }

    /// Issue a software request on a channel configured for software
    /// triggering. Hardware ignores the write if the channel is disabled or
    /// masked.
    pub fn request(&self, channel: usize) {
        self.registers.chnl_sw_request.set(1 << channel);
    }

    /// Transfers not yet completed in the channel's current cycle, read from
    /// the live control structure. Zero once the engine has rewritten the
    /// cycle control field to stop (cycle complete or structure invalid).
    pub fn remaining_count(&self, channel: usize, table: Table) -> usize {
        let ctrl = self.control.channel_control(table, channel).control();
        if ctrl.read(control::CHNL_CTRL::CYCLE_CTRL) == 0 {
            0
        } else {
            ctrl.read(control::CHNL_CTRL::N_MINUS_1) as usize + 1
        }
    }

    /// Read back one status bit. All of these reflect hardware state, not
    /// software bookkeeping.
    pub fn query_flag(&self, channel: usize, flag: Flag) -> bool {
        let regs = self.registers;
        let bit = 1u32 << channel;
        match flag {
            Flag::MasterEnabled => regs.status.is_set(STATUS::MASTER_ENABLE),
            Flag::GlobalError => regs.err_clr.is_set(ERR_CLR::ERR),
            Flag::ChannelEnabled => regs.chnl_enable_set.get() & bit != 0,
            Flag::ChannelMasked => regs.chnl_req_mask_set.get() & bit != 0,
            Flag::WaitingOnRequest => regs.waitonreq_status.get() & bit != 0,
            Flag::UseBurst => regs.chnl_useburst_set.get() & bit != 0,
            Flag::UsingAlternate => regs.chnl_pri_alt_set.get() & bit != 0,
            Flag::HighPriority => regs.chnl_priority_set.get() & bit != 0,
        }
    }

    /// Clear the sticky bus error flag. Which channel caused the error must
    /// be inferred from application context; the hardware does not record
    /// it.
    pub fn clear_error(&self) {
        self.registers.err_clr.write(ERR_CLR::ERR::SET);
    }

    /// Handle the shared completion/error interrupt.
    ///
    /// There is one line for the whole controller and no per-channel vector,
    /// so the handler scans every armed channel and reports the ones whose
    /// enable bit the engine has cleared. Each completion is reported once.
    /// The bus error flag is deliberately left set for the application to
    /// inspect via [`Flag::GlobalError`] and clear.
    pub fn handle_interrupt(&self) {
        let armed = self.armed.get();
        let enabled = self.registers.chnl_enable_set.get();

        for channel in 0..DMA_CHANNELS {
            let bit = 1 << channel;
            if armed & bit != 0 && enabled & bit == 0 {
                self.armed.set(self.armed.get() & !bit);
                self.clients[channel].map(|client| client.transfer_done(channel));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::control::CHNL_CTRL;
    use super::*;
    use std::boxed::Box;
    use std::cell::Cell;

    // Register word offsets into the fake MMIO block.
    const CFG_W: usize = 1;
    const CTRL_BASE_PTR_W: usize = 2;
    const SW_REQUEST_W: usize = 5;
    const USEBURST_SET_W: usize = 6;
    const USEBURST_CLR_W: usize = 7;
    const REQ_MASK_SET_W: usize = 8;
    const REQ_MASK_CLR_W: usize = 9;
    const ENABLE_SET_W: usize = 10;
    const ENABLE_CLR_W: usize = 11;
    const PRI_ALT_SET_W: usize = 12;
    const PRI_ALT_CLR_W: usize = 13;
    const PRIORITY_CLR_W: usize = 15;
    const ERR_CLR_W: usize = 19;
    const REG_WORDS: usize = 20;

    struct Fixture {
        regs: *mut u32,
        control: &'static DmaControlBlock,
        dma: Dma<'static>,
    }

    // The register structs are plain (volatile) memory underneath, so a
    // leaked word array stands in for the MMIO block. Writes to the
    // write-only and set/clear registers just land in their words; hardware
    // side effects (enable auto-clear, count decrement) are simulated by
    // poking the words and structures directly.
    fn fixture() -> Fixture {
        let mem: &'static mut [u32; REG_WORDS] = Box::leak(Box::new([0u32; REG_WORDS]));
        let regs = mem.as_mut_ptr();
        let control: &'static DmaControlBlock =
            Box::leak(Box::new(DmaControlBlock::const_default()));
        let registers = unsafe { StaticRef::new(regs as *const DmaRegisters) };
        Fixture {
            regs,
            control,
            dma: Dma::new(registers, control),
        }
    }

    fn reg(f: &Fixture, word: usize) -> u32 {
        unsafe { f.regs.add(word).read_volatile() }
    }

    fn poke(f: &Fixture, word: usize, value: u32) {
        unsafe { f.regs.add(word).write_volatile(value) }
    }

    fn word_config(src: u32, dst: u32, cycle_len: usize, arbitration: usize) -> TransferConfig {
        TransferConfig {
            src,
            dst,
            src_inc: AddressIncrement::Word,
            dst_inc: AddressIncrement::NoIncrement,
            size: DataSize::Word,
            mode: TransferMode::Basic,
            cycle_len,
            arbitration,
            src_prot: 0,
            dst_prot: 0,
            use_burst: false,
            high_priority: false,
        }
    }

    // Simulate the engine completing a channel: control word rewritten to
    // stop, enable bit cleared.
    fn complete_channel(f: &Fixture, channel: usize, table: Table) {
        f.control.channel_control(table, channel).clear();
        poke(f, ENABLE_SET_W, reg(f, ENABLE_SET_W) & !(1 << channel));
    }

    #[test]
    fn invalid_config_touches_nothing() {
        let f = fixture();

        let mut config = word_config(0x2000_0000, 0x4000_8000, 0, 1);
        assert_eq!(
            f.dma.configure(3, Table::Primary, &config),
            Err(Error::InvalidParameter)
        );

        config.cycle_len = 16;
        config.arbitration = 32;
        assert_eq!(
            f.dma.configure(3, Table::Primary, &config),
            Err(Error::InvalidParameter)
        );

        for word in 0..REG_WORDS {
            assert_eq!(reg(&f, word), 0, "register word {} written", word);
        }
        let slot = f.control.channel_control(Table::Primary, 3);
        assert_eq!(slot.src_end(), 0);
        assert_eq!(slot.dst_end(), 0);
        assert_eq!(slot.control().get(), 0);
        assert!(!f.dma.query_flag(3, Flag::ChannelEnabled));
    }

    #[test]
    fn configure_basic_word_transfer_on_channel_3() {
        let f = fixture();
        let config = word_config(0x2000_0000, 0x4000_8000, 16, 4);

        assert_eq!(f.dma.configure(3, Table::Primary, &config), Ok(()));

        let slot = f.control.channel_control(Table::Primary, 3);
        assert_eq!(slot.src_end(), 0x2000_0000 + 15 * 4);
        assert_eq!(slot.dst_end(), 0x4000_8000);
        let ctrl = slot.control();
        assert_eq!(ctrl.read(CHNL_CTRL::N_MINUS_1), 15);
        assert_eq!(ctrl.read(CHNL_CTRL::R_POWER), 2);
        assert_eq!(ctrl.read(CHNL_CTRL::CYCLE_CTRL), 1);
        assert_eq!(ctrl.read(CHNL_CTRL::SRC_INC), 2);
        assert_eq!(ctrl.read(CHNL_CTRL::DST_INC), 3);

        let bit = 1 << 3;
        assert_eq!(reg(&f, ENABLE_SET_W), bit);
        assert_eq!(reg(&f, REQ_MASK_CLR_W), bit);
        assert_eq!(reg(&f, PRI_ALT_CLR_W), bit);
        assert_eq!(reg(&f, USEBURST_CLR_W), bit);
        assert_eq!(reg(&f, PRIORITY_CLR_W), bit);
        assert!(f.dma.query_flag(3, Flag::ChannelEnabled));
        assert_eq!(f.dma.remaining_count(3, Table::Primary), 16);
    }

    #[test]
    fn configure_options_land_in_set_registers() {
        let f = fixture();
        let mut config = word_config(0x2000_0000, 0x4000_8000, 8, 2);
        config.use_burst = true;
        config.high_priority = true;

        assert_eq!(f.dma.configure(9, Table::Alternate, &config), Ok(()));

        let bit = 1 << 9;
        assert_eq!(reg(&f, USEBURST_SET_W), bit);
        assert_eq!(reg(&f, PRI_ALT_SET_W), bit);
        assert!(f.dma.query_flag(9, Flag::UseBurst));
        assert!(f.dma.query_flag(9, Flag::UsingAlternate));
        assert!(f.dma.query_flag(9, Flag::HighPriority));

        // The alternate slot, not the primary one, holds the structure.
        assert_eq!(
            f.control.channel_control(Table::Alternate, 9).src_end(),
            0x2000_0000 + 7 * 4
        );
        assert_eq!(f.control.channel_control(Table::Primary, 9).src_end(), 0);
    }

    #[test]
    fn configure_distinct_channels_uses_disjoint_slots() {
        let f = fixture();
        let a = word_config(0x2000_0000, 0x4000_8000, 4, 1);
        let b = word_config(0x2000_4000, 0x4000_9000, 2, 1);

        f.dma.configure(0, Table::Primary, &a).unwrap();
        f.dma.configure(31, Table::Primary, &b).unwrap();

        assert_eq!(reg(&f, ENABLE_SET_W), (1 << 0) | (1 << 31));
        assert_eq!(
            f.control.channel_control(Table::Primary, 0).src_end(),
            0x2000_0000 + 3 * 4
        );
        assert_eq!(
            f.control.channel_control(Table::Primary, 31).src_end(),
            0x2000_4000 + 4
        );
    }

    #[test]
    fn chain_of_three_tasks() {
        let f = fixture();
        const EMPTY: ChannelControl = ChannelControl::const_default();
        let tasks: &'static [ChannelControl; 3] = Box::leak(Box::new([EMPTY; 3]));

        // Two chained tasks plus a final auto-request task, 8 words each.
        for (index, mode) in [
            TransferMode::MemoryScatterGatherAlternate,
            TransferMode::MemoryScatterGatherAlternate,
            TransferMode::AutoRequest,
        ]
        .iter()
        .enumerate()
        {
            let mut config = word_config(
                0x2000_0000 + 0x100 * index as u32,
                0x2000_8000 + 0x100 * index as u32,
                8,
                4,
            );
            config.dst_inc = AddressIncrement::Word;
            config.mode = *mode;
            assert_eq!(f.dma.build_task(index, tasks, &config), Ok(()));
        }
        assert_eq!(
            tasks[2].control().read(CHNL_CTRL::CYCLE_CTRL),
            TransferMode::AutoRequest as u32
        );

        assert_eq!(f.dma.arm_chain(5, tasks), Ok(()));

        let primary = f.control.channel_control(Table::Primary, 5);
        let ctrl = primary.control();
        assert_eq!(ctrl.read(CHNL_CTRL::N_MINUS_1), 11);
        assert_eq!(
            ctrl.read(CHNL_CTRL::CYCLE_CTRL),
            TransferMode::MemoryScatterGatherPrimary as u32
        );
        assert_eq!(ctrl.read(CHNL_CTRL::R_POWER), 2);
        assert_eq!(ctrl.read(CHNL_CTRL::SRC_INC), 2);
        assert_eq!(ctrl.read(CHNL_CTRL::DST_INC), 2);

        let task_base = tasks.as_ptr() as usize as u32;
        assert_eq!(primary.src_end(), task_base.wrapping_add(11 * 4));
        let alt = f.control.channel_control(Table::Alternate, 5);
        assert_eq!(primary.dst_end(), alt.address().wrapping_add(12));

        assert!(f.dma.query_flag(5, Flag::ChannelEnabled));
        assert!(!f.dma.query_flag(5, Flag::UsingAlternate));

        // Engine walks all three tasks, then invalidates the primary
        // structure and drops the enable bit on its own.
        complete_channel(&f, 5, Table::Primary);
        assert_eq!(f.dma.remaining_count(5, Table::Primary), 0);
        assert!(!f.dma.query_flag(5, Flag::ChannelEnabled));
    }

    #[test]
    fn empty_and_oversized_chains_are_rejected() {
        let f = fixture();
        assert_eq!(f.dma.arm_chain(0, &[]), Err(Error::InvalidParameter));

        const EMPTY: ChannelControl = ChannelControl::const_default();
        let tasks: &'static [ChannelControl] =
            Box::leak((0..MAX_CHAIN_TASKS + 1).map(|_| EMPTY).collect::<Box<[_]>>());
        assert_eq!(f.dma.arm_chain(0, tasks), Err(Error::InvalidParameter));

        for word in 0..REG_WORDS {
            assert_eq!(reg(&f, word), 0);
        }
    }

    #[test]
    fn reset_all_clears_channel_bits_and_error() {
        let f = fixture();
        // Pretend earlier traffic left bits set.
        poke(&f, ENABLE_SET_W, 0x0000_F00F);
        poke(&f, REQ_MASK_SET_W, 0xFFFF_FFFF);
        poke(&f, ERR_CLR_W, 1);

        f.dma.reset_all();

        // Every clear register got an all-channels write and the error flag
        // a write-one-to-clear.
        for word in [
            USEBURST_CLR_W,
            REQ_MASK_CLR_W,
            ENABLE_CLR_W,
            PRI_ALT_CLR_W,
            PRIORITY_CLR_W,
        ] {
            assert_eq!(reg(&f, word), 0xFFFF_FFFF);
        }
        assert_eq!(reg(&f, ERR_CLR_W), 1);
        // Controller re-enabled, base pointer registered.
        assert_eq!(reg(&f, CFG_W), 1);
        assert_eq!(reg(&f, CTRL_BASE_PTR_W), f.control.base_address());
    }

    #[test]
    fn software_request_hits_the_request_register() {
        let f = fixture();
        f.dma.request(17);
        assert_eq!(reg(&f, SW_REQUEST_W), 1 << 17);
    }

    #[test]
    fn remaining_count_tracks_the_live_control_word() {
        let f = fixture();
        let config = word_config(0x2000_0000, 0x4000_8000, 16, 1);
        f.dma.configure(2, Table::Primary, &config).unwrap();
        assert_eq!(f.dma.remaining_count(2, Table::Primary), 16);

        // Engine has moved 8 of 16 units.
        let mut mid = config;
        mid.cycle_len = 8;
        f.control
            .channel_control(Table::Primary, 2)
            .set(&ControlData::from_config(&mid));
        assert_eq!(f.dma.remaining_count(2, Table::Primary), 8);

        complete_channel(&f, 2, Table::Primary);
        assert_eq!(f.dma.remaining_count(2, Table::Primary), 0);
    }

    #[test]
    fn master_and_error_flags_read_hardware_registers() {
        let f = fixture();
        assert!(!f.dma.query_flag(0, Flag::MasterEnabled));
        poke(&f, 0, 1); // STATUS.MASTER_ENABLE
        assert!(f.dma.query_flag(0, Flag::MasterEnabled));

        poke(&f, ERR_CLR_W, 1);
        assert!(f.dma.query_flag(0, Flag::GlobalError));
        f.dma.clear_error();
        assert_eq!(reg(&f, ERR_CLR_W), 1); // write-one-to-clear reached hw

        poke(&f, 3, 0x2000_0200); // ALT_CTRL_BASE_PTR
        assert_eq!(f.dma.alternate_base(), 0x2000_0200);
    }

    struct SpyClient {
        seen: Cell<Option<usize>>,
    }

    impl DmaClient for SpyClient {
        fn transfer_done(&self, channel: usize) {
            self.seen.set(Some(channel));
        }
    }

    #[test]
    fn interrupt_reports_each_completion_once() {
        let f = fixture();
        let client: &'static SpyClient = Box::leak(Box::new(SpyClient {
            seen: Cell::new(None),
        }));
        f.dma.set_client(6, client);

        let config = word_config(0x2000_0000, 0x4000_8000, 4, 1);
        f.dma.configure(6, Table::Primary, &config).unwrap();

        // Still running: nothing to report.
        f.dma.handle_interrupt();
        assert_eq!(client.seen.get(), None);

        complete_channel(&f, 6, Table::Primary);
        f.dma.handle_interrupt();
        assert_eq!(client.seen.get(), Some(6));

        client.seen.set(None);
        f.dma.handle_interrupt();
        assert_eq!(client.seen.get(), None);
    }

    #[test]
    fn disable_channel_clears_enable_and_bookkeeping() {
        let f = fixture();
        let config = word_config(0x2000_0000, 0x4000_8000, 4, 1);
        f.dma.configure(1, Table::Primary, &config).unwrap();

        f.dma.disable_channel(1);
        assert_eq!(reg(&f, ENABLE_CLR_W), 1 << 1);

        // A cancelled channel must not be reported as a completion.
        poke(&f, ENABLE_SET_W, 0);
        f.dma.handle_interrupt();
        assert_eq!(f.dma.armed.get(), 0);
    }
}
