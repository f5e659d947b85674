//! One physical command/status bus and the drives hanging off it.

use heapless::Vec as HVec;
use log::trace;

use crate::consts::*;
use crate::host::Host;
use crate::port::PortIo;
use crate::regs::{AtaStatus, DriveSelect, Registers};
use crate::sync::{ChannelGuard, ChannelLock, Completion};
use crate::types::{ChannelConfig, DeviceId};

pub struct Channel<P, H: Host> {
    config: ChannelConfig,
    regs: Registers<P>,
    lock: ChannelLock<H>,
    completion: Completion<H>,
    drives: HVec<DeviceId, 2>,
}

impl<P: PortIo, H: Host> Channel<P, H> {
    pub(crate) fn new(config: ChannelConfig, io: P) -> Self {
        Self {
            regs: Registers::new(io, &config),
            config,
            lock: ChannelLock::new(),
            completion: Completion::new(),
            drives: HVec::new(),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn irq_line(&self) -> u8 {
        self.config.irq_line
    }

    pub fn regs(&self) -> &Registers<P> {
        &self.regs
    }

    pub fn lock(&self) -> &ChannelLock<H> {
        &self.lock
    }

    pub fn completion(&self) -> &Completion<H> {
        &self.completion
    }

    /// Devices attached to this channel, master first if both are present.
    pub fn drives(&self) -> &[DeviceId] {
        &self.drives
    }

    pub(crate) fn attach(&mut self, device: DeviceId) -> Result<(), DeviceId> {
        self.drives.push(device)
    }

    pub fn irq_disabled(&self) -> bool {
        self.regs.nien()
    }

    /// Set or clear nIEN. Waits for the channel lock, since the control
    /// register also carries the HOB bit of an access in flight.
    pub fn set_irq_disabled(&self, disabled: bool) {
        let _guard = self.lock.acquire();
        self.regs.set_nien(disabled);
    }

    /// Point the channel at `drive` and write the head/LBA-high nibble.
    ///
    /// Waits for the drive to settle when the selection actually changes.
    pub(crate) fn select(&self, guard: &mut ChannelGuard<'_>, drive: u8, lba: bool, head: u8) {
        let sel = DriveSelect::new(drive, lba, head);
        trace!("ide {:#x}: select {:#04x}", self.config.io_base, sel.bits());
        self.regs.write_byte(ATA_REG_HDDEVSEL, sel.bits());
        if guard.selected != Some(drive) {
            guard.selected = Some(drive);
            H::delay_ms(DRIVE_SELECT_DELAY_MS);
        }
    }

    /// Read the status register so the channel drops its interrupt line.
    pub fn drain_status(&self) -> AtaStatus {
        self.regs.status()
    }
}
