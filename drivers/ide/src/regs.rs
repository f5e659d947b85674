//! Register access layer.
//!
//! Maps logical register indices onto the command and control blocks of a
//! channel. Indices `SECCOUNT1..=LBA5` alias `SECCOUNT0..=LBA2`; every access
//! to them is bracketed by setting HOB in the control register and restoring
//! the stored nIEN state afterwards, so callers never see the aliasing.

use core::sync::atomic::{AtomicBool, Ordering};

use bitflags::bitflags;

use crate::consts::*;
use crate::port::PortIo;
use crate::types::ChannelConfig;

bitflags! {
    /// Status / alternate status register.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct AtaStatus: u8 {
        const BUSY                 = 0x80;
        const DRIVE_READY          = 0x40;
        const DRIVE_WRITE_FAULT    = 0x20;
        const DRIVE_SEEK_COMPLETE  = 0x10;
        const DATA_REQUEST_READY   = 0x08;
        const CORRECTED_DATA       = 0x04;
        const INDEX                = 0x02;
        const ERROR                = 0x01;
    }
}

bitflags! {
    /// Device control register.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct AtaControl: u8 {
        /// Interrupts disabled (nIEN)
        const NIEN = 1 << 1;
        /// Software reset
        const SRST = 1 << 2;
        /// High order byte of the 48-bit registers
        const HOB  = 1 << 7;
    }
}

bitflags! {
    /// Drive/head select register.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct DriveSelect: u8 {
        /// Obsolete bits that must be set
        const BASE  = (1 << 5) | (1 << 7);
        const LBA   = 1 << 6;
        /// Drive 1 (slave)
        const DRIVE = 1 << 4;
        /// Head number or LBA bits 24-27
        const HEAD  = 0x0F;
    }
}

impl DriveSelect {
    pub fn new(drive: u8, lba: bool, head: u8) -> Self {
        let mut sel = DriveSelect::BASE | DriveSelect::from_bits_retain(head & DriveSelect::HEAD.bits());
        if drive != 0 {
            sel |= DriveSelect::DRIVE;
        }
        if lba {
            sel |= DriveSelect::LBA;
        }
        sel
    }
}

fn is_overlapped(reg: u8) -> bool {
    (ATA_REG_SECCOUNT1..=ATA_REG_LBA5).contains(&reg)
}

/// Register file of one channel.
pub struct Registers<P> {
    io: P,
    io_base: u16,
    ctrl_base: u16,
    nien: AtomicBool,
}

impl<P: PortIo> Registers<P> {
    pub fn new(io: P, config: &ChannelConfig) -> Self {
        Self {
            io,
            io_base: config.io_base,
            ctrl_base: config.ctrl_base,
            nien: AtomicBool::new(false),
        }
    }

    /// Physical port of a logical register, `None` past `DEVADDRESS`.
    pub fn port(&self, reg: u8) -> Option<u16> {
        match reg {
            r if r < ATA_REG_SECCOUNT1 => Some(self.io_base + r as u16),
            r if r < ATA_REG_CONTROL => Some(self.io_base + (r - ATA_REG_OVERLAP_DELTA) as u16),
            r if r <= ATA_REG_DEVADDRESS => {
                Some(self.ctrl_base + ATA_CTRL_REG_OFFSET + (r - ATA_REG_CONTROL) as u16)
            }
            _ => None,
        }
    }

    /// Control register value that only reflects the stored nIEN state.
    fn control_bits(&self) -> AtaControl {
        if self.nien.load(Ordering::Relaxed) {
            AtaControl::NIEN
        } else {
            AtaControl::empty()
        }
    }

    fn write_control(&self, value: AtaControl) {
        if let Some(port) = self.port(ATA_REG_CONTROL) {
            self.io.outb(port, value.bits());
        }
    }

    /// Run `access` on the physical port of `reg`, with HOB raised around it
    /// when `reg` is one of the overlapped registers.
    fn access<R>(&self, reg: u8, access: impl FnOnce(&P, u16) -> R) -> Option<R> {
        let port = self.port(reg)?;
        let overlapped = is_overlapped(reg);
        if overlapped {
            self.write_control(AtaControl::HOB | self.control_bits());
        }
        let out = access(&self.io, port);
        if overlapped {
            self.write_control(self.control_bits());
        }
        Some(out)
    }

    pub fn read_byte(&self, reg: u8) -> u8 {
        self.access(reg, |io, port| io.inb(port)).unwrap_or(0)
    }

    pub fn write_byte(&self, reg: u8, value: u8) {
        self.access(reg, |io, port| io.outb(port, value));
    }

    pub fn read_word(&self, reg: u8) -> u16 {
        self.access(reg, |io, port| io.inw(port)).unwrap_or(0)
    }

    pub fn write_word(&self, reg: u8, value: u16) {
        self.access(reg, |io, port| io.outw(port, value));
    }

    /// Read `words` words from `reg`. With a destination, word `i` lands in
    /// `dst[2i..2i+2]` little-endian; without one the words are discarded.
    pub fn read_words(&self, reg: u8, dst: Option<&mut [u8]>, words: usize) {
        self.access(reg, |io, port| match dst {
            Some(dst) => {
                let mut chunks = dst.chunks_exact_mut(2);
                for _ in 0..words {
                    let word = io.inw(port);
                    if let Some(chunk) = chunks.next() {
                        chunk.copy_from_slice(&word.to_le_bytes());
                    }
                }
            }
            None => {
                for _ in 0..words {
                    io.inw(port);
                }
            }
        });
    }

    /// Write every whole word of `src` to `reg`.
    pub fn write_words(&self, reg: u8, src: &[u8]) {
        self.access(reg, |io, port| {
            for chunk in src.chunks_exact(2) {
                io.outw(port, u16::from_le_bytes([chunk[0], chunk[1]]));
            }
        });
    }

    pub fn status(&self) -> AtaStatus {
        AtaStatus::from_bits_retain(self.read_byte(ATA_REG_STATUS))
    }

    /// Alternate status; reading it has no side effects on the device.
    pub fn alt_status(&self) -> AtaStatus {
        AtaStatus::from_bits_retain(self.read_byte(ATA_REG_ALTSTATUS))
    }

    pub fn nien(&self) -> bool {
        self.nien.load(Ordering::Relaxed)
    }

    /// Store the interrupt suppression flag and push it to the device.
    pub fn set_nien(&self, disabled: bool) {
        self.nien.store(disabled, Ordering::Relaxed);
        self.write_control(self.control_bits());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimChannel, PortOp};

    fn regs(sim: &SimChannel) -> Registers<&SimChannel> {
        Registers::new(sim, &sim.config())
    }

    #[test]
    fn logical_registers_map_to_ports() {
        let sim = SimChannel::new();
        let regs = regs(&sim);
        assert_eq!(regs.port(ATA_REG_DATA), Some(0x1F0));
        assert_eq!(regs.port(ATA_REG_COMMAND), Some(0x1F7));
        assert_eq!(regs.port(ATA_REG_SECCOUNT1), Some(0x1F2));
        assert_eq!(regs.port(ATA_REG_LBA5), Some(0x1F5));
        assert_eq!(regs.port(ATA_REG_CONTROL), Some(0x3F6));
        assert_eq!(regs.port(ATA_REG_DEVADDRESS), Some(0x3F7));
        assert_eq!(regs.port(0x0E), None);
    }

    #[test]
    fn overlapped_access_is_bracketed_by_hob() {
        let sim = SimChannel::new();
        let regs = regs(&sim);
        regs.set_nien(true);
        sim.clear_port_log();

        regs.write_byte(ATA_REG_LBA4, 0x5A);
        assert_eq!(
            sim.port_log(),
            vec![
                PortOp::OutB(0x3F6, 0x82),
                PortOp::OutB(0x1F4, 0x5A),
                PortOp::OutB(0x3F6, 0x02),
            ]
        );

        sim.clear_port_log();
        regs.write_byte(ATA_REG_LBA1, 0x11);
        assert_eq!(sim.port_log(), vec![PortOp::OutB(0x1F4, 0x11)]);
    }

    #[test]
    fn hob_reads_return_the_high_byte() {
        let sim = SimChannel::new();
        let regs = regs(&sim);
        regs.write_byte(ATA_REG_LBA3, 0xAB);
        regs.write_byte(ATA_REG_LBA0, 0xCD);
        assert_eq!(regs.read_byte(ATA_REG_LBA0), 0xCD);
        assert_eq!(regs.read_byte(ATA_REG_LBA3), 0xAB);
        // HOB never stays set after the bracketed access
        assert_eq!(regs.read_byte(ATA_REG_LBA0), 0xCD);
    }

    #[test]
    fn control_restore_keeps_interrupts_enabled_state() {
        let sim = SimChannel::new();
        let regs = regs(&sim);
        regs.set_nien(false);
        sim.clear_port_log();
        regs.read_byte(ATA_REG_SECCOUNT1);
        assert_eq!(sim.port_log().last(), Some(&PortOp::OutB(0x3F6, 0x00)));
        assert!(!regs.nien());
    }

    #[test]
    fn drive_select_bits() {
        assert_eq!(DriveSelect::new(0, true, 0x0F).bits(), 0xEF);
        assert_eq!(DriveSelect::new(1, false, 0x03).bits(), 0xB3);
        assert_eq!(DriveSelect::new(1, true, 0x1F).bits(), 0xFF);
    }
}
