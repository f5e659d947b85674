//! Simulated ATA channel for host-side tests.
//!
//! Models the task file of one channel with two drives: the two-deep
//! register FIFO behind the HOB bit, PIO read/write/flush commands in CHS,
//! LBA28 and LBA48 form, DRQ sequencing, interrupt acknowledgement on status
//! reads, and injectable faults. Sector storage is sparse; sectors never
//! written read back a fixed per-sector pattern.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::consts::*;
use crate::host::Host;
use crate::port::PortIo;
use crate::regs::AtaStatus;
use crate::types::{ChannelConfig, ChsGeometry};

pub struct TestHost;

impl Host for TestHost {
    fn yield_now() {
        std::thread::yield_now();
    }

    fn delay_ms(_ms: u32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortOp {
    InB(u16, u8),
    OutB(u16, u8),
    InW(u16, u16),
    OutW(u16, u16),
}

/// A command as the drive understood it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Issued {
    pub command: u8,
    pub drive: u8,
    pub lba: u64,
    pub count: u64,
}

const ERR_ABRT: u8 = 0x04;
const ERR_IDNF: u8 = 0x10;
const ERR_UNC: u8 = 0x40;

/// Default capacity of each simulated drive, in sectors.
pub const SIM_SECTORS: u64 = 4096;
/// Default CHS geometry used to decode CHS commands.
pub const SIM_GEOMETRY: ChsGeometry = ChsGeometry::new(63, 1024, 16);

/// Contents of a sector that was never written.
pub fn pattern(lba: u64) -> [u8; SECTOR_SIZE] {
    let mut sector = [0u8; SECTOR_SIZE];
    for (i, byte) in sector.iter_mut().enumerate() {
        *byte = (lba as u8).wrapping_mul(31) ^ (i as u8) ^ ((i >> 8) as u8);
    }
    sector
}

struct Drive {
    sectors: u64,
    geometry: ChsGeometry,
    storage: HashMap<u64, [u8; SECTOR_SIZE]>,
}

impl Drive {
    fn new() -> Self {
        Self {
            sectors: SIM_SECTORS,
            geometry: SIM_GEOMETRY,
            storage: HashMap::new(),
        }
    }

    fn sector(&self, lba: u64) -> [u8; SECTOR_SIZE] {
        self.storage.get(&lba).copied().unwrap_or_else(|| pattern(lba))
    }
}

struct Xfer {
    drive: usize,
    write: bool,
    lba: u64,
    left: u64,
    index: u64,
    word: usize,
    buf: [u8; SECTOR_SIZE],
    fault: Option<u64>,
}

struct State {
    config: ChannelConfig,
    control: u8,
    error: u8,
    err: bool,
    /// `[current, previous]` for SECCOUNT, LBA0, LBA1, LBA2
    fifo: [[u8; 2]; 4],
    devsel: u8,
    drives: [Drive; 2],
    xfer: Option<Xfer>,
    busy_reads: usize,
    forced_status: Option<u8>,
    irq: bool,
    fault: Option<u64>,
    fail_flush: bool,
    violations: usize,
    commands: Vec<Issued>,
    port_log: Vec<PortOp>,
}

impl State {
    fn selected(&self) -> usize {
        ((self.devsel >> 4) & 1) as usize
    }

    fn status(&self) -> u8 {
        if self.busy_reads > 0 {
            return AtaStatus::BUSY.bits();
        }
        if let Some(status) = self.forced_status {
            return status;
        }
        let mut status = AtaStatus::DRIVE_READY | AtaStatus::DRIVE_SEEK_COMPLETE;
        if self.err {
            status |= AtaStatus::ERROR;
        }
        if self.xfer.is_some() {
            status |= AtaStatus::DATA_REQUEST_READY;
        }
        status.bits()
    }

    fn interrupt(&mut self) {
        if self.control & 0x02 == 0 {
            self.irq = true;
        }
    }

    fn fail(&mut self, code: u8) {
        self.err = true;
        self.error = code;
        self.xfer = None;
        self.interrupt();
    }

    fn hob(&self) -> usize {
        (self.control >> 7) as usize
    }

    fn read(&mut self, offset: u16) -> u8 {
        match offset {
            1 => self.error,
            2..=5 => self.fifo[offset as usize - 2][self.hob()],
            6 => self.devsel,
            7 => {
                let status = self.status();
                if self.busy_reads > 0 {
                    self.busy_reads -= 1;
                }
                self.irq = false;
                status
            }
            _ => 0xFF,
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset {
            2..=5 => {
                let reg = &mut self.fifo[offset as usize - 2];
                reg[1] = reg[0];
                reg[0] = value;
            }
            6 => {
                if self.xfer.is_some() {
                    self.violations += 1;
                }
                self.devsel = value;
            }
            7 => self.command(value),
            _ => {}
        }
    }

    /// Starting sector and count of the command in the task file.
    fn decode(&self, ext: bool) -> (u64, u64) {
        let cur = |i: usize| self.fifo[i][0] as u64;
        let prev = |i: usize| self.fifo[i][1] as u64;
        if ext {
            let lba = cur(1) | cur(2) << 8 | cur(3) << 16 | prev(1) << 24 | prev(2) << 32 | prev(3) << 40;
            let count = cur(0) | prev(0) << 8;
            (lba, if count == 0 { 65536 } else { count })
        } else {
            let count = if cur(0) == 0 { 256 } else { cur(0) };
            if self.devsel & 0x40 != 0 {
                let lba = cur(1) | cur(2) << 8 | cur(3) << 16 | ((self.devsel & 0x0F) as u64) << 24;
                (lba, count)
            } else {
                let geometry = &self.drives[self.selected()].geometry;
                let cylinder = cur(2) | cur(3) << 8;
                let head = (self.devsel & 0x0F) as u64;
                let lba = (cylinder * geometry.heads as u64 + head) * geometry.sectors_per_track as u64
                    + cur(1).saturating_sub(1);
                (lba, count)
            }
        }
    }

    fn command(&mut self, command: u8) {
        if self.xfer.is_some() {
            self.violations += 1;
        }
        self.err = false;
        self.error = 0;
        self.xfer = None;

        let drive = self.selected();
        let (write, ext) = match command {
            ATA_CMD_READ_PIO => (false, false),
            ATA_CMD_READ_PIO_EXT => (false, true),
            ATA_CMD_WRITE_PIO => (true, false),
            ATA_CMD_WRITE_PIO_EXT => (true, true),
            ATA_CMD_CACHE_FLUSH | ATA_CMD_CACHE_FLUSH_EXT => {
                self.commands.push(Issued { command, drive: drive as u8, lba: 0, count: 0 });
                if self.fail_flush {
                    self.fail_flush = false;
                    self.fail(ERR_ABRT);
                } else {
                    self.interrupt();
                }
                return;
            }
            _ => {
                self.fail(ERR_ABRT);
                return;
            }
        };

        let (lba, count) = self.decode(ext);
        self.commands.push(Issued { command, drive: drive as u8, lba, count });
        if lba + count > self.drives[drive].sectors {
            self.fail(ERR_IDNF);
            return;
        }

        let mut xfer = Xfer {
            drive,
            write,
            lba,
            left: count,
            index: 0,
            word: 0,
            buf: [0; SECTOR_SIZE],
            fault: self.fault.take(),
        };
        if write {
            self.xfer = Some(xfer);
        } else if xfer.fault == Some(0) {
            self.fail(ERR_UNC);
        } else {
            xfer.buf = self.drives[drive].sector(lba);
            self.xfer = Some(xfer);
            self.interrupt();
        }
    }

    fn read_data(&mut self) -> u16 {
        let Some(xfer) = self.xfer.as_mut().filter(|x| !x.write) else {
            return 0;
        };
        let word = u16::from_le_bytes([xfer.buf[xfer.word * 2], xfer.buf[xfer.word * 2 + 1]]);
        xfer.word += 1;
        if xfer.word == SECTOR_WORDS {
            xfer.word = 0;
            xfer.left -= 1;
            xfer.lba += 1;
            xfer.index += 1;
            if xfer.left == 0 {
                self.xfer = None;
            } else if xfer.fault == Some(xfer.index) {
                self.fail(ERR_UNC);
            } else {
                xfer.buf = self.drives[xfer.drive].sector(xfer.lba);
                self.interrupt();
            }
        }
        word
    }

    fn write_data(&mut self, value: u16) {
        let Some(xfer) = self.xfer.as_mut().filter(|x| x.write) else {
            return;
        };
        xfer.buf[xfer.word * 2..xfer.word * 2 + 2].copy_from_slice(&value.to_le_bytes());
        xfer.word += 1;
        if xfer.word < SECTOR_WORDS {
            return;
        }

        if xfer.fault == Some(xfer.index) {
            self.fail(ERR_UNC);
            return;
        }
        self.drives[xfer.drive].storage.insert(xfer.lba, xfer.buf);
        xfer.word = 0;
        xfer.left -= 1;
        xfer.lba += 1;
        xfer.index += 1;
        if xfer.left == 0 {
            self.xfer = None;
        }
        self.interrupt();
    }
}

/// One simulated channel with a master and a slave drive.
pub struct SimChannel {
    state: Mutex<State>,
}

impl SimChannel {
    /// Primary legacy channel.
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::primary())
    }

    pub fn with_config(config: ChannelConfig) -> Self {
        Self {
            state: Mutex::new(State {
                config,
                control: 0,
                error: 0,
                err: false,
                fifo: [[0; 2]; 4],
                devsel: 0xA0,
                drives: [Drive::new(), Drive::new()],
                xfer: None,
                busy_reads: 0,
                forced_status: None,
                irq: false,
                fault: None,
                fail_flush: false,
                violations: 0,
                commands: Vec::new(),
                port_log: Vec::new(),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn config(&self) -> ChannelConfig {
        self.state().config
    }

    pub fn control(&self) -> u8 {
        self.state().control
    }

    pub fn set_sectors(&self, drive: usize, sectors: u64) {
        self.state().drives[drive].sectors = sectors;
    }

    pub fn sector(&self, drive: usize, lba: u64) -> [u8; SECTOR_SIZE] {
        self.state().drives[drive].sector(lba)
    }

    pub fn set_sector(&self, drive: usize, lba: u64, data: [u8; SECTOR_SIZE]) {
        self.state().drives[drive].storage.insert(lba, data);
    }

    /// The next read/write command fails at its `sector`-th sector (0-based).
    /// A failing write sector is never committed.
    pub fn inject_fault(&self, sector: u64) {
        self.state().fault = Some(sector);
    }

    pub fn inject_flush_failure(&self) {
        self.state().fail_flush = true;
    }

    /// Report BSY on the next `reads` status reads.
    pub fn set_busy_reads(&self, reads: usize) {
        self.state().busy_reads = reads;
    }

    pub fn busy_reads_left(&self) -> usize {
        self.state().busy_reads
    }

    pub fn force_status(&self, status: AtaStatus) {
        self.state().forced_status = Some(status.bits());
    }

    pub fn force_error(&self, error: u8) {
        self.state().error = error;
    }

    pub fn raise_irq(&self) {
        self.state().irq = true;
    }

    pub fn irq_pending(&self) -> bool {
        self.state().irq
    }

    /// Register writes made while a data phase was still open.
    pub fn violations(&self) -> usize {
        self.state().violations
    }

    pub fn commands(&self) -> Vec<Issued> {
        self.state().commands.clone()
    }

    /// Data commands only, without cache flushes.
    pub fn data_commands(&self) -> Vec<Issued> {
        self.commands()
            .into_iter()
            .filter(|c| !matches!(c.command, ATA_CMD_CACHE_FLUSH | ATA_CMD_CACHE_FLUSH_EXT))
            .collect()
    }

    pub fn port_log(&self) -> Vec<PortOp> {
        self.state().port_log.clone()
    }

    pub fn clear_port_log(&self) {
        self.state().port_log.clear();
    }
}

impl Default for SimChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl PortIo for SimChannel {
    fn inb(&self, port: u16) -> u8 {
        let mut state = self.state();
        let io = state.config.io_base;
        let ctrl = state.config.ctrl_base + ATA_CTRL_REG_OFFSET;
        let value = if (io..io + 8).contains(&port) {
            state.read(port - io)
        } else if port == ctrl {
            state.status()
        } else {
            0xFF
        };
        state.port_log.push(PortOp::InB(port, value));
        value
    }

    fn outb(&self, port: u16, value: u8) {
        let mut state = self.state();
        let io = state.config.io_base;
        let ctrl = state.config.ctrl_base + ATA_CTRL_REG_OFFSET;
        state.port_log.push(PortOp::OutB(port, value));
        if (io..io + 8).contains(&port) {
            state.write(port - io, value);
        } else if port == ctrl {
            state.control = value;
        }
    }

    fn inw(&self, port: u16) -> u16 {
        let mut state = self.state();
        let value = if port == state.config.io_base { state.read_data() } else { 0xFFFF };
        state.port_log.push(PortOp::InW(port, value));
        value
    }

    fn outw(&self, port: u16, value: u16) {
        let mut state = self.state();
        state.port_log.push(PortOp::OutW(port, value));
        if port == state.config.io_base {
            state.write_data(value);
        }
    }
}
