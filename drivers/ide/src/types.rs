use core::fmt;

use crate::consts::*;
use crate::error::{IdeError, IdeResult};

/// Index of a channel inside a [`Controller`](crate::Controller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub(crate) usize);

/// Index of a device inside a [`Controller`](crate::Controller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub(crate) usize);

impl ChannelId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl DeviceId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind of device answering on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Fixed-block ATA disk
    Ata,
    /// Packet (ATAPI) device; only recognised so it can be refused
    Atapi,
}

/// Legacy cylinder/head/sector geometry reported by IDENTIFY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChsGeometry {
    /// Sectors per track
    pub sectors_per_track: u16,
    /// Tracks per platter side
    pub tracks: u16,
    /// Heads (platter sides)
    pub heads: u16,
}

impl ChsGeometry {
    pub const fn new(sectors_per_track: u16, tracks: u16, heads: u16) -> Self {
        Self { sectors_per_track, tracks, heads }
    }

    /// Capacity in sectors implied by the geometry.
    pub fn sectors(&self) -> u64 {
        self.sectors_per_track as u64 * self.tracks as u64 * self.heads as u64
    }

    fn validate(&self) -> IdeResult<()> {
        if self.sectors_per_track == 0 || self.tracks == 0 || self.heads == 0 {
            return Err(IdeError::InvalidGeometry);
        }
        if self.heads > ATA_CHS_MAX_HEADS {
            return Err(IdeError::InvalidGeometry);
        }
        Ok(())
    }
}

/// How sectors are addressed on the wire. Fixed once the drive is identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Chs(ChsGeometry),
    Lba28,
    Lba48,
}

impl AddressingMode {
    pub fn is_lba48(&self) -> bool {
        matches!(self, AddressingMode::Lba48)
    }

    pub fn is_chs(&self) -> bool {
        matches!(self, AddressingMode::Chs(_))
    }
}

/// Precomputed description of one drive, as produced by enumeration.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Drive select index: 0 = master, 1 = slave
    pub drive: u8,
    pub class: DeviceClass,
    pub addressing: AddressingMode,
    /// Capacity in 512-byte sectors
    pub sectors: u64,
    model: [u8; 40],
}

impl DeviceDescriptor {
    /// Describe a fixed-block disk.
    pub const fn ata(drive: u8, addressing: AddressingMode, sectors: u64) -> Self {
        Self {
            drive,
            class: DeviceClass::Ata,
            addressing,
            sectors,
            model: [b' '; 40],
        }
    }

    /// Describe a CHS-only disk; the capacity follows from the geometry.
    pub fn chs(drive: u8, geometry: ChsGeometry) -> Self {
        Self::ata(drive, AddressingMode::Chs(geometry), geometry.sectors())
    }

    /// Describe a packet device. It can be attached but never opened.
    pub const fn atapi(drive: u8) -> Self {
        Self {
            drive,
            class: DeviceClass::Atapi,
            addressing: AddressingMode::Lba28,
            sectors: 0,
            model: [b' '; 40],
        }
    }

    /// Attach the model string (already byte-swapped from IDENTIFY data).
    pub fn with_model(mut self, model: &[u8]) -> Self {
        let len = model.len().min(self.model.len());
        self.model = [b' '; 40];
        self.model[..len].copy_from_slice(&model[..len]);
        self
    }

    /// Model string with padding and NULs trimmed.
    pub fn model(&self) -> &str {
        let end = self.model.iter().position(|&b| b == 0).unwrap_or(self.model.len());
        core::str::from_utf8(&self.model[..end])
            .unwrap_or("")
            .trim()
    }

    pub fn size_bytes(&self) -> u64 {
        self.sectors.saturating_mul(SECTOR_SIZE as u64)
    }

    /// devfs-style node name for the `index`-th device of `class`.
    ///
    /// Disks are `hd` followed by `a`..`z`, `aa`, `ab`, ...; packet devices
    /// are `sr0`, `sr1`, ... Each class is numbered on its own.
    pub fn node_name(class: DeviceClass, index: usize) -> NodeName {
        match class {
            DeviceClass::Ata => NodeName::lettered(b"hd", index),
            DeviceClass::Atapi => NodeName::numbered(b"sr", index),
        }
    }

    pub(crate) fn validate(&self) -> IdeResult<()> {
        if self.drive > 1 {
            return Err(IdeError::InvalidParameter);
        }
        let limit = match self.addressing {
            AddressingMode::Chs(geometry) => {
                geometry.validate()?;
                geometry.sectors()
            }
            AddressingMode::Lba28 => ATA_LBA28_CAPACITY,
            AddressingMode::Lba48 => ATA_LBA48_CAPACITY,
        };
        if self.sectors > limit {
            return Err(IdeError::CapacityOutOfRange);
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("drive", &self.drive)
            .field("class", &self.class)
            .field("addressing", &self.addressing)
            .field("sectors", &self.sectors)
            .field("model", &self.model())
            .finish()
    }
}

/// Fixed-capacity node name, so naming needs no allocation.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NodeName {
    bytes: [u8; 24],
    len: usize,
}

impl NodeName {
    fn with_suffix(prefix: &[u8; 2], digits: &mut [u8], len: usize) -> Self {
        digits[..len].reverse();
        let mut name = NodeName { bytes: [0; 24], len: 2 + len };
        name.bytes[..2].copy_from_slice(prefix);
        name.bytes[2..2 + len].copy_from_slice(&digits[..len]);
        name
    }

    /// Bijective base-26 suffix: 0 is `a`, 25 is `z`, 26 is `aa`.
    fn lettered(prefix: &[u8; 2], index: usize) -> Self {
        let mut letters = [0u8; 20];
        let mut len = 0;
        let mut n = index as u128 + 1;
        while n > 0 {
            n -= 1;
            letters[len] = b'a' + (n % 26) as u8;
            n /= 26;
            len += 1;
        }
        Self::with_suffix(prefix, &mut letters, len)
    }

    fn numbered(prefix: &[u8; 2], index: usize) -> Self {
        let mut digits = [0u8; 20];
        let mut len = 0;
        let mut n = index;
        loop {
            digits[len] = b'0' + (n % 10) as u8;
            n /= 10;
            len += 1;
            if n == 0 {
                break;
            }
        }
        Self::with_suffix(prefix, &mut digits, len)
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len]).unwrap_or("")
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

/// Port assignment of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Command block base (BAR0 / BAR2)
    pub io_base: u16,
    /// Control block base (BAR1 / BAR3); the control register sits at +2
    pub ctrl_base: u16,
    /// Bus master IDE base, 0 when absent
    pub bmide_base: u16,
    /// Interrupt line the channel raises
    pub irq_line: u8,
}

impl ChannelConfig {
    /// Legacy primary channel.
    pub const fn primary() -> Self {
        Self {
            io_base: IDE_PRI_IO_BASE,
            ctrl_base: IDE_PRI_CTRL_BASE,
            bmide_base: 0,
            irq_line: IDE_PRI_IRQ,
        }
    }

    /// Legacy secondary channel.
    pub const fn secondary() -> Self {
        Self {
            io_base: IDE_SEC_IO_BASE,
            ctrl_base: IDE_SEC_CTRL_BASE,
            bmide_base: 0,
            irq_line: IDE_SEC_IRQ,
        }
    }

    /// Resolve the ports of channel `index` (0 primary, 1 secondary) of a PCI
    /// IDE function from its programming interface and BAR0..=BAR4.
    ///
    /// Native-mode channels take their bases from the BARs, falling back to
    /// the legacy ports when a BAR reads as zero. Compatibility-mode channels
    /// always use the legacy ports.
    pub fn from_pci(index: usize, prog_if: u8, bars: [u32; 5], irq_line: u8) -> IdeResult<Self> {
        let (legacy, native_bit, io_bar, ctrl_bar) = match index {
            0 => (Self::primary(), PROG_IF_PRI_NATIVE, bars[0], bars[1]),
            1 => (Self::secondary(), PROG_IF_SEC_NATIVE, bars[2], bars[3]),
            _ => return Err(IdeError::InvalidParameter),
        };

        let native = prog_if & native_bit != 0;
        let pick = |bar: u32, fallback: u16| {
            if native && bar != 0 {
                (bar & PCI_BAR_IO_MASK) as u16
            } else {
                fallback
            }
        };

        let bmide_base = if prog_if & PROG_IF_BUS_MASTER != 0 && bars[4] != 0 {
            (bars[4] & PCI_BAR_IO_MASK) as u16 + if index == 1 { 8 } else { 0 }
        } else {
            0
        };

        Ok(Self {
            io_base: pick(io_bar, legacy.io_base),
            ctrl_base: pick(ctrl_bar, legacy.ctrl_base),
            bmide_base,
            irq_line: if native { irq_line } else { legacy.irq_line },
        })
    }
}

/// Programming interface with every switchable channel moved to native mode.
pub fn native_prog_if(prog_if: u8) -> u8 {
    let mut out = prog_if;
    if prog_if & PROG_IF_PRI_SWITCHABLE != 0 {
        out |= PROG_IF_PRI_NATIVE;
    }
    if prog_if & PROG_IF_SEC_SWITCHABLE != 0 {
        out |= PROG_IF_SEC_NATIVE;
    }
    out
}

/// Which interrupt dispatcher the controller's channels are wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqMode {
    /// One shared line for both channels (PCI native mode)
    PciNative,
    /// One line per channel (ISA compatibility mode)
    Compat,
}
