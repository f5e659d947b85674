//! Translation of linear sector indices into task-file values.

use crate::consts::*;
use crate::types::{AddressingMode, ChsGeometry};

/// Register values describing the starting sector of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskFile {
    /// `LBA0..=LBA5`. In CHS mode: sector, cylinder low, cylinder high.
    pub lba: [u8; 6],
    /// Low nibble of the drive select register
    pub head: u8,
}

/// Cylinder/head/sector triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chs {
    pub cylinder: u16,
    pub head: u8,
    pub sector: u8,
}

impl Chs {
    pub fn from_lba(lba: u64, geometry: &ChsGeometry) -> Self {
        let spt = geometry.sectors_per_track as u64;
        let heads = geometry.heads as u64;
        let sector = (lba % spt + 1) as u8;
        let cylinder = (lba + 1 - sector as u64) / (geometry.tracks as u64 * heads);
        let head = ((lba / spt) % heads) as u8;
        Self {
            cylinder: cylinder as u16,
            head,
            sector,
        }
    }
}

/// Encode `lba` for a device using `mode`.
pub fn encode(mode: &AddressingMode, lba: u64) -> TaskFile {
    match mode {
        AddressingMode::Lba48 => {
            let mut lba_io = [0u8; 6];
            for (i, byte) in lba_io.iter_mut().enumerate() {
                *byte = (lba >> (8 * i)) as u8;
            }
            TaskFile { lba: lba_io, head: 0 }
        }
        AddressingMode::Lba28 => TaskFile {
            lba: [lba as u8, (lba >> 8) as u8, (lba >> 16) as u8, 0, 0, 0],
            head: ((lba >> 24) & 0x0F) as u8,
        },
        AddressingMode::Chs(geometry) => {
            let chs = Chs::from_lba(lba, geometry);
            TaskFile {
                lba: [chs.sector, chs.cylinder as u8, (chs.cylinder >> 8) as u8, 0, 0, 0],
                head: chs.head & 0x0F,
            }
        }
    }
}

/// Reassemble the 48-bit sector index from its six register bytes.
pub fn decode_lba48(lba_io: &[u8; 6]) -> u64 {
    lba_io
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &byte)| acc | (byte as u64) << (8 * i))
}

/// Largest sector count one command can carry in `mode`.
pub fn protocol_max_sectors(mode: &AddressingMode) -> u64 {
    if mode.is_lba48() {
        ATA_LBA48_MAX_SECTORS
    } else {
        ATA_LBA28_MAX_SECTORS
    }
}

/// Per-command sector ceiling: the protocol limit, capped for fairness.
pub fn max_sectors(mode: &AddressingMode) -> u64 {
    protocol_max_sectors(mode).min(ATA_IO_MAX_SECTORS)
}
