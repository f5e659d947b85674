//! ATA task-file constants shared by the register layer and the transfer engine.

/// Bytes per sector. All transfers are framed in units of this size.
pub const SECTOR_SIZE: usize = 512;
/// Mask selecting the in-sector part of a byte offset.
pub const SECTOR_MASK: u64 = SECTOR_SIZE as u64 - 1;
/// `offset >> SECTOR_SHIFT` is the LBA containing `offset`.
pub const SECTOR_SHIFT: u32 = 9;
/// 16-bit words per sector on the data register.
pub const SECTOR_WORDS: usize = SECTOR_SIZE / 2;

/// Maximum number of sectors moved by one command, regardless of what the
/// addressing mode could express, so other tasks get a turn at the channel.
pub const ATA_IO_MAX_SECTORS: u64 = 256;
/// Sector count ceiling of a 28-bit (and CHS) command.
pub const ATA_LBA28_MAX_SECTORS: u64 = u8::MAX as u64;
/// Sector count ceiling of a 48-bit command.
pub const ATA_LBA48_MAX_SECTORS: u64 = u16::MAX as u64;
/// Largest disk a 28-bit LBA can reach, in sectors.
pub const ATA_LBA28_CAPACITY: u64 = 1 << 28;
/// Largest disk a 48-bit LBA can reach, in sectors.
pub const ATA_LBA48_CAPACITY: u64 = 1 << 48;
/// CHS heads are selected through a 4-bit field.
pub const ATA_CHS_MAX_HEADS: u16 = 16;

// Logical register indices. 0x00..=0x07 live at the I/O base, 0x08..=0x0B
// overlap 0x02..=0x05 and need HOB set, 0x0C..=0x0D live at the control base.
pub const ATA_REG_DATA: u8 = 0x00;
pub const ATA_REG_ERROR: u8 = 0x01; // read
pub const ATA_REG_FEATURES: u8 = 0x01; // write
pub const ATA_REG_SECCOUNT0: u8 = 0x02;
pub const ATA_REG_LBA0: u8 = 0x03;
pub const ATA_REG_LBA1: u8 = 0x04;
pub const ATA_REG_LBA2: u8 = 0x05;
pub const ATA_REG_HDDEVSEL: u8 = 0x06; // also carries LBA bits 24-27 in LBA28 mode
pub const ATA_REG_COMMAND: u8 = 0x07; // write
pub const ATA_REG_STATUS: u8 = 0x07; // read
pub const ATA_REG_SECCOUNT1: u8 = 0x08;
pub const ATA_REG_LBA3: u8 = 0x09;
pub const ATA_REG_LBA4: u8 = 0x0A;
pub const ATA_REG_LBA5: u8 = 0x0B;
pub const ATA_REG_CONTROL: u8 = 0x0C; // write
pub const ATA_REG_ALTSTATUS: u8 = 0x0C; // read
pub const ATA_REG_DEVADDRESS: u8 = 0x0D;

/// Distance between an overlapped register and the register it aliases.
pub const ATA_REG_OVERLAP_DELTA: u8 = ATA_REG_SECCOUNT1 - ATA_REG_SECCOUNT0;
/// The control block register file starts at `ctrl_base + 2`.
pub const ATA_CTRL_REG_OFFSET: u16 = 2;

// ATA commands
pub const ATA_CMD_READ_PIO: u8 = 0x20;
pub const ATA_CMD_READ_PIO_EXT: u8 = 0x24;
pub const ATA_CMD_WRITE_PIO: u8 = 0x30;
pub const ATA_CMD_WRITE_PIO_EXT: u8 = 0x34;
pub const ATA_CMD_CACHE_FLUSH: u8 = 0xE7;
pub const ATA_CMD_CACHE_FLUSH_EXT: u8 = 0xEA;

/// PIO data commands indexed by `direction | (lba48 << 1)`.
pub const ATA_IO_COMMANDS: [u8; 4] = [
    ATA_CMD_READ_PIO,
    ATA_CMD_WRITE_PIO,
    ATA_CMD_READ_PIO_EXT,
    ATA_CMD_WRITE_PIO_EXT,
];

// Legacy (ISA compatibility) port assignments. Control bases are given the
// way BAR1/BAR3 report them: the device control register is at base + 2.
pub const IDE_PRI_IO_BASE: u16 = 0x1F0;
pub const IDE_PRI_CTRL_BASE: u16 = 0x3F4;
pub const IDE_PRI_IRQ: u8 = 14;
pub const IDE_SEC_IO_BASE: u16 = 0x170;
pub const IDE_SEC_CTRL_BASE: u16 = 0x374;
pub const IDE_SEC_IRQ: u8 = 15;

/// PCI BARs carry I/O-space flags in their two low bits.
pub const PCI_BAR_IO_MASK: u32 = !0x3;

// Programming interface bits of a PCI IDE function.
pub const PROG_IF_PRI_NATIVE: u8 = 1 << 0;
pub const PROG_IF_PRI_SWITCHABLE: u8 = 1 << 1;
pub const PROG_IF_SEC_NATIVE: u8 = 1 << 2;
pub const PROG_IF_SEC_SWITCHABLE: u8 = 1 << 3;
pub const PROG_IF_BUS_MASTER: u8 = 1 << 7;

/// Milliseconds to let a newly selected drive settle.
pub const DRIVE_SELECT_DELAY_MS: u32 = 1;
/// Alternate-status reads making up the ~400ns settle delay.
pub const SETTLE_READS: usize = 4;
