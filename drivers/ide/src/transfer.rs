//! Transfer engine.
//!
//! Turns an arbitrary `(offset, length)` byte request into whole-sector PIO
//! commands. Requests are clamped to the device, misaligned writes go through
//! read-modify-write, and anything over the per-command ceiling is cut into
//! chunks whose boundaries fall on sector boundaries. Failures surface as a
//! short byte count; the first short chunk ends the whole request.

use log::{debug, trace, warn};

use crate::addressing::{encode, max_sectors};
use crate::channel::Channel;
use crate::consts::*;
use crate::host::Host;
use crate::port::PortIo;
use crate::regs::AtaStatus;
use crate::sync::{poll, wait_not_busy};
use crate::types::DeviceDescriptor;

/// Caller buffer together with the transfer direction.
#[derive(Debug)]
pub enum IoBuf<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl<'a> IoBuf<'a> {
    pub fn len(&self) -> usize {
        match self {
            IoBuf::Read(buf) => buf.len(),
            IoBuf::Write(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_write(&self) -> bool {
        matches!(self, IoBuf::Write(_))
    }

    /// Reborrow `len` bytes starting at `start`.
    ///
    /// Panics if the range is out of bounds, like slice indexing.
    pub fn slice(&mut self, start: usize, len: usize) -> IoBuf<'_> {
        match self {
            IoBuf::Read(buf) => IoBuf::Read(&mut buf[start..start + len]),
            IoBuf::Write(buf) => IoBuf::Write(&buf[start..start + len]),
        }
    }
}

/// One sector-count-bounded command, ready for the wire.
#[derive(Debug)]
pub struct Command<'a> {
    /// First sector touched
    pub lba: u64,
    /// Number of sectors moved, at most the device's per-command ceiling
    pub count: u64,
    /// Byte offset of the request; only its in-sector part matters
    pub offset: u64,
    pub buf: IoBuf<'a>,
}

/// Executes a single command and reports the bytes it moved.
pub trait SectorCommand {
    fn execute(&mut self, dev: &DeviceDescriptor, cmd: Command<'_>) -> u64;
}

/// Move `buf.len()` bytes at byte `offset` of `dev`.
///
/// Returns the number of bytes moved. Anything short of the requested length
/// means a command failed or the request ran past the end of the device.
pub fn transfer<C: SectorCommand>(cmd: &mut C, dev: &DeviceDescriptor, offset: u64, mut buf: IoBuf<'_>) -> u64 {
    let capacity = dev.size_bytes();
    if buf.is_empty() || offset >= capacity {
        return 0;
    }

    let len = (buf.len() as u64).min(capacity - offset) as usize;
    let buf = buf.slice(0, len);

    if let IoBuf::Write(data) = &buf {
        if offset & SECTOR_MASK != 0 || len as u64 & SECTOR_MASK != 0 {
            return write_unaligned(cmd, dev, offset, data);
        }
    }

    subdivide(cmd, dev, offset, buf)
}

/// Write `data` at an offset or length that is not sector aligned.
///
/// Partial sectors are read, patched and written back one at a time; any
/// aligned run of whole sectors in between is written directly.
fn write_unaligned<C: SectorCommand>(cmd: &mut C, dev: &DeviceDescriptor, offset: u64, data: &[u8]) -> u64 {
    let mut done = 0usize;

    while done < data.len() {
        let pos = offset + done as u64;
        let in_sector = (pos & SECTOR_MASK) as usize;
        let remaining = data.len() - done;

        if in_sector == 0 && remaining >= SECTOR_SIZE {
            let whole = remaining & !(SECTOR_SIZE - 1);
            let put = subdivide(cmd, dev, pos, IoBuf::Write(&data[done..done + whole])) as usize;
            done += put;
            if put < whole {
                debug!("ide: aligned write stopped after {} of {} bytes", put, whole);
                return done as u64;
            }
            continue;
        }

        let base = pos - in_sector as u64;
        let mut sector = [0u8; SECTOR_SIZE];
        let got = subdivide(cmd, dev, base, IoBuf::Read(&mut sector));
        if got < SECTOR_SIZE as u64 {
            debug!("ide: read-modify-write: read of sector {} came back short", base >> SECTOR_SHIFT);
            return done as u64;
        }

        let n = (SECTOR_SIZE - in_sector).min(remaining);
        sector[in_sector..in_sector + n].copy_from_slice(&data[done..done + n]);

        let put = subdivide(cmd, dev, base, IoBuf::Write(&sector));
        if put < SECTOR_SIZE as u64 {
            debug!("ide: read-modify-write: write of sector {} came back short", base >> SECTOR_SHIFT);
            return done as u64;
        }
        done += n;
    }

    done as u64
}

/// Issue as many commands as the per-command ceiling requires.
///
/// The first chunk ends on the sector boundary `max` sectors after the one
/// containing `offset`, so every later chunk starts aligned.
fn subdivide<C: SectorCommand>(cmd: &mut C, dev: &DeviceDescriptor, offset: u64, mut buf: IoBuf<'_>) -> u64 {
    let max = max_sectors(&dev.addressing);
    let len = buf.len() as u64;
    let mut done = 0u64;

    while done < len {
        let pos = offset + done;
        let remaining = len - done;
        let chunk = (((max - 1) << SECTOR_SHIFT) + (SECTOR_SIZE as u64 - (pos & SECTOR_MASK))).min(remaining);

        let lba = pos >> SECTOR_SHIFT;
        let lba_end = ((pos + chunk - 1) >> SECTOR_SHIFT).min(dev.sectors - 1);
        let got = cmd.execute(
            dev,
            Command {
                lba,
                count: lba_end - lba + 1,
                offset: pos,
                buf: buf.slice(done as usize, chunk as usize),
            },
        );

        done += got;
        if got < chunk {
            debug!("ide: command at lba {} moved {} of {} bytes", lba, got, chunk);
            break;
        }
    }

    done
}

/// Programmed I/O on a real (or simulated) channel.
pub struct PioCommand<'c, P, H: Host> {
    channel: &'c Channel<P, H>,
}

impl<'c, P: PortIo, H: Host> PioCommand<'c, P, H> {
    pub fn new(channel: &'c Channel<P, H>) -> Self {
        Self { channel }
    }

    fn flush(&self, lba48: bool) {
        let regs = self.channel.regs();
        let opcode = if lba48 { ATA_CMD_CACHE_FLUSH_EXT } else { ATA_CMD_CACHE_FLUSH };
        regs.write_byte(ATA_REG_COMMAND, opcode);
        poll::<P, H>(regs, false);

        let status = regs.status();
        if status.intersects(AtaStatus::ERROR | AtaStatus::DRIVE_WRITE_FAULT) {
            warn!("ide: cache flush failed (status {:#04x})", status.bits());
        }
    }
}

impl<'c, P: PortIo, H: Host> SectorCommand for PioCommand<'c, P, H> {
    fn execute(&mut self, dev: &DeviceDescriptor, mut cmd: Command<'_>) -> u64 {
        let channel = self.channel;
        let regs = channel.regs();
        let lba48 = dev.addressing.is_lba48();
        let write = cmd.buf.is_write();

        let mut guard = channel.lock().acquire();
        wait_not_busy::<P, H>(regs);

        let tf = encode(&dev.addressing, cmd.lba);
        channel.select(&mut guard, dev.drive, !dev.addressing.is_chs(), tf.head);

        if lba48 {
            regs.write_byte(ATA_REG_SECCOUNT1, (cmd.count >> 8) as u8);
            regs.write_byte(ATA_REG_LBA3, tf.lba[3]);
            regs.write_byte(ATA_REG_LBA4, tf.lba[4]);
            regs.write_byte(ATA_REG_LBA5, tf.lba[5]);
        }
        regs.write_byte(ATA_REG_SECCOUNT0, cmd.count as u8);
        regs.write_byte(ATA_REG_LBA0, tf.lba[0]);
        regs.write_byte(ATA_REG_LBA1, tf.lba[1]);
        regs.write_byte(ATA_REG_LBA2, tf.lba[2]);

        let opcode = ATA_IO_COMMANDS[write as usize | (lba48 as usize) << 1];
        trace!(
            "ide: drive {} cmd {:#04x} lba {} count {}",
            dev.drive,
            opcode,
            cmd.lba,
            cmd.count
        );
        regs.write_byte(ATA_REG_COMMAND, opcode);

        let skip = (cmd.offset & SECTOR_MASK) as usize;
        let mut pos = 0usize;
        let mut ret = 0u64;

        for sector in 0..cmd.count {
            if let Err(err) = poll::<P, H>(regs, true).into_result() {
                if write && ret > 0 {
                    ret -= SECTOR_SIZE as u64;
                }
                debug!("ide: drive {} stopped at sector {} of {}: {}", dev.drive, sector, cmd.count, err);
                break;
            }

            match &mut cmd.buf {
                IoBuf::Write(data) => {
                    let Some(chunk) = data.get(pos..pos + SECTOR_SIZE) else {
                        break;
                    };
                    regs.write_words(ATA_REG_DATA, chunk);
                    pos += SECTOR_SIZE;
                    ret += SECTOR_SIZE as u64;
                }
                IoBuf::Read(data) => {
                    let mut words = 0usize;
                    if sector == 0 && skip > 0 {
                        regs.read_words(ATA_REG_DATA, None, skip / 2);
                        words = skip / 2;
                        if skip % 2 == 1 {
                            let word = regs.read_word(ATA_REG_DATA);
                            words += 1;
                            if pos < data.len() {
                                data[pos] = (word >> 8) as u8;
                                pos += 1;
                            }
                        }
                    }

                    let want = (SECTOR_SIZE - words * 2).min(data.len() - pos);
                    let even = want & !1;
                    regs.read_words(ATA_REG_DATA, Some(&mut data[pos..pos + even]), even / 2);
                    words += even / 2;
                    pos += even;
                    if want % 2 == 1 {
                        let word = regs.read_word(ATA_REG_DATA);
                        words += 1;
                        data[pos] = word as u8;
                        pos += 1;
                    }

                    regs.read_words(ATA_REG_DATA, None, SECTOR_WORDS - words);
                    ret = pos as u64;
                }
            }
        }

        if write {
            self.flush(lba48);
        }

        ret
    }
}
