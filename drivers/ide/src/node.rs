//! File-node adapter: the open/close/read/write surface a VFS calls into.

use log::{debug, warn};

use crate::controller::{Controller, Device};
use crate::host::Host;
use crate::port::PortIo;
use crate::transfer::IoBuf;
use crate::types::DeviceId;

/// Contract between a device node and the filesystem layer above it.
///
/// Failures are reported through the return values only: `false` from
/// `open`, a short (possibly zero) count from `read`/`write`.
pub trait FileNode {
    fn open(&self, read: bool, write: bool) -> bool;
    fn close(&self);
    /// Read up to `length` bytes at `offset` into `buf`.
    fn read(&self, offset: u64, length: u64, buf: &mut [u8]) -> u64;
    /// Write up to `length` bytes of `buf` at `offset`.
    fn write(&self, offset: u64, length: u64, buf: &[u8]) -> u64;
}

/// A disk as seen through its devfs node.
pub struct DiskNode<'c, P, H: Host> {
    controller: &'c Controller<P, H>,
    id: DeviceId,
}

impl<'c, P: PortIo, H: Host> DiskNode<'c, P, H> {
    pub(crate) fn new(controller: &'c Controller<P, H>, id: DeviceId) -> Self {
        Self { controller, id }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    fn device(&self) -> Option<&'c Device> {
        self.controller.lookup(self.id).ok()
    }

    pub fn name(&self) -> &'c str {
        self.device().map(Device::name).unwrap_or("")
    }

    /// Size of the disk in bytes.
    pub fn size(&self) -> u64 {
        self.device().map(|d| d.descriptor().size_bytes()).unwrap_or(0)
    }

    pub fn is_open(&self) -> bool {
        self.device().is_some_and(Device::in_use)
    }
}

impl<'c, P: PortIo, H: Host> FileNode for DiskNode<'c, P, H> {
    fn open(&self, _read: bool, _write: bool) -> bool {
        let Some(dev) = self.device() else {
            return false;
        };
        match dev.mark_in_use() {
            Ok(true) => true,
            Ok(false) => {
                debug!("ide: {} is already opened", dev.name());
                true
            }
            Err(err) => {
                warn!("ide: {}: {}", dev.name(), err);
                false
            }
        }
    }

    fn close(&self) {
        let Some(dev) = self.device() else {
            return;
        };
        match dev.clear_in_use() {
            Ok(true) => {}
            Ok(false) => debug!("ide: {} is already closed", dev.name()),
            Err(err) => warn!("ide: {}: {}", dev.name(), err),
        }
    }

    fn read(&self, offset: u64, length: u64, buf: &mut [u8]) -> u64 {
        if !self.is_open() {
            return 0;
        }
        let len = usize::try_from(length).unwrap_or(usize::MAX).min(buf.len());
        self.controller.transfer(self.id, offset, IoBuf::Read(&mut buf[..len]))
    }

    fn write(&self, offset: u64, length: u64, buf: &[u8]) -> u64 {
        if !self.is_open() {
            return 0;
        }
        let len = usize::try_from(length).unwrap_or(usize::MAX).min(buf.len());
        self.controller.transfer(self.id, offset, IoBuf::Write(&buf[..len]))
    }
}
