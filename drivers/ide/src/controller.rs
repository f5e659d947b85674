//! Arena of channels and devices belonging to one IDE controller.
//!
//! Channels and devices are addressed by [`ChannelId`] / [`DeviceId`]
//! handles; a device records its channel and a channel lists its drives, so
//! walks in either direction never chase pointers.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use crate::channel::Channel;
use crate::error::{IdeError, IdeResult};
use crate::host::Host;
use crate::irq::IrqTable;
use crate::node::DiskNode;
use crate::port::PortIo;
use crate::transfer::{self, IoBuf, PioCommand};
use crate::types::{ChannelConfig, ChannelId, DeviceClass, DeviceDescriptor, DeviceId, IrqMode, NodeName};

/// A drive attached to a channel.
pub struct Device {
    channel: ChannelId,
    descriptor: DeviceDescriptor,
    name: NodeName,
    in_use: AtomicBool,
}

impl Device {
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    /// Packet devices are recognised but cannot be driven by the ATA path.
    pub fn check_transferable(&self) -> IdeResult<()> {
        match self.descriptor.class {
            DeviceClass::Ata => Ok(()),
            DeviceClass::Atapi => Err(IdeError::UnsupportedDevice),
        }
    }

    /// Take the in-use marker. `Ok(false)` if it was already taken.
    pub(crate) fn mark_in_use(&self) -> IdeResult<bool> {
        self.check_transferable()?;
        Ok(!self.in_use.swap(true, Ordering::AcqRel))
    }

    /// Drop the in-use marker. `Ok(false)` if it was not taken.
    pub(crate) fn clear_in_use(&self) -> IdeResult<bool> {
        self.check_transferable()?;
        Ok(self.in_use.swap(false, Ordering::AcqRel))
    }
}

pub struct Controller<P, H: Host> {
    irq_mode: IrqMode,
    channels: Vec<Channel<P, H>>,
    devices: Vec<Device>,
}

impl<P: PortIo, H: Host> Controller<P, H> {
    pub fn new(irq_mode: IrqMode) -> Self {
        Self {
            irq_mode,
            channels: Vec::new(),
            devices: Vec::new(),
        }
    }

    pub fn irq_mode(&self) -> IrqMode {
        self.irq_mode
    }

    /// Register a channel. Its interrupts start out disabled.
    pub fn add_channel(&mut self, config: ChannelConfig, io: P) -> ChannelId {
        let id = ChannelId(self.channels.len());
        let channel = Channel::new(config, io);
        // not reachable by anyone else yet, so no lock
        channel.regs().set_nien(true);
        info!(
            "ide: channel {} at {:#x}/{:#x}, irq {}",
            id.index(),
            config.io_base,
            config.ctrl_base,
            config.irq_line
        );
        self.channels.push(channel);
        id
    }

    /// Attach an identified drive to `channel`.
    pub fn add_device(&mut self, channel: ChannelId, descriptor: DeviceDescriptor) -> IdeResult<DeviceId> {
        descriptor.validate()?;
        let id = DeviceId(self.devices.len());
        let devices = &self.devices;
        let chan = self.channels.get_mut(channel.0).ok_or(IdeError::NoSuchChannel)?;

        if chan.drives().iter().any(|d| devices[d.0].descriptor.drive == descriptor.drive) {
            return Err(IdeError::ChannelFull);
        }
        chan.attach(id).map_err(|_| IdeError::ChannelFull)?;

        let ordinal = self.devices.iter().filter(|d| d.descriptor.class == descriptor.class).count();
        let name = DeviceDescriptor::node_name(descriptor.class, ordinal);
        info!(
            "ide: {} on channel {} drive {}: {:?}, {} sectors, \"{}\"",
            name,
            channel.index(),
            descriptor.drive,
            descriptor.addressing,
            descriptor.sectors,
            descriptor.model()
        );
        self.devices.push(Device {
            channel,
            descriptor,
            name,
            in_use: AtomicBool::new(false),
        });
        Ok(id)
    }

    pub fn set_irq_disabled(&self, channel: ChannelId, disabled: bool) -> IdeResult<()> {
        self.channel(channel).ok_or(IdeError::NoSuchChannel)?.set_irq_disabled(disabled);
        Ok(())
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel<P, H>> {
        self.channels.get(id.0)
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id.0)
    }

    pub fn lookup(&self, id: DeviceId) -> IdeResult<&Device> {
        self.device(id).ok_or(IdeError::NoSuchDevice)
    }

    pub fn channels(&self) -> impl Iterator<Item = (ChannelId, &Channel<P, H>)> {
        self.channels.iter().enumerate().map(|(i, c)| (ChannelId(i), c))
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &Device)> {
        self.devices.iter().enumerate().map(|(i, d)| (DeviceId(i), d))
    }

    /// Channels wired to interrupt line `irq`, in registration order.
    pub fn channels_on_irq(&self, irq: u8) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels()
            .filter(move |(_, c)| c.irq_line() == irq)
            .map(|(id, _)| id)
    }

    pub fn devices_on(&self, channel: ChannelId) -> &[DeviceId] {
        self.channel(channel).map(|c| c.drives()).unwrap_or(&[])
    }

    pub fn channel_of(&self, device: DeviceId) -> Option<ChannelId> {
        self.device(device).map(|d| d.channel)
    }

    /// Snapshot of which channels sit on which interrupt line.
    pub fn irq_table(&self) -> IrqTable {
        let mut lines: BTreeMap<u8, Vec<ChannelId>> = BTreeMap::new();
        for (id, channel) in self.channels() {
            lines.entry(channel.irq_line()).or_default().push(id);
        }
        IrqTable::new(self.irq_mode, lines)
    }

    /// Move bytes between `buf` and `device` starting at byte `offset`.
    /// Returns the number of bytes moved, which may be short.
    pub fn try_transfer(&self, device: DeviceId, offset: u64, buf: IoBuf<'_>) -> IdeResult<u64> {
        let dev = self.lookup(device)?;
        dev.check_transferable()?;
        let channel = self.channel(dev.channel).ok_or(IdeError::NoSuchChannel)?;
        Ok(transfer::transfer(&mut PioCommand::new(channel), &dev.descriptor, offset, buf))
    }

    /// Like [`try_transfer`](Self::try_transfer), with refusals counted as 0 bytes.
    pub fn transfer(&self, device: DeviceId, offset: u64, buf: IoBuf<'_>) -> u64 {
        self.try_transfer(device, offset, buf).unwrap_or_else(|err| {
            debug!("ide: transfer on device {}: {}", device.index(), err);
            0
        })
    }

    /// File-node view of `device`.
    pub fn node(&self, device: DeviceId) -> IdeResult<DiskNode<'_, P, H>> {
        self.lookup(device).map(|_| DiskNode::new(self, device))
    }

    pub fn nodes(&self) -> impl Iterator<Item = DiskNode<'_, P, H>> {
        (0..self.devices.len()).map(move |i| DiskNode::new(self, DeviceId(i)))
    }
}
