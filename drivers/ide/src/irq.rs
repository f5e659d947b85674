//! Interrupt dispatch.
//!
//! The host registers one handler per line listed in an [`IrqTable`] and
//! calls [`dispatch`] with the line number. The table is built once by the
//! controller's owner after channel registration and handed in by reference.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use log::debug;

use crate::controller::Controller;
use crate::host::Host;
use crate::port::PortIo;
use crate::types::{ChannelId, IrqMode};

/// Interrupt line to channel mapping of one controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrqTable {
    mode: IrqMode,
    lines: BTreeMap<u8, Vec<ChannelId>>,
}

impl IrqTable {
    pub(crate) fn new(mode: IrqMode, lines: BTreeMap<u8, Vec<ChannelId>>) -> Self {
        Self { mode, lines }
    }

    pub fn mode(&self) -> IrqMode {
        self.mode
    }

    /// Lines a handler must be registered on.
    pub fn lines(&self) -> impl Iterator<Item = u8> + '_ {
        self.lines.keys().copied()
    }

    pub fn channels(&self, irq: u8) -> &[ChannelId] {
        self.lines.get(&irq).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Handle interrupt `irq`. Returns how many channels were serviced.
pub fn dispatch<P: PortIo, H: Host>(controller: &Controller<P, H>, table: &IrqTable, irq: u8) -> usize {
    match table.mode {
        IrqMode::PciNative => dispatch_native(controller, table, irq),
        IrqMode::Compat => dispatch_compat(controller, table, irq),
    }
}

/// Shared line: only channels with a command in flight are credited. If none
/// claims the interrupt, every channel on the line is drained.
fn dispatch_native<P: PortIo, H: Host>(controller: &Controller<P, H>, table: &IrqTable, irq: u8) -> usize {
    let channels = || table.channels(irq).iter().filter_map(|&id| controller.channel(id));

    let mut serviced = 0;
    for channel in channels() {
        if channel.completion().is_armed() {
            channel.drain_status();
            channel.completion().signal();
            serviced += 1;
        }
    }

    if serviced == 0 {
        for channel in channels() {
            channel.drain_status();
            serviced += 1;
        }
        if serviced == 0 {
            debug!("ide: bogus IRQ {}", irq);
        }
    }
    serviced
}

/// Dedicated line per channel: signal whatever is pending and always drain.
fn dispatch_compat<P: PortIo, H: Host>(controller: &Controller<P, H>, table: &IrqTable, irq: u8) -> usize {
    let mut serviced = 0;
    for channel in table.channels(irq).iter().filter_map(|&id| controller.channel(id)) {
        channel.completion().signal();
        channel.drain_status();
        serviced += 1;
    }

    if serviced == 0 {
        debug!("ide: bogus IRQ {}", irq);
    }
    serviced
}
