// lib.rs - ATA/IDE programmed I/O block transfer engine
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod addressing;
pub mod channel;
pub mod consts;
pub mod controller;
pub mod error;
pub mod host;
pub mod irq;
pub mod node;
pub mod port;
pub mod regs;
pub mod sync;
pub mod transfer;
pub mod types;

pub use channel::Channel;
pub use controller::{Controller, Device};
pub use error::{IdeError, IdeResult, PollOutcome};
pub use host::Host;
pub use irq::{dispatch as dispatch_irq, IrqTable};
pub use node::{DiskNode, FileNode};
pub use port::PortIo;
#[cfg(target_arch = "x86_64")]
pub use port::X86PortIo;
pub use transfer::IoBuf;
pub use types::{
    native_prog_if, AddressingMode, ChannelConfig, ChannelId, ChsGeometry, DeviceClass, DeviceDescriptor, DeviceId,
    IrqMode, NodeName,
};

#[cfg(test)]
mod sim;
