//! Channel synchronization: exclusive channel access, status polling and the
//! interrupt completion handshake.
//!
//! None of the waits here time out. A drive that never drops BSY keeps the
//! calling task yielding forever.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use spin::mutex::{TicketMutex, TicketMutexGuard};

use crate::consts::*;
use crate::error::PollOutcome;
use crate::host::{Host, YieldRelax};
use crate::port::PortIo;
use crate::regs::{AtaStatus, Registers};

/// State only the holder of the channel lock may look at.
#[derive(Debug, Default)]
pub struct ChannelState {
    /// Drive index last written to the drive select register
    pub selected: Option<u8>,
}

/// Exclusive-use lock of a channel. Waiters are served in arrival order and
/// yield to the host scheduler while they wait.
pub struct ChannelLock<H: Host> {
    inner: TicketMutex<ChannelState, YieldRelax<H>>,
}

pub type ChannelGuard<'a> = TicketMutexGuard<'a, ChannelState>;

impl<H: Host> ChannelLock<H> {
    pub const fn new() -> Self {
        Self {
            inner: TicketMutex::new(ChannelState { selected: None }),
        }
    }

    /// Block (cooperatively) until the channel is ours. Dropping the guard
    /// releases it.
    pub fn acquire(&self) -> ChannelGuard<'_> {
        self.inner.lock()
    }

    pub fn try_acquire(&self) -> Option<ChannelGuard<'_>> {
        self.inner.try_lock()
    }

    pub fn is_held(&self) -> bool {
        self.inner.is_locked()
    }
}

impl<H: Host> Default for ChannelLock<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Yield until BSY clears and return the status that showed it clear.
pub fn wait_not_busy<P: PortIo, H: Host>(regs: &Registers<P>) -> AtaStatus {
    loop {
        let status = regs.status();
        if !status.contains(AtaStatus::BUSY) {
            return status;
        }
        H::yield_now();
    }
}

/// Wait out the settle delay and BSY, then classify the status if asked to.
pub fn poll<P: PortIo, H: Host>(regs: &Registers<P>, check_errors: bool) -> PollOutcome {
    for _ in 0..SETTLE_READS {
        regs.alt_status();
    }

    let status = wait_not_busy::<P, H>(regs);
    if !check_errors {
        return PollOutcome::Ready;
    }

    if status.contains(AtaStatus::ERROR) {
        let error = regs.read_byte(ATA_REG_ERROR);
        debug!("ide: ERR=1 (status {:#04x}, error {:#04x})", status.bits(), error);
        return PollOutcome::Error(error);
    }
    if status.contains(AtaStatus::DRIVE_WRITE_FAULT) {
        debug!("ide: DF=1 (status {:#04x})", status.bits());
        return PollOutcome::Fault;
    }
    if !status.contains(AtaStatus::DATA_REQUEST_READY) {
        debug!("ide: DRQ=0 (status {:#04x})", status.bits());
        return PollOutcome::DrqMissing;
    }
    PollOutcome::Ready
}

/// Single-slot completion signal between a command issuer and the IRQ
/// handler of its channel.
///
/// The issuer arms it before writing the command, the handler releases it,
/// and the issuer's wait observes the release. Only the holder of the channel
/// lock arms or waits, so one outstanding completion per channel is enough.
pub struct Completion<H> {
    armed: AtomicBool,
    _host: PhantomData<fn() -> H>,
}

impl<H: Host> Completion<H> {
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            _host: PhantomData,
        }
    }

    /// Mark a completion as outstanding. Call before issuing the command.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Release an outstanding completion. Returns whether one was pending.
    pub fn signal(&self) -> bool {
        self.armed.swap(false, Ordering::AcqRel)
    }

    /// Yield until the handler has signalled.
    pub fn wait(&self) {
        while self.is_armed() {
            H::yield_now();
        }
    }
}

impl<H: Host> Default for Completion<H> {
    fn default() -> Self {
        Self::new()
    }
}
