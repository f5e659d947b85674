//! Scheduler and timer hooks consumed from the host kernel.

use core::marker::PhantomData;

use spin::relax::RelaxStrategy;

/// Cooperative scheduling primitives of the host.
///
/// These are associated functions rather than methods: the scheduler is a
/// property of the whole kernel, and lock relax strategies have no receiver.
pub trait Host {
    /// Give up the rest of the current task's turn without blocking.
    fn yield_now();

    /// Wait at least `ms` milliseconds.
    fn delay_ms(ms: u32);
}

/// Lock relax strategy that yields to the host scheduler between attempts.
pub struct YieldRelax<H>(PhantomData<fn() -> H>);

impl<H: Host> RelaxStrategy for YieldRelax<H> {
    #[inline(always)]
    fn relax() {
        H::yield_now();
    }
}
