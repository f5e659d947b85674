//! Byte-exact port I/O consumed from the host.

/// 8- and 16-bit access to the x86 I/O port space.
///
/// Implementations must perform exactly one bus cycle per call; the register
/// layer relies on that for data-register streaming and HOB bracketing.
pub trait PortIo {
    fn inb(&self, port: u16) -> u8;
    fn outb(&self, port: u16, value: u8);
    fn inw(&self, port: u16) -> u16;
    fn outw(&self, port: u16, value: u16);
}

impl<T: PortIo + ?Sized> PortIo for &T {
    fn inb(&self, port: u16) -> u8 {
        (**self).inb(port)
    }

    fn outb(&self, port: u16, value: u8) {
        (**self).outb(port, value)
    }

    fn inw(&self, port: u16) -> u16 {
        (**self).inw(port)
    }

    fn outw(&self, port: u16, value: u16) {
        (**self).outw(port, value)
    }
}

/// Real port I/O through `in`/`out` instructions.
#[cfg(target_arch = "x86_64")]
#[derive(Debug)]
pub struct X86PortIo {
    _private: (),
}

#[cfg(target_arch = "x86_64")]
impl X86PortIo {
    /// # Safety
    ///
    /// The caller must own the I/O ranges of every channel this accessor is
    /// handed to; nothing else may touch those ports concurrently.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(target_arch = "x86_64")]
impl PortIo for X86PortIo {
    fn inb(&self, port: u16) -> u8 {
        use x86_64::instructions::port::Port;
        unsafe { Port::<u8>::new(port).read() }
    }

    fn outb(&self, port: u16, value: u8) {
        use x86_64::instructions::port::Port;
        unsafe { Port::<u8>::new(port).write(value) }
    }

    fn inw(&self, port: u16) -> u16 {
        use x86_64::instructions::port::Port;
        unsafe { Port::<u16>::new(port).read() }
    }

    fn outw(&self, port: u16, value: u16) {
        use x86_64::instructions::port::Port;
        unsafe { Port::<u16>::new(port).write(value) }
    }
}
