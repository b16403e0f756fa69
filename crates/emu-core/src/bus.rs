//! Memory and I/O bus interface.

/// Memory and I/O bus interface.
///
/// CPU cores access memory and peripherals through this trait. The bus
/// handles address decoding and routing to the appropriate device. One call
/// corresponds to one bus access on one half-cycle.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Take a pending sprite-DMA request, if a write to the DMA port
    /// occurred since the last call. The CPU polls this after every
    /// half-cycle; the returned byte is the source page. Buses without a
    /// DMA port use the default.
    fn take_dma_request(&mut self) -> Option<u8> {
        None
    }
}
