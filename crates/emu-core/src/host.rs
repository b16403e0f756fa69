//! Host-side collaborator traits.
//!
//! The emulation core never opens windows, audio devices, or input devices.
//! Hosts implement these traits and hand them to the system; the core calls
//! back at the appropriate points in the frame.

/// Polls physical (or scripted) input devices.
pub trait InputPoller {
    /// Returns the current button state for the given controller port
    /// (0 or 1). Bits are read-out order, MSB to LSB:
    /// A, B, Select, Start, Up, Down, Left, Right.
    fn poll_port(&mut self, port: u8) -> u8;
}

/// Receives completed video frames.
pub trait DisplayHost {
    /// Called once per frame at the start of the vertical blank. The
    /// framebuffer is ARGB32, 256x240.
    fn submit_frame(&mut self, framebuffer: &[u32]);
}

/// Receives audio sample batches.
pub trait AudioHost {
    /// Called periodically with mono samples in the range -1.0 to 1.0.
    fn submit_samples(&mut self, samples: &[f32]);
}
