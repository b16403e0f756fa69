//! Controller ports ($4016/$4017).
//!
//! Each port is a serial shift register. Writing bit 0 of $4016 strobes
//! both ports: while the strobe is high the live input state is reloaded
//! continuously, and reads return the current A button. Once the strobe
//! drops, each read shifts out one bit, MSB first: A, B, Select, Start,
//! Up, Down, Left, Right. Only bit 0 is driven; the bus supplies the
//! upper bits from the open-bus value.

use emu_core::InputPoller;

/// One controller port.
pub struct ControllerPort {
    /// 0 or 1, passed to the input poller.
    port: u8,
    /// Shift register holding the latched button state.
    state: u8,
    /// Strobe level; high keeps the register reloading.
    strobe: bool,
}

impl ControllerPort {
    #[must_use]
    pub fn new(port: u8) -> Self {
        Self {
            port,
            state: 0,
            strobe: false,
        }
    }

    /// Handle a write to the strobe register.
    pub fn write_strobe(&mut self, value: u8, poller: Option<&mut (dyn InputPoller + '_)>) {
        self.strobe = value & 1 != 0;
        self.state = poller.map_or(0, |p| p.poll_port(self.port));
    }

    /// Shift out one bit (bit 0 of the returned byte). While the strobe is
    /// high the register reloads first, so reads keep returning A.
    pub fn read_bit(&mut self, poller: Option<&mut (dyn InputPoller + '_)>) -> u8 {
        if self.strobe {
            self.state = poller.map_or(0, |p| p.poll_port(self.port));
        }
        let bit = self.state >> 7;
        if !self.strobe {
            self.state <<= 1;
        }
        bit
    }

    /// Current shift-register contents (for save states).
    #[must_use]
    pub fn state(&self) -> u8 {
        self.state
    }

    /// Restore shift-register contents (for save states).
    pub fn restore(&mut self, state: u8, strobe: bool) {
        self.state = state;
        self.strobe = strobe;
    }

    /// Strobe level (for save states).
    #[must_use]
    pub fn strobe(&self) -> bool {
        self.strobe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted poller returning a fixed byte per port.
    struct FixedInput(u8, u8);

    impl InputPoller for FixedInput {
        fn poll_port(&mut self, port: u8) -> u8 {
            if port == 0 {
                self.0
            } else {
                self.1
            }
        }
    }

    #[test]
    fn shifts_out_msb_first() {
        // A and Start held: A=bit7, Start=bit4.
        let mut input = FixedInput(0b1001_0000, 0);
        let mut port = ControllerPort::new(0);

        port.write_strobe(1, Some(&mut input));
        port.write_strobe(0, Some(&mut input));

        let bits: Vec<u8> = (0..8).map(|_| port.read_bit(None)).collect();
        assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 0]);
        // Exhausted register shifts out zeros.
        assert_eq!(port.read_bit(None), 0);
    }

    #[test]
    fn strobe_high_keeps_returning_a() {
        let mut input = FixedInput(0x80, 0);
        let mut port = ControllerPort::new(0);
        port.write_strobe(1, Some(&mut input));
        assert_eq!(port.read_bit(Some(&mut input)), 1);
        assert_eq!(port.read_bit(Some(&mut input)), 1);

        input.0 = 0;
        assert_eq!(port.read_bit(Some(&mut input)), 0);
    }

    #[test]
    fn no_poller_reads_zero() {
        let mut port = ControllerPort::new(0);
        port.write_strobe(1, None);
        port.write_strobe(0, None);
        assert_eq!(port.read_bit(None), 0);
    }
}
