//! MSB-first shift engine for the master role
//!
//! Serializes an outbound byte and assembles an inbound byte, aligned to
//! the edge markers produced by [`EdgeClock`](super::clock::EdgeClock).
//! Which marker changes data and which samples it is fixed by the
//! configured phase: capture-on-first-transition changes outbound data on
//! trailing edges and samples inbound data on leading edges,
//! capture-on-second-transition does the opposite.

use super::clock::ClockTick;
use crate::mode::Phase;
use crate::signal::Level;

/// Shift engine outputs for one system tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShiftTick {
    /// Outbound data wire level
    pub mosi: Level,
    /// Completed inbound byte, present for exactly one tick
    pub rx: Option<u8>,
}

/// Master shift engine
#[derive(Debug, Clone)]
pub struct ShiftEngine {
    phase: Phase,
    /// Outbound byte, latched when the start pulse arrives
    tx_byte: u8,
    /// Start pulse delayed one tick, for the first-bit placement below
    start_q: bool,
    /// Next outbound bit position
    tx_bit_index: u8,
    mosi: Level,
    /// Inbound byte under assembly
    rx_byte: u8,
    /// Next inbound bit position
    rx_bit_index: u8,
}

impl ShiftEngine {
    /// Build a shift engine in its idle state
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            tx_byte: 0,
            start_q: false,
            tx_bit_index: 7,
            mosi: Level::Low,
            rx_byte: 0,
            rx_bit_index: 7,
        }
    }

    /// Return to the idle state
    pub fn reset(&mut self) {
        self.tx_byte = 0;
        self.start_q = false;
        self.tx_bit_index = 7;
        self.mosi = Level::Low;
        self.rx_byte = 0;
        self.rx_bit_index = 7;
    }

    /// Advance one system tick
    ///
    /// `clk` must be the clock generator's output from the previous tick:
    /// marker pulses take effect here on the tick the matching transition
    /// appears on the serial clock wire.
    pub fn tick(&mut self, tx: Option<u8>, clk: &ClockTick, miso: Level) -> ShiftTick {
        let start_q = self.start_q;
        let tx_byte_q = self.tx_byte;
        let second = self.phase == Phase::CaptureOnSecondTransition;

        // Outbound byte register: latched on the start pulse so the
        // in-flight byte is immune to later changes at the source.
        self.start_q = tx.is_some();
        if let Some(byte) = tx {
            self.tx_byte = byte;
        }

        // Outbound bit placement
        if clk.ready {
            self.tx_bit_index = 7;
        } else if start_q && !second {
            // Capture-on-first-transition: the first bit must be on the
            // wire before the first edge exists to change it on.
            self.mosi = Level::from_bit(tx_byte_q, 7);
            self.tx_bit_index = 6;
        } else if (clk.leading && second) || (clk.trailing && !second) {
            self.mosi = Level::from_bit(tx_byte_q, self.tx_bit_index);
            self.tx_bit_index = self.tx_bit_index.wrapping_sub(1) & 0x07;
        }

        // Inbound bit capture, on the complementary edge
        let mut rx = None;
        if clk.ready {
            self.rx_bit_index = 7;
        } else if (clk.leading && !second) || (clk.trailing && second) {
            if miso.is_high() {
                self.rx_byte |= 1 << self.rx_bit_index;
            } else {
                self.rx_byte &= !(1 << self.rx_bit_index);
            }
            if self.rx_bit_index == 0 {
                rx = Some(self.rx_byte);
            }
            self.rx_bit_index = self.rx_bit_index.wrapping_sub(1) & 0x07;
        }

        ShiftTick {
            mosi: self.mosi,
            rx,
        }
    }

    /// Inbound byte register, including any partial assembly
    pub fn rx_byte(&self) -> u8 {
        self.rx_byte
    }

    /// Outbound data wire level as of the last tick
    pub fn mosi(&self) -> Level {
        self.mosi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_clk() -> ClockTick {
        ClockTick {
            leading: false,
            trailing: false,
            ready: false,
            sck: Level::Low,
        }
    }

    fn ready_clk() -> ClockTick {
        ClockTick {
            ready: true,
            ..idle_clk()
        }
    }

    fn leading_clk() -> ClockTick {
        ClockTick {
            leading: true,
            ..idle_clk()
        }
    }

    fn trailing_clk() -> ClockTick {
        ClockTick {
            trailing: true,
            ..idle_clk()
        }
    }

    /// Shift one byte through the engine with a scripted marker
    /// sequence, feeding `miso_byte` back MSB-first on sample edges.
    /// Returns (received byte, mosi levels seen at sample points).
    fn run_byte(engine: &mut ShiftEngine, tx: u8, miso_byte: u8, second: bool) -> (u8, [Level; 8]) {
        let mut mosi_at_sample = [Level::Low; 8];
        let mut rx = None;

        engine.tick(None, &ready_clk(), Level::Low);
        engine.tick(Some(tx), &ready_clk(), Level::Low);
        // Start registered; clock is now counting toward the first edge.
        engine.tick(None, &idle_clk(), Level::Low);

        for bit in 0..8u8 {
            let miso = Level::from_bit(miso_byte, 7 - bit);

            // Leading edge of the bit period: the sample point for
            // first-transition capture, the change point otherwise.
            if !second {
                mosi_at_sample[bit as usize] = engine.mosi();
            }
            let out = engine.tick(None, &leading_clk(), miso);
            if out.rx.is_some() {
                rx = out.rx;
            }
            engine.tick(None, &idle_clk(), miso);

            // Trailing edge of the bit period
            if second {
                mosi_at_sample[bit as usize] = engine.mosi();
            }
            let out = engine.tick(None, &trailing_clk(), miso);
            if out.rx.is_some() {
                rx = out.rx;
            }
            engine.tick(None, &idle_clk(), miso);
        }

        (rx.expect("no inbound byte"), mosi_at_sample)
    }

    #[test]
    fn test_first_phase_serializes_msb_first() {
        let mut engine = ShiftEngine::new(Phase::CaptureOnFirstTransition);
        let (_, mosi) = run_byte(&mut engine, 0xA5, 0x00, false);
        for (i, level) in mosi.iter().enumerate() {
            assert_eq!(*level, Level::from_bit(0xA5, 7 - i as u8), "bit {}", i);
        }
    }

    #[test]
    fn test_second_phase_serializes_msb_first() {
        let mut engine = ShiftEngine::new(Phase::CaptureOnSecondTransition);
        let (_, mosi) = run_byte(&mut engine, 0xC3, 0x00, true);
        for (i, level) in mosi.iter().enumerate() {
            assert_eq!(*level, Level::from_bit(0xC3, 7 - i as u8), "bit {}", i);
        }
    }

    #[test]
    fn test_inbound_assembly() {
        let mut engine = ShiftEngine::new(Phase::CaptureOnFirstTransition);
        let (rx, _) = run_byte(&mut engine, 0x00, 0x3C, false);
        assert_eq!(rx, 0x3C);

        let mut engine = ShiftEngine::new(Phase::CaptureOnSecondTransition);
        let (rx, _) = run_byte(&mut engine, 0x00, 0x5A, true);
        assert_eq!(rx, 0x5A);
    }

    #[test]
    fn test_stale_bits_overwritten() {
        // A second byte of zeros must not inherit bits from the first.
        let mut engine = ShiftEngine::new(Phase::CaptureOnFirstTransition);
        let (rx, _) = run_byte(&mut engine, 0x00, 0xFF, false);
        assert_eq!(rx, 0xFF);
        let (rx, _) = run_byte(&mut engine, 0x00, 0x00, false);
        assert_eq!(rx, 0x00);
    }

    #[test]
    fn test_rx_pulse_is_one_tick() {
        let mut engine = ShiftEngine::new(Phase::CaptureOnFirstTransition);
        run_byte(&mut engine, 0x55, 0xAA, false);
        // After the byte, idle ticks produce no further pulses.
        for _ in 0..10 {
            assert_eq!(engine.tick(None, &ready_clk(), Level::Low).rx, None);
        }
    }
}
