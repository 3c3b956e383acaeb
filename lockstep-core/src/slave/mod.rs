//! Bus-slave engine
//!
//! The slave generates no timing of its own: the remote master supplies
//! the serial clock and chip-select, and every serial-domain action here
//! hangs off edges detected on those wires. Completed inbound bytes are
//! handed to the system-clock domain through a multi-stage synchronizer;
//! the outbound byte travels the other way through a register that the
//! serial domain reads bit by bit.
//!
//! Sampling uses an effective clock: the serial clock normalized so that
//! its rising edge is the configured mode's capture edge. Inbound bits
//! are captured and the outbound bit advanced on that rising edge, and
//! the outbound preload keeps the byte's MSB on the wire from the moment
//! chip-select asserts, before any edge has arrived.

pub mod sync;

use crate::mode::{Mode, Phase, Polarity};
use crate::signal::{Level, LineState};
use sync::PulseSynchronizer;

/// Slave engine outputs for one system tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveTick {
    /// Outbound data line: released whenever chip-select is inactive
    pub miso: LineState,
    /// Completed inbound byte, present for exactly one tick
    pub rx: Option<u8>,
}

/// Externally clocked slave engine
#[derive(Debug, Clone)]
pub struct Slave {
    /// True when the capture edge is a falling edge of the raw clock
    invert_clock: bool,

    // Serial-clock domain
    prev_eff_high: bool,
    rx_shift: u8,
    rx_edge_count: u8,
    rx_latch: u8,
    rx_done: bool,
    tx_bit_index: u8,
    miso_bit: Level,
    preload: bool,

    // System-clock domain
    tx_byte: u8,
    sync: PulseSynchronizer,
    rx_out: u8,
    cs_n_q: Level,
}

impl Slave {
    /// Build a slave engine in its idle state
    pub fn new(mode: Mode) -> Self {
        // Normalize the sampling clock per mode: the capture edge is the
        // first transition away from idle for first-transition capture
        // and the return transition otherwise, so a falling-capture mode
        // needs the raw clock inverted.
        let invert_clock = (mode.polarity() == Polarity::IdleHigh)
            != (mode.phase() == Phase::CaptureOnSecondTransition);

        Self {
            invert_clock,
            prev_eff_high: false,
            rx_shift: 0,
            rx_edge_count: 0,
            rx_latch: 0,
            rx_done: false,
            tx_bit_index: 7,
            miso_bit: Level::Low,
            preload: true,
            tx_byte: 0,
            sync: PulseSynchronizer::new(),
            rx_out: 0,
            cs_n_q: Level::High,
        }
    }

    /// Return to the idle state
    ///
    /// The outbound byte register is cleared too; reload it before the
    /// next burst.
    pub fn reset(&mut self) {
        self.prev_eff_high = false;
        self.rx_shift = 0;
        self.rx_edge_count = 0;
        self.rx_latch = 0;
        self.rx_done = false;
        self.tx_bit_index = 7;
        self.miso_bit = Level::Low;
        self.preload = true;
        self.tx_byte = 0;
        self.sync.reset();
        self.rx_out = 0;
        self.cs_n_q = Level::High;
    }

    /// True while chip-select held the data line driven on the last tick
    pub fn driving(&self) -> bool {
        self.cs_n_q == Level::Low
    }

    /// Serial-domain completion flag not yet consumed by the system side
    pub fn rx_done_pending(&self) -> bool {
        self.rx_done
    }

    /// Most recent completed inbound byte
    pub fn last_rx(&self) -> u8 {
        self.rx_out
    }

    /// Advance one system tick
    ///
    /// `tx` registers a new outbound byte (system-clock domain); `sck`,
    /// `mosi` and `cs_n` are the wire levels for this tick, `cs_n` with
    /// active-low semantics.
    pub fn tick(&mut self, tx: Option<u8>, sck: Level, mosi: Level, cs_n: Level) -> SlaveTick {
        let rx_done_q = self.rx_done;
        let tx_byte_q = self.tx_byte;

        let eff = if self.invert_clock { sck.toggled() } else { sck };
        let rising = eff.is_high() && !self.prev_eff_high;
        self.prev_eff_high = eff.is_high();

        if cs_n.is_high() {
            // Deasserted chip-select pins the serial-domain state at its
            // reset values; the bit index snaps back to the MSB so the
            // next burst starts clean no matter where this one stopped.
            self.rx_edge_count = 0;
            self.rx_done = false;
            self.tx_bit_index = 7;
            self.preload = true;
            self.miso_bit = Level::from_bit(tx_byte_q, 7);
        } else if rising {
            // Inbound: shift toward the MSB, latch on the eighth edge.
            self.rx_shift = (self.rx_shift << 1) | (mosi.is_high() as u8);
            if self.rx_edge_count == 7 {
                self.rx_latch = self.rx_shift;
                self.rx_done = true;
            } else if self.rx_edge_count == 2 {
                // Drop the flag partway into the next byte so its pulse
                // stays shorter than a byte period and back-to-back
                // completions still produce distinct rising edges.
                self.rx_done = false;
            }
            self.rx_edge_count = (self.rx_edge_count + 1) & 0x07;

            // Outbound: step past the bit just consumed. The index
            // wraps 0 -> 7, putting the next byte's MSB on the wire a
            // full bit period before its first capture edge.
            self.preload = false;
            self.tx_bit_index = self.tx_bit_index.wrapping_sub(1) & 0x07;
            self.miso_bit = Level::from_bit(tx_byte_q, self.tx_bit_index);
        }

        // System-clock domain: outbound register and completion handoff.
        if let Some(byte) = tx {
            self.tx_byte = byte;
        }

        let mut rx = None;
        if self.sync.tick(rx_done_q) {
            self.rx_out = self.rx_latch;
            rx = Some(self.rx_out);
        }

        let miso = if cs_n.is_high() {
            LineState::HighZ
        } else if self.preload {
            LineState::from(Level::from_bit(self.tx_byte, 7))
        } else {
            LineState::from(self.miso_bit)
        };

        self.cs_n_q = cs_n;

        SlaveTick { miso, rx }
    }
}
