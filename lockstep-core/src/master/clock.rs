//! Serial clock and edge-marker generation
//!
//! Derives the serial clock from the system clock with a configurable
//! half-bit divider and marks each clock transition with a one-tick
//! leading-edge or trailing-edge pulse. Sixteen edges are generated per
//! requested byte (8 bit periods, 2 edges each).

use crate::config::MasterConfig;
use crate::mode::Polarity;
use crate::signal::Level;

/// Clock generator outputs for one system tick
///
/// The marker pulses are registered: logic that acts on them does so on
/// the following tick, which is when the corresponding transition
/// appears on the (also registered) `sck` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockTick {
    /// First transition of a bit period occurred
    pub leading: bool,
    /// Second transition of a bit period occurred
    pub trailing: bool,
    /// No byte in flight and none requested
    pub ready: bool,
    /// Serial clock wire level
    pub sck: Level,
}

/// Serial clock / edge generator
#[derive(Debug, Clone)]
pub struct EdgeClock {
    polarity: Polarity,
    half_bit: u32,
    /// Divider position, 0..2*half_bit
    count: u32,
    /// Edges remaining in the byte in flight
    edges_left: u8,
    /// Internal (pre-output-register) clock level
    sck: Level,
    /// Registered clock output, one tick behind `sck`
    sck_out: Level,
    ready: bool,
}

impl EdgeClock {
    /// Build a clock generator in its idle state
    pub fn new(config: MasterConfig) -> Self {
        let polarity = config.mode().polarity();
        Self {
            polarity,
            half_bit: config.half_bit_divider(),
            count: 0,
            edges_left: 0,
            sck: polarity.idle_level(),
            sck_out: polarity.idle_level(),
            ready: false,
        }
    }

    /// Return to the idle state
    pub fn reset(&mut self) {
        self.count = 0;
        self.edges_left = 0;
        self.sck = self.polarity.idle_level();
        self.sck_out = self.polarity.idle_level();
        self.ready = false;
    }

    /// Ready level as of the last tick
    pub fn ready(&self) -> bool {
        self.ready
    }

    /// Level the serial clock rests at between transfers
    pub fn idle_level(&self) -> Level {
        self.polarity.idle_level()
    }

    /// Advance one system tick
    ///
    /// `start` requests a byte: the edge counter reloads to 16 and the
    /// divider runs until all edges have been produced.
    pub fn tick(&mut self, start: bool) -> ClockTick {
        let sck_q = self.sck;

        let mut leading = false;
        let mut trailing = false;

        if start {
            self.ready = false;
            self.edges_left = 16;
        } else if self.edges_left > 0 {
            self.ready = false;

            if self.count == 2 * self.half_bit - 1 {
                self.edges_left -= 1;
                trailing = true;
                self.count = 0;
                self.sck = self.sck.toggled();
            } else if self.count == self.half_bit - 1 {
                self.edges_left -= 1;
                leading = true;
                self.count += 1;
                self.sck = self.sck.toggled();
            } else {
                self.count += 1;
            }
        } else {
            self.ready = true;
        }

        // Registered output stage: the wire follows the internal clock
        // one tick later, in step with the marker pulses.
        self.sck_out = sck_q;

        ClockTick {
            leading,
            trailing,
            ready: self.ready,
            sck: self.sck_out,
        }
    }
}
