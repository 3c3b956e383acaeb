//! Bus-master engine
//!
//! [`Master`] composes the clock/edge generator with the shift engine
//! and transfers single bytes with no chip-select management of its own;
//! [`sequencer::SpiMaster`] wraps it with burst framing. The shift
//! engine consumes the clock markers one tick after they are produced,
//! which is the tick the matching transition appears on the serial clock
//! wire, so data movement and the visible waveform stay aligned the way
//! registered hardware keeps them aligned.

pub mod clock;
pub mod sequencer;
pub mod shifter;

use crate::config::MasterConfig;
use crate::signal::Level;
use clock::{ClockTick, EdgeClock};
use shifter::ShiftEngine;

/// Master engine outputs for one system tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MasterTick {
    /// Serial clock wire level
    pub sck: Level,
    /// Outbound data wire level
    pub mosi: Level,
    /// Engine accepts a new outbound byte
    pub ready: bool,
    /// Completed inbound byte, present for exactly one tick
    pub rx: Option<u8>,
}

/// Single-byte master engine: clock generation plus shift logic
#[derive(Debug, Clone)]
pub struct Master {
    clock: EdgeClock,
    shifter: ShiftEngine,
    /// Clock outputs from the previous tick, consumed by the shifter
    clk_q: ClockTick,
}

impl Master {
    /// Build a master engine in its idle state
    pub fn new(config: MasterConfig) -> Self {
        let clock = EdgeClock::new(config);
        let clk_q = ClockTick {
            leading: false,
            trailing: false,
            ready: false,
            sck: config.mode().polarity().idle_level(),
        };

        Self {
            clock,
            shifter: ShiftEngine::new(config.mode().phase()),
            clk_q,
        }
    }

    /// Return to the idle state
    pub fn reset(&mut self) {
        self.clock.reset();
        self.shifter.reset();
        self.clk_q = ClockTick {
            leading: false,
            trailing: false,
            ready: false,
            sck: self.clock.idle_level(),
        };
    }

    /// Ready level as of the last tick
    ///
    /// Stays false forever while a byte is in flight; a caller that
    /// never sees it rise again has wedged the engine's environment, not
    /// the engine.
    pub fn ready(&self) -> bool {
        self.clk_q.ready
    }

    /// Advance one system tick
    ///
    /// `tx` carries an outbound byte together with the start pulse;
    /// `miso` is the inbound data wire level for this tick.
    pub fn tick(&mut self, tx: Option<u8>, miso: Level) -> MasterTick {
        let clk_q = self.clk_q;
        let shift = self.shifter.tick(tx, &clk_q, miso);
        self.clk_q = self.clock.tick(tx.is_some());

        MasterTick {
            sck: self.clk_q.sck,
            mosi: shift.mosi,
            ready: self.clk_q.ready,
            rx: shift.rx,
        }
    }
}
