//! Burst transaction sequencer
//!
//! Wraps the single-byte [`Master`](super::Master) engine with
//! chip-select framing: a burst of up to the configured number of bytes
//! is carried under one chip-select assertion, followed by a mandatory
//! inactive gap before the next burst may begin.

use super::{Master, MasterTick};
use crate::config::{BurstConfig, MasterConfig};
use crate::signal::Level;

/// Sequencer states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerState {
    /// Chip-select inactive, waiting for a start pulse
    Idle,
    /// Chip-select active, bytes moving
    Transfer,
    /// Chip-select released, counting down the inter-burst gap
    Cooldown,
}

/// Outbound byte plus the start pulse it rides in on
///
/// `burst_len` is latched when the request opens a new burst and sets
/// how many bytes the chip-select assertion will carry; it is ignored on
/// continuation bytes within a burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxRequest {
    pub byte: u8,
    pub burst_len: u16,
}

/// Sequencer outputs for one system tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequencerTick {
    /// Serial clock wire level
    pub sck: Level,
    /// Outbound data wire level
    pub mosi: Level,
    /// Chip-select wire level (low = asserted)
    pub cs_n: Level,
    /// Sequencer accepts a new outbound byte
    pub ready: bool,
    /// Completed inbound byte, present for exactly one tick
    pub rx: Option<u8>,
    /// Completed inbound bytes this burst, as of the previous tick
    pub rx_index: u16,
}

/// Burst-sequencing SPI master
#[derive(Debug, Clone)]
pub struct SpiMaster {
    engine: Master,
    burst: BurstConfig,
    state: SequencerState,
    cs_n: Level,
    /// Bytes still owed to the current burst after the one in flight
    tx_remaining: u16,
    cooldown_left: u32,
    rx_count: u16,
    /// Engine outputs from the previous tick; the sequencer observes the
    /// engine with register visibility, never mid-tick
    engine_q: MasterTick,
}

impl SpiMaster {
    /// Build a sequencing master in its idle state
    pub fn new(config: MasterConfig, burst: BurstConfig) -> Self {
        Self {
            engine: Master::new(config),
            burst,
            state: SequencerState::Idle,
            cs_n: Level::High,
            tx_remaining: 0,
            cooldown_left: burst.cooldown_ticks(),
            rx_count: 0,
            engine_q: MasterTick {
                sck: config.mode().polarity().idle_level(),
                mosi: Level::Low,
                ready: false,
                rx: None,
            },
        }
    }

    /// Return to the idle state with chip-select inactive
    pub fn reset(&mut self) {
        self.engine.reset();
        self.state = SequencerState::Idle;
        self.cs_n = Level::High;
        self.tx_remaining = 0;
        self.cooldown_left = self.burst.cooldown_ticks();
        self.rx_count = 0;
        self.engine_q.ready = false;
        self.engine_q.rx = None;
    }

    /// Current sequencer state
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// True while chip-select is driven low
    pub fn cs_asserted(&self) -> bool {
        self.cs_n == Level::Low
    }

    /// Completed inbound bytes this burst
    pub fn rx_count(&self) -> u16 {
        self.rx_count
    }

    /// Advance one system tick
    pub fn tick(&mut self, tx: Option<TxRequest>, miso: Level) -> SequencerTick {
        let start = tx.is_some();
        let engine_q = self.engine_q;
        let cs_n_q = self.cs_n;

        match self.state {
            SequencerState::Idle => {
                if cs_n_q == Level::High {
                    if let Some(req) = tx {
                        // First byte goes straight into the engine; the
                        // counter tracks what the burst still owes.
                        let len = req.burst_len.clamp(1, self.burst.max_bytes_per_burst());
                        self.tx_remaining = len - 1;
                        self.cs_n = Level::Low;
                        self.state = SequencerState::Transfer;
                    }
                }
            }
            SequencerState::Transfer => {
                if engine_q.ready {
                    if self.tx_remaining > 0 {
                        if start {
                            self.tx_remaining -= 1;
                        }
                    } else {
                        self.cs_n = Level::High;
                        self.cooldown_left = self.burst.cooldown_ticks();
                        self.state = SequencerState::Cooldown;
                    }
                }
            }
            SequencerState::Cooldown => {
                // A cooldown of 0 or 1 spends a single tick here.
                if self.cooldown_left > 1 {
                    self.cooldown_left -= 1;
                } else {
                    self.state = SequencerState::Idle;
                }
            }
        }

        // Inbound byte index: cleared while chip-select is inactive,
        // stepped the tick after each completed byte.
        if cs_n_q == Level::High {
            self.rx_count = 0;
        } else if engine_q.rx.is_some() {
            self.rx_count += 1;
        }

        let out = self.engine.tick(tx.map(|req| req.byte), miso);
        self.engine_q = out;

        let ready = !start
            && match self.state {
                SequencerState::Idle => true,
                SequencerState::Transfer => out.ready && self.tx_remaining > 0,
                SequencerState::Cooldown => false,
            };

        SequencerTick {
            sck: out.sck,
            mosi: out.mosi,
            cs_n: self.cs_n,
            ready,
            rx: out.rx,
            rx_index: self.rx_count,
        }
    }
}
