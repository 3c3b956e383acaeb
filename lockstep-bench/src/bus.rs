//! Master/slave pair joined by registered wires
//!
//! Both engines advance from the same system-tick loop, but each one
//! reads the wire levels the other drove on the previous tick. That
//! one-tick registration is the whole concurrency model: no engine ever
//! observes the other mid-update, and a transition an engine emits on
//! tick *n* reaches its peer on tick *n+1*.

use heapless::Vec;
use lockstep_core::config::{BurstConfig, MasterConfig};
use lockstep_core::master::sequencer::{SequencerState, SequencerTick, SpiMaster, TxRequest};
use lockstep_core::signal::{Level, LineState};
use lockstep_core::slave::{Slave, SlaveTick};

/// Most bytes a [`Bus::burst`] call will collect per direction
pub const MAX_BURST_BYTES: usize = 16;

/// Wire levels between the two engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Wires {
    /// Serial clock, master to slave
    pub sck: Level,
    /// Data line, master to slave
    pub mosi: Level,
    /// Data line, slave to master; released while the slave is deselected
    pub miso: LineState,
    /// Chip-select, master to slave (low = asserted)
    pub cs_n: Level,
}

/// Outputs of both engines for one system tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusTick {
    pub master: SequencerTick,
    pub slave: SlaveTick,
}

/// Byte streams collected by [`Bus::burst`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BurstResult {
    /// Bytes the master received, in arrival order
    pub master_rx: Vec<u8, MAX_BURST_BYTES>,
    /// Bytes the slave received, in arrival order
    pub slave_rx: Vec<u8, MAX_BURST_BYTES>,
    /// System ticks the exchange took
    pub ticks: u32,
}

/// One master and one slave on a shared set of wires
#[derive(Debug, Clone)]
pub struct Bus {
    master: SpiMaster,
    slave: Slave,
    wires: Wires,
}

impl Bus {
    /// Build an idle bus; both engines share the configured mode
    pub fn new(config: MasterConfig, burst: BurstConfig) -> Self {
        Self {
            master: SpiMaster::new(config, burst),
            slave: Slave::new(config.mode()),
            wires: Wires {
                sck: config.mode().polarity().idle_level(),
                mosi: Level::Low,
                miso: LineState::HighZ,
                cs_n: Level::High,
            },
        }
    }

    /// Wire levels as driven at the end of the last tick
    pub fn wires(&self) -> Wires {
        self.wires
    }

    /// The master engine, for state queries
    pub fn master(&self) -> &SpiMaster {
        &self.master
    }

    /// The slave engine, for state queries
    pub fn slave(&self) -> &Slave {
        &self.slave
    }

    /// Advance both engines one system tick
    ///
    /// `master_tx` and `slave_tx` are the caller-side inputs of the
    /// respective engines. A released data line reads as low on the
    /// master side, as a weak pull-down would make it.
    pub fn tick(&mut self, master_tx: Option<TxRequest>, slave_tx: Option<u8>) -> BusTick {
        let w = self.wires;
        let miso = w.miso.driven().unwrap_or(Level::Low);

        let master = self.master.tick(master_tx, miso);
        let slave = self.slave.tick(slave_tx, w.sck, w.mosi, w.cs_n);

        self.wires = Wires {
            sck: master.sck,
            mosi: master.mosi,
            miso: slave.miso,
            cs_n: master.cs_n,
        };

        BusTick { master, slave }
    }

    /// Exchange a whole burst and collect both directions
    ///
    /// `tx` feeds the master, one byte per ready handshake, under a
    /// single chip-select assertion (subject to the configured burst
    /// cap). `reply[0]` is preloaded into the slave before the burst
    /// opens; each later reply byte is loaded on the tick after the
    /// previous one completes, which is the earliest a caller reacting
    /// to the valid pulse could manage.
    ///
    /// Per-tick stepping via [`Bus::tick`] stays the primary interface;
    /// this is a convenience for exercising exchanges end to end.
    pub fn burst(&mut self, tx: &[u8], reply: &[u8]) -> BurstResult {
        let mut result = BurstResult::default();
        if tx.is_empty() {
            return result;
        }

        if let Some(&first) = reply.first() {
            self.tick(None, Some(first));
            result.ticks += 1;
        }

        let mut out = self.tick(
            Some(TxRequest {
                byte: tx[0],
                burst_len: tx.len() as u16,
            }),
            None,
        );
        result.ticks += 1;

        let mut next_tx = 1;
        let mut next_reply = 1;

        for _ in 0..1_000_000u32 {
            let master_tx = if out.master.ready && next_tx < tx.len() {
                let byte = tx[next_tx];
                next_tx += 1;
                Some(TxRequest {
                    byte,
                    burst_len: 0,
                })
            } else {
                None
            };

            let slave_tx = if out.slave.rx.is_some() && next_reply < reply.len() {
                let byte = reply[next_reply];
                next_reply += 1;
                Some(byte)
            } else {
                None
            };

            out = self.tick(master_tx, slave_tx);
            result.ticks += 1;

            if let Some(byte) = out.master.rx {
                let _ = result.master_rx.push(byte);
            }
            if let Some(byte) = out.slave.rx {
                let _ = result.slave_rx.push(byte);
            }

            if self.master.state() == SequencerState::Idle && next_tx >= tx.len() {
                // A short cooldown can reach idle while the slave's
                // last handoff is still inside the synchronizer; give
                // it time to drain.
                for _ in 0..4 {
                    let tail = self.tick(None, None);
                    result.ticks += 1;
                    if let Some(byte) = tail.master.rx {
                        let _ = result.master_rx.push(byte);
                    }
                    if let Some(byte) = tail.slave.rx {
                        let _ = result.slave_rx.push(byte);
                    }
                }
                return result;
            }
        }
        panic!("burst never completed");
    }
}
