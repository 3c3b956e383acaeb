//! Waveform-level properties observed on the shared wires

use lockstep_bench::bus::Bus;
use lockstep_bench::probe::EdgeProbe;
use lockstep_core::config::{BurstConfig, MasterConfig};
use lockstep_core::master::sequencer::{SequencerState, TxRequest};
use lockstep_core::mode::Mode;
use lockstep_core::signal::{Level, LineState};

struct BurstTrace {
    sck_edges_while_selected: usize,
    cs_low_ticks: u32,
    master_pulses: u32,
    master_byte: Option<u8>,
    slave_pulses: u32,
    slave_byte: Option<u8>,
    /// MISO carried the reply MSB on every selected tick before the
    /// first clock edge (discounting the tick select needs to cross
    /// the registered wires)
    preload_ok: bool,
    /// MISO left high impedance while deselected
    miso_driven_while_deselected: bool,
    /// Serial clock moved while deselected
    sck_active_while_deselected: bool,
}

/// Run one burst and watch the wires every tick.
fn run_burst(mode: Mode, divider: u32, tx: &[u8], reply: u8) -> BurstTrace {
    let mut bus = Bus::new(
        MasterConfig::new(mode, divider).unwrap(),
        BurstConfig::new(8, 2).unwrap(),
    );
    let idle_sck = mode.polarity().idle_level();
    let mut probe = EdgeProbe::<256>::new();
    let mut trace = BurstTrace {
        sck_edges_while_selected: 0,
        cs_low_ticks: 0,
        master_pulses: 0,
        master_byte: None,
        slave_pulses: 0,
        slave_byte: None,
        preload_ok: true,
        miso_driven_while_deselected: false,
        sck_active_while_deselected: false,
    };

    bus.tick(None, Some(reply));
    let mut out = bus.tick(
        Some(TxRequest {
            byte: tx[0],
            burst_len: tx.len() as u16,
        }),
        None,
    );
    let mut next_tx = 1;

    for _ in 0..100_000u32 {
        let w = bus.wires();
        if w.cs_n == Level::Low {
            trace.cs_low_ticks += 1;
            probe.observe(w.sck);
            if trace.cs_low_ticks >= 2 && probe.edges().is_empty() {
                // Select has reached the slave and no edge exists yet:
                // the line must already carry the reply's MSB.
                let expected = LineState::from(Level::from_bit(reply, 7));
                if w.miso != expected {
                    trace.preload_ok = false;
                }
            }
        } else {
            if w.miso != LineState::HighZ {
                trace.miso_driven_while_deselected = true;
            }
            if w.sck != idle_sck {
                trace.sck_active_while_deselected = true;
            }
        }

        if let Some(byte) = out.master.rx {
            trace.master_pulses += 1;
            trace.master_byte = Some(byte);
        }
        if let Some(byte) = out.slave.rx {
            trace.slave_pulses += 1;
            trace.slave_byte = Some(byte);
        }

        if bus.master().state() == SequencerState::Idle && next_tx >= tx.len() {
            assert!(!probe.overflowed());
            trace.sck_edges_while_selected = probe.edges().len();
            return trace;
        }

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
        out = bus.tick(master_tx, None);
    }
    panic!("burst never completed");
}

#[test]
fn test_sixteen_edges_per_byte() {
    for mode in Mode::ALL {
        for divider in [2, 3, 8] {
            let trace = run_burst(mode, divider, &[0xA5], 0x3C);
            assert_eq!(
                trace.sck_edges_while_selected, 16,
                "mode {:?} div {}",
                mode, divider
            );
        }
    }
}

#[test]
fn test_burst_edge_count_scales_with_bytes() {
    for n in 1..=4usize {
        let bytes = [0x11, 0x22, 0x33, 0x44];
        let trace = run_burst(Mode::Mode0, 2, &bytes[..n], 0x00);
        assert_eq!(trace.sck_edges_while_selected, 16 * n);
    }
}

#[test]
fn test_exactly_one_valid_pulse_each_side() {
    for mode in Mode::ALL {
        let trace = run_burst(mode, 2, &[0x81], 0x7E);
        assert_eq!(trace.master_pulses, 1, "mode {:?}", mode);
        assert_eq!(trace.slave_pulses, 1, "mode {:?}", mode);
        assert_eq!(trace.master_byte, Some(0x7E));
        assert_eq!(trace.slave_byte, Some(0x81));
    }
}

#[test]
fn test_preload_visible_before_first_edge() {
    for mode in Mode::ALL {
        for reply in [0x80u8, 0x3C, 0x7F] {
            let trace = run_burst(mode, 3, &[0x00], reply);
            assert!(trace.preload_ok, "mode {:?} reply {:#04x}", mode, reply);
        }
    }
}

#[test]
fn test_data_line_released_while_deselected() {
    for mode in Mode::ALL {
        let trace = run_burst(mode, 2, &[0xF0], 0x0F);
        assert!(!trace.miso_driven_while_deselected, "mode {:?}", mode);
    }
}

#[test]
fn test_clock_quiet_while_deselected() {
    for mode in Mode::ALL {
        let trace = run_burst(mode, 2, &[0x55], 0xAA);
        assert!(!trace.sck_active_while_deselected, "mode {:?}", mode);
    }
}

#[test]
fn test_reference_exchange() {
    // Mode 0, half-bit divider 2, master sends 0xA5 against a slave
    // loaded with 0x3C: one byte each way, sixteen serial half-periods
    // under chip-select.
    let trace = run_burst(Mode::Mode0, 2, &[0xA5], 0x3C);
    assert_eq!(trace.master_byte, Some(0x3C));
    assert_eq!(trace.slave_byte, Some(0xA5));
    assert_eq!(trace.master_pulses, 1);
    assert_eq!(trace.slave_pulses, 1);
    assert_eq!(trace.sck_edges_while_selected, 16);
    // 16 half-periods of 2 ticks each, plus the framing registers.
    assert!(trace.cs_low_ticks >= 32);
}
