//! Host-side harness for the lockstep SPI engines
//!
//! Wires a sequencing master and a slave together through a registered
//! wire bundle and steps both from one system-tick loop, plus a bounded
//! edge recorder for waveform assertions. The engines under test never
//! see each other directly; everything crosses through the wire
//! snapshot, one tick late, the way two registered modules see each
//! other on a board.

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod probe;
