//! Cycle-accurate model of a configurable SPI bus engine
//!
//! This crate models both halves of an SPI link at system-clock
//! resolution, one `tick()` per system-clock cycle:
//!
//! - Serial clock and edge-marker generation (all four CPOL/CPHA modes)
//! - MSB-first shift engines for the master and slave roles
//! - Burst sequencing with chip-select framing and inter-burst cooldown
//! - Multi-stage synchronization of the slave's receive-complete pulse
//!   from the serial-clock domain into the system-clock domain
//!
//! All state is register-equivalent scalars: within one tick every update
//! is computed from the previous tick's state, so the model reproduces
//! the visibility rules of registered hardware. Nothing here performs
//! real I/O; wire levels go in and out of `tick()` as values.

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod master;
pub mod mode;
pub mod signal;
pub mod slave;
