// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared hardware definitions for the R-Car VSP display list engine and the
//! DU display controller.
//!
//! This crate defines the contract between software and the device:
//! - The DMA address type used for everything the device reads
//! - Register offsets and bit fields for the VSP and the DU
//! - The in-memory layout of display list bodies, headers and extended
//!   commands
//! - Per-generation hardware description tables
//!
//! # Design Principles
//!
//! - **No dependencies**: Pure data types, 100% host-testable
//! - **Layout as constants**: Every memory structure the device parses is
//!   described by word offsets, never by a Rust struct the compiler may pad

#![no_std]

#[cfg(test)]
extern crate std;

pub mod addr;
pub mod du;
pub mod generation;
pub mod layout;
pub mod vsp;

pub use addr::DmaAddr;
pub use generation::{DeviceInfo, Generation};

#[cfg(test)]
mod addr_test;
