// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Error types for the display list engine.
//!
//! Exhaustion of a pool is not an error: acquiring from an empty pool
//! returns `None` and the caller backs off. The types here describe misuse
//! of the protocol and failures of the platform.

use thiserror::Error;

/// Device-visible memory could not be provided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The allocator has no memory left.
    #[error("device-visible allocation of {size} bytes failed")]
    OutOfMemory {
        /// Requested size in bytes.
        size: usize,
    },
    /// Zero bodies, zero entries or a size that overflows.
    #[error("invalid pool geometry: {count} x {stride} bytes")]
    InvalidGeometry {
        /// Number of elements requested.
        count: usize,
        /// Bytes per element.
        stride: usize,
    },
}

/// A register write into a body was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BodyError {
    /// The body already holds its maximum number of entries.
    #[error("body full ({max_entries} entries)")]
    Full {
        /// Capacity of the body.
        max_entries: usize,
    },
    /// The body is referenced by more than one holder and may be in flight.
    #[error("body is shared ({refcount} references), contents are frozen")]
    Shared {
        /// Current reference count.
        refcount: u32,
    },
}

/// An operation requires header mode or more header capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ModeError {
    /// Headerless lists hold exactly one body and cannot be chained.
    #[error("operation requires header mode")]
    Headerless,
    /// The header already references the maximum number of bodies.
    #[error("header already references {max} bodies")]
    HeaderFull {
        /// Bodies one header can reference.
        max: usize,
    },
    /// The list being chained belongs to another manager.
    #[error("display list belongs to another manager")]
    ForeignList,
}

/// Extended command data was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// The auto-field command has no slot for this input.
    #[error("auto-field input {input} out of range (max {max})")]
    InputOutOfRange {
        /// Requested input.
        input: usize,
        /// Number of inputs the command describes.
        max: usize,
    },
}

/// A pool was destroyed while elements were still checked out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("pool destroyed with {outstanding} of {capacity} elements outstanding")]
pub struct DestroyError {
    /// Elements not yet returned.
    pub outstanding: usize,
    /// Elements the pool was created with.
    pub capacity: usize,
}
