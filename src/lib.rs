//! Live-interval data structures for linear-scan register allocation.
//!
//! A linear-scan register allocator works on one *live interval* per value:
//! the ordered set of instruction positions where the value must be kept in
//! a register or spill slot. This crate provides that data structure: the
//! coalesced range list built up by liveness analysis, and the `split`
//! operation the allocator uses when an active interval has to give up its
//! register at some program position.
//!
//! The allocator and the liveness analysis themselves are not part of this
//! crate; they drive it through [`LiveInterval::add_range`],
//! [`LiveInterval::split`] and the query methods.

#![deny(missing_docs, trivial_numeric_casts)]
#![warn(unused_import_braces)]
#![no_std]

#[cfg(test)]
extern crate alloc;

pub mod liverange;

mod result;

pub use crate::liverange::{LiveInterval, LiveRange, Position, RegUnit};
pub use crate::result::{IntervalError, IntervalResult};

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
