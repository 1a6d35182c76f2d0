//! Public API for devmem.
//!
//! This module contains all user-facing types and functions.
//! Most users only need [`memory::DeviceMemory`] and [`buffer::DeviceBuffer`].

pub mod buffer;
pub mod config;
pub mod error;
pub mod memory;
pub mod stats;
pub mod transfer;
