//! CUDA backend for device memory
//!
//! This module implements the DeviceBackend trait over the CUDA driver API using the cudarc crate.

pub mod backend;

pub use backend::CudaBackend;
