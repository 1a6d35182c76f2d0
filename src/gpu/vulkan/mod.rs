//! Vulkan backend for device memory
//!
//! This module provides a Vulkan implementation of the DeviceBackend trait using the ash crate.
//! Buffers live in host-visible, host-coherent memory and are copied through a persistent mapping.

pub mod backend;
pub mod buffer;

pub use backend::VulkanBackend;
pub use buffer::VulkanBuffer;
