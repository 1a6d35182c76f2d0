//! Vulkan backend implementation

use std::collections::HashMap;
use std::sync::Arc;

use ash::vk::{self, Handle};

use super::super::traits::{BackendError, DeviceBackend, DevicePtr, MemInfo};
use super::buffer::VulkanBuffer;
use crate::diagnostics::macros::dm_log;
use crate::sync::mutex::Mutex;

/// Vulkan-based device backend
///
/// Handles are the raw `VkBuffer` values. The caller keeps the instance and
/// device alive for as long as the backend exists.
pub struct VulkanBackend {
    /// Vulkan device
    device: Arc<ash::Device>,
    /// Memory properties of the physical device
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Live buffers keyed by handle
    buffers: Mutex<HashMap<DevicePtr, VulkanBuffer>>,
}

impl VulkanBackend {
    /// Create a new Vulkan backend
    pub fn new(device: Arc<ash::Device>, physical_device: vk::PhysicalDevice, instance: &ash::Instance) -> Self {
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };

        Self {
            device,
            memory_properties,
            buffers: Mutex::new(HashMap::new()),
        }
    }

    /// Size of the largest device-local heap
    fn device_local_heap_size(&self) -> usize {
        let heap_count = self.memory_properties.memory_heap_count as usize;
        self.memory_properties.memory_heaps[..heap_count]
            .iter()
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size as usize)
            .max()
            .unwrap_or(0)
    }

    fn used_bytes(&self) -> usize {
        self.buffers.lock().values().map(VulkanBuffer::size).sum()
    }
}

impl DeviceBackend for VulkanBackend {
    fn name(&self) -> &str {
        "vulkan"
    }

    fn malloc(&self, size: usize) -> Result<DevicePtr, BackendError> {
        let buffer = VulkanBuffer::new(&self.device, size, &self.memory_properties)?;
        let ptr = DevicePtr::from_raw(buffer.vk_buffer.as_raw());
        self.buffers.lock().insert(ptr, buffer);
        Ok(ptr)
    }

    /// A failed idle wait keeps the buffer tracked; it is destroyed when the
    /// backend drops.
    fn free(&self, ptr: DevicePtr) -> Result<(), BackendError> {
        let mut buffers = self.buffers.lock();
        if !buffers.contains_key(&ptr) {
            return Err(BackendError::InvalidHandle(ptr));
        }

        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| super::buffer::vk_error(e, 0))?;
        }

        if let Some(buffer) = buffers.remove(&ptr) {
            unsafe { buffer.destroy(&self.device) };
        }
        Ok(())
    }

    fn copy_htod(&self, src: &[u8], dst: DevicePtr) -> Result<(), BackendError> {
        let buffers = self.buffers.lock();
        let buffer = buffers.get(&dst).ok_or(BackendError::InvalidHandle(dst))?;
        buffer.write(src)
    }

    fn copy_dtoh(&self, src: DevicePtr, dst: &mut [u8]) -> Result<(), BackendError> {
        let buffers = self.buffers.lock();
        let buffer = buffers.get(&src).ok_or(BackendError::InvalidHandle(src))?;
        buffer.read(dst)
    }

    fn mem_info(&self) -> Option<MemInfo> {
        let total = self.device_local_heap_size();
        Some(MemInfo {
            free: total.saturating_sub(self.used_bytes()),
            total,
        })
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        let buffers = std::mem::take(&mut *self.buffers.lock());
        if buffers.is_empty() {
            return;
        }

        dm_log!(debug, "destroying {} vulkan buffer(s) still held by the backend", buffers.len());
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                dm_log!(warn, "vkDeviceWaitIdle failed before backend teardown: {:?}", e);
            }
            for buffer in buffers.into_values() {
                buffer.destroy(&self.device);
            }
        }
    }
}
