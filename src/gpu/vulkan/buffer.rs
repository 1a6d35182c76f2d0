//! Vulkan buffer implementation

use std::ptr;

use ash::vk;

use super::super::traits::BackendError;

/// A Vulkan buffer bound to its own host-visible, host-coherent memory and mapped for its whole life
pub struct VulkanBuffer {
    /// Raw Vulkan buffer handle
    pub vk_buffer: vk::Buffer,
    /// Raw Vulkan device memory handle
    pub vk_memory: vk::DeviceMemory,
    /// Size in bytes
    size: usize,
    /// Persistent mapping of `vk_memory`
    mapped_ptr: *mut u8,
}

impl VulkanBuffer {
    /// Create, bind and map a buffer of exactly `size` bytes.
    ///
    /// Every object created before a failing step is destroyed before returning.
    pub fn new(
        device: &ash::Device,
        size: usize,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
    ) -> Result<Self, BackendError> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size as u64)
            .usage(vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST | vk::BufferUsageFlags::STORAGE_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let vk_buffer = unsafe { device.create_buffer(&buffer_info, None) }
            .map_err(|e| vk_error(e, size))?;

        let mem_requirements = unsafe { device.get_buffer_memory_requirements(vk_buffer) };

        let memory_type_index = match find_memory_type(memory_properties, mem_requirements.memory_type_bits) {
            Ok(index) => index,
            Err(e) => {
                unsafe { device.destroy_buffer(vk_buffer, None) };
                return Err(e);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(mem_requirements.size)
            .memory_type_index(memory_type_index);

        let vk_memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(vk_buffer, None) };
                return Err(vk_error(e, size));
            }
        };

        let mapped = unsafe {
            device
                .bind_buffer_memory(vk_buffer, vk_memory, 0)
                .and_then(|_| device.map_memory(vk_memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty()))
        };

        let mapped_ptr = match mapped {
            Ok(p) => p as *mut u8,
            Err(e) => {
                unsafe {
                    device.free_memory(vk_memory, None);
                    device.destroy_buffer(vk_buffer, None);
                }
                return Err(vk_error(e, size));
            }
        };

        Ok(Self {
            vk_buffer,
            vk_memory,
            size,
            mapped_ptr,
        })
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Copy `src` to the start of the buffer.
    pub fn write(&self, src: &[u8]) -> Result<(), BackendError> {
        if src.len() > self.size {
            return Err(BackendError::OutOfRange {
                capacity: self.size,
                requested: src.len(),
            });
        }
        // SAFETY: the mapping covers `size` bytes and host-coherent memory needs no flush.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), self.mapped_ptr, src.len()) };
        Ok(())
    }

    /// Fill `dst` from the start of the buffer.
    pub fn read(&self, dst: &mut [u8]) -> Result<(), BackendError> {
        if dst.len() > self.size {
            return Err(BackendError::OutOfRange {
                capacity: self.size,
                requested: dst.len(),
            });
        }
        // SAFETY: as in `write`.
        unsafe { ptr::copy_nonoverlapping(self.mapped_ptr, dst.as_mut_ptr(), dst.len()) };
        Ok(())
    }

    /// Unmap and release the memory and the buffer.
    ///
    /// # Safety
    ///
    /// `device` must be the device that created this buffer, and the GPU must
    /// no longer be using it.
    pub unsafe fn destroy(self, device: &ash::Device) {
        device.unmap_memory(self.vk_memory);
        device.free_memory(self.vk_memory, None);
        device.destroy_buffer(self.vk_buffer, None);
    }
}

// The mapping is only dereferenced under the backend's lock.
unsafe impl Send for VulkanBuffer {}
unsafe impl Sync for VulkanBuffer {}

/// Find a host-visible, host-coherent memory type allowed by `type_filter`
fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
) -> Result<u32, BackendError> {
    let wanted = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;

    (0..memory_properties.memory_type_count)
        .find(|&i| {
            let allowed = type_filter & (1 << i) != 0;
            let flags = memory_properties.memory_types[i as usize].property_flags;
            allowed && flags.contains(wanted)
        })
        .ok_or_else(|| BackendError::api(0, "no host-visible, host-coherent memory type"))
}

/// Convert a Vulkan result code into a backend error
pub(super) fn vk_error(result: vk::Result, requested: usize) -> BackendError {
    match result {
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
            BackendError::OutOfMemory { requested }
        }
        other => BackendError::api(other.as_raw() as i64, format!("{:?}", other)),
    }
}
