//! Vulkan backend tests. Need a Vulkan driver:
//!
//! cargo test --features gpu-vulkan -- --ignored

#![cfg(feature = "gpu-vulkan")]

use ash::vk;
use devmem::gpu::vulkan::VulkanBackend;
use devmem::{DeviceConfig, DeviceMemory};
use std::sync::Arc;

struct VulkanContext {
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: Arc<ash::Device>,
}

impl VulkanContext {
    fn new() -> Self {
        let entry = unsafe { ash::Entry::load() }.expect("no Vulkan loader");
        let app_info = vk::ApplicationInfo::builder().api_version(vk::API_VERSION_1_0);
        let instance_info = vk::InstanceCreateInfo::builder().application_info(&app_info);
        let instance = unsafe { entry.create_instance(&instance_info, None) }.expect("create instance");

        let physical_device = unsafe { instance.enumerate_physical_devices() }
            .expect("enumerate devices")
            .into_iter()
            .next()
            .expect("no Vulkan device");

        let priorities = [1.0f32];
        let queue_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(0)
            .queue_priorities(&priorities);
        let queue_infos = [queue_info.build()];
        let device_info = vk::DeviceCreateInfo::builder().queue_create_infos(&queue_infos);
        let device = unsafe { instance.create_device(physical_device, &device_info, None) }
            .expect("create device");

        Self {
            _entry: entry,
            instance,
            physical_device,
            device: Arc::new(device),
        }
    }

    fn backend(&self) -> VulkanBackend {
        VulkanBackend::new(self.device.clone(), self.physical_device, &self.instance)
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            if let Some(device) = Arc::get_mut(&mut self.device) {
                device.destroy_device(None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

#[test]
#[ignore = "requires a Vulkan device"]
fn test_vulkan_round_trip() {
    let context = VulkanContext::new();
    let memory = DeviceMemory::new(context.backend(), DeviceConfig::default());
    assert_eq!(memory.backend_name(), "vulkan");

    let host: Vec<u8> = (0x11..=0xAAu8).cycle().take(4096).collect();
    let mut buffer = memory.allocate(4096).unwrap();
    memory.upload(&host, &mut buffer, 4096).unwrap();

    let mut host2 = vec![0u8; 4096];
    memory.download(&buffer, &mut host2, 4096).unwrap();
    assert_eq!(host2, host);

    buffer.free().unwrap();
    assert!(memory.live_allocations().is_empty());
}

#[test]
#[ignore = "requires a Vulkan device"]
fn test_vulkan_backend_drop_releases_held_buffers() {
    let context = VulkanContext::new();
    let memory = DeviceMemory::new(context.backend(), DeviceConfig::default());

    let before = memory.mem_info().unwrap();
    let held = memory.allocate(1 << 16).unwrap();
    let _raw = held.into_raw();
    assert!(memory.mem_info().unwrap().free < before.free);

    // Dropping the facade drops the backend, which destroys what it still holds.
    drop(memory);
    assert_eq!(Arc::strong_count(&context.device), 1);
}
