//! Logical device and queue retrieval

use ash::vk;

use crate::device::{Candidate, DeviceRequirements};
use crate::error::{RenderError, Result};
use crate::instance::VulkanInstance;

pub struct LogicalDevice {
    device: ash::Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    graphics_family: u32,
    present_family: u32,
}

impl LogicalDevice {
    pub fn new(
        instance: &VulkanInstance,
        selected: &Candidate,
        requirements: &DeviceRequirements,
    ) -> Result<Self> {
        let graphics_family = selected.graphics_family;
        let present_family = selected.present_family;

        let priorities = [1.0f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = selected
            .unique_families()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();

        let mut extensions = requirements.extension_ptrs();
        // Mandatory whenever a portability implementation (MoltenVK) advertises it
        if selected.info.has_extension(ash::khr::portability_subset::NAME) {
            extensions.push(ash::khr::portability_subset::NAME.as_ptr());
        }

        let features = vk::PhysicalDeviceFeatures::default();
        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .raw()
                .create_device(selected.info.handle, &create_info, None)
        }
        .map_err(RenderError::vk("vkCreateDevice"))?;

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };

        tracing::info!(
            graphics_family,
            present_family,
            extensions = extensions.len(),
            "Logical device created"
        );

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            graphics_family,
            present_family,
        })
    }

    pub fn raw(&self) -> &ash::Device {
        &self.device
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn graphics_family(&self) -> u32 {
        self.graphics_family
    }

    pub fn present_family(&self) -> u32 {
        self.present_family
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            if let Err(err) = self.device.device_wait_idle() {
                tracing::warn!("vkDeviceWaitIdle failed during shutdown: {err:?}");
            }
            self.device.destroy_device(None);
        }
    }
}
