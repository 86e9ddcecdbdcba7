//! Backend bring-up
//!
//! [`VulkanContext`] runs the whole bootstrap sequence against one window:
//! instance, validation, surface, physical device selection, logical device.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::backend::{probe_capabilities, DeviceCapabilities};
use crate::device::{self, DeviceRequirements};
use crate::error::Result;
use crate::instance::{InstanceConfig, VulkanInstance};
use crate::logical::LogicalDevice;
use crate::surface::Surface;

#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    pub instance: InstanceConfig,
    pub device: DeviceRequirements,
}

/// Fields drop in declaration order: device, surface, then instance.
pub struct VulkanContext {
    device: LogicalDevice,
    surface: Surface,
    capabilities: DeviceCapabilities,
    instance: VulkanInstance,
}

impl VulkanContext {
    /// Bring up Vulkan for `window`.
    ///
    /// The window must outlive the context.
    pub fn new<W>(window: &W, config: &RenderConfig) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window.display_handle()?.as_raw();
        let instance = VulkanInstance::new(&config.instance, display)?;
        let surface = Surface::new(&instance, window)?;

        // On early return, locals drop in reverse: surface, then instance
        let selected = device::select(device::enumerate(&instance, &surface)?, &config.device)?;
        let device = LogicalDevice::new(&instance, &selected, &config.device)?;

        let capabilities = probe_capabilities(&selected);
        tracing::info!(
            device = %capabilities.device_name,
            kind = ?capabilities.kind,
            api = %capabilities.api_version,
            max_texture_size = capabilities.max_texture_size,
            "Vulkan backend ready"
        );

        Ok(Self {
            device,
            surface,
            capabilities,
            instance,
        })
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    pub fn instance(&self) -> &VulkanInstance {
        &self.instance
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }
}
