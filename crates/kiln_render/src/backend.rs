//! Rendering backend capabilities
//!
//! Summarizes the selected GPU for the rest of the engine.

use ash::vk;

use crate::device::Candidate;
use crate::instance::ApiVersion;

/// Physical GPU category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuKind {
    Discrete,
    Integrated,
    Virtual,
    /// Software rasterizer (llvmpipe, SwiftShader)
    Cpu,
    Other,
}

impl From<vk::PhysicalDeviceType> for GpuKind {
    fn from(ty: vk::PhysicalDeviceType) -> Self {
        match ty {
            vk::PhysicalDeviceType::DISCRETE_GPU => Self::Discrete,
            vk::PhysicalDeviceType::INTEGRATED_GPU => Self::Integrated,
            vk::PhysicalDeviceType::VIRTUAL_GPU => Self::Virtual,
            vk::PhysicalDeviceType::CPU => Self::Cpu,
            _ => Self::Other,
        }
    }
}

/// Capability probe result
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    pub device_name: String,
    pub kind: GpuKind,
    pub api_version: ApiVersion,
    pub max_texture_size: u32,
    pub supports_compute: bool,
    pub graphics_family: u32,
    pub present_family: u32,
}

/// Probe rendering capabilities of the selected device
pub fn probe_capabilities(selected: &Candidate) -> DeviceCapabilities {
    let info = &selected.info;

    let supports_compute = info
        .queue_families
        .iter()
        .any(|f| f.flags.contains(vk::QueueFlags::COMPUTE));

    DeviceCapabilities {
        device_name: info.name.clone(),
        kind: info.device_type.into(),
        api_version: ApiVersion::from_raw(info.api_version),
        max_texture_size: info.max_image_dimension_2d,
        supports_compute,
        graphics_family: selected.graphics_family,
        present_family: selected.present_family,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{PhysicalDeviceInfo, QueueFamilyInfo};
    use crate::surface::SwapchainSupport;

    fn candidate(flags: vk::QueueFlags) -> Candidate {
        Candidate {
            info: PhysicalDeviceInfo {
                handle: vk::PhysicalDevice::null(),
                name: "Test GPU".into(),
                device_type: vk::PhysicalDeviceType::INTEGRATED_GPU,
                api_version: vk::make_api_version(0, 1, 3, 250),
                max_image_dimension_2d: 8192,
                queue_families: vec![QueueFamilyInfo {
                    index: 0,
                    flags,
                    queue_count: 4,
                    supports_present: true,
                }],
                extensions: Default::default(),
                swapchain: SwapchainSupport::default(),
            },
            graphics_family: 0,
            present_family: 0,
            score: 0,
        }
    }

    #[test]
    fn capabilities_reflect_selected_device() {
        let caps = probe_capabilities(&candidate(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE));
        assert_eq!(caps.device_name, "Test GPU");
        assert_eq!(caps.kind, GpuKind::Integrated);
        assert_eq!(caps.api_version, ApiVersion { major: 1, minor: 3 });
        assert_eq!(caps.max_texture_size, 8192);
        assert!(caps.supports_compute);
        assert_eq!((caps.graphics_family, caps.present_family), (0, 0));
    }

    #[test]
    fn compute_absent_without_compute_family() {
        let caps = probe_capabilities(&candidate(vk::QueueFlags::GRAPHICS));
        assert!(!caps.supports_compute);
    }

    #[test]
    fn device_types_map_to_kinds() {
        assert_eq!(GpuKind::from(vk::PhysicalDeviceType::DISCRETE_GPU), GpuKind::Discrete);
        assert_eq!(GpuKind::from(vk::PhysicalDeviceType::CPU), GpuKind::Cpu);
        assert_eq!(GpuKind::from(vk::PhysicalDeviceType::OTHER), GpuKind::Other);
    }
}
