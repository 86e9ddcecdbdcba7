//! Presentation surface
//!
//! Binds a `VkSurfaceKHR` to a winit window and answers the per-device
//! presentation queries used during device selection.

use ash::{khr::surface, vk};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::{RenderError, Result};
use crate::instance::VulkanInstance;

pub struct Surface {
    loader: surface::Instance,
    surface: vk::SurfaceKHR,
}

impl Surface {
    /// Create a surface for `window`.
    ///
    /// The window must outlive the returned surface.
    pub fn new<W>(instance: &VulkanInstance, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window.display_handle()?.as_raw();
        let handle = window.window_handle()?.as_raw();

        let surface = unsafe {
            ash_window::create_surface(instance.entry(), instance.raw(), display, handle, None)
        }
        .map_err(RenderError::vk("vkCreateSurfaceKHR"))?;
        let loader = surface::Instance::new(instance.entry(), instance.raw());

        tracing::debug!("Presentation surface created");
        Ok(Self { loader, surface })
    }

    pub fn raw(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Whether queue family `family` of `device` can present to this surface.
    pub fn supports_present(&self, device: vk::PhysicalDevice, family: u32) -> Result<bool> {
        unsafe {
            self.loader
                .get_physical_device_surface_support(device, family, self.surface)
        }
        .map_err(RenderError::vk("vkGetPhysicalDeviceSurfaceSupportKHR"))
    }

    pub fn swapchain_support(&self, device: vk::PhysicalDevice) -> Result<SwapchainSupport> {
        unsafe {
            let capabilities = self
                .loader
                .get_physical_device_surface_capabilities(device, self.surface)
                .map_err(RenderError::vk("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?;
            let formats = self
                .loader
                .get_physical_device_surface_formats(device, self.surface)
                .map_err(RenderError::vk("vkGetPhysicalDeviceSurfaceFormatsKHR"))?;
            let present_modes = self
                .loader
                .get_physical_device_surface_present_modes(device, self.surface)
                .map_err(RenderError::vk("vkGetPhysicalDeviceSurfacePresentModesKHR"))?;

            Ok(SwapchainSupport {
                capabilities,
                formats,
                present_modes,
            })
        }
    }
}

/// Must drop after any swapchain on it and before the owning instance.
impl Drop for Surface {
    fn drop(&mut self) {
        unsafe { self.loader.destroy_surface(self.surface, None) };
    }
}

/// What a device offers for swap-chain creation on a given surface
#[derive(Debug, Clone, Default)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

fn is_srgb(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::B8G8R8A8_SRGB
            | vk::Format::R8G8B8A8_SRGB
            | vk::Format::A8B8G8R8_SRGB_PACK32
            | vk::Format::R8G8B8_SRGB
            | vk::Format::B8G8R8_SRGB
    )
}

/// Pick a surface format, preferring 8-bit BGRA sRGB.
///
/// Returns `None` only when `formats` is empty.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| {
            formats.iter().copied().find(|f| {
                is_srgb(f.format) && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
        })
        .or_else(|| formats.first().copied())
}

/// FIFO is the only mode every implementation must support.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|m| modes.contains(m))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    #[test]
    fn surface_is_released_on_drop() {
        // The loader and handle are plain data; release needs an explicit Drop
        assert!(!std::mem::needs_drop::<surface::Instance>());
        assert!(std::mem::needs_drop::<Surface>());
    }

    #[test]
    fn adequate_needs_formats_and_modes() {
        let mut support = SwapchainSupport::default();
        assert!(!support.is_adequate());

        support.formats.push(fmt(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR));
        assert!(!support.is_adequate());

        support.present_modes.push(vk::PresentModeKHR::FIFO);
        assert!(support.is_adequate());
    }

    #[test]
    fn prefers_bgra_srgb() {
        let formats = [
            fmt(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            fmt(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            fmt(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(
            choose_surface_format(&formats).map(|f| f.format),
            Some(vk::Format::B8G8R8A8_SRGB)
        );
    }

    #[test]
    fn falls_back_to_other_srgb_then_first() {
        let formats = [
            fmt(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
            fmt(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(
            choose_surface_format(&formats).map(|f| f.format),
            Some(vk::Format::R8G8B8A8_SRGB)
        );

        let formats = [fmt(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR)];
        assert_eq!(
            choose_surface_format(&formats).map(|f| f.format),
            Some(vk::Format::B8G8R8A8_UNORM)
        );
        assert!(choose_surface_format(&[]).is_none());
    }

    #[test]
    fn present_mode_respects_vsync() {
        let modes = [
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::FIFO,
        ];
        assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::FIFO);
        assert_eq!(choose_present_mode(&modes, false), vk::PresentModeKHR::MAILBOX);
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO], false),
            vk::PresentModeKHR::IMMEDIATE
        );
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO], false),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn extent_uses_current_unless_sentinel() {
        let mut caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 800, height: 600 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            ..Default::default()
        };
        assert_eq!(choose_extent(&caps, 1920, 1080), vk::Extent2D { width: 800, height: 600 });

        caps.current_extent = vk::Extent2D { width: u32::MAX, height: u32::MAX };
        assert_eq!(choose_extent(&caps, 1920, 1080), vk::Extent2D { width: 1920, height: 1080 });
        assert_eq!(choose_extent(&caps, 9000, 0), vk::Extent2D { width: 4096, height: 1 });
    }
}
