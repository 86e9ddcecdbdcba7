//! Kiln Render System
//!
//! Vulkan bootstrap: instance, validation, presentation surface, and GPU
//! selection.

pub mod backend;
pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod instance;
pub mod logical;
pub mod surface;
pub mod window;

pub use ash;
pub use winit;

pub use backend::{DeviceCapabilities, GpuKind};
pub use context::{RenderConfig, VulkanContext};
pub use device::{DevicePreference, DeviceRequirements, Rejection};
pub use error::{RenderError, Result};
pub use instance::{ApiVersion, InstanceConfig, ValidationMode};
