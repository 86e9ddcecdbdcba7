use ash::vk;
use thiserror::Error;

use crate::device::Rejection;

/// Errors that can occur while bringing up the Vulkan backend.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load the Vulkan loader: {0}")]
    Loader(#[from] ash::LoadingError),

    #[error("Vulkan call `{call}` failed: {result:?}")]
    Vulkan { call: &'static str, result: vk::Result },

    #[error("requested Vulkan {requested} but the loader only supports {supported}")]
    UnsupportedApiVersion { requested: String, supported: String },

    #[error("validation requested but layers are unavailable: {}", missing.join(", "))]
    MissingLayers { missing: Vec<String> },

    #[error("required instance extensions are unavailable: {}", missing.join(", "))]
    MissingInstanceExtensions { missing: Vec<String> },

    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    #[error("no Vulkan physical devices found")]
    NoPhysicalDevices,

    #[error("no suitable GPU found ({} rejected)", rejected.len())]
    NoSuitableDevice { rejected: Vec<(String, Rejection)> },

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

impl RenderError {
    pub(crate) fn vk(call: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Vulkan { call, result }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
