//! Validation message routing
//!
//! Forwards `VK_EXT_debug_utils` messages into `tracing` so validation output
//! lands in the same subscriber as the rest of the engine.

use std::ffi::{c_void, CStr};

use ash::{ext::debug_utils, vk};
use tracing::Level;

use crate::error::{RenderError, Result};

/// Name of the Khronos validation layer
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Owns the debug utils loader and the messenger handle.
///
/// Destroyed explicitly by [`crate::instance::VulkanInstance`] before the
/// instance goes away.
pub struct DebugMessenger {
    loader: debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    pub fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let loader = debug_utils::Instance::new(entry, instance);
        let info = messenger_create_info();
        let messenger = unsafe { loader.create_debug_utils_messenger(&info, None) }
            .map_err(RenderError::vk("vkCreateDebugUtilsMessengerEXT"))?;
        tracing::debug!("Validation messenger installed");
        Ok(Self { loader, messenger })
    }

    /// # Safety
    /// Must be called once, before the owning instance is destroyed.
    pub(crate) unsafe fn destroy(&mut self) {
        self.loader
            .destroy_debug_utils_messenger(self.messenger, None);
        self.messenger = vk::DebugUtilsMessengerEXT::null();
    }
}

/// Create info shared by the persistent messenger and the one chained into
/// instance creation.
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
}

/// Map a message severity onto a tracing level.
///
/// Driver INFO chatter is noisy, so it is demoted to `debug`.
pub fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Level::ERROR
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Level::WARN
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        Level::DEBUG
    } else {
        Level::TRACE
    }
}

fn type_label(ty: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if ty.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "validation"
    } else if ty.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "performance"
    } else {
        "general"
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    ty: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() || (*data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*data).p_message).to_string_lossy();
    let kind = type_label(ty);

    match severity_level(severity) {
        Level::ERROR => tracing::error!(target: "vulkan", kind, "{message}"),
        Level::WARN => tracing::warn!(target: "vulkan", kind, "{message}"),
        Level::DEBUG => tracing::debug!(target: "vulkan", kind, "{message}"),
        _ => tracing::trace!(target: "vulkan", kind, "{message}"),
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_maps_to_tracing_levels() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        assert_eq!(severity_level(S::ERROR), Level::ERROR);
        assert_eq!(severity_level(S::WARNING), Level::WARN);
        assert_eq!(severity_level(S::INFO), Level::DEBUG);
        assert_eq!(severity_level(S::VERBOSE), Level::TRACE);
    }

    #[test]
    fn most_severe_bit_wins() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        assert_eq!(severity_level(S::WARNING | S::VERBOSE), Level::WARN);
        assert_eq!(severity_level(S::ERROR | S::INFO), Level::ERROR);
    }

    #[test]
    fn validation_type_takes_priority() {
        use vk::DebugUtilsMessageTypeFlagsEXT as T;
        assert_eq!(type_label(T::VALIDATION | T::GENERAL), "validation");
        assert_eq!(type_label(T::PERFORMANCE), "performance");
        assert_eq!(type_label(T::GENERAL), "general");
    }

    #[test]
    fn create_info_enables_callback() {
        let info = messenger_create_info();
        assert!(info.pfn_user_callback.is_some());
        assert!(info
            .message_severity
            .contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR));
    }

    #[test]
    fn null_callback_data_is_ignored() {
        let ret = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(ret, vk::FALSE);
    }

    #[test]
    fn null_message_is_ignored() {
        let data = vk::DebugUtilsMessengerCallbackDataEXT::default();
        assert!(data.p_message.is_null());
        let ret = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                std::ptr::null_mut(),
            )
        };
        assert_eq!(ret, vk::FALSE);
    }

    #[test]
    fn message_is_forwarded() {
        let data = vk::DebugUtilsMessengerCallbackDataEXT::default()
            .message(c"vkCreateBuffer: size is zero");
        let ret = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                std::ptr::null_mut(),
            )
        };
        assert_eq!(ret, vk::FALSE);
    }
}
