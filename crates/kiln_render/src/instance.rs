//! Instance creation
//!
//! Negotiates layers and extensions against what the loader reports, then
//! creates the `VkInstance` (with the debug messenger chained in when
//! validation is enabled).

use std::collections::HashSet;
use std::ffi::{c_char, CStr, CString};
use std::fmt;

use ash::vk;
use raw_window_handle::RawDisplayHandle;
use serde::{Deserialize, Serialize};

use crate::debug::{self, DebugMessenger, VALIDATION_LAYER};
use crate::error::{RenderError, Result};

/// Whether to load the Khronos validation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Never enable validation
    Off,
    /// Always enable validation; missing layers are an error
    On,
    /// Enable in debug builds if the layer is installed
    #[default]
    Auto,
}

/// Vulkan API version requested at instance creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const V1_0: Self = Self { major: 1, minor: 0 };

    pub fn to_raw(self) -> u32 {
        vk::make_api_version(0, self.major, self.minor, 0)
    }

    pub fn from_raw(raw: u32) -> Self {
        Self {
            major: vk::api_version_major(raw),
            minor: vk::api_version_minor(raw),
        }
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::V1_0
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub api_version: ApiVersion,
    pub validation: ValidationMode,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            application_name: "Kiln".to_string(),
            application_version: vk::make_api_version(0, 0, 1, 0),
            engine_name: "Kiln Engine".to_string(),
            api_version: ApiVersion::V1_0,
            validation: ValidationMode::Auto,
        }
    }
}

/// Decide whether validation ends up enabled.
pub fn resolve_validation(
    mode: ValidationMode,
    debug_build: bool,
    available_layers: &HashSet<String>,
) -> Result<bool> {
    let name = VALIDATION_LAYER.to_string_lossy();
    let present = available_layers.contains(name.as_ref());

    match mode {
        ValidationMode::Off => Ok(false),
        ValidationMode::On if present => Ok(true),
        ValidationMode::On => Err(RenderError::MissingLayers {
            missing: vec![name.into_owned()],
        }),
        ValidationMode::Auto if !debug_build => Ok(false),
        ValidationMode::Auto if present => Ok(true),
        ValidationMode::Auto => {
            tracing::warn!("{name} not installed, continuing without validation");
            Ok(false)
        }
    }
}

/// Extensions and flags to pass to `vkCreateInstance`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPlan {
    pub names: Vec<CString>,
    pub flags: vk::InstanceCreateFlags,
}

impl ExtensionPlan {
    fn push(&mut self, name: &CStr) {
        if !self.names.iter().any(|n| n.as_c_str() == name) {
            self.names.push(name.to_owned());
        }
    }

    pub fn contains(&self, name: &CStr) -> bool {
        self.names.iter().any(|n| n.as_c_str() == name)
    }

    pub fn as_ptrs(&self) -> Vec<*const c_char> {
        self.names.iter().map(|n| n.as_ptr()).collect()
    }
}

/// Build the instance extension list.
///
/// `required` are the window-system extensions; every one of them must be
/// available. `VK_EXT_debug_utils` is only added when validation is on and
/// something (usually the validation layer itself) provides it.
pub fn plan_instance_extensions(
    required: &[&CStr],
    available: &HashSet<String>,
    validation: bool,
) -> Result<ExtensionPlan> {
    let is_available = |name: &CStr| available.contains(name.to_string_lossy().as_ref());

    let missing: Vec<String> = required
        .iter()
        .filter(|name| !is_available(name))
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    if !missing.is_empty() {
        return Err(RenderError::MissingInstanceExtensions { missing });
    }

    let mut plan = ExtensionPlan {
        names: Vec::with_capacity(required.len() + 3),
        flags: vk::InstanceCreateFlags::empty(),
    };
    for name in required {
        plan.push(name);
    }

    if validation {
        if is_available(ash::ext::debug_utils::NAME) {
            plan.push(ash::ext::debug_utils::NAME);
        } else {
            tracing::warn!("VK_EXT_debug_utils unavailable, validation output will not be routed");
        }
    }

    // MoltenVK only enumerates devices when portability enumeration is on
    if is_available(ash::khr::portability_enumeration::NAME) {
        plan.push(ash::khr::portability_enumeration::NAME);
        if is_available(ash::khr::get_physical_device_properties2::NAME) {
            plan.push(ash::khr::get_physical_device_properties2::NAME);
        }
        plan.flags |= vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    }

    Ok(plan)
}

fn layer_names(entry: &ash::Entry) -> Result<HashSet<String>> {
    let layers = unsafe { entry.enumerate_instance_layer_properties() }
        .map_err(RenderError::vk("vkEnumerateInstanceLayerProperties"))?;
    Ok(layers
        .iter()
        .filter_map(|l| l.layer_name_as_c_str().ok())
        .map(|n| n.to_string_lossy().into_owned())
        .collect())
}

fn extension_names(entry: &ash::Entry, layer: Option<&CStr>) -> Result<HashSet<String>> {
    let extensions = unsafe { entry.enumerate_instance_extension_properties(layer) }
        .map_err(RenderError::vk("vkEnumerateInstanceExtensionProperties"))?;
    Ok(extensions
        .iter()
        .filter_map(|e| e.extension_name_as_c_str().ok())
        .map(|n| n.to_string_lossy().into_owned())
        .collect())
}

/// Owns the loader entry, the instance, and the validation messenger.
pub struct VulkanInstance {
    entry: ash::Entry,
    instance: ash::Instance,
    messenger: Option<DebugMessenger>,
    validation: bool,
    api_version: ApiVersion,
}

impl VulkanInstance {
    pub fn new(config: &InstanceConfig, display: RawDisplayHandle) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        let supported = match unsafe { entry.try_enumerate_instance_version() }
            .map_err(RenderError::vk("vkEnumerateInstanceVersion"))?
        {
            Some(raw) => ApiVersion::from_raw(raw),
            None => ApiVersion::V1_0,
        };
        if config.api_version > supported {
            return Err(RenderError::UnsupportedApiVersion {
                requested: config.api_version.to_string(),
                supported: supported.to_string(),
            });
        }
        tracing::info!("Vulkan loader supports {supported}, requesting {}", config.api_version);

        let validation = resolve_validation(
            config.validation,
            cfg!(debug_assertions),
            &layer_names(&entry)?,
        )?;

        let window_extensions: Vec<&CStr> = ash_window::enumerate_required_extensions(display)
            .map_err(RenderError::vk("enumerate_required_extensions"))?
            .iter()
            .map(|&ptr| unsafe { CStr::from_ptr(ptr) })
            .collect();
        let mut available = extension_names(&entry, None)?;
        if validation {
            available.extend(extension_names(&entry, Some(VALIDATION_LAYER))?);
        }
        let plan = plan_instance_extensions(&window_extensions, &available, validation)?;
        let debug_utils = plan.contains(ash::ext::debug_utils::NAME);
        for name in &plan.names {
            tracing::debug!("Enabling instance extension {}", name.to_string_lossy());
        }

        let app_name = CString::new(config.application_name.replace('\0', ""))
            .unwrap_or_default();
        let engine_name = CString::new(config.engine_name.replace('\0', ""))
            .unwrap_or_default();
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(config.application_version)
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(config.api_version.to_raw());

        let layers: Vec<*const c_char> = if validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };
        let extensions = plan.as_ptrs();

        // Chained so instance creation and destruction are also validated
        let mut creation_messenger = debug::messenger_create_info();
        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .flags(plan.flags);
        if debug_utils {
            create_info = create_info.push_next(&mut creation_messenger);
        }

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(RenderError::vk("vkCreateInstance"))?;

        let messenger = if debug_utils {
            match DebugMessenger::new(&entry, &instance) {
                Ok(m) => Some(m),
                Err(err) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(err);
                }
            }
        } else {
            None
        };

        tracing::info!(
            validation,
            extensions = plan.names.len(),
            "Vulkan instance created"
        );

        Ok(Self {
            entry,
            instance,
            messenger,
            validation,
            api_version: config.api_version,
        })
    }

    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn raw(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn validation_enabled(&self) -> bool {
        self.validation
    }

    /// Whether validation messages are routed into `tracing`
    pub fn messenger_installed(&self) -> bool {
        self.messenger.is_some()
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some(messenger) = self.messenger.as_mut() {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}
