//! Physical device selection
//!
//! Every enumerated GPU is probed into a [`PhysicalDeviceInfo`], checked
//! against [`DeviceRequirements`], and the suitable ones are ranked. The
//! checks work on plain data so they can be exercised without a GPU.

use std::collections::{BTreeSet, HashSet};
use std::ffi::{c_char, CStr, CString};

use ash::vk;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{RenderError, Result};
use crate::instance::VulkanInstance;
use crate::surface::{Surface, SwapchainSupport};

/// Why a device was passed over
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no queue family supports graphics")]
    NoGraphicsQueue,

    #[error("no queue family can present to the surface")]
    NoPresentQueue,

    #[error("missing device extensions: {}", .0.join(", "))]
    MissingExtensions(Vec<String>),

    #[error("surface reports no formats")]
    NoSurfaceFormats,

    #[error("surface reports no present modes")]
    NoPresentModes,

    #[error("device queries failed: {0}")]
    QueryFailed(String),
}

/// How to rank suitable devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePreference {
    /// Discrete over integrated over everything else
    #[default]
    HighPerformance,
    /// Integrated first, for battery-powered machines
    LowPower,
    /// Enumeration order
    FirstSuitable,
}

#[derive(Debug, Clone)]
pub struct DeviceRequirements {
    pub extensions: Vec<CString>,
    pub preference: DevicePreference,
    /// Case-insensitive substring of the device name that wins outright
    pub preferred_name: Option<String>,
}

impl Default for DeviceRequirements {
    fn default() -> Self {
        Self {
            extensions: vec![ash::khr::swapchain::NAME.to_owned()],
            preference: DevicePreference::default(),
            preferred_name: None,
        }
    }
}

impl DeviceRequirements {
    pub fn extension_ptrs(&self) -> Vec<*const c_char> {
        self.extensions.iter().map(|e| e.as_ptr()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyInfo {
    pub index: u32,
    pub flags: vk::QueueFlags,
    pub queue_count: u32,
    pub supports_present: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn find(families: &[QueueFamilyInfo]) -> Self {
        let usable = || families.iter().filter(|f| f.queue_count > 0);
        let graphics = |f: &&QueueFamilyInfo| f.flags.contains(vk::QueueFlags::GRAPHICS);

        // A single family for both avoids ownership transfers on present
        if let Some(both) = usable().find(|f| graphics(f) && f.supports_present) {
            return Self {
                graphics: Some(both.index),
                present: Some(both.index),
            };
        }

        Self {
            graphics: usable().find(graphics).map(|f| f.index),
            present: usable().find(|f| f.supports_present).map(|f| f.index),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Distinct family indices, sorted.
    pub fn unique(&self) -> Vec<u32> {
        self.graphics
            .into_iter()
            .chain(self.present)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Everything selection needs to know about one GPU
#[derive(Debug, Clone)]
pub struct PhysicalDeviceInfo {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
    pub max_image_dimension_2d: u32,
    pub queue_families: Vec<QueueFamilyInfo>,
    pub extensions: HashSet<String>,
    pub swapchain: SwapchainSupport,
}

impl PhysicalDeviceInfo {
    /// Query a device's properties, queues, extensions and surface support.
    pub fn probe(
        instance: &VulkanInstance,
        surface: &Surface,
        handle: vk::PhysicalDevice,
    ) -> Result<Self> {
        let raw = instance.raw();
        let properties = unsafe { raw.get_physical_device_properties(handle) };
        let name = device_name(instance, handle);

        let queue_families = unsafe { raw.get_physical_device_queue_family_properties(handle) }
            .iter()
            .zip(0u32..)
            .map(|(props, index)| {
                Ok(QueueFamilyInfo {
                    index,
                    flags: props.queue_flags,
                    queue_count: props.queue_count,
                    supports_present: surface.supports_present(handle, index)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let extensions = unsafe { raw.enumerate_device_extension_properties(handle) }
            .map_err(RenderError::vk("vkEnumerateDeviceExtensionProperties"))?
            .iter()
            .filter_map(|e| e.extension_name_as_c_str().ok())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();

        let swapchain = surface.swapchain_support(handle)?;

        Ok(Self {
            handle,
            name,
            device_type: properties.device_type,
            api_version: properties.api_version,
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
            queue_families,
            extensions,
            swapchain,
        })
    }

    pub fn has_extension(&self, name: &CStr) -> bool {
        self.extensions.contains(name.to_string_lossy().as_ref())
    }
}

/// A device that passed every check
#[derive(Debug, Clone)]
pub struct Candidate {
    pub info: PhysicalDeviceInfo,
    pub graphics_family: u32,
    pub present_family: u32,
    pub score: u64,
}

impl Candidate {
    /// Distinct queue families to create queues on, sorted.
    pub fn unique_families(&self) -> Vec<u32> {
        QueueFamilyIndices {
            graphics: Some(self.graphics_family),
            present: Some(self.present_family),
        }
        .unique()
    }
}

/// Check `info` against `requirements`.
pub fn evaluate(
    info: PhysicalDeviceInfo,
    requirements: &DeviceRequirements,
) -> std::result::Result<Candidate, Rejection> {
    let queues = QueueFamilyIndices::find(&info.queue_families);
    let graphics_family = queues.graphics.ok_or(Rejection::NoGraphicsQueue)?;
    let present_family = queues.present.ok_or(Rejection::NoPresentQueue)?;

    let missing: Vec<String> = requirements
        .extensions
        .iter()
        .filter(|ext| !info.has_extension(ext))
        .map(|ext| ext.to_string_lossy().into_owned())
        .collect();
    if !missing.is_empty() {
        return Err(Rejection::MissingExtensions(missing));
    }

    // Only meaningful once the swapchain extension is known to exist
    if info.swapchain.formats.is_empty() {
        return Err(Rejection::NoSurfaceFormats);
    }
    if info.swapchain.present_modes.is_empty() {
        return Err(Rejection::NoPresentModes);
    }

    let score = score(&info, requirements);
    Ok(Candidate {
        info,
        graphics_family,
        present_family,
        score,
    })
}

const NAME_MATCH_BONUS: u64 = 1 << 40;

/// Rank a suitable device; higher is better.
pub fn score(info: &PhysicalDeviceInfo, requirements: &DeviceRequirements) -> u64 {
    let type_weight: u64 = match (requirements.preference, info.device_type) {
        (DevicePreference::FirstSuitable, _) => 0,
        (DevicePreference::HighPerformance, vk::PhysicalDeviceType::DISCRETE_GPU) => 4,
        (DevicePreference::HighPerformance, vk::PhysicalDeviceType::INTEGRATED_GPU) => 3,
        (DevicePreference::LowPower, vk::PhysicalDeviceType::INTEGRATED_GPU) => 4,
        (DevicePreference::LowPower, vk::PhysicalDeviceType::DISCRETE_GPU) => 3,
        (_, vk::PhysicalDeviceType::VIRTUAL_GPU) => 2,
        (_, vk::PhysicalDeviceType::CPU) => 1,
        _ => 0,
    };

    let mut score = if requirements.preference == DevicePreference::FirstSuitable {
        0
    } else {
        // Image dimension only breaks ties between devices of the same type
        (type_weight << 32) | u64::from(info.max_image_dimension_2d)
    };

    if let Some(wanted) = &requirements.preferred_name {
        if info.name.to_lowercase().contains(&wanted.to_lowercase()) {
            score += NAME_MATCH_BONUS;
        }
    }
    score
}

/// Outcome of probing one enumerated device: its info, or its name and the
/// query failure.
pub type Probed = std::result::Result<PhysicalDeviceInfo, (String, Rejection)>;

/// Pick the best suitable device.
///
/// Ties go to the device enumerated first.
pub fn select(devices: Vec<Probed>, requirements: &DeviceRequirements) -> Result<Candidate> {
    if devices.is_empty() {
        return Err(RenderError::NoPhysicalDevices);
    }

    let mut best: Option<Candidate> = None;
    let mut rejected = Vec::new();

    for probed in devices {
        let info = match probed {
            Ok(info) => info,
            Err((name, reason)) => {
                rejected.push((name, reason));
                continue;
            }
        };
        let name = info.name.clone();
        match evaluate(info, requirements) {
            Ok(candidate) => {
                tracing::debug!(device = %name, score = candidate.score, "Device is suitable");
                if best.as_ref().map_or(true, |b| candidate.score > b.score) {
                    best = Some(candidate);
                }
            }
            Err(reason) => {
                tracing::debug!(device = %name, %reason, "Skipping device");
                rejected.push((name, reason));
            }
        }
    }

    match best {
        Some(candidate) => {
            tracing::info!(
                device = %candidate.info.name,
                graphics = candidate.graphics_family,
                present = candidate.present_family,
                "Selected physical device"
            );
            Ok(candidate)
        }
        None => Err(RenderError::NoSuitableDevice { rejected }),
    }
}

/// Probe every enumerated device.
///
/// A device whose queries fail is kept as a [`Rejection::QueryFailed`] so
/// selection can report it instead of aborting.
pub fn enumerate(instance: &VulkanInstance, surface: &Surface) -> Result<Vec<Probed>> {
    let handles = unsafe { instance.raw().enumerate_physical_devices() }
        .map_err(RenderError::vk("vkEnumeratePhysicalDevices"))?;
    tracing::debug!("Found {} physical device(s)", handles.len());

    Ok(handles
        .into_iter()
        .map(|handle| {
            PhysicalDeviceInfo::probe(instance, surface, handle).map_err(|err| {
                let name = device_name(instance, handle);
                tracing::warn!(device = %name, "Failed to query physical device: {err}");
                (name, Rejection::QueryFailed(err.to_string()))
            })
        })
        .collect())
}

fn device_name(instance: &VulkanInstance, handle: vk::PhysicalDevice) -> String {
    let properties = unsafe { instance.raw().get_physical_device_properties(handle) };
    properties
        .device_name_as_c_str()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "<unnamed>".to_string())
}
