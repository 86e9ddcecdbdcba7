//! Window management
//!
//! Cross-platform window creation via winit

use winit::{
    event_loop::EventLoop,
    window::{Window, WindowAttributes},
};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Kiln".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Create window attributes from config
pub fn window_attributes(config: &WindowConfig) -> WindowAttributes {
    Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
}

/// Windows must still be created inside `ApplicationHandler::resumed`.
pub fn create_event_loop() -> Result<EventLoop<()>> {
    Ok(EventLoop::new()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = WindowConfig::default();
        assert_eq!(config.title, "Kiln");
        assert_eq!((config.width, config.height), (1280, 720));
    }

    #[test]
    fn attributes_carry_title_and_size() {
        let attrs = window_attributes(&WindowConfig {
            title: "Probe".into(),
            width: 640,
            height: 480,
        });
        assert_eq!(attrs.title, "Probe");
        assert_eq!(
            attrs.inner_size,
            Some(winit::dpi::LogicalSize::new(640u32, 480u32).into())
        );
    }
}
