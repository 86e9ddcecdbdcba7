//! Kiln Runtime
//!
//! Opens a window and brings up the Vulkan backend for it.
//!
//! Usage: `kiln [settings.json]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use kiln_render::window::{create_event_loop, window_attributes, WindowConfig};
use kiln_render::{RenderConfig, VulkanContext};
use kiln_services::Settings;
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

struct KilnApp {
    window_config: WindowConfig,
    render_config: RenderConfig,
    // Dropped before `window`; the surface borrows the native window
    context: Option<VulkanContext>,
    window: Option<Window>,
    error: Option<anyhow::Error>,
}

impl KilnApp {
    fn new(settings: &Settings) -> Self {
        Self {
            window_config: settings.window_config(),
            render_config: settings.render_config(),
            context: None,
            window: None,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = event_loop
            .create_window(window_attributes(&self.window_config))
            .context("failed to create window")?;
        let context = VulkanContext::new(&window, &self.render_config)
            .context("failed to initialize Vulkan")?;

        let caps = context.capabilities();
        tracing::info!(
            "Rendering on {} ({:?}, Vulkan {}, validation {})",
            caps.device_name,
            caps.kind,
            caps.api_version,
            if context.instance().validation_enabled() { "on" } else { "off" }
        );

        self.context = Some(context);
        self.window = Some(window);
        Ok(())
    }
}

impl ApplicationHandler for KilnApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.error.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            tracing::info!("Close requested, shutting down");
            self.context = None;
            event_loop.exit();
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Kiln v{}", env!("CARGO_PKG_VERSION"));

    let settings_path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = Settings::load(settings_path.as_deref())?;

    let event_loop = create_event_loop()?;
    let mut app = KilnApp::new(&settings);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
