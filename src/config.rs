// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Every section and field is optional. Missing values, a missing file or a
// file that fails to parse all fall back to the built-in defaults.

use anyhow::{Context, Result};
use ash::vk;
use serde::Deserialize;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub debug: DebugConfig,
    pub resources: ResourceConfig,
}

/// Window settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "SampleApp".to_string(),
            width: 960,
            height: 540,
        }
    }
}

/// Graphics settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Swapchain images and command buffers
    pub chain_count: u32,
    pub swapchain_format: String,
    pub color_space: String,
    pub depth_format: String,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub clear_stencil: u32,
    /// Fence wait and image acquire timeout per frame
    pub timeout_ns: u64,
    /// "auto", "immediate", "mailbox", "fifo" or "fifo_relaxed"
    pub present_mode: String,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            chain_count: 2,
            swapchain_format: "B8G8R8A8_UNORM".to_string(),
            color_space: "SRGB_NONLINEAR".to_string(),
            depth_format: "D24_UNORM_S8_UINT".to_string(),
            // Cornflower blue
            clear_color: [0.392_156_9, 0.584_313_75, 0.929_411_83, 1.0],
            clear_depth: 1.0,
            clear_stencil: 0,
            timeout_ns: 100_000_000,
            present_mode: "auto".to_string(),
        }
    }
}

/// Debug settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Only honored in debug builds
    pub validation_layers: bool,
    pub log_level: String,
    pub show_fps: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            log_level: "info".to_string(),
            show_fps: true,
        }
    }
}

/// Runtime asset names, resolved through the path probe
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResourceConfig {
    pub vertex_shader: String,
    pub fragment_shader: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            vertex_shader: "SimpleVS.spv".to_string(),
            fragment_shader: "SimpleFS.spv".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validation only in debug builds, and only when asked for
    pub fn validation_enabled(&self) -> bool {
        cfg!(debug_assertions) && self.debug.validation_layers
    }

    /// Present mode override; `None` means pick automatically
    pub fn present_mode(&self) -> Option<vk::PresentModeKHR> {
        match self.graphics.present_mode.to_lowercase().as_str() {
            "auto" => None,
            "immediate" => Some(vk::PresentModeKHR::IMMEDIATE),
            "mailbox" => Some(vk::PresentModeKHR::MAILBOX),
            "fifo" => Some(vk::PresentModeKHR::FIFO),
            "fifo_relaxed" => Some(vk::PresentModeKHR::FIFO_RELAXED),
            _ => {
                log::warn!(
                    "Unknown present mode '{}', choosing automatically",
                    self.graphics.present_mode
                );
                None
            }
        }
    }

    pub fn swapchain_format(&self) -> vk::Format {
        parse_format(&self.graphics.swapchain_format).unwrap_or_else(|| {
            log::warn!(
                "Unknown swapchain format '{}', using B8G8R8A8_UNORM",
                self.graphics.swapchain_format
            );
            vk::Format::B8G8R8A8_UNORM
        })
    }

    pub fn depth_format(&self) -> vk::Format {
        parse_format(&self.graphics.depth_format).unwrap_or_else(|| {
            log::warn!(
                "Unknown depth format '{}', using D24_UNORM_S8_UINT",
                self.graphics.depth_format
            );
            vk::Format::D24_UNORM_S8_UINT
        })
    }

    pub fn color_space(&self) -> vk::ColorSpaceKHR {
        match self.graphics.color_space.to_uppercase().as_str() {
            "SRGB_NONLINEAR" => vk::ColorSpaceKHR::SRGB_NONLINEAR,
            "EXTENDED_SRGB_LINEAR" => vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
            "HDR10_ST2084" => vk::ColorSpaceKHR::HDR10_ST2084_EXT,
            _ => {
                log::warn!(
                    "Unknown color space '{}', using SRGB_NONLINEAR",
                    self.graphics.color_space
                );
                vk::ColorSpaceKHR::SRGB_NONLINEAR
            }
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.debug.log_level.parse().unwrap_or_else(|_| {
            log::warn!("Unknown log level '{}', using info", self.debug.log_level);
            log::LevelFilter::Info
        })
    }
}

/// Formats the swapchain and depth buffer can be configured with
fn parse_format(name: &str) -> Option<vk::Format> {
    let format = match name.to_uppercase().as_str() {
        "B8G8R8A8_UNORM" => vk::Format::B8G8R8A8_UNORM,
        "B8G8R8A8_SRGB" => vk::Format::B8G8R8A8_SRGB,
        "R8G8B8A8_UNORM" => vk::Format::R8G8B8A8_UNORM,
        "R8G8B8A8_SRGB" => vk::Format::R8G8B8A8_SRGB,
        "A2B10G10R10_UNORM_PACK32" => vk::Format::A2B10G10R10_UNORM_PACK32,
        "R16G16B16A16_SFLOAT" => vk::Format::R16G16B16A16_SFLOAT,
        "D16_UNORM" => vk::Format::D16_UNORM,
        "D32_SFLOAT" => vk::Format::D32_SFLOAT,
        "D16_UNORM_S8_UINT" => vk::Format::D16_UNORM_S8_UINT,
        "D24_UNORM_S8_UINT" => vk::Format::D24_UNORM_S8_UINT,
        "D32_SFLOAT_S8_UINT" => vk::Format::D32_SFLOAT_S8_UINT,
        _ => return None,
    };
    Some(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.graphics.chain_count, 2);
        assert_eq!(config.window.width, 960);
        assert_eq!(config.window.height, 540);
        assert_eq!(config.graphics.timeout_ns, 100_000_000);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [window]
            width = 1280

            [graphics]
            present_mode = "fifo"
            "#,
        )
        .unwrap();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 540);
        assert_eq!(config.window.title, "SampleApp");
        assert_eq!(config.present_mode(), Some(vk::PresentModeKHR::FIFO));
        assert_eq!(config.depth_format(), vk::Format::D24_UNORM_S8_UINT);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(Config::parse("[window\nwidth = ").is_err());
        assert!(Config::parse("[window]\nwidth = \"wide\"").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_from_path("definitely/not/here/config.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn default_formats_map_to_vulkan() {
        let config = Config::default();
        assert_eq!(config.swapchain_format(), vk::Format::B8G8R8A8_UNORM);
        assert_eq!(config.color_space(), vk::ColorSpaceKHR::SRGB_NONLINEAR);
        assert_eq!(config.present_mode(), None);
        assert_eq!(config.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn unknown_names_fall_back() {
        let mut config = Config::default();
        config.graphics.swapchain_format = "NOT_A_FORMAT".into();
        config.graphics.present_mode = "sometimes".into();
        config.debug.log_level = "chatty".into();
        assert_eq!(config.swapchain_format(), vk::Format::B8G8R8A8_UNORM);
        assert_eq!(config.present_mode(), None);
        assert_eq!(config.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn format_names_are_case_insensitive() {
        assert_eq!(parse_format("d32_sfloat"), Some(vk::Format::D32_SFLOAT));
        assert_eq!(parse_format("B8G8R8A8_srgb"), Some(vk::Format::B8G8R8A8_SRGB));
    }
}
