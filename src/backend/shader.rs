// Shader module loading
//
// Vulkan consumes SPIR-V words. Shaders are compiled to .spv by build.rs
// and read back at runtime.

use anyhow::{Context, Result};
use ash::vk;
use std::io::Cursor;
use std::path::Path;

/// Create a shader module from SPIR-V bytes
pub fn create_shader_module(device: &ash::Device, code: &[u8]) -> Result<vk::ShaderModule> {
    // read_spv copies into u32 words, so the byte slice needs no particular alignment
    let words = ash::util::read_spv(&mut Cursor::new(code)).context("Invalid SPIR-V binary")?;

    let create_info = vk::ShaderModuleCreateInfo::builder().code(&words);

    unsafe { device.create_shader_module(&create_info, None) }
        .context("Failed to create shader module")
}

/// Read a .spv file and create a shader module from it
pub fn load_shader_module(device: &ash::Device, path: &Path) -> Result<vk::ShaderModule> {
    let code = std::fs::read(path)
        .with_context(|| format!("Failed to read shader '{}'", path.display()))?;
    create_shader_module(device, &code)
        .with_context(|| format!("Failed to load shader '{}'", path.display()))
}
