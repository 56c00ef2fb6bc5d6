// Sample application: one colored triangle
//
// Shaders come from res/ (compiled by build.rs) through the path probe.
// Dropping a texture file on the window loads it and logs what was found.

mod pipeline;

use anyhow::{Context, Result};
use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use asvk::app::{AppHandler, DropEventArgs, FrameEventArgs, KeyEventArgs, ResizeEventArgs};
use asvk::backend::shader::load_shader_module;
use asvk::backend::BufferResource;
use asvk::config::ResourceConfig;
use asvk::misc::search_file_path;
use asvk::texture::TextureFactory;
use asvk::Graphics;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub tex_coord: Vec2,
    pub color: [f32; 4],
}

const TRIANGLE: [Vertex; 3] = [
    Vertex {
        position: Vec3::new(-0.5, -0.75, 0.0),
        tex_coord: Vec2::new(0.0, 1.0),
        color: [1.0, 0.0, 0.0, 1.0],
    },
    Vertex {
        position: Vec3::new(0.0, 0.75, 0.0),
        tex_coord: Vec2::new(0.5, 0.0),
        color: [0.0, 1.0, 0.0, 1.0],
    },
    Vertex {
        position: Vec3::new(0.5, -0.75, 0.0),
        tex_coord: Vec2::new(1.0, 1.0),
        color: [0.0, 0.0, 1.0, 1.0],
    },
];

/// GPU objects owned by the sample. Released before the device goes away.
struct TriangleResources {
    device: ash::Device,
    vertex_buffer: BufferResource,
    pipeline: vk::Pipeline,
    pipeline_layout: vk::PipelineLayout,
}

impl Drop for TriangleResources {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
    }
}

pub struct SampleApp {
    resources: ResourceConfig,
    triangle: Option<TriangleResources>,
}

impl SampleApp {
    pub fn new(resources: ResourceConfig) -> Self {
        Self {
            resources,
            triangle: None,
        }
    }

    fn create_triangle(&self, gfx: &Graphics) -> Result<TriangleResources> {
        let device = gfx.device().device();

        let vs_path = search_file_path(&self.resources.vertex_shader)
            .with_context(|| format!("Vertex shader '{}' not found", self.resources.vertex_shader))?;
        let fs_path = search_file_path(&self.resources.fragment_shader).with_context(|| {
            format!("Fragment shader '{}' not found", self.resources.fragment_shader)
        })?;

        let vert_shader = load_shader_module(device, &vs_path)?;
        let frag_shader = match load_shader_module(device, &fs_path) {
            Ok(module) => module,
            Err(e) => {
                unsafe { device.destroy_shader_module(vert_shader, None) };
                return Err(e);
            }
        };

        // Modules are only needed while the pipeline is built
        let created = pipeline::create_graphics_pipeline(
            device,
            gfx.render_pass(),
            vert_shader,
            frag_shader,
        );
        unsafe {
            device.destroy_shader_module(vert_shader, None);
            device.destroy_shader_module(frag_shader, None);
        }
        let (pipeline, pipeline_layout) = created?;

        let vertex_buffer = match create_vertex_buffer(gfx) {
            Ok(buffer) => buffer,
            Err(e) => {
                unsafe {
                    device.destroy_pipeline(pipeline, None);
                    device.destroy_pipeline_layout(pipeline_layout, None);
                }
                return Err(e);
            }
        };

        Ok(TriangleResources {
            device: device.clone(),
            vertex_buffer,
            pipeline,
            pipeline_layout,
        })
    }
}

fn create_vertex_buffer(gfx: &Graphics) -> Result<BufferResource> {
    let bytes: &[u8] = bytemuck::cast_slice(&TRIANGLE);
    let buffer = BufferResource::host_visible(
        gfx.device().device(),
        gfx.device().memory_properties(),
        bytes.len() as vk::DeviceSize,
        vk::BufferUsageFlags::VERTEX_BUFFER,
    )
    .context("Failed to create vertex buffer")?;
    buffer.upload(&TRIANGLE)?;
    Ok(buffer)
}

impl AppHandler for SampleApp {
    fn on_init(&mut self, gfx: &mut Graphics) -> Result<()> {
        self.triangle = Some(self.create_triangle(gfx)?);
        log::info!("Sample resources created");
        Ok(())
    }

    fn on_term(&mut self, _gfx: &Graphics) {
        self.triangle = None;
    }

    fn on_frame_render(
        &mut self,
        gfx: &Graphics,
        command_buffer: vk::CommandBuffer,
        _args: &FrameEventArgs,
    ) -> Result<()> {
        let Some(triangle) = self.triangle.as_ref() else {
            return Ok(());
        };
        let device = gfx.device().device();

        unsafe {
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                triangle.pipeline,
            );
            device.cmd_set_viewport(command_buffer, 0, &[gfx.viewport()]);
            device.cmd_set_scissor(command_buffer, 0, &[gfx.scissor()]);
            device.cmd_bind_vertex_buffers(
                command_buffer,
                0,
                &[triangle.vertex_buffer.buffer()],
                &[0],
            );
            device.cmd_draw(command_buffer, TRIANGLE.len() as u32, 1, 0, 0);
        }
        Ok(())
    }

    fn on_resize(&mut self, _gfx: &Graphics, args: &ResizeEventArgs) {
        log::debug!(
            "Render target is now {}x{} (aspect {:.3})",
            args.width,
            args.height,
            args.aspect_ratio
        );
    }

    fn on_key(&mut self, args: &KeyEventArgs) {
        if args.is_key_down {
            log::debug!("Key down: {:?} (alt: {})", args.key, args.is_alt_down);
        }
    }

    fn on_drop(&mut self, args: &DropEventArgs) {
        for path in &args.files {
            match TextureFactory::create(path) {
                Ok(texture) => log::info!(
                    "{:?}: {:?} {}x{}x{} {:?}, {} mip(s)",
                    path,
                    texture.dimension,
                    texture.width,
                    texture.height,
                    texture.depth_or_array_size,
                    texture.format,
                    texture.mip_levels
                ),
                Err(e) => log::warn!("Could not load {:?}: {}", path, e),
            }
        }
    }
}
