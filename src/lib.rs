// asvk - a thin Vulkan layer for single-window applications
//
// backend:  device, queues, command ring, resources, swapchain (ash)
// app:      winit event loop driving the per-frame record/submit/present cycle
// texture:  CPU-side texture loading (DDS parser, image-crate decoders)

pub mod app;
pub mod backend;
pub mod config;
pub mod misc;
pub mod texture;
pub mod timer;

pub use app::{App, AppHandler, Graphics};
pub use config::Config;
