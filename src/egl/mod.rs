//! EGL/GLESv2 backend
//!
//! Display and context lifecycle, shader construction and the GPU renderer.

pub mod context;
pub mod renderer;
pub mod shader;

pub use context::{sanitize_display_par, EglContext, EglDisplay};
pub use renderer::GlesRenderer;
