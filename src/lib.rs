//! glessink - EGL/GLESv2 video sink
//!
//! Renders decoded video frames onto a native window surface using EGL and
//! OpenGL ES 2.0. Handles display/context lifecycle, per-format fragment
//! shaders (RGB reordering and BT.601 YUV conversion), aspect-ratio correct
//! scaling with black borders, and a blocking frame queue serviced by a
//! dedicated render thread.
//!
//! # Example
//!
//! ```rust,no_run
//! use glessink::{Frame, GlesVideoSink, PixelFormat, SinkConfig, VideoInfo};
//!
//! fn main() -> glessink::Result<()> {
//!     let mut sink = GlesVideoSink::new(SinkConfig::default());
//!     sink.open()?;
//!     println!("renderable formats: {:?}", sink.supported_formats()?);
//!
//!     sink.start()?;
//!     let info = VideoInfo::new(PixelFormat::I420, 720, 480).with_par(10, 11);
//!     sink.submit(Frame::new(info))?;
//!     sink.stop()?;
//!     sink.close()
//! }
//! ```

pub mod config;
pub mod egl;
pub mod error;
pub mod format;
pub mod geometry;
pub mod logging;
pub mod queue;
pub mod renderer;
pub mod sink;
pub mod types;
pub mod window;

// Re-exports for convenience
pub use config::SinkConfig;
pub use error::{Error, Result};
pub use format::{DisplayFormat, ShaderSelector};
pub use sink::{create_sink, GlesVideoSink};
pub use types::{DisplayRegion, Fraction, Frame, PixelFormat, VideoInfo};
pub use window::{WindowHandle, WindowProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
