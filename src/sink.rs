//! Video sink orchestration
//!
//! Ties the pieces together: the control surface the embedding application
//! calls, the frame queue, and the render thread running the GPU backend.

use crate::config::SinkConfig;
use crate::egl::{EglDisplay, GlesRenderer};
use crate::error::{Error, Result};
use crate::format::supported_pixel_formats;
use crate::queue::FrameQueue;
use crate::renderer::run_render_loop;
use crate::types::{DisplayRegion, Frame, PixelFormat};
use crate::window::{NullWindowProvider, WindowHandle, WindowProvider};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// State shared between the control thread and the render thread.
pub struct SharedState {
    /// Externally supplied window handle, if any
    pub window_handle: Option<WindowHandle>,
    /// Destination rectangle within the window, full window when `None`
    pub render_rectangle: Option<DisplayRegion>,
}

/// EGL/GLESv2 video sink.
///
/// Lifecycle: `open` the display, `start` the render thread, `submit`
/// frames, `stop`, `close`. A window handle can be supplied any time before
/// the first frame; without one the sink creates its own window when
/// configuration allows.
pub struct GlesVideoSink {
    config: SinkConfig,
    display: Option<Arc<EglDisplay>>,
    queue: Option<Arc<FrameQueue>>,
    shared: Arc<Mutex<SharedState>>,
    thread: Option<JoinHandle<()>>,
    provider: Option<Box<dyn WindowProvider>>,
}

impl GlesVideoSink {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            display: None,
            queue: None,
            shared: Arc::new(Mutex::new(SharedState {
                window_handle: None,
                render_rectangle: None,
            })),
            thread: None,
            provider: None,
        }
    }

    /// Use a platform window provider instead of the default, which cannot
    /// create windows.
    pub fn with_window_provider(mut self, provider: Box<dyn WindowProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Open the EGL display connection.
    pub fn open(&mut self) -> Result<()> {
        if self.display.is_some() {
            return Ok(());
        }
        self.display = Some(Arc::new(EglDisplay::open()?));
        Ok(())
    }

    /// Pixel formats renderable on the opened display, in preference order.
    pub fn supported_formats(&self) -> Result<Vec<PixelFormat>> {
        let display = self.display.as_ref().ok_or(Error::NotOpened)?;
        let available = display.supported_display_formats();
        debug!(?available, "display config families");
        Ok(supported_pixel_formats(&available))
    }

    /// Pick the first of `candidates`, in our preference order, that the
    /// display can render. `None` when nothing matches.
    pub fn negotiate(&self, candidates: &[PixelFormat]) -> Result<Option<PixelFormat>> {
        let supported = self.supported_formats()?;
        Ok(supported.into_iter().find(|f| candidates.contains(f)))
    }

    /// Spawn the render thread.
    pub fn start(&mut self) -> Result<()> {
        let display = self.display.clone().ok_or(Error::NotOpened)?;
        if self.thread.is_some() {
            return Err(Error::AlreadyRunning);
        }
        if display.supported_display_formats().is_empty() {
            return Err(Error::NoMatchingConfig(
                "display offers no usable framebuffer configuration".into(),
            ));
        }

        let queue = Arc::new(FrameQueue::new());
        let provider = self
            .provider
            .take()
            .unwrap_or_else(|| Box::new(NullWindowProvider));
        let config = self.config;
        let shared = self.shared.clone();
        let thread_queue = queue.clone();

        let thread = std::thread::Builder::new()
            .name("glessink-render".into())
            .spawn(move || {
                let renderer = GlesRenderer::new(display, config, shared, provider);
                run_render_loop(renderer, thread_queue);
            })
            .map_err(|e| Error::Internal(format!("spawning render thread: {e}")))?;

        self.queue = Some(queue);
        self.thread = Some(thread);
        info!("render thread started");
        Ok(())
    }

    /// Submit a frame for display; blocks until it has been rendered.
    pub fn submit(&self, frame: Frame) -> Result<()> {
        let queue = self.queue.as_ref().ok_or(Error::NotStarted)?;
        queue.submit(frame)
    }

    /// Ask for a redraw of the last frame, e.g. after the window was
    /// exposed or resized. Never blocks.
    pub fn expose(&self) -> Result<()> {
        let queue = self.queue.as_ref().ok_or(Error::NotStarted)?;
        queue.submit_redraw();
        Ok(())
    }

    /// Supply the native window to render into.
    ///
    /// Takes effect when the render thread next builds its surface; a
    /// handle arriving mid-stream does not retarget the current surface.
    pub fn set_window_handle(&self, handle: Option<WindowHandle>) {
        self.shared.lock().window_handle = handle;
    }

    /// Restrict rendering to a sub-rectangle of the window. `None` restores
    /// the full window. Followed by a redraw so the change shows.
    pub fn set_render_rectangle(&self, rect: Option<DisplayRegion>) {
        self.shared.lock().render_rectangle = rect;
        if let Some(queue) = &self.queue {
            queue.submit_redraw();
        }
    }

    /// Drop queued frames and release any blocked submitter. The render
    /// thread exits; `start` brings it back.
    pub fn flush(&mut self) {
        if let Some(queue) = &self.queue {
            queue.set_flushing(true);
        }
        self.join_render_thread();
        self.queue = None;
    }

    /// Stop rendering. Flushes the queue and joins the render thread.
    pub fn stop(&mut self) -> Result<()> {
        let Some(queue) = self.queue.take() else {
            return Ok(());
        };
        queue.set_flushing(true);
        self.join_render_thread();
        let outcome = queue.last_outcome();
        if let Err(e) = &outcome {
            warn!(error = %e, "render thread ended with error");
        }
        info!("sink stopped");
        Ok(())
    }

    /// Close the display connection. Stops first if still running.
    pub fn close(&mut self) -> Result<()> {
        self.stop()?;
        if let Some(display) = self.display.take() {
            display.close();
        }
        Ok(())
    }

    /// Whether the render thread is up.
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    fn join_render_thread(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("render thread panicked");
            }
        }
    }
}

impl Drop for GlesVideoSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Create a sink with the given configuration.
pub fn create_sink(config: SinkConfig) -> GlesVideoSink {
    GlesVideoSink::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PixelFormat, VideoInfo};

    #[test]
    fn submit_before_start_fails() {
        let sink = GlesVideoSink::new(SinkConfig::default());
        let frame = Frame::new(VideoInfo::new(PixelFormat::Rgba, 4, 4));
        assert_eq!(sink.submit(frame), Err(Error::NotStarted));
        assert_eq!(sink.expose(), Err(Error::NotStarted));
    }

    #[test]
    fn start_before_open_fails() {
        let mut sink = GlesVideoSink::new(SinkConfig::default());
        assert_eq!(sink.start().unwrap_err(), Error::NotOpened);
        assert_eq!(sink.supported_formats().unwrap_err(), Error::NotOpened);
    }

    #[test]
    fn stop_without_start_is_ok() {
        let mut sink = GlesVideoSink::new(SinkConfig::default());
        assert!(sink.stop().is_ok());
        assert!(sink.close().is_ok());
        assert!(!sink.is_running());
    }

    #[test]
    fn window_handle_and_rectangle_are_recorded() {
        let sink = GlesVideoSink::new(SinkConfig::default());
        sink.set_window_handle(Some(WindowHandle::new(0xbeef)));
        sink.set_render_rectangle(Some(DisplayRegion::new(10, 10, 100, 100)));
        let shared = sink.shared.lock();
        assert_eq!(shared.window_handle, Some(WindowHandle::new(0xbeef)));
        assert_eq!(
            shared.render_rectangle,
            Some(DisplayRegion::new(10, 10, 100, 100))
        );
    }
}
