//! Renderer abstraction and the render thread loop
//!
//! The loop owns a [`Renderer`] and services the frame queue: it rebuilds
//! GPU state when the stream description changes, draws frames, answers
//! redraw requests, and reports each outcome back to the submitter.

use crate::error::{Error, Result};
use crate::queue::FrameQueue;
use crate::types::{Frame, VideoInfo};
use std::sync::Arc;
use tracing::{debug, error, info};

/// GPU-facing half of the sink.
///
/// Implemented by the EGL/GLES backend; tests drive the loop with a mock.
pub trait Renderer {
    /// Build surface, shaders and textures for a stream description.
    ///
    /// Called with everything from any previous configuration already torn
    /// down. A failure here is fatal to the render thread.
    fn configure(&mut self, info: &VideoInfo) -> Result<()>;

    /// Release everything `configure` built.
    fn unconfigure(&mut self);

    /// Upload and draw a frame, or redraw the last state when `None`.
    fn draw(&mut self, frame: Option<&Frame>) -> Result<()>;
}

/// Service the queue until flush, shutdown or a fatal error.
///
/// Records the terminal outcome in the queue on the way out so late
/// submitters see why the thread is gone.
pub fn run_render_loop<R: Renderer>(mut renderer: R, queue: Arc<FrameQueue>) {
    let mut current: Option<VideoInfo> = None;
    let outcome = loop {
        let Some(item) = queue.pop() else {
            break Ok(());
        };

        if let Some(frame) = &item.frame {
            if current.as_ref() != Some(&frame.info) {
                if current.is_some() {
                    debug!(info = ?frame.info, "stream description changed, rebuilding");
                    renderer.unconfigure();
                }
                if let Err(e) = renderer.configure(&frame.info) {
                    error!(error = %e, "renderer configuration failed");
                    item.complete(Err(e.clone()));
                    break Err(e);
                }
                info!(info = ?frame.info, "renderer configured");
                current = Some(frame.info.clone());
            }
        } else if current.is_none() {
            // Redraw before the first frame: nothing to show yet
            item.complete(Ok(()));
            continue;
        }

        let result = renderer.draw(item.frame.as_ref());
        if let Err(e) = &result {
            error!(error = %e, "draw failed");
        }
        let fatal = result.as_ref().err().map(Error::is_fatal).unwrap_or(false);
        let err = result.clone().err();
        item.complete(result);
        if fatal {
            break Err(err.unwrap_or_else(|| Error::Internal("missing error".into())));
        }
    };

    renderer.unconfigure();
    queue.shut_down(outcome);
    debug!("render thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelFormat;
    use parking_lot::Mutex;
    use std::thread;

    #[derive(Default)]
    struct Calls {
        configures: usize,
        unconfigures: usize,
        draws: usize,
        redraws: usize,
    }

    struct MockRenderer {
        calls: Arc<Mutex<Calls>>,
        fail_configure: bool,
        draw_error: Option<Error>,
    }

    impl MockRenderer {
        fn new(calls: Arc<Mutex<Calls>>) -> Self {
            Self {
                calls,
                fail_configure: false,
                draw_error: None,
            }
        }
    }

    impl Renderer for MockRenderer {
        fn configure(&mut self, _info: &VideoInfo) -> Result<()> {
            self.calls.lock().configures += 1;
            if self.fail_configure {
                return Err(Error::ShaderBuildFailed("mock".into()));
            }
            Ok(())
        }

        fn unconfigure(&mut self) {
            self.calls.lock().unconfigures += 1;
        }

        fn draw(&mut self, frame: Option<&Frame>) -> Result<()> {
            let mut calls = self.calls.lock();
            match frame {
                Some(_) => calls.draws += 1,
                None => calls.redraws += 1,
            }
            match &self.draw_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    fn frame(format: PixelFormat, w: u32, h: u32) -> Frame {
        Frame::new(VideoInfo::new(format, w, h))
    }

    fn spawn_loop(renderer: MockRenderer, queue: Arc<FrameQueue>) -> thread::JoinHandle<()> {
        thread::spawn(move || run_render_loop(renderer, queue))
    }

    #[test]
    fn configures_once_for_identical_frames() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let queue = Arc::new(FrameQueue::new());
        let handle = spawn_loop(MockRenderer::new(calls.clone()), queue.clone());

        for _ in 0..3 {
            queue.submit(frame(PixelFormat::I420, 320, 240)).unwrap();
        }
        queue.set_flushing(true);
        handle.join().unwrap();

        let calls = calls.lock();
        assert_eq!(calls.configures, 1);
        assert_eq!(calls.draws, 3);
    }

    #[test]
    fn reconfigures_on_format_change_with_teardown_first() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let queue = Arc::new(FrameQueue::new());
        let handle = spawn_loop(MockRenderer::new(calls.clone()), queue.clone());

        queue.submit(frame(PixelFormat::I420, 320, 240)).unwrap();
        queue.submit(frame(PixelFormat::Nv12, 320, 240)).unwrap();
        queue.set_flushing(true);
        handle.join().unwrap();

        let calls = calls.lock();
        assert_eq!(calls.configures, 2);
        // One teardown between configurations, one on thread exit
        assert_eq!(calls.unconfigures, 2);
    }

    #[test]
    fn configure_failure_stops_the_thread() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let queue = Arc::new(FrameQueue::new());
        let mut renderer = MockRenderer::new(calls.clone());
        renderer.fail_configure = true;
        let handle = spawn_loop(renderer, queue.clone());

        assert_eq!(
            queue.submit(frame(PixelFormat::Rgba, 64, 64)),
            Err(Error::ShaderBuildFailed("mock".into()))
        );
        handle.join().unwrap();
        assert_eq!(calls.lock().draws, 0);
        assert_eq!(
            queue.last_outcome(),
            Err(Error::ShaderBuildFailed("mock".into()))
        );
    }

    #[test]
    fn render_failure_is_reported_but_not_fatal() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let queue = Arc::new(FrameQueue::new());
        let mut renderer = MockRenderer::new(calls.clone());
        renderer.draw_error = Some(Error::RenderFailed("swap failed".into()));
        let handle = spawn_loop(renderer, queue.clone());

        assert_eq!(
            queue.submit(frame(PixelFormat::Rgba, 64, 64)),
            Err(Error::RenderFailed("swap failed".into()))
        );
        // Thread survives and serves the next frame
        assert_eq!(
            queue.submit(frame(PixelFormat::Rgba, 64, 64)),
            Err(Error::RenderFailed("swap failed".into()))
        );
        queue.set_flushing(true);
        handle.join().unwrap();
        assert_eq!(calls.lock().draws, 2);
    }

    #[test]
    fn redraw_before_first_frame_is_a_no_op() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let queue = Arc::new(FrameQueue::new());
        let handle = spawn_loop(MockRenderer::new(calls.clone()), queue.clone());

        queue.submit_redraw();
        queue.submit(frame(PixelFormat::Rgba, 64, 64)).unwrap();
        queue.submit_redraw();
        queue.submit(frame(PixelFormat::Rgba, 64, 64)).unwrap();
        queue.set_flushing(true);
        handle.join().unwrap();

        let calls = calls.lock();
        assert_eq!(calls.configures, 1);
        assert_eq!(calls.draws, 2);
        // First redraw arrived before any configuration and was skipped
        assert!(calls.redraws <= 1);
    }
}
