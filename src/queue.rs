//! Frame queue between the submitting thread and the render thread
//!
//! Holds at most one visible frame in flight: a submitter blocks until the
//! render thread has fully processed its frame and reports back the render
//! outcome. Flushing drops everything queued and releases any blocked
//! submitter with a flushing error.

use crate::error::{Error, Result};
use crate::types::Frame;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use tracing::debug;

/// One queued render request.
///
/// `frame` of `None` asks the render thread to redraw the last frame (or
/// clear the surface if nothing was shown yet). Redraws carry no completion
/// channel; the submitter does not wait for them.
pub struct QueueItem {
    pub frame: Option<Frame>,
    done: Option<Sender<Result<()>>>,
}

impl QueueItem {
    /// Report the render outcome to the blocked submitter, if any.
    pub fn complete(mut self, outcome: Result<()>) {
        if let Some(done) = self.done.take() {
            // Receiver gone means the submitter was released by a flush
            let _ = done.send(outcome);
        }
    }
}

struct Inner {
    items: VecDeque<QueueItem>,
    flushing: bool,
    shut_down: bool,
    last_outcome: Result<()>,
}

impl Inner {
    fn has_visible_item(&self) -> bool {
        self.items.iter().any(|item| item.frame.is_some())
    }
}

/// Bounded handoff queue for render requests.
pub struct FrameQueue {
    inner: Mutex<Inner>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                flushing: false,
                shut_down: false,
                last_outcome: Ok(()),
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Submit a frame for display and block until it has been rendered.
    ///
    /// Returns the render outcome, `Err(Flushing)` if the queue was flushed
    /// while waiting, or the last recorded outcome if the render thread has
    /// already gone away.
    pub fn submit(&self, frame: Frame) -> Result<()> {
        let rx = {
            let mut inner = self.inner.lock();
            if inner.flushing {
                return Err(Error::Flushing);
            }
            if inner.shut_down {
                return match &inner.last_outcome {
                    Ok(()) => Err(Error::NotStarted),
                    Err(e) => Err(e.clone()),
                };
            }
            while inner.has_visible_item() {
                self.not_full.wait(&mut inner);
                if inner.flushing {
                    return Err(Error::Flushing);
                }
                if inner.shut_down {
                    return match &inner.last_outcome {
                        Ok(()) => Err(Error::NotStarted),
                        Err(e) => Err(e.clone()),
                    };
                }
            }
            let (tx, rx) = bounded(1);
            inner.items.push_back(QueueItem {
                frame: Some(frame),
                done: Some(tx),
            });
            self.not_empty.notify_one();
            rx
        };
        self.wait_done(rx)
    }

    /// Queue a redraw request without blocking.
    ///
    /// Dropped silently while flushing; a redraw of stale state is never
    /// worth waking a flushing pipeline for.
    pub fn submit_redraw(&self) {
        let mut inner = self.inner.lock();
        if inner.flushing || inner.shut_down {
            return;
        }
        inner.items.push_back(QueueItem {
            frame: None,
            done: None,
        });
        self.not_empty.notify_one();
    }

    /// Pop the next request, blocking until one arrives.
    ///
    /// Returns `None` when the queue enters the flushing state or is shut
    /// down; the render thread uses that as its exit signal.
    pub fn pop(&self) -> Option<QueueItem> {
        let mut inner = self.inner.lock();
        loop {
            if inner.flushing || inner.shut_down {
                return None;
            }
            if let Some(item) = inner.items.pop_front() {
                if item.frame.is_some() {
                    self.not_full.notify_one();
                }
                return Some(item);
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Enter or leave the flushing state.
    ///
    /// Entering drops everything queued; dropping an item's completion
    /// channel wakes its submitter with a flushing error.
    pub fn set_flushing(&self, flushing: bool) {
        let mut inner = self.inner.lock();
        inner.flushing = flushing;
        if flushing {
            let dropped = inner.items.len();
            inner.items.clear();
            if dropped > 0 {
                debug!(dropped, "flushed queued render requests");
            }
        }
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Record the terminal outcome and wake everyone; called by the render
    /// thread on its way out.
    pub fn shut_down(&self, outcome: Result<()>) {
        let mut inner = self.inner.lock();
        inner.shut_down = true;
        inner.last_outcome = outcome;
        inner.items.clear();
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Last outcome recorded by the render thread.
    pub fn last_outcome(&self) -> Result<()> {
        self.inner.lock().last_outcome.clone()
    }

    fn wait_done(&self, rx: Receiver<Result<()>>) -> Result<()> {
        match rx.recv() {
            Ok(outcome) => outcome,
            // Sender dropped without completing: flush or thread exit
            Err(_) => {
                let inner = self.inner.lock();
                if inner.shut_down {
                    match &inner.last_outcome {
                        Ok(()) => Err(Error::Flushing),
                        Err(e) => Err(e.clone()),
                    }
                } else {
                    Err(Error::Flushing)
                }
            }
        }
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PixelFormat, VideoInfo};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn test_frame() -> Frame {
        Frame::new(VideoInfo::new(PixelFormat::Rgba, 4, 4))
    }

    #[test]
    fn submit_completes_with_render_outcome() {
        let queue = Arc::new(FrameQueue::new());
        let q = queue.clone();
        let render = thread::spawn(move || {
            let item = q.pop().unwrap();
            assert!(item.frame.is_some());
            item.complete(Ok(()));
        });
        assert_eq!(queue.submit(test_frame()), Ok(()));
        render.join().unwrap();
    }

    #[test]
    fn submit_propagates_render_failure() {
        let queue = Arc::new(FrameQueue::new());
        let q = queue.clone();
        let render = thread::spawn(move || {
            let item = q.pop().unwrap();
            item.complete(Err(Error::RenderFailed("lost surface".into())));
        });
        assert_eq!(
            queue.submit(test_frame()),
            Err(Error::RenderFailed("lost surface".into()))
        );
        render.join().unwrap();
    }

    #[test]
    fn flush_fails_fast() {
        let queue = FrameQueue::new();
        queue.set_flushing(true);
        assert_eq!(queue.submit(test_frame()), Err(Error::Flushing));
        queue.set_flushing(false);
        queue.submit_redraw();
        assert!(queue.pop().unwrap().frame.is_none());
    }

    #[test]
    fn flush_releases_blocked_submitter() {
        let queue = Arc::new(FrameQueue::new());
        let q = queue.clone();
        let submitter = thread::spawn(move || q.submit(test_frame()));
        // Let the item land in the queue, then flush without popping it
        thread::sleep(Duration::from_millis(50));
        queue.set_flushing(true);
        assert_eq!(submitter.join().unwrap(), Err(Error::Flushing));
    }

    #[test]
    fn at_most_one_visible_frame_in_flight() {
        let queue = Arc::new(FrameQueue::new());
        let q = queue.clone();
        let first = thread::spawn(move || q.submit(test_frame()));
        thread::sleep(Duration::from_millis(50));

        // Second submitter must block until the first item is popped
        let q = queue.clone();
        let second = thread::spawn(move || q.submit(test_frame()));
        thread::sleep(Duration::from_millis(50));
        assert!(!second.is_finished());

        let item = queue.pop().unwrap();
        item.complete(Ok(()));
        assert_eq!(first.join().unwrap(), Ok(()));

        let item = queue.pop().unwrap();
        item.complete(Ok(()));
        assert_eq!(second.join().unwrap(), Ok(()));
    }

    #[test]
    fn redraw_does_not_block_or_fill() {
        let queue = Arc::new(FrameQueue::new());
        queue.submit_redraw();
        queue.submit_redraw();

        // A visible frame can still be submitted behind queued redraws
        let q = queue.clone();
        let submitter = thread::spawn(move || q.submit(test_frame()));
        assert!(queue.pop().unwrap().frame.is_none());
        assert!(queue.pop().unwrap().frame.is_none());
        let item = queue.pop().unwrap();
        assert!(item.frame.is_some());
        item.complete(Ok(()));
        assert_eq!(submitter.join().unwrap(), Ok(()));
    }

    #[test]
    fn shutdown_releases_blocked_submitter_with_last_outcome() {
        let queue = Arc::new(FrameQueue::new());
        let q = queue.clone();
        let submitter = thread::spawn(move || q.submit(test_frame()));
        thread::sleep(Duration::from_millis(50));

        // Render thread dies without servicing the item
        let item = queue.pop().unwrap();
        queue.shut_down(Err(Error::ShaderBuildFailed("link error".into())));
        drop(item);
        assert_eq!(
            submitter.join().unwrap(),
            Err(Error::ShaderBuildFailed("link error".into()))
        );
    }

    #[test]
    fn pop_returns_none_while_flushing() {
        let queue = FrameQueue::new();
        queue.set_flushing(true);
        assert!(queue.pop().is_none());
    }
}
