//! Native window integration
//!
//! The sink renders into a platform window identified by an opaque handle.
//! The handle normally arrives from the embedding application; when none
//! does, a [`WindowProvider`] can create an internal window instead.

use crate::error::{Error, Result};

/// Opaque native window handle, as passed to EGL surface creation.
///
/// Stored as an integer so it can cross the thread boundary into the render
/// thread; the platform layer it came from guarantees it stays valid until
/// the window is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHandle(usize);

impl WindowHandle {
    pub fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> usize {
        self.0
    }

    pub fn as_ptr(&self) -> *mut std::ffi::c_void {
        self.0 as *mut std::ffi::c_void
    }
}

/// Platform hook for window lifecycle.
///
/// Runs on the render thread. The default implementation has no windowing
/// system behind it and only reports what it cannot do.
pub trait WindowProvider: Send {
    /// Ask the embedding application for a window handle, without creating
    /// one. Returns `None` when the application has none to give.
    fn acquire_window_handle(&mut self) -> Option<WindowHandle>;

    /// Create an internal window of the given size.
    fn create_window(&mut self, width: u32, height: u32) -> Result<WindowHandle>;

    /// Destroy a window previously returned by `create_window`.
    fn destroy_window(&mut self, handle: WindowHandle);

    /// Called once a window, external or internal, is in use.
    fn on_window_handle_ready(&mut self, _handle: WindowHandle) {}
}

/// Provider for embedded use: the application must hand in a handle, the
/// sink never creates its own window.
#[derive(Debug, Default)]
pub struct NullWindowProvider;

impl WindowProvider for NullWindowProvider {
    fn acquire_window_handle(&mut self) -> Option<WindowHandle> {
        None
    }

    fn create_window(&mut self, _width: u32, _height: u32) -> Result<WindowHandle> {
        Err(Error::WindowCreationFailed(
            "no windowing backend available".into(),
        ))
    }

    fn destroy_window(&mut self, _handle: WindowHandle) {}
}

/// Resolve the window to render into.
///
/// Preference order: an externally supplied handle, then one offered by the
/// provider, then an internally created window when configuration allows.
/// The boolean is true when the window was created here and must be
/// destroyed on teardown.
pub fn resolve_window(
    external: Option<WindowHandle>,
    provider: &mut dyn WindowProvider,
    create_window: bool,
    width: u32,
    height: u32,
) -> Result<(WindowHandle, bool)> {
    if let Some(handle) = external {
        provider.on_window_handle_ready(handle);
        return Ok((handle, false));
    }
    if let Some(handle) = provider.acquire_window_handle() {
        provider.on_window_handle_ready(handle);
        return Ok((handle, false));
    }
    if !create_window {
        return Err(Error::NoWindowAvailable);
    }
    let handle = provider.create_window(width, height)?;
    provider.on_window_handle_ready(handle);
    Ok((handle, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider {
        offered: Option<WindowHandle>,
        created: Vec<WindowHandle>,
        destroyed: Vec<WindowHandle>,
        next: usize,
    }

    impl FakeProvider {
        fn new(offered: Option<WindowHandle>) -> Self {
            Self {
                offered,
                created: Vec::new(),
                destroyed: Vec::new(),
                next: 0x1000,
            }
        }
    }

    impl WindowProvider for FakeProvider {
        fn acquire_window_handle(&mut self) -> Option<WindowHandle> {
            self.offered
        }

        fn create_window(&mut self, _width: u32, _height: u32) -> Result<WindowHandle> {
            let handle = WindowHandle::new(self.next);
            self.next += 1;
            self.created.push(handle);
            Ok(handle)
        }

        fn destroy_window(&mut self, handle: WindowHandle) {
            self.destroyed.push(handle);
        }
    }

    #[test]
    fn external_handle_wins() {
        let mut provider = FakeProvider::new(Some(WindowHandle::new(7)));
        let external = Some(WindowHandle::new(42));
        let (handle, own) = resolve_window(external, &mut provider, true, 320, 240).unwrap();
        assert_eq!(handle, WindowHandle::new(42));
        assert!(!own);
        assert!(provider.created.is_empty());
    }

    #[test]
    fn provider_offer_beats_creation() {
        let mut provider = FakeProvider::new(Some(WindowHandle::new(7)));
        let (handle, own) = resolve_window(None, &mut provider, true, 320, 240).unwrap();
        assert_eq!(handle, WindowHandle::new(7));
        assert!(!own);
    }

    #[test]
    fn creates_own_window_as_last_resort() {
        let mut provider = FakeProvider::new(None);
        let (handle, own) = resolve_window(None, &mut provider, true, 320, 240).unwrap();
        assert!(own);
        assert_eq!(provider.created, vec![handle]);
    }

    #[test]
    fn creation_disabled_yields_no_window() {
        let mut provider = FakeProvider::new(None);
        assert_eq!(
            resolve_window(None, &mut provider, false, 320, 240),
            Err(Error::NoWindowAvailable)
        );
    }

    #[test]
    fn null_provider_cannot_create() {
        let mut provider = NullWindowProvider;
        assert!(matches!(
            provider.create_window(320, 240),
            Err(Error::WindowCreationFailed(_))
        ));
    }
}
