//! EGL display and context lifecycle
//!
//! The display connection is opened once on the control thread and shared
//! with the render thread, which owns the context and surface. EGL entry
//! points are loaded dynamically at runtime.

use crate::error::{Error, Result};
use crate::format::DisplayFormat;
use crate::types::Fraction;
use crate::window::WindowHandle;
use khronos_egl as egl;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type EglInstance = egl::DynamicInstance<egl::EGL1_4>;

/// EGL scales the pixel aspect ratio it reports by this factor.
pub const DISPLAY_SCALING: i32 = 10_000;
/// Value EGL returns for attributes it cannot answer.
pub const EGL_UNKNOWN: i32 = -1;

const PIXEL_ASPECT_RATIO: i32 = 0x3092;
const SWAP_BEHAVIOR: i32 = 0x3093;
const BUFFER_PRESERVED: i32 = 0x3094;

/// Clamp a raw EGL pixel aspect ratio to something sane.
///
/// Values outside a 10x band around square pixels are treated as driver
/// garbage and replaced with 1:1, as is the unknown marker.
pub fn sanitize_display_par(raw: i32) -> Fraction {
    if raw == EGL_UNKNOWN {
        return Fraction::ONE;
    }
    if raw < DISPLAY_SCALING / 10 || raw > DISPLAY_SCALING * 10 {
        warn!(raw, "implausible display pixel aspect ratio, assuming 1:1");
        return Fraction::ONE;
    }
    Fraction::new(raw as u32, DISPLAY_SCALING as u32).reduced()
}

/// An open EGL display connection.
///
/// Holds the dynamically loaded EGL entry points and the initialized
/// display. Safe to hand to the render thread: EGL displays are process
/// globals, not thread-bound objects.
pub struct EglDisplay {
    instance: Arc<EglInstance>,
    display: usize,
    version: (i32, i32),
}

unsafe impl Send for EglDisplay {}
unsafe impl Sync for EglDisplay {}

impl EglDisplay {
    /// Load libEGL, connect to the default display and initialize it.
    pub fn open() -> Result<Self> {
        let instance = unsafe { EglInstance::load_required() }
            .map_err(|e| Error::DisplayUnavailable(format!("loading libEGL: {e}")))?;

        let display = unsafe { instance.get_display(egl::DEFAULT_DISPLAY) }
            .ok_or_else(|| Error::DisplayUnavailable("no default display".into()))?;

        let (major, minor) = instance
            .initialize(display)
            .map_err(|e| Error::DisplayUnavailable(format!("eglInitialize: {e}")))?;
        if major < 1 || (major == 1 && minor < 2) {
            return Err(Error::VersionUnsupported {
                major,
                minor,
                required: 2,
            });
        }

        instance
            .bind_api(egl::OPENGL_ES_API)
            .map_err(|e| Error::DisplayUnavailable(format!("eglBindAPI: {e}")))?;

        if let Ok(extensions) = instance.query_string(Some(display), egl::EXTENSIONS) {
            debug!(extensions = %extensions.to_string_lossy(), "EGL display extensions");
        }
        info!(major, minor, "EGL display initialized");

        Ok(Self {
            instance: Arc::new(instance),
            display: display.as_ptr() as usize,
            version: (major, minor),
        })
    }

    pub fn version(&self) -> (i32, i32) {
        self.version
    }

    pub fn instance(&self) -> &Arc<EglInstance> {
        &self.instance
    }

    pub(crate) fn raw(&self) -> egl::Display {
        unsafe { egl::Display::from_ptr(self.display as *mut _) }
    }

    /// Config families this display has at least one config for.
    pub fn supported_display_formats(&self) -> Vec<DisplayFormat> {
        DisplayFormat::ALL
            .iter()
            .copied()
            .filter(|fmt| {
                matches!(
                    self.instance.choose_first_config(self.raw(), fmt.attribs()),
                    Ok(Some(_))
                )
            })
            .collect()
    }

    /// Terminate the display connection.
    pub fn close(&self) {
        if let Err(e) = self.instance.terminate(self.raw()) {
            warn!(error = %e, "eglTerminate failed");
        }
    }
}

/// Surface and context state owned by the render thread.
pub struct EglContext {
    display: Arc<EglDisplay>,
    config: egl::Config,
    context: egl::Context,
    surface: Option<egl::Surface>,
    /// Driver keeps the back buffer across swaps; redraws can skip re-upload
    pub buffer_preserved: bool,
    /// Display pixel aspect ratio queried at surface creation
    pub display_par: Fraction,
}

impl EglContext {
    /// Choose a config from the requested family and create a GLESv2
    /// context for it. No surface yet.
    pub fn new(display: Arc<EglDisplay>, format: DisplayFormat) -> Result<Self> {
        let instance = display.instance().clone();
        let config = instance
            .choose_first_config(display.raw(), format.attribs())
            .map_err(|e| Error::NoMatchingConfig(format!("eglChooseConfig: {e}")))?
            .ok_or_else(|| Error::NoMatchingConfig(format!("{format:?}")))?;

        let context_attribs = [egl::CONTEXT_CLIENT_VERSION, 2, egl::NONE];
        let context = instance
            .create_context(display.raw(), config, None, &context_attribs)
            .map_err(|e| Error::SurfaceCreationFailed(format!("eglCreateContext: {e}")))?;
        debug!(?format, "EGL context created");

        Ok(Self {
            display,
            config,
            context,
            surface: None,
            buffer_preserved: false,
            display_par: Fraction::ONE,
        })
    }

    /// Create the window surface and make the context current on it.
    ///
    /// Queries the display pixel aspect ratio once here; it does not change
    /// for the lifetime of a surface.
    pub fn create_surface(&mut self, window: WindowHandle) -> Result<()> {
        let instance = self.display.instance();
        let surface = unsafe {
            instance.create_window_surface(
                self.display.raw(),
                self.config,
                window.as_ptr() as egl::NativeWindowType,
                None,
            )
        }
        .map_err(|e| Error::SurfaceCreationFailed(format!("eglCreateWindowSurface: {e}")))?;
        self.surface = Some(surface);
        self.make_current()?;

        self.buffer_preserved = instance
            .query_surface(self.display.raw(), surface, SWAP_BEHAVIOR)
            .map(|v| v == BUFFER_PRESERVED)
            .unwrap_or(false);

        let raw_par = instance
            .query_surface(self.display.raw(), surface, PIXEL_ASPECT_RATIO)
            .unwrap_or(EGL_UNKNOWN);
        self.display_par = sanitize_display_par(raw_par);
        debug!(
            buffer_preserved = self.buffer_preserved,
            display_par = %self.display_par,
            "window surface created"
        );
        Ok(())
    }

    /// Make the context current, skipping the call when it already is.
    pub fn make_current(&self) -> Result<()> {
        let instance = self.display.instance();
        if instance.get_current_context() == Some(self.context) {
            return Ok(());
        }
        instance
            .make_current(self.display.raw(), self.surface, self.surface, Some(self.context))
            .map_err(|e| Error::SurfaceCreationFailed(format!("eglMakeCurrent: {e}")))
    }

    /// Current surface size in pixels.
    pub fn surface_size(&self) -> Result<(u32, u32)> {
        let instance = self.display.instance();
        let surface = self
            .surface
            .ok_or_else(|| Error::Internal("no surface".into()))?;
        let w = instance
            .query_surface(self.display.raw(), surface, egl::WIDTH)
            .map_err(|e| Error::RenderFailed(format!("eglQuerySurface: {e}")))?;
        let h = instance
            .query_surface(self.display.raw(), surface, egl::HEIGHT)
            .map_err(|e| Error::RenderFailed(format!("eglQuerySurface: {e}")))?;
        Ok((w.max(0) as u32, h.max(0) as u32))
    }

    pub fn swap_buffers(&self) -> Result<()> {
        let instance = self.display.instance();
        let surface = self
            .surface
            .ok_or_else(|| Error::Internal("no surface".into()))?;
        instance
            .swap_buffers(self.display.raw(), surface)
            .map_err(|e| Error::RenderFailed(format!("eglSwapBuffers: {e}")))
    }

    /// GL function loader for this context.
    pub fn get_proc_address(&self, name: &str) -> *const std::ffi::c_void {
        match self.display.instance().get_proc_address(name) {
            Some(f) => f as *const std::ffi::c_void,
            None => std::ptr::null(),
        }
    }

    /// Release the surface and context. Unbinds first so EGL does not hold
    /// on to them until the next make-current.
    pub fn destroy(&mut self) {
        let instance = self.display.instance();
        let _ = instance.make_current(self.display.raw(), None, None, None);
        if let Some(surface) = self.surface.take() {
            if let Err(e) = instance.destroy_surface(self.display.raw(), surface) {
                warn!(error = %e, "eglDestroySurface failed");
            }
        }
        if let Err(e) = instance.destroy_context(self.display.raw(), self.context) {
            warn!(error = %e, "eglDestroyContext failed");
        }
    }
}
