//! Pixel format catalog
//!
//! Fixed mapping from a negotiated [`PixelFormat`] to everything the render
//! path needs: the framebuffer config family, the fragment shader flavor,
//! the number of textures (1-3), sampler uniform names and per-plane upload
//! descriptions. Nothing in here is re-derived at runtime; a format keeps
//! the same table entry until a full context teardown.

use crate::types::{PixelFormat, VideoInfo};

/// Framebuffer config family requested from EGL.
///
/// Chosen once per process from what the display supports; carries the raw
/// attribute list used with `eglChooseConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFormat {
    /// 8:8:8:8 RGBA configs
    Rgba8888,
    /// 8:8:8 RGB configs
    Rgb888,
    /// 5:6:5 RGB configs
    Rgb565,
}

const SURFACE_TYPE: i32 = 0x3033; // EGL_SURFACE_TYPE
const WINDOW_BIT: i32 = 0x0004; // EGL_WINDOW_BIT
const RENDERABLE_TYPE: i32 = 0x3040; // EGL_RENDERABLE_TYPE
const OPENGL_ES2_BIT: i32 = 0x0004; // EGL_OPENGL_ES2_BIT
const RED_SIZE: i32 = 0x3024;
const GREEN_SIZE: i32 = 0x3023;
const BLUE_SIZE: i32 = 0x3022;
const ALPHA_SIZE: i32 = 0x3021;
const NONE: i32 = 0x3038; // EGL_NONE

#[rustfmt::skip]
const RGBA8888_ATTRIBS: [i32; 13] = [
    RED_SIZE, 8,
    GREEN_SIZE, 8,
    BLUE_SIZE, 8,
    ALPHA_SIZE, 8,
    SURFACE_TYPE, WINDOW_BIT,
    RENDERABLE_TYPE, OPENGL_ES2_BIT,
    NONE,
];

#[rustfmt::skip]
const RGB888_ATTRIBS: [i32; 11] = [
    RED_SIZE, 8,
    GREEN_SIZE, 8,
    BLUE_SIZE, 8,
    SURFACE_TYPE, WINDOW_BIT,
    RENDERABLE_TYPE, OPENGL_ES2_BIT,
    NONE,
];

#[rustfmt::skip]
const RGB565_ATTRIBS: [i32; 11] = [
    RED_SIZE, 5,
    GREEN_SIZE, 6,
    BLUE_SIZE, 5,
    SURFACE_TYPE, WINDOW_BIT,
    RENDERABLE_TYPE, OPENGL_ES2_BIT,
    NONE,
];

impl DisplayFormat {
    pub const ALL: [DisplayFormat; 3] = [
        DisplayFormat::Rgba8888,
        DisplayFormat::Rgb888,
        DisplayFormat::Rgb565,
    ];

    /// EGL framebuffer attribute list for this config family.
    pub fn attribs(&self) -> &'static [i32] {
        match self {
            DisplayFormat::Rgba8888 => &RGBA8888_ATTRIBS,
            DisplayFormat::Rgb888 => &RGB888_ATTRIBS,
            DisplayFormat::Rgb565 => &RGB565_ATTRIBS,
        }
    }

    /// Pixel formats renderable through this config family.
    pub fn pixel_formats(&self) -> &'static [PixelFormat] {
        match self {
            // An RGBA config can host every upload path, YUV included
            DisplayFormat::Rgba8888 => &PixelFormat::ALL,
            DisplayFormat::Rgb888 => &[PixelFormat::Rgb, PixelFormat::Bgr],
            DisplayFormat::Rgb565 => &[PixelFormat::Rgb16],
        }
    }
}

/// Framebuffer config family a pixel format renders through.
pub fn display_format_for(format: PixelFormat) -> DisplayFormat {
    match format {
        PixelFormat::Rgb | PixelFormat::Bgr => DisplayFormat::Rgb888,
        PixelFormat::Rgb16 => DisplayFormat::Rgb565,
        _ => DisplayFormat::Rgba8888,
    }
}

/// Fragment shader flavor for a pixel format.
///
/// The channel letters are GLSL swizzle components substituted into the
/// shader source; they encode where each Y/U/V or R/G/B component sits in
/// the sampled texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderSelector {
    /// Direct texel copy
    Copy,
    /// Channel-reordering copy
    Reorder(char, char, char),
    /// Packed AYUV conversion
    Ayuv,
    /// Three-plane YUV conversion
    PlanarYuv,
    /// Packed 4:2:2 conversion; components are (y, u, v) sampling channels
    PackedYuv(char, char, char),
    /// Semi-planar conversion; components are (u, v) sampling channels
    InterleavedYuv(char, char),
}

/// Shader flavor for a pixel format. Fixed table, never renegotiated.
pub fn shader_selector(format: PixelFormat) -> ShaderSelector {
    match format {
        PixelFormat::Rgb | PixelFormat::Rgbx | PixelFormat::Rgba | PixelFormat::Rgb16 => {
            ShaderSelector::Copy
        }
        PixelFormat::Bgr | PixelFormat::Bgrx | PixelFormat::Bgra => {
            ShaderSelector::Reorder('b', 'g', 'r')
        }
        PixelFormat::Xrgb | PixelFormat::Argb => ShaderSelector::Reorder('g', 'b', 'a'),
        PixelFormat::Xbgr | PixelFormat::Abgr => ShaderSelector::Reorder('a', 'b', 'g'),
        PixelFormat::Ayuv => ShaderSelector::Ayuv,
        PixelFormat::I420
        | PixelFormat::Yv12
        | PixelFormat::Y444
        | PixelFormat::Y42b
        | PixelFormat::Y41b => ShaderSelector::PlanarYuv,
        PixelFormat::Yuy2 => ShaderSelector::PackedYuv('r', 'g', 'a'),
        PixelFormat::Yvyu => ShaderSelector::PackedYuv('r', 'a', 'g'),
        PixelFormat::Uyvy => ShaderSelector::PackedYuv('a', 'r', 'b'),
        PixelFormat::Nv12 => ShaderSelector::InterleavedYuv('r', 'a'),
        PixelFormat::Nv21 => ShaderSelector::InterleavedYuv('a', 'r'),
    }
}

/// Number of textures a format uploads (1-3).
pub fn texture_count(format: PixelFormat) -> usize {
    match shader_selector(format) {
        ShaderSelector::Copy | ShaderSelector::Reorder(..) | ShaderSelector::Ayuv => 1,
        ShaderSelector::PackedYuv(..) | ShaderSelector::InterleavedYuv(..) => 2,
        ShaderSelector::PlanarYuv => 3,
    }
}

/// Sampler uniform names, in texture-unit order.
pub fn sampler_names(format: PixelFormat) -> &'static [&'static str] {
    match shader_selector(format) {
        ShaderSelector::Copy | ShaderSelector::Reorder(..) | ShaderSelector::Ayuv => &["tex"],
        ShaderSelector::PackedYuv(..) | ShaderSelector::InterleavedYuv(..) => &["Ytex", "UVtex"],
        ShaderSelector::PlanarYuv => &["Ytex", "Utex", "Vtex"],
    }
}

/// GL upload format for one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    /// 4 bytes/texel, GL_RGBA + GL_UNSIGNED_BYTE
    Rgba,
    /// 3 bytes/texel, GL_RGB + GL_UNSIGNED_BYTE
    Rgb,
    /// 2 bytes/texel, GL_RGB + GL_UNSIGNED_SHORT_5_6_5
    Rgb565,
    /// 1 byte/texel, GL_LUMINANCE
    Luminance,
    /// 2 bytes/texel, GL_LUMINANCE_ALPHA
    LuminanceAlpha,
}

impl UploadFormat {
    pub fn bytes_per_texel(&self) -> usize {
        match self {
            UploadFormat::Rgba => 4,
            UploadFormat::Rgb => 3,
            UploadFormat::Rgb565 | UploadFormat::LuminanceAlpha => 2,
            UploadFormat::Luminance => 1,
        }
    }
}

/// One texture upload: byte offset into the frame, texel dimensions, format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneUpload {
    pub offset: usize,
    pub width: u32,
    pub height: u32,
    pub format: UploadFormat,
}

fn half(v: u32) -> u32 {
    (v + 1) / 2
}

/// Per-texture upload layout for a frame of the given geometry.
///
/// Planes are tightly packed; the upload path sets UNPACK_ALIGNMENT to 1.
/// Packed 4:2:2 formats expose the same bytes twice: once as a full-size
/// luminance/alpha texture and once as a half-width RGBA texture holding the
/// chroma pairs (widths are assumed even for these, as in the wire format).
pub fn plane_layout(info: &VideoInfo) -> Vec<PlaneUpload> {
    let (w, h) = (info.width, info.height);
    let y_size = (w as usize) * (h as usize);

    match info.format {
        PixelFormat::Rgb | PixelFormat::Bgr => vec![PlaneUpload {
            offset: 0,
            width: w,
            height: h,
            format: UploadFormat::Rgb,
        }],
        PixelFormat::Rgb16 => vec![PlaneUpload {
            offset: 0,
            width: w,
            height: h,
            format: UploadFormat::Rgb565,
        }],
        PixelFormat::Rgbx
        | PixelFormat::Bgrx
        | PixelFormat::Xrgb
        | PixelFormat::Xbgr
        | PixelFormat::Rgba
        | PixelFormat::Bgra
        | PixelFormat::Argb
        | PixelFormat::Abgr
        | PixelFormat::Ayuv => vec![PlaneUpload {
            offset: 0,
            width: w,
            height: h,
            format: UploadFormat::Rgba,
        }],
        PixelFormat::I420 | PixelFormat::Yv12 => {
            let (cw, ch) = (half(w), half(h));
            let c_size = (cw as usize) * (ch as usize);
            let (u_off, v_off) = if info.format == PixelFormat::I420 {
                (y_size, y_size + c_size)
            } else {
                // YV12 stores V before U
                (y_size + c_size, y_size)
            };
            vec![
                PlaneUpload {
                    offset: 0,
                    width: w,
                    height: h,
                    format: UploadFormat::Luminance,
                },
                PlaneUpload {
                    offset: u_off,
                    width: cw,
                    height: ch,
                    format: UploadFormat::Luminance,
                },
                PlaneUpload {
                    offset: v_off,
                    width: cw,
                    height: ch,
                    format: UploadFormat::Luminance,
                },
            ]
        }
        PixelFormat::Y444 | PixelFormat::Y42b | PixelFormat::Y41b => {
            let cw = match info.format {
                PixelFormat::Y444 => w,
                PixelFormat::Y42b => half(w),
                _ => (w + 3) / 4,
            };
            let c_size = (cw as usize) * (h as usize);
            vec![
                PlaneUpload {
                    offset: 0,
                    width: w,
                    height: h,
                    format: UploadFormat::Luminance,
                },
                PlaneUpload {
                    offset: y_size,
                    width: cw,
                    height: h,
                    format: UploadFormat::Luminance,
                },
                PlaneUpload {
                    offset: y_size + c_size,
                    width: cw,
                    height: h,
                    format: UploadFormat::Luminance,
                },
            ]
        }
        PixelFormat::Yuy2 | PixelFormat::Yvyu | PixelFormat::Uyvy => vec![
            PlaneUpload {
                offset: 0,
                width: w,
                height: h,
                format: UploadFormat::LuminanceAlpha,
            },
            PlaneUpload {
                offset: 0,
                width: half(w),
                height: h,
                format: UploadFormat::Rgba,
            },
        ],
        PixelFormat::Nv12 | PixelFormat::Nv21 => vec![
            PlaneUpload {
                offset: 0,
                width: w,
                height: h,
                format: UploadFormat::Luminance,
            },
            PlaneUpload {
                offset: y_size,
                width: half(w),
                height: half(h),
                format: UploadFormat::LuminanceAlpha,
            },
        ],
    }
}

/// Total frame size in bytes for a given geometry.
pub fn frame_size(info: &VideoInfo) -> usize {
    let (w, h) = (info.width as usize, info.height as usize);
    match info.format {
        PixelFormat::Rgb | PixelFormat::Bgr => w * h * 3,
        PixelFormat::Rgb16 => w * h * 2,
        PixelFormat::Rgbx
        | PixelFormat::Bgrx
        | PixelFormat::Xrgb
        | PixelFormat::Xbgr
        | PixelFormat::Rgba
        | PixelFormat::Bgra
        | PixelFormat::Argb
        | PixelFormat::Abgr
        | PixelFormat::Ayuv => w * h * 4,
        PixelFormat::Yuy2 | PixelFormat::Yvyu | PixelFormat::Uyvy => {
            half(info.width) as usize * 4 * h
        }
        _ => plane_layout(info)
            .iter()
            .map(|p| p.width as usize * p.height as usize * p.format.bytes_per_texel())
            .sum(),
    }
}

/// Pixel formats renderable with the given set of available config families,
/// in negotiation-preference order. Input for upstream format negotiation.
pub fn supported_pixel_formats(available: &[DisplayFormat]) -> Vec<PixelFormat> {
    PixelFormat::ALL
        .iter()
        .copied()
        .filter(|fmt| available.contains(&display_format_for(*fmt)))
        .collect()
}
