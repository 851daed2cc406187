//! Common types used throughout glessink

use serde::{Deserialize, Serialize};

/// Pixel format of an incoming video frame.
///
/// Covers the packed RGB variants, packed YUV (AYUV and the 4:2:2 family),
/// planar YUV, the semi-planar NV12/NV21 pair and 16-bit RGB. Immutable once
/// a frame's format has been negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 24-bit packed RGB
    Rgb,
    /// 24-bit packed BGR
    Bgr,
    /// 32-bit RGB with padding byte
    Rgbx,
    /// 32-bit BGR with padding byte
    Bgrx,
    /// 32-bit padded RGB, padding first
    Xrgb,
    /// 32-bit padded BGR, padding first
    Xbgr,
    /// 32-bit RGBA
    Rgba,
    /// 32-bit BGRA
    Bgra,
    /// 32-bit ARGB
    Argb,
    /// 32-bit ABGR
    Abgr,
    /// 16-bit RGB 5:6:5
    Rgb16,
    /// Packed 4:4:4 YUV with alpha
    Ayuv,
    /// Planar 4:2:0 YUV, U before V
    I420,
    /// Planar 4:2:0 YUV, V before U
    Yv12,
    /// Planar 4:4:4 YUV
    Y444,
    /// Planar 4:2:2 YUV
    Y42b,
    /// Planar 4:1:1 YUV
    Y41b,
    /// Packed 4:2:2 YUV, Y-U-Y-V ordering
    Yuy2,
    /// Packed 4:2:2 YUV, Y-V-Y-U ordering
    Yvyu,
    /// Packed 4:2:2 YUV, U-Y-V-Y ordering
    Uyvy,
    /// Semi-planar 4:2:0, Y plane + interleaved UV
    Nv12,
    /// Semi-planar 4:2:0, Y plane + interleaved VU
    Nv21,
}

impl PixelFormat {
    /// Every format the sink can render, in negotiation-preference order.
    pub const ALL: [PixelFormat; 22] = [
        PixelFormat::Rgba,
        PixelFormat::Bgra,
        PixelFormat::Argb,
        PixelFormat::Abgr,
        PixelFormat::Rgbx,
        PixelFormat::Bgrx,
        PixelFormat::Xrgb,
        PixelFormat::Xbgr,
        PixelFormat::Ayuv,
        PixelFormat::Y444,
        PixelFormat::I420,
        PixelFormat::Yv12,
        PixelFormat::Nv12,
        PixelFormat::Nv21,
        PixelFormat::Yuy2,
        PixelFormat::Yvyu,
        PixelFormat::Uyvy,
        PixelFormat::Y42b,
        PixelFormat::Y41b,
        PixelFormat::Rgb,
        PixelFormat::Bgr,
        PixelFormat::Rgb16,
    ];

    /// Is this one of the YUV family (needs colorspace conversion)?
    pub fn is_yuv(&self) -> bool {
        matches!(
            self,
            PixelFormat::Ayuv
                | PixelFormat::I420
                | PixelFormat::Yv12
                | PixelFormat::Y444
                | PixelFormat::Y42b
                | PixelFormat::Y41b
                | PixelFormat::Yuy2
                | PixelFormat::Yvyu
                | PixelFormat::Uyvy
                | PixelFormat::Nv12
                | PixelFormat::Nv21
        )
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// An integer ratio. Used for storage and display pixel aspect ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    pub num: u32,
    pub den: u32,
}

impl Fraction {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Square pixels / unity ratio.
    pub const ONE: Self = Self::new(1, 1);

    /// Reduce by the greatest common divisor.
    pub fn reduced(self) -> Self {
        let g = gcd(self.num.max(1), self.den.max(1));
        Self {
            num: self.num / g,
            den: self.den / g,
        }
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::ONE
    }
}

impl std::fmt::Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Negotiated video stream description.
///
/// Equality between two `VideoInfo`s decides whether the render thread must
/// tear down and rebuild its GPU resources when a frame arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    /// Pixel format
    pub format: PixelFormat,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Storage pixel aspect ratio, as encoded in the source
    pub par: Fraction,
}

impl VideoInfo {
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            par: Fraction::ONE,
        }
    }

    pub fn with_par(mut self, num: u32, den: u32) -> Self {
        self.par = Fraction::new(num, den);
        self
    }
}

/// A decoded video frame handed to the sink for display.
///
/// Planes are tightly packed (no row padding); see
/// [`crate::format::plane_layout`] for the exact byte layout per format.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel data, all planes contiguous
    pub data: Vec<u8>,
    /// Stream description
    pub info: VideoInfo,
}

impl Frame {
    /// Create a zero-filled frame of the right size for `info`.
    pub fn new(info: VideoInfo) -> Self {
        let size = crate::format::frame_size(&info);
        Self {
            data: vec![0u8; size],
            info,
        }
    }

    /// Wrap existing pixel data.
    pub fn from_data(data: Vec<u8>, info: VideoInfo) -> Self {
        Self { data, info }
    }

    /// Frame size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Destination rectangle within the output surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayRegion {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl DisplayRegion {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}
