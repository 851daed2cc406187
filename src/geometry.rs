//! Display geometry
//!
//! Aspect-ratio math and vertex generation for the render pass. The scaled
//! frame size is computed once per stream configuration; the vertex array is
//! rebuilt whenever the destination rectangle or surface size changes.

use crate::types::{DisplayRegion, Fraction, VideoInfo};
use bytemuck::{Pod, Zeroable};

/// One vertex of the render pass: position plus texture coordinate.
///
/// The border quads only ever read the position; their texture coordinates
/// stay zeroed.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub tex: [f32; 2],
}

pub const VERTEX_STRIDE: i32 = std::mem::size_of::<Vertex>() as i32;

/// Byte offset of the first border quad within the vertex buffer.
pub const BORDER1_OFFSET: i32 = 4 * VERTEX_STRIDE;
/// Byte offset of the second border quad.
pub const BORDER2_OFFSET: i32 = 8 * VERTEX_STRIDE;

/// Triangle-strip indices shared by the content and border quads.
pub const INDICES: [u16; 4] = [0, 1, 2, 3];

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Display aspect ratio of a stream on a display with the given pixel
/// aspect ratio.
///
/// Computed in 64-bit intermediates so large frame sizes cannot overflow.
pub fn display_aspect_ratio(info: &VideoInfo, display_par: Fraction) -> Fraction {
    let num = info.width as u64 * info.par.num as u64 * display_par.den as u64;
    let den = info.height as u64 * info.par.den as u64 * display_par.num as u64;
    let g = gcd(num.max(1), den.max(1));
    Fraction::new((num / g) as u32, (den / g) as u32)
}

/// Frame size scaled so it shows with the correct display aspect ratio.
///
/// Prefers keeping one original dimension: height when it divides evenly
/// into the ratio, else width, else height is scaled anyway.
pub fn scaled_size(info: &VideoInfo, dar: Fraction) -> (u32, u32) {
    let (w, h) = (info.width, info.height);
    if h % dar.den == 0 {
        ((h as u64 * dar.num as u64 / dar.den as u64) as u32, h)
    } else if w % dar.num == 0 {
        (w, (w as u64 * dar.den as u64 / dar.num as u64) as u32)
    } else {
        ((h as u64 * dar.num as u64 / dar.den as u64) as u32, h)
    }
}

/// Center a scaled frame inside the output surface, shrinking to fit while
/// preserving its aspect ratio.
pub fn center_region(frame_w: u32, frame_h: u32, surface_w: u32, surface_h: u32) -> DisplayRegion {
    if frame_w == 0 || frame_h == 0 || surface_w == 0 || surface_h == 0 {
        return DisplayRegion::new(0, 0, surface_w, surface_h);
    }
    // Compare frame_w/frame_h against surface_w/surface_h without division
    let frame_wider = frame_w as u64 * surface_h as u64 >= surface_w as u64 * frame_h as u64;
    let (w, h) = if frame_wider {
        let h = (surface_w as u64 * frame_h as u64 / frame_w as u64) as u32;
        (surface_w, h)
    } else {
        let w = (surface_h as u64 * frame_w as u64 / frame_h as u64) as u32;
        (w, surface_h)
    };
    DisplayRegion::new(
        ((surface_w - w) / 2) as i32,
        ((surface_h - h) / 2) as i32,
        w,
        h,
    )
}

fn to_ndc(v: i32, extent: u32) -> f32 {
    if extent == 0 {
        return -1.0;
    }
    v as f32 * 2.0 / extent as f32 - 1.0
}

/// Build the 12-vertex array for one render pass.
///
/// Vertices 0-3 are the content quad (position + texture coordinate),
/// 4-7 and 8-11 the two border quads (position only). When the content
/// rectangle touches the left edge the borders sit above and below it,
/// otherwise to its left and right.
pub fn build_vertices(region: &DisplayRegion, surface_w: u32, surface_h: u32) -> [Vertex; 12] {
    let x1 = to_ndc(region.x, surface_w);
    let x2 = to_ndc(region.x + region.w as i32, surface_w);
    let y1 = to_ndc(region.y, surface_h);
    let y2 = to_ndc(region.y + region.h as i32, surface_h);

    let mut verts = [Vertex {
        pos: [0.0; 3],
        tex: [0.0; 2],
    }; 12];

    // Content quad, triangle-strip order, texture v flipped so row 0 of the
    // frame lands at the top of the rectangle
    verts[0] = Vertex {
        pos: [x2, y2, 0.0],
        tex: [1.0, 0.0],
    };
    verts[1] = Vertex {
        pos: [x2, y1, 0.0],
        tex: [1.0, 1.0],
    };
    verts[2] = Vertex {
        pos: [x1, y2, 0.0],
        tex: [0.0, 0.0],
    };
    verts[3] = Vertex {
        pos: [x1, y1, 0.0],
        tex: [0.0, 1.0],
    };

    let quad = |verts: &mut [Vertex; 12], base: usize, left: f32, right: f32, bottom: f32, top: f32| {
        verts[base].pos = [right, top, 0.0];
        verts[base + 1].pos = [right, bottom, 0.0];
        verts[base + 2].pos = [left, top, 0.0];
        verts[base + 3].pos = [left, bottom, 0.0];
    };

    if region.x == 0 {
        // Letterbox: borders above and below the content
        quad(&mut verts, 4, -1.0, 1.0, y2, 1.0);
        quad(&mut verts, 8, -1.0, 1.0, -1.0, y1);
    } else {
        // Pillarbox: borders left and right of the content
        quad(&mut verts, 4, -1.0, x1, -1.0, 1.0);
        quad(&mut verts, 8, x2, 1.0, -1.0, 1.0);
    }

    verts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelFormat;

    #[test]
    fn ntsc_dar_scales_height() {
        let info = VideoInfo::new(PixelFormat::I420, 720, 480).with_par(10, 11);
        let dar = display_aspect_ratio(&info, Fraction::ONE);
        assert_eq!(dar, Fraction::new(15, 11));
        // 480 is not divisible by 11 but 720 is divisible by 15
        assert_eq!(scaled_size(&info, dar), (720, 528));
    }

    #[test]
    fn square_pixels_keep_frame_size() {
        let info = VideoInfo::new(PixelFormat::Rgba, 640, 480);
        let dar = display_aspect_ratio(&info, Fraction::ONE);
        assert_eq!(dar, Fraction::new(4, 3));
        assert_eq!(scaled_size(&info, dar), (640, 480));
    }

    #[test]
    fn anamorphic_display_par() {
        let info = VideoInfo::new(PixelFormat::I420, 640, 480);
        let dar = display_aspect_ratio(&info, Fraction::new(2, 1));
        assert_eq!(dar, Fraction::new(2, 3));
        // 480 divisible by 3: width becomes 320
        assert_eq!(scaled_size(&info, dar), (320, 480));
    }

    #[test]
    fn centering_letterboxes_wide_frames() {
        let region = center_region(1920, 1080, 1280, 1024);
        assert_eq!(region.w, 1280);
        assert_eq!(region.h, 720);
        assert_eq!(region.x, 0);
        assert_eq!(region.y, 152);
    }

    #[test]
    fn centering_pillarboxes_tall_frames() {
        let region = center_region(480, 640, 800, 600);
        assert_eq!(region.h, 600);
        assert_eq!(region.w, 450);
        assert_eq!(region.y, 0);
        assert_eq!(region.x, 175);
    }

    #[test]
    fn exact_fit_has_no_borders() {
        let region = center_region(640, 480, 1280, 960);
        assert_eq!(region, DisplayRegion::new(0, 0, 1280, 960));
    }

    #[test]
    fn full_surface_vertices_span_ndc() {
        let region = DisplayRegion::new(0, 0, 640, 480);
        let verts = build_vertices(&region, 640, 480);
        assert_eq!(verts[0].pos[0], 1.0);
        assert_eq!(verts[3].pos[0], -1.0);
        assert_eq!(verts[0].tex, [1.0, 0.0]);
        assert_eq!(verts[3].tex, [0.0, 1.0]);
    }

    #[test]
    fn letterbox_borders_cover_top_and_bottom() {
        // Content fills the width, centered vertically
        let region = DisplayRegion::new(0, 120, 640, 240);
        let verts = build_vertices(&region, 640, 480);
        // First border spans the full width above the content
        assert_eq!(verts[4].pos[0], 1.0);
        assert_eq!(verts[6].pos[0], -1.0);
        assert!(verts[4].pos[1] > verts[5].pos[1]);
        // Second border sits below
        assert_eq!(verts[8].pos[1], verts[3].pos[1]);
    }

    #[test]
    fn pillarbox_borders_cover_sides() {
        let region = DisplayRegion::new(160, 0, 320, 480);
        let verts = build_vertices(&region, 640, 480);
        // First border from the left edge to the content
        assert_eq!(verts[6].pos[0], -1.0);
        assert_eq!(verts[4].pos[0], verts[2].pos[0]);
        // Second border from the content to the right edge
        assert_eq!(verts[8].pos[0], 1.0);
    }

    #[test]
    fn vertex_buffer_is_pod() {
        let region = DisplayRegion::new(0, 0, 2, 2);
        let verts = build_vertices(&region, 2, 2);
        let bytes: &[u8] = bytemuck::cast_slice(&verts);
        assert_eq!(bytes.len(), 12 * VERTEX_STRIDE as usize);
    }
}
