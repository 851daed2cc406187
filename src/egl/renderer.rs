//! GPU renderer
//!
//! Owns the EGL context, surface, shader programs, textures and vertex
//! buffers for one stream configuration, and runs the per-frame upload and
//! draw pass.

use crate::config::SinkConfig;
use crate::error::{Error, Result};
use crate::format::{
    display_format_for, plane_layout, sampler_names, shader_selector, texture_count, PlaneUpload,
    UploadFormat,
};
use crate::geometry::{
    build_vertices, center_region, display_aspect_ratio, scaled_size, BORDER1_OFFSET,
    BORDER2_OFFSET, INDICES, VERTEX_STRIDE,
};
use crate::renderer::Renderer;
use crate::sink::SharedState;
use crate::types::{DisplayRegion, Frame, VideoInfo};
use crate::window::{resolve_window, WindowHandle, WindowProvider};
use glow::HasContext;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use super::context::{EglContext, EglDisplay};
use super::shader::{build_program, fragment_source, FRAG_BLACK, VERT_TEXTURED, VERT_UNTEXTURED};

/// Everything built per stream configuration.
struct Configured {
    ctx: EglContext,
    gl: glow::Context,
    info: VideoInfo,
    /// Frame size adjusted for storage and display pixel aspect ratios
    scaled: (u32, u32),
    content_program: glow::NativeProgram,
    position_loc: u32,
    texpos_loc: u32,
    border_program: glow::NativeProgram,
    border_position_loc: u32,
    textures: Vec<glow::NativeTexture>,
    vbo: glow::NativeBuffer,
    ibo: glow::NativeBuffer,
    window: WindowHandle,
    own_window: bool,
    /// Region and surface size the vertex buffer currently describes
    last_layout: Option<(DisplayRegion, (u32, u32))>,
    cleared: bool,
}

/// EGL/GLESv2 implementation of [`Renderer`]. Lives on the render thread.
pub struct GlesRenderer {
    display: Arc<EglDisplay>,
    config: SinkConfig,
    shared: Arc<Mutex<SharedState>>,
    provider: Box<dyn WindowProvider>,
    state: Option<Configured>,
    last_frame: Option<Frame>,
}

impl GlesRenderer {
    pub(crate) fn new(
        display: Arc<EglDisplay>,
        config: SinkConfig,
        shared: Arc<Mutex<SharedState>>,
        provider: Box<dyn WindowProvider>,
    ) -> Self {
        Self {
            display,
            config,
            shared,
            provider,
            state: None,
            last_frame: None,
        }
    }

}

impl Renderer for GlesRenderer {
    fn configure(&mut self, stream: &VideoInfo) -> Result<()> {
        let external = self.shared.lock().window_handle;
        let (window, own_window) = resolve_window(
            external,
            self.provider.as_mut(),
            self.config.create_window,
            stream.width,
            stream.height,
        )?;

        let mut ctx = EglContext::new(self.display.clone(), display_format_for(stream.format))?;
        ctx.create_surface(window)?;

        let gl = unsafe { glow::Context::from_loader_function(|s| ctx.get_proc_address(s)) };

        let selector = shader_selector(stream.format);
        let content_program = build_program(&gl, VERT_TEXTURED, &fragment_source(selector))?;
        let border_program = build_program(&gl, VERT_UNTEXTURED, FRAG_BLACK)?;

        let (position_loc, texpos_loc, border_position_loc, textures, vbo, ibo) = unsafe {
            let position_loc = gl
                .get_attrib_location(content_program, "position")
                .ok_or_else(|| Error::ShaderBuildFailed("missing position attribute".into()))?;
            let texpos_loc = gl
                .get_attrib_location(content_program, "texpos")
                .ok_or_else(|| Error::ShaderBuildFailed("missing texpos attribute".into()))?;
            let border_position_loc = gl
                .get_attrib_location(border_program, "position")
                .ok_or_else(|| Error::ShaderBuildFailed("missing position attribute".into()))?;

            // Bind each sampler uniform to its texture unit once
            gl.use_program(Some(content_program));
            for (unit, name) in sampler_names(stream.format).iter().enumerate() {
                let loc = gl
                    .get_uniform_location(content_program, name)
                    .ok_or_else(|| {
                        Error::ShaderBuildFailed(format!("missing sampler uniform {name}"))
                    })?;
                gl.uniform_1_i32(Some(&loc), unit as i32);
            }

            let mut textures = Vec::with_capacity(texture_count(stream.format));
            for unit in 0..texture_count(stream.format) {
                let tex = gl.create_texture().map_err(Error::RenderFailed)?;
                gl.active_texture(glow::TEXTURE0 + unit as u32);
                gl.bind_texture(glow::TEXTURE_2D, Some(tex));
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MIN_FILTER,
                    glow::LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MAG_FILTER,
                    glow::LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_S,
                    glow::CLAMP_TO_EDGE as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_T,
                    glow::CLAMP_TO_EDGE as i32,
                );
                textures.push(tex);
            }

            let vbo = gl.create_buffer().map_err(Error::RenderFailed)?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_size(
                glow::ARRAY_BUFFER,
                12 * VERTEX_STRIDE,
                glow::DYNAMIC_DRAW,
            );
            let ibo = gl.create_buffer().map_err(Error::RenderFailed)?;
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&INDICES),
                glow::STATIC_DRAW,
            );

            (position_loc, texpos_loc, border_position_loc, textures, vbo, ibo)
        };

        let dar = display_aspect_ratio(stream, ctx.display_par);
        let scaled = scaled_size(stream, dar);
        info!(
            stream = ?stream,
            dar = %dar,
            scaled_w = scaled.0,
            scaled_h = scaled.1,
            "GPU state built"
        );

        self.state = Some(Configured {
            ctx,
            gl,
            info: stream.clone(),
            scaled,
            content_program,
            position_loc,
            texpos_loc,
            border_program,
            border_position_loc,
            textures,
            vbo,
            ibo,
            window,
            own_window,
            last_layout: None,
            cleared: false,
        });
        Ok(())
    }

    fn unconfigure(&mut self) {
        let Some(mut state) = self.state.take() else {
            return;
        };
        if state.ctx.make_current().is_ok() {
            unsafe {
                let gl = &state.gl;
                gl.delete_program(state.content_program);
                gl.delete_program(state.border_program);
                for tex in &state.textures {
                    gl.delete_texture(*tex);
                }
                gl.delete_buffer(state.vbo);
                gl.delete_buffer(state.ibo);
            }
        }
        state.ctx.destroy();
        if state.own_window {
            self.provider.destroy_window(state.window);
        }
        self.last_frame = None;
        debug!("GPU state released");
    }

    fn draw(&mut self, frame: Option<&Frame>) -> Result<()> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| Error::Internal("draw without configuration".into()))?;
        state.ctx.make_current()?;

        let redraw = frame.is_none();
        if let Some(frame) = frame {
            self.last_frame = Some(frame.clone());
        }

        let surface = state.ctx.surface_size()?;
        // An explicit caller rectangle is used verbatim; aspect correction
        // only applies to the default full-surface placement
        let region = match self.shared.lock().render_rectangle {
            Some(rect) => rect,
            None if self.config.force_aspect_ratio => {
                center_region(state.scaled.0, state.scaled.1, surface.0, surface.1)
            }
            None => DisplayRegion::new(0, 0, surface.0, surface.1),
        };
        let layout = (region, surface);
        let layout_unchanged = state.last_layout == Some(layout);

        // A preserved back buffer makes an unchanged redraw a plain swap
        if redraw && state.ctx.buffer_preserved && layout_unchanged && state.cleared {
            return state.ctx.swap_buffers();
        }

        let Some(frame) = frame.or(self.last_frame.as_ref()) else {
            // Redraw with nothing shown yet: present a blank surface
            unsafe {
                state.gl.viewport(0, 0, surface.0 as i32, surface.1 as i32);
                state.gl.clear_color(0.0, 0.0, 0.0, 1.0);
                state.gl.clear(glow::COLOR_BUFFER_BIT);
            }
            state.cleared = true;
            return state.ctx.swap_buffers();
        };

        unsafe {
            let gl = &state.gl;
            gl.viewport(0, 0, surface.0 as i32, surface.1 as i32);
            // Clear once per layout so stale pixels never outlive a resize,
            // including on surfaces that preserve their buffer across swaps
            if !state.cleared || !layout_unchanged {
                gl.clear_color(0.0, 0.0, 0.0, 1.0);
                gl.clear(glow::COLOR_BUFFER_BIT);
                state.cleared = true;
            }

            if !layout_unchanged {
                let vertices = build_vertices(&region, surface.0, surface.1);
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(state.vbo));
                gl.buffer_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    bytemuck::cast_slice(&vertices),
                    glow::DYNAMIC_DRAW,
                );
                state.last_layout = Some(layout);
            } else {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(state.vbo));
            }
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(state.ibo));

            // Borders first, content on top. A preserved back buffer keeps
            // the border pixels valid, so they are never redrawn
            let content_fills_surface = region == DisplayRegion::new(0, 0, surface.0, surface.1);
            if !state.ctx.buffer_preserved && !content_fills_surface {
                gl.use_program(Some(state.border_program));
                gl.enable_vertex_attrib_array(state.border_position_loc);
                for offset in [BORDER1_OFFSET, BORDER2_OFFSET] {
                    gl.vertex_attrib_pointer_f32(
                        state.border_position_loc,
                        3,
                        glow::FLOAT,
                        false,
                        VERTEX_STRIDE,
                        offset,
                    );
                    gl.draw_elements(glow::TRIANGLE_STRIP, 4, glow::UNSIGNED_SHORT, 0);
                }
                gl.disable_vertex_attrib_array(state.border_position_loc);
            }

            gl.use_program(Some(state.content_program));
            upload_planes(gl, &state.textures, &state.info, frame)?;

            gl.enable_vertex_attrib_array(state.position_loc);
            gl.enable_vertex_attrib_array(state.texpos_loc);
            gl.vertex_attrib_pointer_f32(
                state.position_loc,
                3,
                glow::FLOAT,
                false,
                VERTEX_STRIDE,
                0,
            );
            gl.vertex_attrib_pointer_f32(
                state.texpos_loc,
                2,
                glow::FLOAT,
                false,
                VERTEX_STRIDE,
                (3 * std::mem::size_of::<f32>()) as i32,
            );
            gl.draw_elements(glow::TRIANGLE_STRIP, 4, glow::UNSIGNED_SHORT, 0);
            gl.disable_vertex_attrib_array(state.position_loc);
            gl.disable_vertex_attrib_array(state.texpos_loc);

            let err = gl.get_error();
            if err != glow::NO_ERROR {
                return Err(Error::RenderFailed(format!("GL error 0x{err:04x}")));
            }
        }

        state.ctx.swap_buffers()
    }
}

fn upload_formats(format: UploadFormat) -> (u32, u32) {
    match format {
        UploadFormat::Rgba => (glow::RGBA, glow::UNSIGNED_BYTE),
        UploadFormat::Rgb => (glow::RGB, glow::UNSIGNED_BYTE),
        UploadFormat::Rgb565 => (glow::RGB, glow::UNSIGNED_SHORT_5_6_5),
        UploadFormat::Luminance => (glow::LUMINANCE, glow::UNSIGNED_BYTE),
        UploadFormat::LuminanceAlpha => (glow::LUMINANCE_ALPHA, glow::UNSIGNED_BYTE),
    }
}

fn plane_bytes<'a>(frame: &'a Frame, plane: &PlaneUpload) -> Result<&'a [u8]> {
    let len = plane.width as usize * plane.height as usize * plane.format.bytes_per_texel();
    frame
        .data
        .get(plane.offset..plane.offset + len)
        .ok_or_else(|| {
            Error::RenderFailed(format!(
                "frame too small: need {} bytes at offset {}, have {}",
                len,
                plane.offset,
                frame.data.len()
            ))
        })
}

unsafe fn upload_planes(
    gl: &glow::Context,
    textures: &[glow::NativeTexture],
    info: &VideoInfo,
    frame: &Frame,
) -> Result<()> {
    gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
    for (unit, plane) in plane_layout(info).iter().enumerate() {
        let (format, ty) = upload_formats(plane.format);
        let bytes = plane_bytes(frame, plane)?;
        gl.active_texture(glow::TEXTURE0 + unit as u32);
        gl.bind_texture(glow::TEXTURE_2D, Some(textures[unit]));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            format as i32,
            plane.width as i32,
            plane.height as i32,
            0,
            format,
            ty,
            Some(bytes),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PixelFormat, VideoInfo};

    #[test]
    fn plane_bytes_bounds_checked() {
        let info = VideoInfo::new(PixelFormat::I420, 4, 4);
        let frame = Frame::new(info.clone());
        for plane in plane_layout(&info) {
            assert!(plane_bytes(&frame, &plane).is_ok());
        }

        let short = Frame::from_data(vec![0u8; 8], info.clone());
        let planes = plane_layout(&info);
        assert!(matches!(
            plane_bytes(&short, &planes[0]),
            Err(Error::RenderFailed(_))
        ));
    }

    #[test]
    fn upload_format_bytes_agree_with_gl_types() {
        assert_eq!(upload_formats(UploadFormat::Rgba).0, glow::RGBA);
        assert_eq!(
            upload_formats(UploadFormat::Rgb565),
            (glow::RGB, glow::UNSIGNED_SHORT_5_6_5)
        );
        assert_eq!(upload_formats(UploadFormat::Luminance).0, glow::LUMINANCE);
    }
}
