//! GLSL shader construction
//!
//! One vertex shader pair (textured and untextured) and a fragment shader
//! per format family. YUV conversion uses BT.601 studio-swing coefficients.
//! Channel swizzles come from the format catalog.

use crate::error::{Error, Result};
use crate::format::ShaderSelector;
use glow::HasContext;

/// Vertex shader for the content quad.
pub const VERT_TEXTURED: &str = "\
attribute vec3 position;
attribute vec2 texpos;
varying vec2 opos;
void main(void) {
  opos = texpos;
  gl_Position = vec4(position, 1.0);
}
";

/// Vertex shader for the border quads.
pub const VERT_UNTEXTURED: &str = "\
attribute vec3 position;
void main(void) {
  gl_Position = vec4(position, 1.0);
}
";

/// Fragment shader painting the black borders.
pub const FRAG_BLACK: &str = "\
precision mediump float;
void main(void) {
  gl_FragColor = vec4(0.0, 0.0, 0.0, 1.0);
}
";

const YUV_COEFFICIENTS: &str = "\
const vec3 offset = vec3(-0.0625, -0.5, -0.5);
const vec3 rcoeff = vec3(1.164, 0.000, 1.596);
const vec3 gcoeff = vec3(1.164, -0.391, -0.813);
const vec3 bcoeff = vec3(1.164, 2.018, 0.000);
";

fn yuv_body(sampling: &str) -> String {
    format!(
        "precision mediump float;\n\
         varying vec2 opos;\n\
         {uniforms}\n\
         {YUV_COEFFICIENTS}\
         void main(void) {{\n\
         \x20 vec3 yuv;\n\
         {sampling}\
         \x20 yuv += offset;\n\
         \x20 float r = dot(yuv, rcoeff);\n\
         \x20 float g = dot(yuv, gcoeff);\n\
         \x20 float b = dot(yuv, bcoeff);\n\
         \x20 gl_FragColor = vec4(r, g, b, 1.0);\n\
         }}\n",
        uniforms = sampling_uniforms(sampling),
    )
}

fn sampling_uniforms(sampling: &str) -> &'static str {
    if sampling.contains("Vtex") {
        "uniform sampler2D Ytex, Utex, Vtex;"
    } else if sampling.contains("UVtex") {
        "uniform sampler2D Ytex, UVtex;"
    } else {
        "uniform sampler2D tex;"
    }
}

/// Fragment shader source for a format family.
pub fn fragment_source(selector: ShaderSelector) -> String {
    match selector {
        ShaderSelector::Copy => "\
precision mediump float;
varying vec2 opos;
uniform sampler2D tex;
void main(void) {
  gl_FragColor = texture2D(tex, opos);
}
"
        .to_string(),
        ShaderSelector::Reorder(r, g, b) => format!(
            "precision mediump float;\n\
             varying vec2 opos;\n\
             uniform sampler2D tex;\n\
             void main(void) {{\n\
             \x20 gl_FragColor = texture2D(tex, opos).{r}{g}{b}a;\n\
             }}\n"
        ),
        ShaderSelector::Ayuv => yuv_body("  yuv = texture2D(tex, opos).gba;\n"),
        ShaderSelector::PlanarYuv => yuv_body(
            "  yuv.x = texture2D(Ytex, opos).r;\n\
             \x20 yuv.y = texture2D(Utex, opos).r;\n\
             \x20 yuv.z = texture2D(Vtex, opos).r;\n",
        ),
        ShaderSelector::PackedYuv(y, u, v) => yuv_body(&format!(
            "  yuv.x = texture2D(Ytex, opos).{y};\n\
             \x20 yuv.yz = texture2D(UVtex, opos).{u}{v};\n"
        )),
        ShaderSelector::InterleavedYuv(u, v) => yuv_body(&format!(
            "  yuv.x = texture2D(Ytex, opos).r;\n\
             \x20 yuv.yz = texture2D(UVtex, opos).{u}{v};\n"
        )),
    }
}

/// Compile and link a program, surfacing driver info logs on failure.
pub fn build_program(
    gl: &glow::Context,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<glow::NativeProgram> {
    unsafe {
        let program = gl
            .create_program()
            .map_err(Error::ShaderBuildFailed)?;
        let vert = compile_shader(gl, glow::VERTEX_SHADER, vertex_source)?;
        let frag = compile_shader(gl, glow::FRAGMENT_SHADER, fragment_source)?;
        gl.attach_shader(program, vert);
        gl.attach_shader(program, frag);
        gl.link_program(program);
        // Shaders are reference-counted by the driver once attached
        gl.delete_shader(vert);
        gl.delete_shader(frag);
        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(Error::ShaderBuildFailed(format!("link: {log}")));
        }
        Ok(program)
    }
}

unsafe fn compile_shader(
    gl: &glow::Context,
    kind: u32,
    source: &str,
) -> Result<glow::NativeShader> {
    let shader = gl.create_shader(kind).map_err(Error::ShaderBuildFailed)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(Error::ShaderBuildFailed(format!("compile: {log}")));
    }
    Ok(shader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{sampler_names, shader_selector};
    use crate::types::PixelFormat;

    #[test]
    fn copy_shader_samples_directly() {
        let src = fragment_source(ShaderSelector::Copy);
        assert!(src.contains("texture2D(tex, opos);"));
        assert!(!src.contains("rcoeff"));
    }

    #[test]
    fn reorder_shader_swizzles() {
        let src = fragment_source(shader_selector(PixelFormat::Bgra));
        assert!(src.contains(".bgra;"));
        let src = fragment_source(shader_selector(PixelFormat::Argb));
        assert!(src.contains(".gbaa;"));
        let src = fragment_source(shader_selector(PixelFormat::Abgr));
        assert!(src.contains(".abga;"));
    }

    #[test]
    fn ayuv_shader_samples_gba() {
        let src = fragment_source(ShaderSelector::Ayuv);
        assert!(src.contains("texture2D(tex, opos).gba;"));
        assert!(src.contains("rcoeff"));
    }

    #[test]
    fn planar_shader_uses_three_samplers() {
        let src = fragment_source(ShaderSelector::PlanarYuv);
        for name in sampler_names(PixelFormat::I420) {
            assert!(src.contains(name), "missing sampler {name}");
        }
    }

    #[test]
    fn packed_yuv_swizzles_per_variant() {
        let src = fragment_source(shader_selector(PixelFormat::Yuy2));
        assert!(src.contains("texture2D(Ytex, opos).r;"));
        assert!(src.contains("texture2D(UVtex, opos).ga;"));

        let src = fragment_source(shader_selector(PixelFormat::Yvyu));
        assert!(src.contains("texture2D(UVtex, opos).ag;"));

        let src = fragment_source(shader_selector(PixelFormat::Uyvy));
        assert!(src.contains("texture2D(Ytex, opos).a;"));
        assert!(src.contains("texture2D(UVtex, opos).rb;"));
    }

    #[test]
    fn semiplanar_swizzles_per_variant() {
        let src = fragment_source(shader_selector(PixelFormat::Nv12));
        assert!(src.contains("texture2D(UVtex, opos).ra;"));
        let src = fragment_source(shader_selector(PixelFormat::Nv21));
        assert!(src.contains("texture2D(UVtex, opos).ar;"));
    }

    #[test]
    fn yuv_coefficients_are_bt601() {
        let src = fragment_source(ShaderSelector::PlanarYuv);
        assert!(src.contains("vec3(-0.0625, -0.5, -0.5)"));
        assert!(src.contains("vec3(1.164, 0.000, 1.596)"));
        assert!(src.contains("vec3(1.164, -0.391, -0.813)"));
        assert!(src.contains("vec3(1.164, 2.018, 0.000)"));
    }
}
