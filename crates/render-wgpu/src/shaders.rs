/// WGSL shader for flat 2D meshes: one `mvp` matrix and a solid fill color.
pub const GROUND_SHADER: &str = r#"
struct Uniforms {
    mvp: mat4x4<f32>,
    color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct GroundOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) height: f32,
};

@vertex
fn vs_ground(@location(0) position: vec2<f32>) -> GroundOutput {
    var out: GroundOutput;
    out.clip_position = uniforms.mvp * vec4<f32>(position, 0.0, 1.0);
    out.height = position.y;
    return out;
}

@fragment
fn fs_ground(in: GroundOutput) -> @location(0) vec4<f32> {
    // Fade toward the bottom of the mesh.
    let shade = clamp(1.0 + in.height * 0.01, 0.35, 1.0);
    return vec4<f32>(uniforms.color.rgb * shade, uniforms.color.a);
}
"#;
