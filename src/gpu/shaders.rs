//! WGSL sources for the viewport scene.

/// Gradient-shaded reference sphere. Vertices are on the unit sphere and
/// scaled by the uniform radius.
pub const SPHERE_SHADER: &str = r#"
struct SphereUniforms {
    view_proj: mat4x4<f32>,
    center_radius: vec4<f32>,
    top_color: vec4<f32>,
    bottom_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> u: SphereUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    let world = u.center_radius.xyz + position * u.center_radius.w;
    out.clip_position = u.view_proj * vec4<f32>(world, 1.0);
    let t = position.y * 0.5 + 0.5;
    out.color = mix(u.bottom_color, u.top_color, t);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Camera-facing particle quads, one instance per sprite.
pub const SPRITE_SHADER: &str = r#"
struct SpriteUniforms {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> u: SpriteUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) position: vec3<f32>,
    @location(1) size: f32,
    @location(2) color: vec4<f32>,
) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[vertex_index];

    var out: VertexOutput;
    let world = position + vec3<f32>(corner * size, 0.0);
    out.clip_position = u.view_proj * vec4<f32>(world, 1.0);
    out.color = color;
    out.uv = corner;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let dist = length(in.uv);
    if dist > 1.0 {
        discard;
    }
    return in.color;
}
"#;
