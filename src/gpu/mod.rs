//! `wgpu` implementation of [`RenderBackend`].
//!
//! The backend records the immediate-style calls made during a bind
//! (clears, state changes, draws) and encodes them as render passes when the
//! color target is invalidated at unbind, then submits them in one go. The
//! device and queue are shared with the UI renderer, so the submission lands
//! on the queue before the UI samples the target.

mod primitive;
mod shaders;

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

pub use primitive::{PrimitiveVertex, SphereMesh};
pub use shaders::{SPHERE_SHADER, SPRITE_SHADER};

use crate::engine::{DrawList, SpriteInstance};
use crate::error::AllocationError;
use crate::render_target::{
    CullMode, DebugSphere, NativeTexture, PixelRect, RenderBackend, RenderState, Swizzle,
};

pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const SPRITE_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x3,
    },
    wgpu::VertexAttribute {
        offset: 12,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32,
    },
    wgpu::VertexAttribute {
        offset: 16,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32x4,
    },
];

const SPRITE_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<SpriteInstance>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Instance,
    attributes: &SPRITE_ATTRIBUTES,
};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SphereUniforms {
    view_proj: [[f32; 4]; 4],
    center_radius: [f32; 4],
    top_color: [f32; 4],
    bottom_color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SpriteUniforms {
    view_proj: [[f32; 4]; 4],
}

/// A texture allocated by [`WgpuBackend`].
pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: Arc<wgpu::TextureView>,
    width: u32,
    height: u32,
    id: u64,
    // wgpu has no view-level component remap. The remap is recorded here and
    // UI_IMAGE's opaque alpha is produced by never writing alpha after the
    // clear.
    swizzle: Cell<Swizzle>,
}

impl WgpuTexture {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Backend-unique id, also used as the [`NativeTexture`] value.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn swizzle(&self) -> Swizzle {
        self.swizzle.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DrawKind {
    Sphere,
    Sprites,
}

struct BoundViews {
    color: Arc<wgpu::TextureView>,
    depth: Arc<wgpu::TextureView>,
    width: u32,
    height: u32,
}

enum Geometry {
    Sphere,
    Sprites { instances: wgpu::Buffer, count: u32 },
}

struct DrawCommand {
    pipeline: (DrawKind, RenderState),
    viewport: PixelRect,
    scissor: PixelRect,
    bind_group: wgpu::BindGroup,
    geometry: Geometry,
}

enum Command {
    Clear { color: Option<[f32; 4]>, depth: bool },
    Draw(DrawCommand),
}

/// Clip `rect` to a `width` x `height` target. `None` if nothing is left.
fn clip_rect(rect: PixelRect, width: u32, height: u32) -> Option<PixelRect> {
    let x = rect.x.min(width);
    let y = rect.y.min(height);
    let w = rect.width.min(width - x);
    let h = rect.height.min(height - y);
    (w > 0 && h > 0).then_some(PixelRect {
        x,
        y,
        width: w,
        height: h,
    })
}

fn to_wgpu_color([r, g, b, a]: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: a as f64,
    }
}

fn cull_face(cull: CullMode) -> Option<wgpu::Face> {
    match cull {
        CullMode::None => None,
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    target: &'e BoundViews,
    color_load: wgpu::LoadOp<wgpu::Color>,
    depth_load: wgpu::LoadOp<f32>,
    label: &'static str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &target.color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: color_load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &target.depth,
            depth_ops: Some(wgpu::Operations {
                load: depth_load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Render backend drawing the viewport scene with `wgpu`.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    next_id: u64,
    bound: Option<BoundViews>,
    viewport: PixelRect,
    scissor: PixelRect,
    state: RenderState,
    commands: Vec<Command>,
    sphere_shader: wgpu::ShaderModule,
    sprite_shader: wgpu::ShaderModule,
    uniform_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<(DrawKind, RenderState), wgpu::RenderPipeline>,
    sphere_vertices: wgpu::Buffer,
    sphere_indices: wgpu::Buffer,
    sphere_index_count: u32,
    submissions: u64,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let sphere_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Debug Sphere Shader"),
            source: wgpu::ShaderSource::Wgsl(SPHERE_SHADER.into()),
        });
        let sprite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(SPRITE_SHADER.into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Viewport Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Viewport Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let mesh = SphereMesh::reference();
        let sphere_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Sphere Vertices"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sphere_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Sphere Indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            device,
            queue,
            next_id: 1,
            bound: None,
            viewport: PixelRect::sized(1, 1),
            scissor: PixelRect::sized(1, 1),
            state: RenderState::default(),
            commands: Vec::new(),
            sphere_shader,
            sprite_shader,
            uniform_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            sphere_vertices,
            sphere_indices,
            sphere_index_count: mesh.indices.len() as u32,
            submissions: 0,
        }
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Command buffers submitted so far.
    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    /// Pipelines built so far, one per draw kind and render state.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    fn allocate(
        &mut self,
        what: &'static str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Result<WgpuTexture, AllocationError> {
        let limit = self.device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            return Err(AllocationError::TooLarge {
                what,
                width,
                height,
                limit,
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(what),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(AllocationError::OutOfMemory {
                what,
                width,
                height,
                reason: error.to_string(),
            });
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = self.next_id;
        self.next_id += 1;

        Ok(WgpuTexture {
            texture,
            view: Arc::new(view),
            width,
            height,
            id,
            swizzle: Cell::new(Swizzle::RENDER_TARGET),
        })
    }

    fn ensure_pipeline(&mut self, kind: DrawKind, state: RenderState) {
        if self.pipelines.contains_key(&(kind, state)) {
            return;
        }

        let (label, module, buffers) = match kind {
            DrawKind::Sphere => (
                "Debug Sphere Pipeline",
                &self.sphere_shader,
                [PrimitiveVertex::LAYOUT],
            ),
            DrawKind::Sprites => ("Particle Sprite Pipeline", &self.sprite_shader, [SPRITE_LAYOUT]),
        };

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: state.blend.then_some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::COLOR,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: cull_face(state.cull),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: state.depth_write,
                depth_compare: if state.depth_test {
                    wgpu::CompareFunction::Less
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::debug!("built {:?} pipeline for {:?}", kind, state);
        self.pipelines.insert((kind, state), pipeline);
    }

    fn uniform_bind_group(&self, label: &'static str, contents: &[u8]) -> wgpu::BindGroup {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    fn record_draw(&mut self, kind: DrawKind, bind_group: wgpu::BindGroup, geometry: Geometry) {
        self.ensure_pipeline(kind, self.state);
        self.commands.push(Command::Draw(DrawCommand {
            pipeline: (kind, self.state),
            viewport: self.viewport,
            scissor: self.scissor,
            bind_group,
            geometry,
        }));
    }

    fn flush(&mut self) {
        let commands = std::mem::take(&mut self.commands);
        let Some(target) = self.bound.as_ref() else {
            return;
        };
        if commands.is_empty() {
            return;
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Viewport Encoder"),
        });

        for command in &commands {
            match command {
                Command::Clear { color, depth } => {
                    let color_load = color
                        .map_or(wgpu::LoadOp::Load, |c| wgpu::LoadOp::Clear(to_wgpu_color(c)));
                    let depth_load = if *depth {
                        wgpu::LoadOp::Clear(1.0)
                    } else {
                        wgpu::LoadOp::Load
                    };
                    begin_pass(&mut encoder, target, color_load, depth_load, "Viewport Clear Pass");
                }
                Command::Draw(draw) => {
                    let Some(pipeline) = self.pipelines.get(&draw.pipeline) else {
                        continue;
                    };
                    let (Some(viewport), Some(scissor)) = (
                        clip_rect(draw.viewport, target.width, target.height),
                        clip_rect(draw.scissor, target.width, target.height),
                    ) else {
                        continue;
                    };

                    let mut pass = begin_pass(
                        &mut encoder,
                        target,
                        wgpu::LoadOp::Load,
                        wgpu::LoadOp::Load,
                        "Viewport Draw Pass",
                    );
                    pass.set_viewport(
                        viewport.x as f32,
                        viewport.y as f32,
                        viewport.width as f32,
                        viewport.height as f32,
                        0.0,
                        1.0,
                    );
                    pass.set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(0, &draw.bind_group, &[]);

                    match &draw.geometry {
                        Geometry::Sphere => {
                            pass.set_vertex_buffer(0, self.sphere_vertices.slice(..));
                            pass.set_index_buffer(
                                self.sphere_indices.slice(..),
                                wgpu::IndexFormat::Uint32,
                            );
                            pass.draw_indexed(0..self.sphere_index_count, 0, 0..1);
                        }
                        Geometry::Sprites { instances, count } => {
                            pass.set_vertex_buffer(0, instances.slice(..));
                            pass.draw(0..6, 0..*count);
                        }
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.submissions += 1;
    }
}

impl RenderBackend for WgpuBackend {
    type Texture = WgpuTexture;

    fn create_color_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<WgpuTexture, AllocationError> {
        self.allocate(
            "viewport color",
            width,
            height,
            COLOR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }

    fn create_depth_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<WgpuTexture, AllocationError> {
        self.allocate(
            "viewport depth",
            width,
            height,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        )
    }

    fn native_handle(&self, texture: &WgpuTexture) -> NativeTexture {
        NativeTexture(texture.id)
    }

    fn bind_targets(&mut self, color: &WgpuTexture, depth: &WgpuTexture) {
        self.commands.clear();
        self.bound = Some(BoundViews {
            color: Arc::clone(&color.view),
            depth: Arc::clone(&depth.view),
            width: color.width.min(depth.width),
            height: color.height.min(depth.height),
        });
    }

    fn set_viewport(&mut self, rect: PixelRect) {
        self.viewport = rect;
    }

    fn set_scissor(&mut self, rect: PixelRect) {
        self.scissor = rect;
    }

    fn set_swizzle(&mut self, color: &WgpuTexture, swizzle: Swizzle) {
        color.swizzle.set(swizzle);
    }

    fn clear(&mut self, color: Option<[f32; 4]>, depth: bool) {
        if self.bound.is_some() && (color.is_some() || depth) {
            self.commands.push(Command::Clear { color, depth });
        }
    }

    fn clear_depth_texture(&mut self, depth: &WgpuTexture) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Depth Clear Encoder"),
        });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Depth Clear Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.queue.submit(std::iter::once(encoder.finish()));
        self.submissions += 1;
    }

    fn invalidate_color(&mut self, _color: &WgpuTexture) {
        self.flush();
    }

    fn restore_window_target(&mut self) {
        self.bound = None;
        self.commands.clear();
    }

    fn apply_render_state(&mut self, state: RenderState) {
        self.state = state;
    }

    fn draw_sphere(&mut self, view_proj: Mat4, sphere: &DebugSphere) {
        if self.bound.is_none() {
            return;
        }
        let uniforms = SphereUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            center_radius: sphere.center.extend(sphere.radius).to_array(),
            top_color: sphere.top_color,
            bottom_color: sphere.bottom_color,
        };
        let bind_group =
            self.uniform_bind_group("Debug Sphere Uniforms", bytemuck::bytes_of(&uniforms));
        self.record_draw(DrawKind::Sphere, bind_group, Geometry::Sphere);
    }

    fn draw_sprites(&mut self, list: &DrawList) {
        if self.bound.is_none() || list.is_empty() {
            return;
        }
        let uniforms = SpriteUniforms {
            view_proj: list.view_proj.to_cols_array_2d(),
        };
        let bind_group =
            self.uniform_bind_group("Particle Sprite Uniforms", bytemuck::bytes_of(&uniforms));
        let instances = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Sprite Instances"),
            contents: bytemuck::cast_slice(&list.sprites),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let count = list.sprites.len() as u32;
        self.record_draw(DrawKind::Sprites, bind_group, Geometry::Sprites { instances, count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_rect_inside() {
        let rect = PixelRect::sized(100, 50);
        assert_eq!(clip_rect(rect, 200, 200), Some(rect));
    }

    #[test]
    fn test_clip_rect_to_target() {
        // The window-sized rect restored on unbind can exceed the target.
        let clipped = clip_rect(PixelRect::sized(1920, 1080), 640, 480).unwrap();
        assert_eq!(clipped, PixelRect::sized(640, 480));
    }

    #[test]
    fn test_clip_rect_outside() {
        let rect = PixelRect {
            x: 700,
            y: 0,
            width: 10,
            height: 10,
        };
        assert_eq!(clip_rect(rect, 640, 480), None);
    }

    #[test]
    fn test_uniform_sizes_are_aligned() {
        assert_eq!(std::mem::size_of::<SphereUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<SpriteUniforms>(), 64);
        assert_eq!(SPRITE_LAYOUT.array_stride, 32);
    }
}
