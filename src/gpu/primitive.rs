//! Mesh generation for the debug primitives.

use bytemuck::{Pod, Zeroable};

/// Longitude divisions of the reference sphere.
pub const SPHERE_SLICES: u32 = 8;
/// Latitude divisions of the reference sphere.
pub const SPHERE_STACKS: u32 = 16;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PrimitiveVertex {
    pub position: [f32; 3],
}

impl PrimitiveVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<PrimitiveVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    };
}

/// Indexed triangle list of a unit sphere, poles on the Y axis.
pub struct SphereMesh {
    pub vertices: Vec<PrimitiveVertex>,
    pub indices: Vec<u32>,
}

impl SphereMesh {
    pub fn new(slices: u32, stacks: u32) -> Self {
        let slices = slices.max(3);
        let stacks = stacks.max(2);

        let mut vertices = Vec::with_capacity(((slices + 1) * (stacks + 1)) as usize);
        for stack in 0..=stacks {
            let phi = std::f32::consts::PI * stack as f32 / stacks as f32;
            let (ring, y) = (phi.sin(), phi.cos());
            for slice in 0..=slices {
                let theta = std::f32::consts::TAU * slice as f32 / slices as f32;
                vertices.push(PrimitiveVertex {
                    position: [ring * theta.cos(), y, ring * theta.sin()],
                });
            }
        }

        let row = slices + 1;
        let mut indices = Vec::with_capacity((slices * stacks * 6) as usize);
        for stack in 0..stacks {
            for slice in 0..slices {
                let a = stack * row + slice;
                let b = a + row;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }

        Self { vertices, indices }
    }

    /// The 8 x 16 sphere drawn behind the particles.
    pub fn reference() -> Self {
        Self::new(SPHERE_SLICES, SPHERE_STACKS)
    }
}
