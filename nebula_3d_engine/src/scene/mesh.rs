/// Mesh - vertex/index data on the CPU and its uploaded GPU buffers
///
/// `MeshData` holds interleaved `Vertex` values plus optional `u32` indices and
/// provides the built-in generators (sky sphere, coordinate axis, cube).
/// `Mesh` is the uploaded form: buffers created and written through the
/// render device, destroyed with `destroy()`.

use bytemuck::{Pod, Zeroable};

use crate::engine_err;
use crate::error::Result;
use crate::render_device::{
    BufferHandle, BufferUsage, CommandBufferHandle, IndexType, PrimitiveTopology, RenderDevice,
    VertexAttribute, VertexFormat, VertexLayout,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, color, uv }
    }

    /// Vertex input layout matching the field order (locations 0..=3)
    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Vertex>() as u32,
            attributes: vec![
                VertexAttribute { location: 0, format: VertexFormat::Float3, offset: 0 },
                VertexAttribute { location: 1, format: VertexFormat::Float3, offset: 12 },
                VertexAttribute { location: 2, format: VertexFormat::Float3, offset: 24 },
                VertexAttribute { location: 3, format: VertexFormat::Float2, offset: 36 },
            ],
        }
    }
}

// ============================================================================
// CPU-side mesh data
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: PrimitiveTopology,
}

impl MeshData {
    /// UV sphere of radius 1 with normals pointing inward, for drawing from inside
    ///
    /// Vertex colors fade from `horizon` at the equator to `zenith` at the poles.
    pub fn sky_sphere(rings: u32, segments: u32, zenith: [f32; 3], horizon: [f32; 3]) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);
        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);

        for ring in 0..=rings {
            let v = ring as f32 / rings as f32;
            let theta = v * std::f32::consts::PI;
            let (sin_t, cos_t) = theta.sin_cos();
            let t = cos_t.abs();
            let color = [
                horizon[0] + (zenith[0] - horizon[0]) * t,
                horizon[1] + (zenith[1] - horizon[1]) * t,
                horizon[2] + (zenith[2] - horizon[2]) * t,
            ];
            for segment in 0..=segments {
                let u = segment as f32 / segments as f32;
                let phi = u * std::f32::consts::TAU;
                let (sin_p, cos_p) = phi.sin_cos();
                let position = [sin_t * cos_p, cos_t, sin_t * sin_p];
                let normal = [-position[0], -position[1], -position[2]];
                vertices.push(Vertex::new(position, normal, color, [u, v]));
            }
        }

        let stride = segments + 1;
        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }

        Self { vertices, indices, topology: PrimitiveTopology::TriangleList }
    }

    /// Three colored line segments along +X (red), +Y (green), +Z (blue)
    pub fn coordinate_axis(length: f32) -> Self {
        let axes = [
            ([length, 0.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, length, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, length], [0.0, 0.0, 1.0]),
        ];
        let mut vertices = Vec::with_capacity(6);
        for (end, color) in axes {
            vertices.push(Vertex::new([0.0; 3], [0.0, 1.0, 0.0], color, [0.0, 0.0]));
            vertices.push(Vertex::new(end, [0.0, 1.0, 0.0], color, [1.0, 0.0]));
        }
        Self { vertices, indices: Vec::new(), topology: PrimitiveTopology::LineList }
    }

    /// Axis-aligned cube centered on the origin, one flat normal per face
    pub fn cube(size: f32, color: [f32; 3]) -> Self {
        let h = size * 0.5;
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]]),
            ([0.0, 0.0, -1.0], [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]]),
            ([1.0, 0.0, 0.0], [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]]),
            ([-1.0, 0.0, 0.0], [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]]),
            ([0.0, 1.0, 0.0], [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]]),
            ([0.0, -1.0, 0.0], [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]]),
        ];
        let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let base = vertices.len() as u32;
            for (corner, uv) in corners.iter().zip(uvs) {
                vertices.push(Vertex::new(*corner, normal, color, uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        Self { vertices, indices, topology: PrimitiveTopology::TriangleList }
    }
}

// ============================================================================
// GPU mesh
// ============================================================================

#[derive(Debug)]
pub struct Mesh {
    vertex_buffer: BufferHandle,
    index_buffer: Option<BufferHandle>,
    vertex_count: u32,
    index_count: u32,
    topology: PrimitiveTopology,
}

impl Mesh {
    /// Create and fill the vertex (and index) buffers
    pub fn upload(device: &mut dyn RenderDevice, data: &MeshData) -> Result<Self> {
        if data.vertices.is_empty() {
            return Err(engine_err!("nebula3d::SceneRenderer", "Cannot upload a mesh without vertices"));
        }

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&data.vertices);
        let vertex_buffer = device.create_buffer(BufferUsage::Vertex, vertex_bytes.len() as u64)?;
        device.write_buffer(vertex_buffer, 0, vertex_bytes)?;

        let index_buffer = if data.indices.is_empty() {
            None
        } else {
            let index_bytes: &[u8] = bytemuck::cast_slice(&data.indices);
            let buffer = device.create_buffer(BufferUsage::Index, index_bytes.len() as u64)?;
            device.write_buffer(buffer, 0, index_bytes)?;
            Some(buffer)
        };

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count: data.vertices.len() as u32,
            index_count: data.indices.len() as u32,
            topology: data.topology,
        })
    }

    pub fn vertex_buffer(&self) -> BufferHandle {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> Option<BufferHandle> {
        self.index_buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Bind buffers and record the draw (indexed when an index buffer exists)
    pub fn cmd_draw(&self, device: &mut dyn RenderDevice, command_buffer: CommandBufferHandle) -> Result<()> {
        device.cmd_bind_vertex_buffer(command_buffer, self.vertex_buffer, 0)?;
        match self.index_buffer {
            Some(index_buffer) => {
                device.cmd_bind_index_buffer(command_buffer, index_buffer, 0, IndexType::U32)?;
                device.cmd_draw_indexed(command_buffer, self.index_count, 1, 0, 0, 0)
            }
            None => device.cmd_draw(command_buffer, self.vertex_count, 1, 0, 0),
        }
    }

    pub fn destroy(self, device: &mut dyn RenderDevice) -> Result<()> {
        if let Some(index_buffer) = self.index_buffer {
            device.destroy_buffer(index_buffer)?;
        }
        device.destroy_buffer(self.vertex_buffer)
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
