use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// Flat-shaded triangle soup as produced by the model loaders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(triangles * 3),
            indices: Vec::with_capacity(triangles * 3),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append one triangle. A zero or non-finite `normal` is replaced by the face normal.
    pub fn push_triangle(&mut self, corners: [Vec3; 3], normal: Vec3) {
        let normal = if normal.is_finite() && normal.length_squared() > 1e-12 {
            normal.normalize()
        } else {
            (corners[1] - corners[0]).cross(corners[2] - corners[0]).normalize_or_zero()
        };
        let base = self.vertices.len() as u32;
        for corner in corners {
            self.vertices.push(Vertex { pos: corner.to_array(), normal: normal.to_array() });
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    /// Axis-aligned box centered on the origin
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let mut mesh = Self::with_capacity(12);
        // (normal, u axis, v axis) per face; corners wound counter-clockwise seen from outside
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        for (n, u, v) in faces {
            let center = n * h;
            let du = u * h;
            let dv = v * h;
            let quad = [center - du - dv, center + du - dv, center + du + dv, center - du + dv];
            mesh.push_triangle([quad[0], quad[1], quad[2]], n);
            mesh.push_triangle([quad[0], quad[2], quad[3]], n);
        }
        mesh
    }

    /// Axis-aligned bounds, `None` for an empty mesh
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.vertices.iter().map(|v| Vec3::from_array(v.pos));
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Vertex Buffer"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Index Buffer"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_is_closed_and_outward_facing() {
        let mesh = Mesh::cuboid(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.triangle_count(), 12);
        let (lo, hi) = mesh.bounds().unwrap();
        assert_eq!(lo, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(hi, Vec3::new(1.0, 2.0, 3.0));

        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from_array(mesh.vertices[tri[i] as usize].pos));
            let winding = (b - a).cross(c - a);
            let stored = Vec3::from_array(mesh.vertices[tri[0] as usize].normal);
            assert!(winding.dot(stored) > 0.0, "triangle wound against its normal");
            let centroid = (a + b + c) / 3.0;
            assert!(centroid.dot(stored) > 0.0, "normal points inwards");
        }
    }

    #[test]
    fn zero_normal_is_recomputed() {
        let mut mesh = Mesh::empty();
        mesh.push_triangle([Vec3::ZERO, Vec3::X, Vec3::Y], Vec3::ZERO);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(Mesh::empty().bounds().is_none());
        assert!(Mesh::empty().is_empty());
    }
}
