// src/rendering_lib/geometry.rs

use std::ops::Range;

use super::vertex::Vertex;
use crate::engine_lib::scene_types::MeshKind;

/// Index range of one built-in mesh inside the shared index buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshRange {
    pub indices: Range<u32>,
    pub base_vertex: i32,
}

/// All built-in meshes packed into one vertex and one index list.
#[derive(Clone, Debug)]
pub struct MeshLibrary {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    cube: MeshRange,
    quad: MeshRange,
}

impl MeshLibrary {
    pub fn build() -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        let cube = append_mesh(&mut vertices, &mut indices, unit_cube());
        let quad = append_mesh(&mut vertices, &mut indices, unit_quad());
        Self { vertices, indices, cube, quad }
    }

    pub fn range(&self, mesh: MeshKind) -> &MeshRange {
        match mesh {
            MeshKind::Cube => &self.cube,
            MeshKind::Quad => &self.quad,
        }
    }
}

fn append_mesh(vertices: &mut Vec<Vertex>, indices: &mut Vec<u16>, mesh: (Vec<Vertex>, Vec<u16>)) -> MeshRange {
    let (mesh_vertices, mesh_indices) = mesh;
    let base_vertex = vertices.len() as i32;
    let first_index = indices.len() as u32;
    vertices.extend(mesh_vertices);
    indices.extend(mesh_indices);
    MeshRange { indices: first_index..indices.len() as u32, base_vertex }
}

/// Unit quad in the XY plane, centred on the origin, facing +Z. Two-sided.
pub fn unit_quad() -> (Vec<Vertex>, Vec<u16>) {
    let n = [0.0, 0.0, 1.0];
    let vertices = vec![
        Vertex::new([-0.5, -0.5, 0.0], n),
        Vertex::new([0.5, -0.5, 0.0], n),
        Vertex::new([0.5, 0.5, 0.0], n),
        Vertex::new([-0.5, 0.5, 0.0], n),
    ];
    (vertices, vec![0, 1, 2, 0, 2, 3])
}

/// Unit cube centred on the origin with per-face normals, CCW when seen from outside.
pub fn unit_cube() -> (Vec<Vertex>, Vec<u16>) {
    // (normal, tangent u, tangent v) with u x v = normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u16;
        for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            let position = [
                normal[0] * 0.5 + u[0] * su + v[0] * sv,
                normal[1] * 0.5 + u[1] * su + v[1] * sv,
                normal[2] * 0.5 + u[2] * su + v[2] * sv,
            ];
            vertices.push(Vertex::new(position, normal));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}
