use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4};

use crate::data_structures::{
    mesh_instance::SubMesh,
    model::{self, Aabb, GpuGeometry},
};

/**
 * OBJ files don't come with tangents and bitangents so they are accumulated
 * per triangle and averaged per vertex for normal mapping to work.
 */
pub fn compute_tangents(vertices: &mut [model::ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks_exact(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let (v0, v1, v2) = (vertices[i0], vertices[i1], vertices[i2]);

        let pos0: Vector3<f32> = v0.position.into();
        let pos1: Vector3<f32> = v1.position.into();
        let pos2: Vector3<f32> = v2.position.into();

        let uv0: cgmath::Vector2<f32> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<f32> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<f32> = v2.tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        // delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // flipped for right-handed normal maps in wgpu texture space
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for i in [i0, i1, i2] {
            vertices[i].tangent = (tangent + Vector3::from(vertices[i].tangent)).into();
            vertices[i].bitangent = (bitangent + Vector3::from(vertices[i].bitangent)).into();
            triangles_included[i] += 1;
        }
    }

    for (v, n) in vertices.iter_mut().zip(triangles_included) {
        if n == 0 {
            continue;
        }
        let denom = 1.0 / n as f32;
        v.tangent = (Vector3::from(v.tangent) * denom).into();
        v.bitangent = (Vector3::from(v.bitangent) * denom).into();
    }
}

/// Build one submesh per OBJ model. Models without geometry are skipped.
pub fn obj_submeshes(models: &[tobj::Model], file_name: &str, device: &wgpu::Device) -> Vec<SubMesh> {
    models
        .iter()
        .filter_map(|m| {
            let mut vertices = (0..m.mesh.positions.len() / 3)
                .map(|i| model::ModelVertex {
                    position: [
                        m.mesh.positions[i * 3],
                        m.mesh.positions[i * 3 + 1],
                        m.mesh.positions[i * 3 + 2],
                    ],
                    tex_coords: [
                        m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                        1.0 - m.mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
                    ],
                    normal: [
                        m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                    ],
                    tangent: [0.0; 3],
                    bitangent: [0.0; 3],
                })
                .collect::<Vec<_>>();
            let Some(bounds) = Aabb::from_points(vertices.iter().map(|v| v.position)) else {
                log::warn!("Skipping empty object {} in {file_name}", m.name);
                return None;
            };
            compute_tangents(&mut vertices, &m.mesh.indices);

            let name = format!("{file_name}:{}", m.name);
            let geometry = GpuGeometry::new(device, &name, &vertices, &m.mesh.indices);
            Some(SubMesh::new(
                &name,
                bounds,
                m.mesh.material_id.unwrap_or(0),
                Some(geometry),
            ))
        })
        .collect()
}

/// Read the geometry of one glTF primitive with `node_matrix` baked into the
/// vertices, so every placement of the file shares a single object space.
pub fn gltf_primitive_vertices(
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
    node_matrix: &Matrix4<f32>,
) -> (Vec<model::ModelVertex>, Vec<u32>) {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<model::ModelVertex> = reader
        .read_positions()
        .map(|positions| {
            positions
                .map(|position| model::ModelVertex {
                    position,
                    ..Default::default()
                })
                .collect()
        })
        .unwrap_or_default();

    if let Some(normals) = reader.read_normals() {
        for (vertex, normal) in vertices.iter_mut().zip(normals) {
            vertex.normal = normal;
        }
    }
    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
        for (vertex, tex_coord) in vertices.iter_mut().zip(tex_coords) {
            vertex.tex_coords = tex_coord;
        }
    }
    let has_tangents = match reader.read_tangents() {
        Some(tangents) => {
            for (vertex, tangent) in vertices.iter_mut().zip(tangents) {
                // the 4th component is the bitangent sign
                let tangent: Vector4<f32> = tangent.into();
                let normal: Vector3<f32> = vertex.normal.into();
                vertex.tangent = tangent.truncate().into();
                vertex.bitangent = (normal.cross(tangent.truncate()) * tangent.w).into();
            }
            true
        }
        None => false,
    };

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    if !has_tangents {
        compute_tangents(&mut vertices, &indices);
    }

    let normal_matrix = node_matrix_normal(node_matrix);
    for vertex in vertices.iter_mut() {
        let p = node_matrix * Vector3::from(vertex.position).extend(1.0);
        vertex.position = p.truncate().into();
        for direction in [&mut vertex.normal, &mut vertex.tangent, &mut vertex.bitangent] {
            let d = normal_matrix * Vector3::from(*direction);
            *direction = if d.magnitude2() > 0.0 { d.normalize().into() } else { d.into() };
        }
    }
    (vertices, indices)
}

fn node_matrix_normal(m: &Matrix4<f32>) -> Matrix3<f32> {
    let upper = Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate());
    upper.invert().map(|inv| inv.transpose()).unwrap_or(upper)
}
