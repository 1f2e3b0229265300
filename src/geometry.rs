use crate::config::FallbackConfig;
use crate::utils::Vertex;
use glam::Vec3;
use std::f32::consts::TAU;

/// Indexed triangle mesh in flat attribute arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_capacity: usize, index_capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_capacity),
            normals: Vec::with_capacity(vertex_capacity),
            uvs: Vec::with_capacity(vertex_capacity),
            indices: Vec::with_capacity(index_capacity),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Area-weighted vertex normals from the triangle list.
    pub fn compute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= accum.len() || b >= accum.len() || c >= accum.len() {
                continue;
            }
            let pa = Vec3::from(self.positions[a]);
            let pb = Vec3::from(self.positions[b]);
            let pc = Vec3::from(self.positions[c]);
            let face = (pb - pa).cross(pc - pa);
            accum[a] += face;
            accum[b] += face;
            accum[c] += face;
        }
        self.normals = accum
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
            .collect();
    }

    /// Interleaved vertices for upload. Missing attributes are zero-filled.
    pub fn vertices(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, position)| Vertex {
                position: *position,
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                tex_coords: self.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect()
    }

    /// Axis-aligned bounds `(min, max)`.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = Vec3::from(*self.positions.first()?);
        Some(self.positions.iter().fold((first, first), |(lo, hi), p| {
            let p = Vec3::from(*p);
            (lo.min(p), hi.max(p))
        }))
    }
}

/// Cylinder centered on the origin along +Y, with caps.
///
/// The side wall's `u` runs once around the circumference and `v` runs from
/// 0 at the top rim to 1 at the bottom rim, so an image drawn top-down reads
/// upright.
pub fn generate_cylinder(
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    radial_segments: u32,
) -> MeshBuffers {
    let radial_segments = radial_segments.max(3);
    let half_height = height / 2.0;
    let slope = if height != 0.0 {
        (radius_bottom - radius_top) / height
    } else {
        0.0
    };

    let side_vertices = 2 * (radial_segments + 1) as usize;
    let cap_vertices = 2 * (radial_segments as usize * 2 + 1);
    let mut mesh = MeshBuffers::with_capacity(
        side_vertices + cap_vertices,
        radial_segments as usize * 12,
    );

    for row in 0..=1u32 {
        let v = row as f32;
        let radius = v * (radius_bottom - radius_top) + radius_top;
        let y = -v * height + half_height;
        for seg in 0..=radial_segments {
            let u = seg as f32 / radial_segments as f32;
            let (sin_theta, cos_theta) = (u * TAU).sin_cos();
            mesh.positions
                .push([radius * sin_theta, y, radius * cos_theta]);
            let normal = Vec3::new(sin_theta, slope, cos_theta).normalize();
            mesh.normals.push(normal.to_array());
            mesh.uvs.push([u, v]);
        }
    }

    let row = radial_segments + 1;
    for seg in 0..radial_segments {
        let a = seg;
        let b = seg + row;
        let c = seg + row + 1;
        let d = seg + 1;
        mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    if radius_top > 0.0 {
        add_cap(&mut mesh, radial_segments, radius_top, half_height, true);
    }
    if radius_bottom > 0.0 {
        add_cap(&mut mesh, radial_segments, radius_bottom, -half_height, false);
    }
    mesh
}

fn add_cap(mesh: &mut MeshBuffers, radial_segments: u32, radius: f32, y: f32, top: bool) {
    let normal = [0.0, if top { 1.0 } else { -1.0 }, 0.0];
    let center = mesh.vertex_count() as u32;
    mesh.positions.push([0.0, y, 0.0]);
    mesh.normals.push(normal);
    mesh.uvs.push([0.5, 0.5]);

    for seg in 0..=radial_segments {
        let u = seg as f32 / radial_segments as f32;
        let (sin_theta, cos_theta) = (u * TAU).sin_cos();
        mesh.positions
            .push([radius * sin_theta, y, radius * cos_theta]);
        mesh.normals.push(normal);
        mesh.uvs
            .push([0.5 + sin_theta * 0.5, 0.5 - cos_theta * 0.5]);
    }

    for seg in 0..radial_segments {
        let rim = center + 1 + seg;
        if top {
            mesh.indices.extend_from_slice(&[center, rim, rim + 1]);
        } else {
            mesh.indices.extend_from_slice(&[center, rim + 1, rim]);
        }
    }
}

/// The stand-in tumbler used when no model could be loaded.
pub fn fallback_tumbler(config: &FallbackConfig) -> MeshBuffers {
    generate_cylinder(
        config.radius_top,
        config.radius_bottom,
        config.height,
        config.radial_segments,
    )
}
