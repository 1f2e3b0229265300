use std::ops::Sub;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],   // x, y, z coordinates
    pub normal: [f32; 3],     // unit surface normal
    pub tex_coords: [f32; 2], // u, v texture coordinates (origin top-left)
}

/// Per-frame values shared by every mesh.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalsUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub light_direction: [f32; 4], // xyz towards the light, w unused
    pub light_color: [f32; 4],     // rgb * intensity
    pub ambient_color: [f32; 4],   // rgb * intensity
}

/// Per-mesh transform and surface parameters.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub params: [f32; 4], // metalness, roughness, has_map, map_alpha
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width over height, or `None` for a degenerate size.
    pub fn aspect(&self) -> Option<f32> {
        if self.width > 0.0 && self.height > 0.0 {
            Some(self.width / self.height)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Self::Output {
        Position {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Unpacks a `0xRRGGBB` color into sRGB channels in `0.0..=1.0`.
pub fn rgb_from_hex(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}
