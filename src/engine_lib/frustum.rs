// src/engine_lib/frustum.rs

use glam::{Mat4, Vec3, Vec4};

use crate::engine_lib::transform::Plane;

/// Left, right, bottom and top planes of a view frustum, normals pointing inward.
///
/// Near and far are left out on purpose: an oblique projection replaces the near
/// plane with the portal's exit plane, while the four side planes are untouched.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 4],
}

impl Frustum {
    pub fn from_view_projection(view_proj: &Mat4) -> Self {
        let row = |i: usize| view_proj.row(i);
        let (r0, r1, r3) = (row(0), row(1), row(3));
        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1].map(plane_from_row);
        Self { planes }
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(center) >= -radius)
    }
}

fn plane_from_row(row: Vec4) -> Plane {
    let normal = row.truncate();
    let len = normal.length();
    if len <= f32::EPSILON {
        return Plane { normal: Vec3::ZERO, d: 0.0 };
    }
    Plane { normal: normal / len, d: row.w / len }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frustum_looking_down_neg_z() -> Frustum {
        let proj = Mat4::perspective_rh(70f32.to_radians(), 1.0, 0.1, 100.0);
        Frustum::from_view_projection(&proj)
    }

    #[test]
    fn sphere_ahead_is_inside() {
        let frustum = frustum_looking_down_neg_z();
        assert!(frustum.intersects_sphere(Vec3::new(0.0, 0.0, -5.0), 0.5));
    }

    #[test]
    fn sphere_far_to_the_side_is_outside() {
        let frustum = frustum_looking_down_neg_z();
        assert!(!frustum.intersects_sphere(Vec3::new(50.0, 0.0, -5.0), 1.0));
        assert!(!frustum.intersects_sphere(Vec3::new(0.0, -40.0, -5.0), 1.0));
    }

    #[test]
    fn large_radius_straddling_edge_is_kept() {
        let frustum = frustum_looking_down_neg_z();
        assert!(frustum.intersects_sphere(Vec3::new(6.0, 0.0, -5.0), 3.0));
    }
}
