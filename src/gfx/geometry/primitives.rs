//! # Primitive Shape Generation
//!
//! Every generator emits triangles wound counter-clockwise when seen from
//! outside the shape, so back-face culling with clockwise-is-back keeps all
//! outer faces. The transform passed in is stored on the mesh; it is not
//! baked into the vertex data.

use crate::gfx::scene::{Mesh, Object3D};

/// Generate a cube centered at the origin
///
/// Each face gets its own 4 vertices so per-face data can diverge later.
///
/// # Arguments
/// * `side_length` - Edge length of the cube
/// * `transform` - Initial transform, kept on the mesh rather than baked in
///
/// # Returns
/// Mesh with 24 vertices and 36 indices, wound counter-clockwise from outside
#[rustfmt::skip]
pub fn generate_cube(side_length: f32, transform: Object3D) -> Mesh {
    let h = side_length / 2.0;

    let vertices = vec![
        // Front face
        -h, -h,  h,    h, -h,  h,    h,  h,  h,   -h,  h,  h,
        // Back face
        -h, -h, -h,   -h,  h, -h,    h,  h, -h,    h, -h, -h,
        // Top face
        -h,  h, -h,   -h,  h,  h,    h,  h,  h,    h,  h, -h,
        // Bottom face
        -h, -h, -h,    h, -h, -h,    h, -h,  h,   -h, -h,  h,
        // Right face
         h, -h, -h,    h,  h, -h,    h,  h,  h,    h, -h,  h,
        // Left face
        -h, -h, -h,   -h, -h,  h,   -h,  h,  h,   -h,  h, -h,
    ];

    let indices = vec![
        0,  1,  2,    0,  2,  3,  // Front
        4,  5,  6,    4,  6,  7,  // Back
        8,  9,  10,   8,  10, 11, // Top
        12, 13, 14,   12, 14, 15, // Bottom
        16, 17, 18,   16, 18, 19, // Right
        20, 21, 22,   20, 22, 23, // Left
    ];

    Mesh::new(vertices, indices).with_transform(transform)
}

/// Generate a square plane in the XZ plane facing +Y
#[rustfmt::skip]
pub fn generate_plane(side_length: f32, transform: Object3D) -> Mesh {
    let h = side_length / 2.0;

    let vertices = vec![
        -h, 0.0, -h,
        -h, 0.0,  h,
         h, 0.0,  h,
         h, 0.0, -h,
    ];

    let indices = vec![0, 1, 2, 0, 2, 3];

    Mesh::new(vertices, indices).with_transform(transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;

    /// Asserts every triangle's CCW normal points away from `center`
    fn assert_outward(mesh: &Mesh, center: Vector3) {
        for [a, b, c] in mesh.triangles() {
            let v0 = mesh.vertex(a as usize).unwrap();
            let v1 = mesh.vertex(b as usize).unwrap();
            let v2 = mesh.vertex(c as usize).unwrap();
            let normal = (v1 - v0).cross(v2 - v0);
            let centroid = (v0 + v1 + v2).multiply_scalar(1.0 / 3.0);
            assert!(
                normal.dot(centroid - center) > 0.0,
                "triangle {:?} faces inward",
                [a, b, c]
            );
        }
    }

    #[test]
    fn test_cube_generation() {
        let cube = generate_cube(1.0, Object3D::default());
        assert_eq!(cube.vertex_count(), 24); // 6 faces * 4 vertices
        assert_eq!(cube.indices().len(), 36); // 6 faces * 2 triangles * 3 indices
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.indices().iter().all(|&i| i < 24));
    }

    #[test]
    fn test_cube_faces_point_outward() {
        let cube = generate_cube(2.0, Object3D::default());
        assert_outward(&cube, Vector3::ZERO);
    }

    #[test]
    fn test_cube_respects_side_length() {
        let cube = generate_cube(3.0, Object3D::default());
        assert!(cube.vertices().iter().all(|v| v.abs() == 1.5));
    }

    #[test]
    fn test_plane_generation() {
        let plane = generate_plane(2.0, Object3D::default());
        assert_eq!(
            plane.vertices(),
            &[-1.0, 0.0, -1.0, -1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, -1.0]
        );
        assert_eq!(plane.indices(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_plane_faces_up() {
        let plane = generate_plane(4.0, Object3D::default());
        assert_outward(&plane, Vector3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_transform_is_stored_not_baked() {
        let transform = Object3D::new(
            Vector3::new(0.0, 0.5, 2.0),
            Vector3::new(0.0, 30.0, 0.0),
            Vector3::splat(0.5),
        );
        let cube = generate_cube(1.0, transform);
        assert_eq!(cube.transform, transform);
        assert_eq!(cube.vertices(), generate_cube(1.0, Object3D::default()).vertices());
    }
}
