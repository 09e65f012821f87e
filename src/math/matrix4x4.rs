//! 4x4 transform matrices in column-major order.
//!
//! Storage follows the layout GPUs expect for `mat4` uniforms: element at
//! row `r`, column `c` lives at index `c * 4 + r`, so the translation of an
//! affine transform occupies indices 12, 13 and 14. Points are treated as
//! column vectors, `M * v`.
//!
//! Every constructor returns a fresh matrix; nothing here mutates an existing
//! matrix in place.

use std::fmt;
use std::ops::Mul;

use super::vector3::Vector3;

/// Depth range of the clip space a projection matrix targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ClipDepth {
    /// OpenGL / WebGL convention, z in [-1, 1]
    #[default]
    NegativeOneToOne,
    /// wgpu / Vulkan / Metal / D3D convention, z in [0, 1]
    ZeroToOne,
}

#[repr(C)]
#[derive(Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Matrix4x4 {
    values: [f32; 16],
}

#[rustfmt::skip]
const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

impl Default for Matrix4x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4x4 {
    pub const IDENTITY: Matrix4x4 = Matrix4x4 { values: IDENTITY };

    /// Wraps 16 column-major values
    pub const fn from_values(values: [f32; 16]) -> Self {
        Self { values }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn values(&self) -> &[f32; 16] {
        &self.values
    }

    pub fn to_array(self) -> [f32; 16] {
        self.values
    }

    /// Element at `row`, `column`
    pub fn get(&self, row: usize, column: usize) -> f32 {
        self.values[column * 4 + row]
    }

    pub fn translation(v: Vector3) -> Self {
        let mut values = IDENTITY;
        values[12] = v.x;
        values[13] = v.y;
        values[14] = v.z;
        Self { values }
    }

    pub fn scaling(v: Vector3) -> Self {
        let mut values = IDENTITY;
        values[0] = v.x;
        values[5] = v.y;
        values[10] = v.z;
        Self { values }
    }

    /// Rotation about the X axis, angle in degrees
    pub fn x_rotation(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let mut values = IDENTITY;
        values[5] = cos;
        values[6] = sin;
        values[9] = -sin;
        values[10] = cos;
        Self { values }
    }

    /// Rotation about the Y axis, angle in degrees
    pub fn y_rotation(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let mut values = IDENTITY;
        values[0] = cos;
        values[2] = -sin;
        values[8] = sin;
        values[10] = cos;
        Self { values }
    }

    /// Rotation about the Z axis, angle in degrees
    pub fn z_rotation(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let mut values = IDENTITY;
        values[0] = cos;
        values[1] = sin;
        values[4] = -sin;
        values[5] = cos;
        Self { values }
    }

    /// Matrix product `b * a`: the result applies `a` first, then `b`.
    ///
    /// To compose "apply X, then Y, then Z" write
    /// `multiply(z, multiply(y, x))`, or equivalently `z * y * x`.
    pub fn multiply(b: Matrix4x4, a: Matrix4x4) -> Matrix4x4 {
        let mut values = [0.0; 16];
        for column in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += b.values[k * 4 + row] * a.values[column * 4 + k];
                }
                values[column * 4 + row] = sum;
            }
        }
        Matrix4x4 { values }
    }

    /// Composes scale, then X, Y and Z rotations (degrees), then translation:
    /// `T * Rz * Ry * Rx * S`.
    pub fn from_rotation_translation_scale(
        rotation: Vector3,
        translation: Vector3,
        scale: Vector3,
    ) -> Self {
        let mut transform = Self::scaling(scale);
        transform = Self::multiply(Self::x_rotation(rotation.x), transform);
        transform = Self::multiply(Self::y_rotation(rotation.y), transform);
        transform = Self::multiply(Self::z_rotation(rotation.z), transform);
        Self::multiply(Self::translation(translation), transform)
    }

    /// Symmetric perspective projection targeting the GL clip space.
    ///
    /// # Arguments
    /// * `aspect_ratio` - Height / width; scales the x axis
    /// * `fov_degrees` - Vertical field of view
    /// * `z_far`, `z_near` - Clip plane distances, both positive
    pub fn perspective(aspect_ratio: f32, fov_degrees: f32, z_far: f32, z_near: f32) -> Self {
        Self::perspective_with_depth(
            aspect_ratio,
            fov_degrees,
            z_far,
            z_near,
            ClipDepth::NegativeOneToOne,
        )
    }

    /// Symmetric perspective projection for a given clip depth convention.
    ///
    /// The fourth row is `(0, 0, -1, 0)`, so `w' = -z` and the perspective
    /// divide happens on the GPU.
    pub fn perspective_with_depth(
        aspect_ratio: f32,
        fov_degrees: f32,
        z_far: f32,
        z_near: f32,
        depth: ClipDepth,
    ) -> Self {
        let focal = 1.0 / (fov_degrees.to_radians() / 2.0).tan();
        let range = z_far - z_near;

        let mut values = IDENTITY;
        values[0] = focal * aspect_ratio;
        values[5] = focal;
        match depth {
            ClipDepth::NegativeOneToOne => {
                values[10] = -(z_far + z_near) / range;
                values[14] = -(2.0 * z_far * z_near) / range;
            }
            ClipDepth::ZeroToOne => {
                values[10] = -z_far / range;
                values[14] = -(z_far * z_near) / range;
            }
        }
        values[11] = -1.0;
        values[15] = 0.0;
        Self { values }
    }

    /// Camera transform `P * TRS(rotation, translation, 1)`
    pub fn camera(
        rotation: Vector3,
        translation: Vector3,
        aspect_ratio: f32,
        fov_degrees: f32,
        z_far: f32,
        z_near: f32,
    ) -> Self {
        let transform = Self::from_rotation_translation_scale(rotation, translation, Vector3::ONE);
        let projection = Self::perspective(aspect_ratio, fov_degrees, z_far, z_near);
        Self::multiply(projection, transform)
    }

    /// View matrix for a camera at `eye` looking at `target`.
    ///
    /// `eye == target` or `up` parallel to the view direction yields a
    /// singular basis; the result is then meaningless and callers must avoid
    /// those inputs.
    pub fn look_at(eye: Vector3, target: Vector3, up: Vector3) -> Self {
        let forward = (eye - target).normalize();
        let right = up.cross(forward).normalize();
        let camera_up = forward.cross(right);

        #[rustfmt::skip]
        let values = [
            right.x, camera_up.x, forward.x, 0.0,
            right.y, camera_up.y, forward.y, 0.0,
            right.z, camera_up.z, forward.z, 0.0,
            -right.dot(eye), -camera_up.dot(eye), -forward.dot(eye), 1.0,
        ];
        Self { values }
    }

    /// [`Matrix4x4::look_at`] with the world Y axis as up
    pub fn look_at_y_up(eye: Vector3, target: Vector3) -> Self {
        Self::look_at(eye, target, Vector3::UP)
    }

    /// Transforms `point` as `(x, y, z, 1)` and drops w (no perspective divide)
    pub fn transform_point(&self, point: Vector3) -> Vector3 {
        let m = &self.values;
        Vector3::new(
            m[0] * point.x + m[4] * point.y + m[8] * point.z + m[12],
            m[1] * point.x + m[5] * point.y + m[9] * point.z + m[13],
            m[2] * point.x + m[6] * point.y + m[10] * point.z + m[14],
        )
    }

    pub fn approx_eq(&self, other: &Matrix4x4, epsilon: f32) -> bool {
        self.values
            .iter()
            .zip(other.values.iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Mul for Matrix4x4 {
    type Output = Matrix4x4;

    fn mul(self, rhs: Matrix4x4) -> Matrix4x4 {
        Matrix4x4::multiply(self, rhs)
    }
}

impl From<[f32; 16]> for Matrix4x4 {
    fn from(values: [f32; 16]) -> Self {
        Self { values }
    }
}

impl From<cgmath::Matrix4<f32>> for Matrix4x4 {
    fn from(matrix: cgmath::Matrix4<f32>) -> Self {
        let values: &[f32; 16] = matrix.as_ref();
        Self { values: *values }
    }
}

impl From<Matrix4x4> for cgmath::Matrix4<f32> {
    fn from(matrix: Matrix4x4) -> Self {
        let m = matrix.values;
        cgmath::Matrix4::new(
            m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7], m[8], m[9], m[10], m[11], m[12],
            m[13], m[14], m[15],
        )
    }
}

impl fmt::Debug for Matrix4x4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix4x4")
            .field("values", &self.values)
            .finish()
    }
}

impl fmt::Display for Matrix4x4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            let separator = if (i + 1) % 4 == 0 { "\n" } else { " " };
            write!(f, "{:.4}{}", value, separator)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Matrix4, Point3, SquareMatrix};
    use rand::Rng;

    const EPSILON: f32 = 1e-5;

    fn random_matrix(rng: &mut impl Rng) -> Matrix4x4 {
        let mut values = [0.0; 16];
        for value in values.iter_mut() {
            *value = rng.random_range(-10.0..10.0);
        }
        Matrix4x4::from_values(values)
    }

    #[test]
    fn test_default_is_identity() {
        assert_eq!(Matrix4x4::default(), Matrix4x4::IDENTITY);
        let identity: Matrix4x4 = Matrix4::<f32>::identity().into();
        assert_eq!(identity, Matrix4x4::identity());
    }

    #[test]
    fn test_identity_is_neutral_for_multiply() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let a = random_matrix(&mut rng);
            assert!(Matrix4x4::multiply(Matrix4x4::IDENTITY, a).approx_eq(&a, EPSILON));
            assert!(Matrix4x4::multiply(a, Matrix4x4::IDENTITY).approx_eq(&a, EPSILON));
        }
    }

    #[test]
    fn test_multiply_matches_cgmath_product() {
        let mut rng = rand::rng();
        let a = random_matrix(&mut rng);
        let b = random_matrix(&mut rng);
        let expected: Matrix4x4 =
            (Matrix4::<f32>::from(b) * Matrix4::<f32>::from(a)).into();
        assert!(Matrix4x4::multiply(b, a).approx_eq(&expected, 1e-3));
        assert_eq!(b * a, Matrix4x4::multiply(b, a));
    }

    #[test]
    fn test_multiply_applies_second_argument_first() {
        let scale = Matrix4x4::scaling(Vector3::splat(2.0));
        let shift = Matrix4x4::translation(Vector3::new(1.0, 0.0, 0.0));

        // scale, then translate
        let p = Matrix4x4::multiply(shift, scale).transform_point(Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Vector3::new(3.0, 2.0, 2.0));

        // translate, then scale
        let p = Matrix4x4::multiply(scale, shift).transform_point(Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Vector3::new(4.0, 2.0, 2.0));
    }

    #[test]
    fn test_translation_and_scaling_layout() {
        let t = Matrix4x4::translation(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(&t.values()[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(t.get(0, 3), 1.0);

        let s = Matrix4x4::scaling(Vector3::new(2.0, 3.0, 4.0));
        assert_eq!(
            [s.values()[0], s.values()[5], s.values()[10], s.values()[15]],
            [2.0, 3.0, 4.0, 1.0]
        );
    }

    #[test]
    fn test_rotations_match_cgmath() {
        for angle in [0.0_f32, 30.0, 45.0, 90.0, 180.0, 270.0, -60.0] {
            let x: Matrix4x4 = Matrix4::from_angle_x(Deg(angle)).into();
            let y: Matrix4x4 = Matrix4::from_angle_y(Deg(angle)).into();
            let z: Matrix4x4 = Matrix4::from_angle_z(Deg(angle)).into();
            assert!(Matrix4x4::x_rotation(angle).approx_eq(&x, EPSILON));
            assert!(Matrix4x4::y_rotation(angle).approx_eq(&y, EPSILON));
            assert!(Matrix4x4::z_rotation(angle).approx_eq(&z, EPSILON));
        }
    }

    #[test]
    fn test_trs_without_rotation_moves_origin_to_translation() {
        let t = Vector3::new(4.0, -2.0, 7.5);
        let m = Matrix4x4::from_rotation_translation_scale(Vector3::ZERO, t, Vector3::ONE);
        assert_eq!(m.transform_point(Vector3::ZERO), t);
    }

    #[test]
    fn test_trs_composition_order() {
        let rotation = Vector3::new(10.0, 20.0, 30.0);
        let translation = Vector3::new(1.0, 2.0, 3.0);
        let scale = Vector3::new(2.0, 0.5, 1.5);

        let expected: Matrix4x4 = (Matrix4::from_translation(translation.into())
            * Matrix4::from_angle_z(Deg(rotation.z))
            * Matrix4::from_angle_y(Deg(rotation.y))
            * Matrix4::from_angle_x(Deg(rotation.x))
            * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z))
        .into();

        let m = Matrix4x4::from_rotation_translation_scale(rotation, translation, scale);
        assert!(m.approx_eq(&expected, EPSILON));
    }

    #[test]
    fn test_perspective_matches_cgmath_for_gl_depth() {
        let (width, height) = (800.0_f32, 600.0_f32);
        let m = Matrix4x4::perspective(height / width, 90.0, 100.0, 0.1);

        // cgmath takes width / height and divides the x focal length by it
        let expected: Matrix4x4 = cgmath::perspective(Deg(90.0), width / height, 0.1, 100.0).into();
        assert!(m.approx_eq(&expected, 1e-4));
        assert_eq!(m.values()[11], -1.0);
        assert_eq!(m.values()[15], 0.0);
    }

    #[test]
    fn test_perspective_maps_near_and_far_planes() {
        let (near, far) = (0.5, 50.0);
        for (depth, near_ndc) in [
            (ClipDepth::NegativeOneToOne, -1.0),
            (ClipDepth::ZeroToOne, 0.0),
        ] {
            let m = Matrix4x4::perspective_with_depth(1.0, 60.0, far, near, depth);
            let ndc_z = |view_z: f32| {
                let z = m.values()[10] * view_z + m.values()[14];
                let w = m.values()[11] * view_z;
                z / w
            };
            assert!((ndc_z(-near) - near_ndc).abs() < 1e-4);
            assert!((ndc_z(-far) - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_look_at_maps_eye_to_origin() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let eye = Vector3::new(
                rng.random_range(-20.0..20.0),
                rng.random_range(1.0..20.0),
                rng.random_range(-20.0..20.0),
            );
            let view = Matrix4x4::look_at_y_up(eye, Vector3::ZERO);
            assert!(view.transform_point(eye).approx_eq(Vector3::ZERO, 1e-3));
        }
    }

    #[test]
    fn test_look_at_matches_cgmath() {
        let eye = Vector3::new(6.0, 3.0, 2.0);
        let target = Vector3::new(0.0, 0.5, 0.0);
        let expected: Matrix4x4 = Matrix4::look_at_rh(
            Point3::new(eye.x, eye.y, eye.z),
            Point3::new(target.x, target.y, target.z),
            cgmath::Vector3::unit_y(),
        )
        .into();
        assert!(Matrix4x4::look_at(eye, target, Vector3::UP).approx_eq(&expected, 1e-5));
    }

    #[test]
    fn test_camera_is_projection_after_transform() {
        let rotation = Vector3::new(0.0, 45.0, 0.0);
        let translation = Vector3::new(0.0, 0.0, -5.0);
        let expected = Matrix4x4::perspective(0.75, 80.0, 100.0, 0.1)
            * Matrix4x4::from_rotation_translation_scale(rotation, translation, Vector3::ONE);
        let camera = Matrix4x4::camera(rotation, translation, 0.75, 80.0, 100.0, 0.1);
        assert!(camera.approx_eq(&expected, EPSILON));
    }

    #[test]
    fn test_display_prints_four_values_per_line() {
        let text = Matrix4x4::IDENTITY.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "1.0000 0.0000 0.0000 0.0000");
    }
}
