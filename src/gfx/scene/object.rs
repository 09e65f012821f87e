use cgmath::Deg;

use crate::math::{Matrix4x4, Vector3};

/// Position, euler rotation and scale of a scene entity.
///
/// Entities (meshes, shapes) embed an `Object3D` by value instead of
/// inheriting from a common base. Rotation is in degrees and applied X, then
/// Y, then Z.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Object3D {
    pub position: Vector3,
    pub rotation: Vector3,
    pub scale: Vector3,
}

impl Default for Object3D {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            rotation: Vector3::ZERO,
            scale: Vector3::ONE,
        }
    }
}

impl Object3D {
    /// Creates a transform from its components
    ///
    /// # Arguments
    /// * `position` - Translation in world units
    /// * `rotation` - Euler angles in degrees, applied X then Y then Z
    /// * `scale` - Per-axis scale factors
    pub fn new(position: Vector3, rotation: Vector3, scale: Vector3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Set translation
    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
    }

    /// Apply translation (adds to the current position)
    pub fn translate(&mut self, offset: Vector3) {
        self.position = self.position + offset;
    }

    /// Set all three euler angles, in degrees
    pub fn set_rotation(&mut self, rotation: Vector3) {
        self.rotation = rotation;
    }

    /// Apply rotation around X axis
    pub fn rotate_x(&mut self, angle: Deg<f32>) {
        self.rotation.x += angle.0;
    }

    /// Apply rotation around Y axis
    pub fn rotate_y(&mut self, angle: Deg<f32>) {
        self.rotation.y += angle.0;
    }

    /// Apply rotation around Z axis
    pub fn rotate_z(&mut self, angle: Deg<f32>) {
        self.rotation.z += angle.0;
    }

    /// Set uniform scale
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = Vector3::splat(scale);
    }

    /// Set non-uniform scale
    pub fn set_scale_xyz(&mut self, scale: Vector3) {
        self.scale = scale;
    }

    /// Reset to the identity transform
    pub fn reset_transform(&mut self) {
        *self = Self::default();
    }

    /// Local-to-world matrix, `T * Rz * Ry * Rx * S`
    pub fn world_matrix(&self) -> Matrix4x4 {
        Matrix4x4::from_rotation_translation_scale(self.rotation, self.position, self.scale)
    }
}
