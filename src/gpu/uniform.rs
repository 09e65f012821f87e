//! Typed uniform values.
//!
//! Each variant carries exactly the data its shader type needs, so a mat4
//! can never be sent with nine floats. The string-tagged entry point
//! [`UniformValue::from_tagged`] exists for data-driven callers and reports
//! unknown tags or wrong value counts as `None`.

use crate::math::{Matrix4x4, Vector3};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    /// Column-major 4x4 matrix
    Mat4([f32; 16]),
    /// Column-major 3x3 matrix
    Mat3([f32; 9]),
    Vec4([f32; 4]),
    Vec3([f32; 3]),
    Vec2([f32; 2]),
    Float(f32),
    Int(i32),
    Bool(bool),
}

/// Shape of a uniform, without its data
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Mat4,
    Mat3,
    Vec4,
    Vec3,
    Vec2,
    Float,
    Int,
    Bool,
}

impl UniformKind {
    /// Tag accepted by [`UniformValue::from_tagged`]
    pub fn tag(self) -> &'static str {
        match self {
            UniformKind::Mat4 => "mat4",
            UniformKind::Mat3 => "mat3",
            UniformKind::Vec4 => "vec4",
            UniformKind::Vec3 => "vec3",
            UniformKind::Vec2 => "vec2",
            UniformKind::Float => "float",
            UniformKind::Int => "int",
            UniformKind::Bool => "bool",
        }
    }

    pub fn from_tag(tag: &str) -> Option<UniformKind> {
        Some(match tag {
            "mat4" => UniformKind::Mat4,
            "mat3" => UniformKind::Mat3,
            "vec4" => UniformKind::Vec4,
            "vec3" => UniformKind::Vec3,
            "vec2" => UniformKind::Vec2,
            "float" => UniformKind::Float,
            "int" => UniformKind::Int,
            "bool" => UniformKind::Bool,
            _ => return None,
        })
    }

    /// Number of scalars a value of this kind holds
    pub fn component_count(self) -> usize {
        match self {
            UniformKind::Mat4 => 16,
            UniformKind::Mat3 => 9,
            UniformKind::Vec4 => 4,
            UniformKind::Vec3 => 3,
            UniformKind::Vec2 => 2,
            UniformKind::Float | UniformKind::Int | UniformKind::Bool => 1,
        }
    }
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Bool(_) => UniformKind::Bool,
        }
    }

    /// Builds a value from a type tag and a flat list of scalars.
    ///
    /// Returns `None` when the tag is unknown or `values` does not hold
    /// exactly as many scalars as the tag requires. `int` truncates toward
    /// zero and `bool` is true for any non-zero value.
    pub fn from_tagged(tag: &str, values: &[f32]) -> Option<UniformValue> {
        let kind = UniformKind::from_tag(tag)?;
        if values.len() != kind.component_count() {
            return None;
        }
        Some(match kind {
            UniformKind::Mat4 => UniformValue::Mat4(values.try_into().ok()?),
            UniformKind::Mat3 => UniformValue::Mat3(values.try_into().ok()?),
            UniformKind::Vec4 => UniformValue::Vec4(values.try_into().ok()?),
            UniformKind::Vec3 => UniformValue::Vec3(values.try_into().ok()?),
            UniformKind::Vec2 => UniformValue::Vec2(values.try_into().ok()?),
            UniformKind::Float => UniformValue::Float(values[0]),
            UniformKind::Int => UniformValue::Int(values[0] as i32),
            UniformKind::Bool => UniformValue::Bool(values[0] != 0.0),
        })
    }
}

impl From<Matrix4x4> for UniformValue {
    fn from(matrix: Matrix4x4) -> Self {
        UniformValue::Mat4(matrix.to_array())
    }
}

impl From<Vector3> for UniformValue {
    fn from(v: Vector3) -> Self {
        UniformValue::Vec3(v.to_array())
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}
