// src/wgpu_utils/uniform_buffer.rs
//! Uniform block layout and its GPU buffer
//!
//! WGSL lays out the uniform address space with fixed alignment rules. The
//! block is flattened into named members (`material.diffuse` for nested
//! structs) with byte offsets, written into a CPU shadow copy and uploaded
//! before each draw, skipping the upload when nothing changed.

use std::collections::HashMap;

use crate::gpu::UniformValue;

use super::reflect::{StructDecl, WgslType};

/// One leaf member of a flattened uniform block
#[derive(Debug, Clone, PartialEq)]
pub struct UniformMember {
    pub name: String,
    pub ty: WgslType,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UniformLayout {
    members: Vec<UniformMember>,
    size: u32,
}

fn round_up(alignment: u32, value: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// (alignment, size) of `ty` in the uniform address space
fn align_and_size(ty: &WgslType, structs: &HashMap<String, StructDecl>) -> Result<(u32, u32), String> {
    Ok(match ty {
        WgslType::F32 | WgslType::I32 | WgslType::U32 => (4, 4),
        WgslType::Vec2F | WgslType::Vec2I | WgslType::Vec2U => (8, 8),
        WgslType::Vec3F | WgslType::Vec3I | WgslType::Vec3U => (16, 12),
        WgslType::Vec4F | WgslType::Vec4I | WgslType::Vec4U => (16, 16),
        WgslType::Mat3F => (16, 48),
        WgslType::Mat4F => (16, 64),
        WgslType::Struct(name) => {
            let decl = structs
                .get(name)
                .ok_or_else(|| format!("unknown struct \"{name}\" in uniform block"))?;
            let mut align = 16;
            let mut end = 0;
            for member in &decl.members {
                let (member_align, member_size) = align_and_size(&member.ty, structs)?;
                align = align.max(member_align);
                end = round_up(member_align, end) + member_size;
            }
            (align, round_up(align, end))
        }
    })
}

impl UniformLayout {
    /// Flattens `block` using the uniform address space alignment rules
    pub fn from_struct(block: &StructDecl, structs: &HashMap<String, StructDecl>) -> Result<Self, String> {
        let mut layout = UniformLayout::default();
        let (align, size) = align_and_size(&WgslType::Struct(block.name.clone()), structs)?;
        layout.flatten(block, "", 0, structs)?;
        layout.size = round_up(align, size);
        Ok(layout)
    }

    fn flatten(
        &mut self,
        decl: &StructDecl,
        prefix: &str,
        base: u32,
        structs: &HashMap<String, StructDecl>,
    ) -> Result<(), String> {
        let mut end = 0;
        for member in &decl.members {
            let (align, size) = align_and_size(&member.ty, structs)?;
            let offset = round_up(align, end);
            end = offset + size;
            let name = format!("{prefix}{}", member.name);
            match &member.ty {
                WgslType::Struct(struct_name) => {
                    let nested = structs
                        .get(struct_name)
                        .ok_or_else(|| format!("unknown struct \"{struct_name}\""))?;
                    self.flatten(nested, &format!("{name}."), base + offset, structs)?;
                }
                ty => self.members.push(UniformMember {
                    name,
                    ty: ty.clone(),
                    offset: base + offset,
                }),
            }
        }
        Ok(())
    }

    pub fn members(&self) -> &[UniformMember] {
        &self.members
    }

    /// Total block size in bytes, a multiple of 16
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }

    /// Encodes `value` for member `index` into `shadow`.
    ///
    /// Booleans and integers are accepted by `i32` and `u32` members;
    /// `mat3` columns are padded to 16 bytes.
    pub fn write(&self, shadow: &mut [u8], index: usize, value: &UniformValue) -> Result<(), String> {
        let member = self
            .members
            .get(index)
            .ok_or_else(|| format!("invalid uniform index {index}"))?;
        let bytes: Vec<u8> = match (&member.ty, value) {
            (WgslType::Mat4F, UniformValue::Mat4(m)) => bytemuck::cast_slice(m).to_vec(),
            (WgslType::Mat3F, UniformValue::Mat3(m)) => {
                let mut padded = [0.0f32; 12];
                for column in 0..3 {
                    padded[column * 4..column * 4 + 3].copy_from_slice(&m[column * 3..column * 3 + 3]);
                }
                bytemuck::cast_slice(&padded).to_vec()
            }
            (WgslType::Vec4F, UniformValue::Vec4(v)) => bytemuck::cast_slice(v).to_vec(),
            (WgslType::Vec3F, UniformValue::Vec3(v)) => bytemuck::cast_slice(v).to_vec(),
            (WgslType::Vec2F, UniformValue::Vec2(v)) => bytemuck::cast_slice(v).to_vec(),
            (WgslType::F32, UniformValue::Float(f)) => f.to_ne_bytes().to_vec(),
            (WgslType::I32, UniformValue::Int(i)) => i.to_ne_bytes().to_vec(),
            (WgslType::I32, UniformValue::Bool(b)) => (*b as i32).to_ne_bytes().to_vec(),
            (WgslType::U32, UniformValue::Int(i)) => (*i as u32).to_ne_bytes().to_vec(),
            (WgslType::U32, UniformValue::Bool(b)) => (*b as u32).to_ne_bytes().to_vec(),
            (ty, value) => {
                return Err(format!(
                    "uniform \"{}\" of type {ty:?} cannot hold a {} value",
                    member.name,
                    value.kind().tag()
                ))
            }
        };
        let start = member.offset as usize;
        let target = shadow
            .get_mut(start..start + bytes.len())
            .ok_or_else(|| format!("uniform \"{}\" lies outside the block", member.name))?;
        target.copy_from_slice(&bytes);
        Ok(())
    }
}

/// GPU uniform buffer backed by a shadow copy of its contents
pub struct UniformBlock {
    layout: UniformLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    shadow: Vec<u8>,
    previous_content: Vec<u8>,
}

impl UniformBlock {
    pub fn new(device: &wgpu::Device, bind_group_layout: &wgpu::BindGroupLayout, layout: UniformLayout, label: &str) -> Self {
        let size = layout.size().max(16);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("UniformBuffer: {label}")),
            size: size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Uniform Bind Group: {label}")),
            layout: bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        UniformBlock {
            layout,
            buffer,
            bind_group,
            shadow: vec![0; size as usize],
            previous_content: Vec::new(),
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn write(&mut self, index: usize, value: &UniformValue) -> Result<(), String> {
        self.layout.write(&mut self.shadow, index, value)
    }

    /// Uploads the shadow copy if it changed since the last flush
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        if self.previous_content == self.shadow {
            return;
        }
        queue.write_buffer(&self.buffer, 0, &self.shadow);
        self.previous_content = self.shadow.clone();
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wgpu_utils::reflect::ShaderInterface;

    fn layout_of(source: &str) -> UniformLayout {
        let interface = ShaderInterface::reflect(source).unwrap();
        UniformLayout::from_struct(interface.uniform_struct().unwrap(), &interface.structs).unwrap()
    }

    #[test]
    fn test_offsets_follow_uniform_alignment() {
        let layout = layout_of(
            "struct Material { ambient: vec3<f32>, shininess: f32, diffuse: vec3<f32> }
             struct U { flag: u32, world: mat4x4<f32>, tint: vec3<f32>, material: Material, scale: vec2<f32> }
             @group(0) @binding(0) var<uniform> u: U;",
        );
        let offsets: Vec<_> = layout
            .members()
            .iter()
            .map(|m| (m.name.as_str(), m.offset))
            .collect();
        assert_eq!(
            offsets,
            vec![
                ("flag", 0),
                ("world", 16),
                ("tint", 80),
                ("material.ambient", 96),
                ("material.shininess", 108),
                ("material.diffuse", 112),
                ("scale", 128),
            ]
        );
        assert_eq!(layout.size(), 144);
    }

    #[test]
    fn test_write_encodes_values() {
        let layout = layout_of(
            "struct U { normal: mat3x3<f32>, enabled: u32 }
             @group(0) @binding(0) var<uniform> u: U;",
        );
        let mut shadow = vec![0u8; layout.size() as usize];
        let mat3 = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        layout.write(&mut shadow, 0, &UniformValue::Mat3(mat3)).unwrap();
        layout.write(&mut shadow, 1, &UniformValue::Bool(true)).unwrap();

        let floats: Vec<f32> = shadow[..48]
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(floats, vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0, 7.0, 8.0, 9.0, 0.0]);
        assert_eq!(u32::from_ne_bytes([shadow[48], shadow[49], shadow[50], shadow[51]]), 1);
    }

    #[test]
    fn test_write_rejects_mismatched_kind() {
        let layout = layout_of(
            "struct U { world: mat4x4<f32> }
             @group(0) @binding(0) var<uniform> u: U;",
        );
        let mut shadow = vec![0u8; layout.size() as usize];
        assert!(layout.write(&mut shadow, 0, &UniformValue::Float(1.0)).is_err());
        assert!(layout.write(&mut shadow, 3, &UniformValue::Float(1.0)).is_err());
    }
}
