//! WGSL interface reflection
//!
//! The wgpu backend exposes GL-style name lookups, so it needs to know what
//! a WGSL module declares: the vertex inputs (`@location(n) name: type`,
//! directly as entry point parameters or as members of an input struct),
//! the entry point names, and the uniform block bound at `@group(0)
//! @binding(0)`. This is a declaration scanner, not a WGSL parser; wgpu
//! validates the module itself.

use std::collections::HashMap;

use crate::gpu::source::{find_keyword, is_identifier, matching_close, split_top_level};

/// WGSL types the backend can feed from attributes or uniforms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WgslType {
    F32,
    I32,
    U32,
    Vec2F,
    Vec3F,
    Vec4F,
    Vec2I,
    Vec3I,
    Vec4I,
    Vec2U,
    Vec3U,
    Vec4U,
    Mat3F,
    Mat4F,
    /// A user declared struct, by name
    Struct(String),
}

impl WgslType {
    pub fn parse(ty: &str) -> Option<WgslType> {
        let compact: String = ty.chars().filter(|c| !c.is_whitespace()).collect();
        Some(match compact.as_str() {
            "f32" => WgslType::F32,
            "i32" => WgslType::I32,
            "u32" => WgslType::U32,
            "vec2<f32>" | "vec2f" => WgslType::Vec2F,
            "vec3<f32>" | "vec3f" => WgslType::Vec3F,
            "vec4<f32>" | "vec4f" => WgslType::Vec4F,
            "vec2<i32>" | "vec2i" => WgslType::Vec2I,
            "vec3<i32>" | "vec3i" => WgslType::Vec3I,
            "vec4<i32>" | "vec4i" => WgslType::Vec4I,
            "vec2<u32>" | "vec2u" => WgslType::Vec2U,
            "vec3<u32>" | "vec3u" => WgslType::Vec3U,
            "vec4<u32>" | "vec4u" => WgslType::Vec4U,
            "mat3x3<f32>" | "mat3x3f" => WgslType::Mat3F,
            "mat4x4<f32>" | "mat4x4f" => WgslType::Mat4F,
            other if is_identifier(other) => WgslType::Struct(other.to_string()),
            _ => return None,
        })
    }

    /// Scalar component count for vector and scalar types
    pub fn components(&self) -> Option<u32> {
        match self {
            WgslType::F32 | WgslType::I32 | WgslType::U32 => Some(1),
            WgslType::Vec2F | WgslType::Vec2I | WgslType::Vec2U => Some(2),
            WgslType::Vec3F | WgslType::Vec3I | WgslType::Vec3U => Some(3),
            WgslType::Vec4F | WgslType::Vec4I | WgslType::Vec4U => Some(4),
            _ => None,
        }
    }
}

/// A struct declaration, members in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: WgslType,
    pub location: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
    pub ty: WgslType,
}

/// The `var<uniform>` at group 0, binding 0
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlockDecl {
    pub variable: String,
    pub struct_name: String,
}

/// Everything the backend needs to know about one module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderInterface {
    pub vertex_entry: Option<String>,
    pub fragment_entry: Option<String>,
    pub vertex_inputs: Vec<VertexInput>,
    pub uniform_block: Option<UniformBlockDecl>,
    pub structs: HashMap<String, StructDecl>,
}

impl ShaderInterface {
    /// Scans comment-free WGSL `source`.
    ///
    /// Fails for uniform bindings outside group 0 binding 0 and for
    /// malformed declarations the scanner cannot make sense of.
    pub fn reflect(source: &str) -> Result<ShaderInterface, String> {
        let structs = parse_structs(source)?;
        let vertex_entry = entry_point(source, "@vertex");
        let fragment_entry = entry_point(source, "@fragment");

        let vertex_inputs = match &vertex_entry {
            Some((_, params)) => vertex_inputs(params, &structs)?,
            None => Vec::new(),
        };

        Ok(ShaderInterface {
            vertex_entry: vertex_entry.map(|(name, _)| name),
            fragment_entry: fragment_entry.map(|(name, _)| name),
            vertex_inputs,
            uniform_block: uniform_block(source)?,
            structs,
        })
    }

    pub fn uniform_struct(&self) -> Option<&StructDecl> {
        let block = self.uniform_block.as_ref()?;
        self.structs.get(&block.struct_name)
    }
}

/// Splits `@location(0) @interpolate(flat) name` into its location and the
/// remaining text
fn take_attributes(decl: &str) -> Result<(Option<u32>, bool, &str), String> {
    let mut rest = decl.trim();
    let mut location = None;
    let mut builtin = false;
    while let Some(after_at) = rest.strip_prefix('@') {
        let name_end = after_at
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after_at.len());
        let name = &after_at[..name_end];
        let mut after = after_at[name_end..].trim_start();
        let mut argument = None;
        if after.starts_with('(') {
            let close = matching_close(after, 0, '(', ')')
                .ok_or_else(|| format!("unterminated attribute @{name}"))?;
            argument = Some(after[1..close].trim());
            after = &after[close + 1..];
        }
        match name {
            "location" => {
                let value = argument.unwrap_or_default();
                location = Some(
                    value
                        .trim_end_matches('u')
                        .parse()
                        .map_err(|_| format!("invalid location \"{value}\""))?,
                );
            }
            "builtin" => builtin = true,
            _ => {}
        }
        rest = after.trim_start();
    }
    Ok((location, builtin, rest))
}

/// Parses `name: type`
fn name_and_type(decl: &str) -> Result<(String, WgslType), String> {
    let (name, ty) = decl
        .split_once(':')
        .ok_or_else(|| format!("expected \"name: type\", found \"{decl}\""))?;
    let name = name.trim();
    if !is_identifier(name) {
        return Err(format!("invalid identifier \"{name}\""));
    }
    let ty = WgslType::parse(ty).ok_or_else(|| format!("unsupported type \"{}\"", ty.trim()))?;
    Ok((name.to_string(), ty))
}

fn parse_structs(source: &str) -> Result<HashMap<String, StructDecl>, String> {
    let mut structs = HashMap::new();
    let mut rest = source;
    while let Some(start) = find_keyword(rest, "struct") {
        let after = &rest[start + "struct".len()..];
        let open = after.find('{').ok_or("struct without a body")?;
        let close = matching_close(after, open, '{', '}').ok_or("unterminated struct body")?;
        let name = after[..open].trim().to_string();

        let mut members = Vec::new();
        for member in split_top_level(&after[open + 1..close]) {
            let (location, _, decl) = take_attributes(member)?;
            let (member_name, ty) = name_and_type(decl)?;
            members.push(Member {
                name: member_name,
                ty,
                location,
            });
        }
        structs.insert(name.clone(), StructDecl { name, members });
        rest = &after[close + 1..];
    }
    Ok(structs)
}

/// Name and parameter list of the function following `stage_attribute`
fn entry_point<'a>(source: &'a str, stage_attribute: &str) -> Option<(String, &'a str)> {
    let start = source.find(stage_attribute)? + stage_attribute.len();
    let after = &source[start..];
    let fn_start = find_keyword(after, "fn")? + 2;
    let after_fn = &after[fn_start..];
    let open = after_fn.find('(')?;
    let name = after_fn[..open].trim().to_string();
    let close = matching_close(after_fn, open, '(', ')')?;
    Some((name, &after_fn[open + 1..close]))
}

fn vertex_inputs(params: &str, structs: &HashMap<String, StructDecl>) -> Result<Vec<VertexInput>, String> {
    let mut inputs = Vec::new();
    for param in split_top_level(params) {
        let (location, builtin, decl) = take_attributes(param)?;
        if builtin {
            continue;
        }
        let (name, ty) = name_and_type(decl)?;
        match (location, &ty) {
            (Some(location), _) => inputs.push(VertexInput { name, location, ty }),
            (None, WgslType::Struct(struct_name)) => {
                let decl = structs
                    .get(struct_name)
                    .ok_or_else(|| format!("unknown input struct \"{struct_name}\""))?;
                inputs.extend(decl.members.iter().filter_map(|member| {
                    Some(VertexInput {
                        name: member.name.clone(),
                        location: member.location?,
                        ty: member.ty.clone(),
                    })
                }));
            }
            (None, _) => return Err(format!("vertex input \"{name}\" has no @location")),
        }
    }
    inputs.sort_by_key(|input| input.location);
    Ok(inputs)
}

fn uniform_block(source: &str) -> Result<Option<UniformBlockDecl>, String> {
    let Some(position) = source.find("var<uniform>") else {
        return Ok(None);
    };

    // attributes sit on the same statement, before the `var`
    let statement_start = source[..position]
        .rfind(|c| c == ';' || c == '}')
        .map_or(0, |i| i + 1);
    let attributes = &source[statement_start..position];
    let group = attribute_value(attributes, "@group");
    let binding = attribute_value(attributes, "@binding");
    if group != Some(0) || binding != Some(0) {
        return Err("uniform blocks must be declared at @group(0) @binding(0)".to_string());
    }

    let after = &source[position + "var<uniform>".len()..];
    let end = after.find(';').ok_or("unterminated uniform declaration")?;
    let (variable, ty) = name_and_type(&after[..end])?;
    match ty {
        WgslType::Struct(struct_name) => Ok(Some(UniformBlockDecl {
            variable,
            struct_name,
        })),
        _ => Err("the uniform binding must have a struct type".to_string()),
    }
}

fn attribute_value(attributes: &str, name: &str) -> Option<u32> {
    let start = attributes.find(name)? + name.len();
    let after = attributes[start..].trim_start().strip_prefix('(')?;
    let close = after.find(')')?;
    after[..close].trim().trim_end_matches('u').parse().ok()
}
