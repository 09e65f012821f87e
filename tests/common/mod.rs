#![allow(dead_code)]

use lumen3d::gfx::engine::{EngineConfig, GraphicsEngine, LoadedMesh};
use lumen3d::gfx::geometry::{generate_cube, generate_plane};
use lumen3d::gfx::scene::Object3D;
use lumen3d::gpu::recording::RecordingContext;
use lumen3d::math::Vector3;

pub const VERTEX: &str = "#version 300 es
    precision mediump float;

    struct Material {
        vec3 ambient;
        vec3 diffuse;
        vec3 specular;
        float shininess;
    };

    in vec3 vertexPosition;
    uniform mat4 matWorld;
    uniform mat4 matViewProj;
    uniform Material material;

    out vec3 fragmentColor;

    void main() {
        fragmentColor = material.ambient + material.diffuse;
        gl_Position = matViewProj * matWorld * vec4(vertexPosition, 1.0);
    }";

pub const FRAGMENT: &str = "#version 300 es
    precision mediump float;

    in vec3 fragmentColor;
    out vec4 outputColor;

    void main() {
        outputColor = vec4(fragmentColor, 1.0);
    }";

pub fn engine() -> GraphicsEngine<RecordingContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    GraphicsEngine::new(RecordingContext::new(), 800, 600, EngineConfig::default())
}

/// The plane and two cubes of the orbit scene
pub fn load_scene(engine: &mut GraphicsEngine<RecordingContext>) -> Vec<LoadedMesh> {
    engine.load_program(VERTEX, FRAGMENT).unwrap();
    engine
        .load_meshes([
            generate_plane(10.0, Object3D::default()),
            generate_cube(
                1.0,
                Object3D::new(Vector3::new(0.0, 0.5, 0.0), Vector3::new(0.0, 45.0, 0.0), Vector3::ONE),
            ),
            generate_cube(
                1.0,
                Object3D::new(Vector3::new(0.0, 0.5, 2.0), Vector3::new(0.0, 30.0, 0.0), Vector3::splat(0.5)),
            ),
        ])
        .unwrap()
}
