mod common;

use std::fs;

use lumen3d::gfx::engine::{EngineConfig, EngineError, GraphicsEngine, ShaderDirectory};
use lumen3d::gfx::geometry::generate_plane;
use lumen3d::gfx::scene::Object3D;
use lumen3d::gpu::recording::RecordingSurfaces;
use lumen3d::gpu::{AcquireError, UniformValue};
use lumen3d::math::{ClipDepth, Matrix4x4};

#[test]
fn test_engine_from_named_surface() {
    let mut surfaces = RecordingSurfaces::new().with_surface("glCanvas", 1024, 512);
    let engine = GraphicsEngine::from_surface(&mut surfaces, "glCanvas", EngineConfig::default()).unwrap();

    assert_eq!((engine.width(), engine.height()), (1024, 512));
    assert_eq!(engine.aspect_ratio(), 0.5);
    assert_eq!(engine.context().current_viewport(), (0, 0, 1024, 512));
}

#[test]
fn test_missing_surface_and_context_are_fatal() {
    let mut surfaces = RecordingSurfaces::new().with_unavailable_context("headless");

    let missing = GraphicsEngine::from_surface(&mut surfaces, "glCanvas", EngineConfig::default());
    assert!(matches!(
        missing,
        Err(EngineError::Acquire(AcquireError::SurfaceNotFound(ref name))) if name == "glCanvas"
    ));

    let unavailable = GraphicsEngine::from_surface(&mut surfaces, "headless", EngineConfig::default());
    assert!(matches!(
        unavailable,
        Err(EngineError::Acquire(AcquireError::ContextUnavailable(_)))
    ));
}

#[test]
fn test_projection_follows_surface_depth_range() {
    let mut surfaces = RecordingSurfaces::new()
        .with_surface("offscreen", 800, 600)
        .with_clip_depth(ClipDepth::ZeroToOne);
    let engine = GraphicsEngine::from_surface(&mut surfaces, "offscreen", EngineConfig::default()).unwrap();

    let expected = Matrix4x4::perspective_with_depth(0.75, 90.0, 100.0, 0.1, ClipDepth::ZeroToOne);
    assert_eq!(engine.projection(90.0, 100.0, 0.1), expected);
}

#[test]
fn test_program_from_shader_directory() {
    let root = std::env::temp_dir().join(format!("lumen3d-surfaces-{}", std::process::id()));
    fs::create_dir_all(root.join("flat")).unwrap();
    fs::write(root.join("flat/flat.vert"), common::VERTEX).unwrap();
    fs::write(root.join("flat/flat.frag"), common::FRAGMENT).unwrap();

    let mut engine = common::engine();
    let shaders = ShaderDirectory::new(&root);
    let program = engine
        .create_program_from(&shaders, "flat/flat.vert", "flat/flat.frag")
        .unwrap();
    engine.use_program(program);

    let plane = engine.load_mesh(generate_plane(4.0, Object3D::default())).unwrap();
    engine.set_uniform_tagged("matViewProj", "mat4", &Matrix4x4::IDENTITY.to_array());
    engine.draw_mesh(&plane).unwrap();

    assert_eq!(
        engine.context().uniform_value(program, "matViewProj"),
        Some(UniformValue::Mat4(Matrix4x4::IDENTITY.to_array()))
    );
    assert_eq!(engine.context().draw_calls().len(), 1);

    let missing = engine.create_program_from(&shaders, "flat/flat.vert", "flat/missing.frag");
    assert!(matches!(missing, Err(EngineError::ShaderSource(_))));

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn test_bad_tagged_uniform_is_skipped() {
    let mut engine = common::engine();
    let _ = common::load_scene(&mut engine);
    let program = engine.active_program().unwrap();

    engine.set_uniform_tagged("matViewProj", "mat4", &[1.0, 2.0]);
    engine.set_uniform_tagged("matViewProj", "dmat4", &[0.0; 16]);

    assert_eq!(engine.context().uniform_value(program, "matViewProj"), None);
    assert!(engine.context().errors().is_empty());
}
