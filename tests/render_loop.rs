mod common;

use anyhow::Context;
use lumen3d::gfx::engine::{EngineState, GraphicsEngine, LoadedMesh};
use lumen3d::gpu::recording::{Command, RecordingContext};
use lumen3d::gpu::UniformValue;
use lumen3d::math::{Matrix4x4, Vector3};
use lumen3d::{DriverConfig, FrameDriver, FrameHandler};

struct OrbitScene {
    meshes: Vec<LoadedMesh>,
    angle: f32,
    frames: u32,
    fail_on_frame: Option<u32>,
    torn_down: bool,
}

impl OrbitScene {
    fn new(meshes: Vec<LoadedMesh>) -> Self {
        Self {
            meshes,
            angle: 0.0,
            frames: 0,
            fail_on_frame: None,
            torn_down: false,
        }
    }

    fn view_projection(&self, engine: &GraphicsEngine<RecordingContext>) -> Matrix4x4 {
        let eye = Vector3::new(6.0 * self.angle.sin(), 3.0, 6.0 * self.angle.cos());
        engine.projection(90.0, 100.0, 0.1) * Matrix4x4::look_at_y_up(eye, Vector3::ZERO)
    }
}

impl FrameHandler<RecordingContext> for OrbitScene {
    fn frame(&mut self, engine: &mut GraphicsEngine<RecordingContext>, dt: f32) -> anyhow::Result<()> {
        if self.fail_on_frame == Some(self.frames) {
            anyhow::bail!("scene lost");
        }
        self.angle += dt * 200f32.to_radians();
        let view_projection = self.view_projection(engine);
        engine.set_view_projection(view_projection);

        engine.clear_viewport(128, 128, 128, 1.0)?;
        for mesh in &self.meshes {
            engine.draw_mesh(mesh).context("draw failed")?;
        }
        self.frames += 1;
        Ok(())
    }

    fn teardown(&mut self, engine: &mut GraphicsEngine<RecordingContext>) -> anyhow::Result<()> {
        for mesh in self.meshes.drain(..) {
            engine.release_mesh(mesh);
        }
        self.torn_down = true;
        Ok(())
    }
}

#[test]
fn test_orbit_scene_renders_and_tears_down() {
    let mut engine = common::engine();
    let meshes = common::load_scene(&mut engine);
    let mut scene = OrbitScene::new(meshes);
    let mut driver = FrameDriver::new(DriverConfig::default().with_max_frames(3));

    let summary = driver.run(&mut engine, &mut scene).unwrap();

    assert_eq!(summary.frames, 3);
    assert_eq!(summary.metrics.draw_calls, 3);
    // plane (6 indices) + two cubes (36 each)
    assert_eq!(summary.metrics.vertex_count, 78);
    assert!(scene.torn_down);

    let ctx = engine.context();
    assert_eq!(ctx.draw_calls().len(), 9);
    assert!(ctx.errors().is_empty());
    assert_eq!(ctx.live_buffers(), 0);
    assert_eq!(ctx.live_vertex_arrays(), 0);
    assert_eq!(ctx.live_programs(), 0);
    assert!(ctx.is_unbound());
}

#[test]
fn test_uniforms_precede_each_draw() {
    let mut engine = common::engine();
    let meshes = common::load_scene(&mut engine);
    let program = engine.active_program().unwrap();
    engine.context_mut().clear_commands();

    let mut scene = OrbitScene::new(meshes);
    scene.frame(&mut engine, 0.0).unwrap();
    assert_eq!(engine.state(), EngineState::Rendering);

    let ctx = engine.context();
    assert_eq!(
        ctx.uniform_value(program, "matViewProj"),
        Some(UniformValue::from(scene.view_projection(&engine)))
    );

    let commands = ctx.commands();
    let mut world_set = false;
    for command in commands {
        match command {
            Command::SetUniform { name, .. } if name == "matWorld" => world_set = true,
            command if command.is_draw() => {
                assert!(world_set, "draw issued before its world matrix");
                world_set = false;
            }
            _ => {}
        }
    }
}

#[test]
fn test_handler_error_stops_loop_and_still_tears_down() {
    let mut engine = common::engine();
    let meshes = common::load_scene(&mut engine);
    let mut scene = OrbitScene::new(meshes);
    scene.fail_on_frame = Some(2);
    let mut driver = FrameDriver::new(DriverConfig::default().with_max_frames(10));

    let err = driver.run(&mut engine, &mut scene).unwrap_err();

    assert!(format!("{err:#}").contains("scene lost"));
    assert_eq!(scene.frames, 2);
    assert!(scene.torn_down);
    assert_eq!(engine.context().live_buffers(), 0);
    assert!(engine.resources().is_empty());
}

#[test]
fn test_draw_failure_surfaces_through_the_driver() {
    let mut engine = common::engine();
    let meshes = common::load_scene(&mut engine);
    engine.context_mut().fail_next_draw("GL_INVALID_OPERATION");
    let mut scene = OrbitScene::new(meshes);
    let mut driver = FrameDriver::new(DriverConfig::default().with_max_frames(10));

    let err = driver.run(&mut engine, &mut scene).unwrap_err();

    assert!(format!("{err:#}").contains("GL_INVALID_OPERATION"));
    assert_eq!(scene.frames, 0);
    assert!(engine.context().is_unbound());
}

#[test]
fn test_stop_from_another_thread() {
    let mut engine = common::engine();
    let meshes = common::load_scene(&mut engine);
    let mut scene = OrbitScene::new(meshes);
    let mut driver = FrameDriver::new(DriverConfig::default().with_target_fps(1000));
    let handle = driver.handle();

    let stopper = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(20));
        handle.stop();
    });
    let summary = driver.run(&mut engine, &mut scene).unwrap();
    stopper.join().unwrap();

    assert!(summary.frames >= 1);
    assert_eq!(summary.frames, scene.frames as u64);
    assert!(scene.torn_down);
}
