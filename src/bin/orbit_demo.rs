//! Orbiting camera over a plane and two cubes, rendered offscreen with wgpu.
//!
//! Usage: `orbit-demo [frames]` (default 240). Set `RUST_LOG=info` for
//! frame statistics.

use anyhow::Context;
use lumen3d::gfx::engine::{EngineConfig, GraphicsEngine, LoadedMesh};
use lumen3d::gfx::geometry::{generate_cube, generate_plane};
use lumen3d::gfx::scene::Object3D;
use lumen3d::gpu::GpuContext;
use lumen3d::math::{Matrix4x4, Vector3};
use lumen3d::wgpu_utils::HeadlessSurfaces;
use lumen3d::{DriverConfig, FrameDriver, FrameHandler};

const SHADER: &str = include_str!("flat.wgsl");
const SURFACE: &str = "offscreen";

const ORBIT_RADIUS: f32 = 6.0;
const ORBIT_HEIGHT: f32 = 3.0;
/// Degrees per second
const ORBIT_SPEED: f32 = 200.0;

struct OrbitScene {
    meshes: Vec<LoadedMesh>,
    projection: Matrix4x4,
    camera_angle: f32,
}

impl OrbitScene {
    fn load<C: GpuContext>(engine: &mut GraphicsEngine<C>) -> anyhow::Result<Self> {
        engine
            .load_program(SHADER, SHADER)
            .context("failed to build the flat shader program")?;

        let meshes = engine.load_meshes([
            generate_plane(10.0, Object3D::default()),
            generate_cube(
                1.0,
                Object3D::new(Vector3::new(0.0, 0.5, 0.0), Vector3::new(0.0, 45.0, 0.0), Vector3::ONE),
            ),
            generate_cube(
                1.0,
                Object3D::new(
                    Vector3::new(0.0, 0.5, 2.0),
                    Vector3::new(0.0, 30.0, 0.0),
                    Vector3::splat(0.5),
                ),
            ),
        ])?;

        Ok(Self {
            meshes,
            projection: engine.projection(90.0, 100.0, 0.1),
            camera_angle: 0.0,
        })
    }
}

impl<C: GpuContext> FrameHandler<C> for OrbitScene {
    fn frame(&mut self, engine: &mut GraphicsEngine<C>, dt: f32) -> anyhow::Result<()> {
        self.camera_angle += dt * ORBIT_SPEED.to_radians();
        let eye = Vector3::new(
            ORBIT_RADIUS * self.camera_angle.sin(),
            ORBIT_HEIGHT,
            ORBIT_RADIUS * self.camera_angle.cos(),
        );
        let view = Matrix4x4::look_at_y_up(eye, Vector3::ZERO);
        engine.set_view_projection(Matrix4x4::multiply(self.projection, view));

        engine.clear()?;
        for mesh in &self.meshes {
            engine.draw_mesh(mesh)?;
        }
        Ok(())
    }

    fn teardown(&mut self, engine: &mut GraphicsEngine<C>) -> anyhow::Result<()> {
        for mesh in self.meshes.drain(..) {
            engine.release_mesh(mesh);
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let frames = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<u64>()
            .with_context(|| format!("invalid frame count \"{arg}\""))?,
        None => 240,
    };

    let mut surfaces = HeadlessSurfaces::new().with_surface(SURFACE, 800, 600);
    let mut engine = GraphicsEngine::from_surface(&mut surfaces, SURFACE, EngineConfig::default())?;
    let mut scene = OrbitScene::load(&mut engine)?;

    let mut driver = FrameDriver::new(DriverConfig::default().with_max_frames(frames).with_target_fps(60));
    let summary = driver.run(&mut engine, &mut scene)?;

    let metrics = &summary.metrics;
    println!(
        "Rendered {} frames in {:.2?} ({:.1} fps, {} draw calls per frame)",
        summary.frames, summary.elapsed, metrics.fps, metrics.draw_calls
    );
    Ok(())
}
