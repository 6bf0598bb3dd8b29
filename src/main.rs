//! # Headless Chunk Renderer Demo
//!
//! Generates a noise terrain, flies a camera across it and edits random blocks,
//! logging traversal and build statistics along the way. Uses the host-memory
//! buffer device, so no GPU is needed.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json]
//! ```

use cgmath::{Deg, Matrix4, Point3, Rad, Vector3};
use log::{error, info};
use voxel_chunk_graph::{
    config::{GpuCapabilities, RendererConfig},
    engine_state::{
        buffer_state::{BufferDevice, HostBufferState},
        camera_state::{
            camera::{Camera, Projection, OPENGL_TO_WGPU_MATRIX},
            frustum::Frustum,
        },
        rendering::{render_pass::BlockRenderPass, vertex::QuadEncoderRegistry},
        voxels::{
            coord::ColumnCoordinate,
            terrain::{TerrainGenerator, STONE, WATER},
            world::World,
        },
        ChunkRenderer,
    },
    error::Result,
};
use web_time::{Duration, Instant};

const FRAME_COUNT: u32 = 600;
const WORLD_RADIUS: i32 = 12;
const EDITS_PER_FRAME: usize = 2;

fn main() {
    voxel_chunk_graph::init_logger();

    if let Err(e) = run() {
        error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => RendererConfig::load(path)?,
        None => RendererConfig::default(),
    };

    let generator = TerrainGenerator::new(fastrand::u32(..));
    let mut world = World::new();
    let start = Instant::now();
    for x in -WORLD_RADIUS..=WORLD_RADIUS {
        for z in -WORLD_RADIUS..=WORLD_RADIUS {
            generator.generate_column(&mut world, ColumnCoordinate::new(x, z));
        }
    }
    info!(
        "Generated {} columns in {:?}",
        (2 * WORLD_RADIUS + 1).pow(2),
        start.elapsed()
    );

    let encoders = QuadEncoderRegistry::with_defaults()?;
    let mut renderer = ChunkRenderer::new(
        world,
        HostBufferState::new(),
        config,
        GpuCapabilities::all(),
        &encoders,
    )?;

    let projection = Projection::new(1280, 720, Deg(70.0), 0.1, 1000.0);
    let height = generator.surface_height(0, 0) as f32 + 12.0;
    let mut camera = Camera::new(Point3::new(0.5, height, 0.5), Deg(0.0), Deg(-15.0));
    let mut frame_time = Duration::ZERO;

    for frame in 1..=FRAME_COUNT {
        camera.translate(Vector3::new(0.25, 0.0, 0.1));
        camera.rotate(Rad(0.004), Rad(0.0));

        for _ in 0..EDITS_PER_FRAME {
            let x = camera.position.x as i32 + fastrand::i32(-24..=24);
            let z = camera.position.z as i32 + fastrand::i32(-24..=24);
            let y = generator.surface_height(x, z) + 1;
            let state = if fastrand::bool() { STONE } else { WATER };
            renderer.world_mut().set_block(x, y, z, state);
            renderer.schedule_rebuild_for_block(x, y, z, fastrand::u8(..) < 32);
        }

        let view_projection: Matrix4<f32> =
            OPENGL_TO_WGPU_MATRIX * projection.calc_matrix() * camera.calc_matrix();
        let frustum = Frustum::from_view_projection(&view_projection);

        let start = Instant::now();
        renderer.update(&camera, &frustum, frame, false);
        let draws: usize = BlockRenderPass::ALL
            .iter()
            .map(|pass| {
                renderer
                    .render_pass(*pass)
                    .iter()
                    .map(|batch| batch.draws.len())
                    .sum::<usize>()
            })
            .sum();
        frame_time += start.elapsed();

        if frame % 60 == 0 {
            info!(
                "Frame {}: {} | {} draws | {} global block entities | {:?} avg update",
                frame,
                renderer.debug_string(),
                draws,
                renderer.global_block_entities().count(),
                frame_time / 60
            );
            info!(
                "Buffers: {} live, {} bytes allocated, {} bytes used",
                renderer.device().buffer_count(),
                renderer.device().total_allocated_memory(),
                renderer.device().total_used_memory()
            );
            frame_time = Duration::ZERO;
        }
    }

    renderer.destroy();
    Ok(())
}
