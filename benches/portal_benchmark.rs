// benches/portal_benchmark.rs
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Quat, Vec3};
use rand::Rng;

use portal_engine::demo_scene::create_corridor_scene;
use portal_engine::engine_lib::{Camera, PortalConfig, PortalRenderer, Pose};
use portal_engine::rendering_lib::FrameRecorder;

/// Viewer poses scattered in front of the demo portal, looking roughly at it.
fn random_viewer_poses(rng: &mut impl Rng, count: usize) -> Vec<Pose> {
    (0..count)
        .map(|_| {
            let position = Vec3::new(rng.gen_range(-1.5..2.5), rng.gen_range(1.0..2.0), rng.gen_range(-1.5..1.5));
            let yaw = std::f32::consts::FRAC_PI_2 + rng.gen_range(-0.4..0.4);
            let pitch = rng.gen_range(-0.2..0.2);
            Pose::new(position, Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch))
        })
        .collect()
}

fn portal_frame_benchmark_fn(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    const NUM_BENCH_POSES: usize = 100;
    let poses = random_viewer_poses(&mut rng, NUM_BENCH_POSES);

    let mut group = c.benchmark_group("PortalFrame");
    for depth in [1u32, 3, 10] {
        let mut demo = create_corridor_scene();
        let camera = Camera::new(75.0, 16.0 / 9.0, 0.1, 100.0);
        let mut renderer = PortalRenderer::new(camera, PortalConfig::new(true, depth));
        if let Err(e) = renderer.create_portal(
            &mut demo.scene,
            demo.portal.width,
            demo.portal.height,
            demo.portal.surface_transform,
            demo.portal.reference_transform,
        ) {
            panic!("demo portal rejected: {e}");
        }
        let mut recorder = FrameRecorder::new(true);

        group.bench_with_input(BenchmarkId::new("record_frame", depth), &depth, |b, _| {
            let mut pose_iter = poses.iter().cycle();
            b.iter(|| {
                if let Some(pose) = pose_iter.next() {
                    renderer.main_camera_mut().set_pose(*pose);
                }
                recorder.begin_frame();
                let report = renderer.render(black_box(&mut recorder), black_box(&demo.scene));
                black_box(report.levels_rendered())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, portal_frame_benchmark_fn);
criterion_main!(benches);
