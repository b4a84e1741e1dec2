//! Benchmarks for the CPU particle engine and the controller tick.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use ptcl_editor::engine::{EmitterDef, EmitterSetDef};
use ptcl_editor::{
    CpuParticleEngine, EffectResource, EmitterSetController, EngineConfig, ParticleEngine,
    RenderParams,
};

fn resource(emitters: usize, rate: f32) -> EffectResource {
    EffectResource {
        emitter_sets: vec![EmitterSetDef {
            name: "Bench".into(),
            emitters: (0..emitters)
                .map(|i| EmitterDef {
                    name: format!("Emitter{}", i),
                    rate,
                    emit_frames: 0,
                    particle_life: 120,
                    velocity: [0.0, 1.0, 0.0],
                    spread: 0.5,
                    gravity: [0.0, -0.01, 0.0],
                    ..Default::default()
                })
                .collect(),
        }],
    }
}

fn warm_controller(
    emitters: usize,
    rate: f32,
    particle_num: u32,
) -> EmitterSetController<CpuParticleEngine> {
    let mut engine = CpuParticleEngine::new(EngineConfig {
        particle_num,
        ..Default::default()
    });
    engine.entry_resource(resource(emitters, rate));
    let mut controller = EmitterSetController::new(engine, Vec3::new(6.0, 6.0, 4.0));
    // Single emitter set, the handle always exists.
    let _ = controller.select_emitter_set(0);
    for _ in 0..150 {
        step(&mut controller);
    }
    controller
}

fn step(controller: &mut EmitterSetController<CpuParticleEngine>) {
    let engine = controller.engine_mut();
    engine.begin_frame();
    engine.swap_buffers();
    engine.calc_emitters();
    engine.calc_particles(true);
    let _ = controller.tick();
    controller.engine_mut().calc_all(true);
}

fn bench_simulation_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_step");

    for particle_num in [2048u32, 16384, 65536] {
        group.bench_with_input(BenchmarkId::from_parameter(particle_num), &particle_num, |b, &n| {
            let mut controller = warm_controller(8, n as f32 / 960.0, n);
            b.iter(|| {
                step(&mut controller);
                black_box(controller.engine().particle_count())
            })
        });
    }

    group.finish();
}

fn bench_render_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_pass");
    let params = RenderParams {
        projection: glam::Mat4::orthographic_rh(-640.0, 640.0, -360.0, 360.0, 0.0, 1000.0),
        view: glam::Mat4::IDENTITY,
        camera_position: Vec3::ZERO,
        near: 0.0,
        far: 1000.0,
    };

    for emitters in [1usize, 8, 32] {
        group.bench_with_input(BenchmarkId::new("emitters", emitters), &emitters, |b, &n| {
            let mut controller = warm_controller(n, 4.0, 16384);
            b.iter(|| {
                let engine = controller.engine_mut();
                engine.begin_render(&params);
                for emitter in engine.live_emitters() {
                    engine.render_emitter(emitter, true);
                }
                black_box(engine.end_render())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_simulation_step, bench_render_pass);
criterion_main!(benches);
