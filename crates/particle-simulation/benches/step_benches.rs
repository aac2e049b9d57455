use criterion::{criterion_group, criterion_main, Criterion};
use glam::Vec2;
use particle_physics::{InjectionBlock, RingCursor};
use particle_simulation::{CpuBackend, ParticleBackend, SimulationConfig, SlotPair};

fn bench_step(c: &mut Criterion) {
    let config = SimulationConfig::default();
    let mut cpu = CpuBackend::new(config).unwrap();

    // Half-full grid so the kernel is not just moving zeros
    let mut rng = rand::rng();
    let mut cursor = RingCursor::new();
    while cursor.active_count() < config.capacity() / 2 {
        let block = InjectionBlock::generate(&mut rng, Vec2::new(0.0, 0.5), config.block_size);
        cpu.write_block(SlotPair::for_tick(0).read, cursor.address(config.grid_side), &block)
            .unwrap();
        cursor.advance(config.block_size);
    }

    let mut tick = 0u64;
    c.bench_function("cpu_step_262k", |b| {
        b.iter(|| {
            cpu.step(SlotPair::for_tick(tick)).unwrap();
            tick += 1;
        })
    });
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
