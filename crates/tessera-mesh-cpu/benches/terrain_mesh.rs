use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use tessera_geom::Vec2;
use tessera_mesh_cpu::{MeshSettings, build_terrain_mesh};
use tessera_world::{HeightMapSettings, NormalizeMode, generate_height_map};

fn bench_build_terrain_mesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_terrain_mesh");
    let mesh = MeshSettings {
        chunk_size_index: 8,
        ..MeshSettings::default()
    };
    let mut height = HeightMapSettings {
        height_multiplier: 40.0,
        ..HeightMapSettings::default()
    };
    height.noise.normalize_mode = NormalizeMode::Global;
    let n = mesh.num_verts_per_line();
    let field = generate_height_map(n, n, &height, Vec2::ZERO, None);

    for lod in [0u8, 2, 4] {
        group.bench_function(format!("smooth_241_lod{lod}"), |b| {
            b.iter(|| {
                let out = build_terrain_mesh(black_box(&field), &mesh, lod);
                black_box(out.vertex_count());
            })
        });
    }
    let flat = MeshSettings {
        use_flat_shading: true,
        flat_chunk_size_index: 2,
        ..mesh.clone()
    };
    let n = flat.num_verts_per_line();
    let flat_field = generate_height_map(n, n, &height, Vec2::ZERO, None);
    group.bench_function("flat_97_lod0", |b| {
        b.iter(|| {
            let out = build_terrain_mesh(black_box(&flat_field), &flat, 0);
            black_box(out.vertex_count());
        })
    });
    group.finish();
}

fn bench_height_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_height_map");
    group.measurement_time(Duration::from_secs(5));
    let height = HeightMapSettings::default();
    group.bench_function("241x241", |b| {
        b.iter(|| {
            let f = generate_height_map(241, 241, black_box(&height), Vec2::ZERO, None);
            black_box(f.max_value());
        })
    });
    group.finish();
}

criterion_group!(benches, bench_build_terrain_mesh, bench_height_map);
criterion_main!(benches);
