use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use tessera_geom::{Vec2, Vec3};
use tessera_mesh_cpu::MeshBuildResult;
use tessera_stream::{ChunkCoord, RenderObject, SceneHost, StreamStats, TerrainStreamer};

/// Headless chunk object: remembers what it was given and logs the changes.
#[derive(Debug)]
pub struct LogObject {
    coord: ChunkCoord,
    pub active: bool,
    pub position: Vec3,
    pub mesh_vertices: usize,
    pub mesh_swaps: usize,
    pub has_collider: bool,
}

impl RenderObject for LogObject {
    fn set_active(&mut self, active: bool) {
        self.active = active;
        log::trace!(
            "chunk ({}, {}) {}",
            self.coord.cx,
            self.coord.cz,
            if active { "shown" } else { "hidden" }
        );
    }

    fn set_world_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_mesh(&mut self, mesh: Arc<MeshBuildResult>) {
        self.mesh_vertices = mesh.vertex_count();
        self.mesh_swaps += 1;
    }

    fn set_collider_mesh(&mut self, mesh: Arc<MeshBuildResult>) {
        self.has_collider = true;
        log::debug!(
            "chunk ({}, {}) collider with {} triangles",
            self.coord.cx,
            self.coord.cz,
            mesh.triangle_count()
        );
    }
}

#[derive(Debug, Default)]
pub struct LogHost {
    spawned_by_ring: HashMap<i32, usize>,
}

impl LogHost {
    pub fn spawned(&self) -> usize {
        self.spawned_by_ring.values().sum()
    }

    /// Spawn counts keyed by Chebyshev distance from the origin chunk.
    pub fn spawned_by_ring(&self) -> &HashMap<i32, usize> {
        &self.spawned_by_ring
    }
}

impl SceneHost for LogHost {
    type Object = LogObject;

    fn spawn(&mut self, coord: ChunkCoord) -> LogObject {
        let ring = coord.cx.abs().max(coord.cz.abs());
        *self.spawned_by_ring.entry(ring).or_default() += 1;
        LogObject {
            coord,
            active: false,
            position: Vec3::ZERO,
            mesh_vertices: 0,
            mesh_swaps: 0,
            has_collider: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SimPath {
    pub ticks: u32,
    /// World units per tick.
    pub step: f32,
    /// Degrees, 0 along +x, counter-clockwise.
    pub heading: f32,
    pub tick_interval: Duration,
}

impl SimPath {
    pub fn position(&self, tick: u32) -> Vec2 {
        let rad = self.heading.to_radians();
        Vec2::new(rad.cos(), rad.sin()) * (self.step * tick as f32)
    }
}

/// Walks the viewer along `path`, then keeps ticking in place until all generation work
/// has been applied or `settle_timeout` passes.
pub fn run(
    streamer: &mut TerrainStreamer<LogHost>,
    path: &SimPath,
    settle_timeout: Duration,
) -> StreamStats {
    let start = Instant::now();
    for tick in 0..path.ticks {
        streamer.update(path.position(tick));
        if tick % 50 == 0 {
            let (hq, hi, mq, mi) = streamer.runtime().queue_debug_counts();
            log::debug!(
                "tick {}: height q{} r{}, mesh q{} r{}",
                tick,
                hq,
                hi,
                mq,
                mi
            );
        }
        if !path.tick_interval.is_zero() {
            std::thread::sleep(path.tick_interval);
        }
    }

    let end = path.position(path.ticks.saturating_sub(1));
    let deadline = Instant::now() + settle_timeout;
    loop {
        streamer.update(end);
        if streamer.is_settled() {
            break;
        }
        if Instant::now() >= deadline {
            log::warn!("simulation stopped before generation settled");
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    let stats = streamer.stats();
    log::info!(
        "simulated {} ticks in {:.2?}: {} chunks, {} visible, {} rescans, {} mesh swaps",
        path.ticks,
        start.elapsed(),
        stats.chunks,
        stats.visible,
        stats.rescans,
        stats.meshes_applied
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_mesh_cpu::MeshSettings;
    use tessera_runtime::{TerrainGenerator, TerrainSource};
    use tessera_stream::{LodLevel, StreamSettings};
    use tessera_world::HeightMapSettings;

    #[test]
    fn path_heads_along_the_given_angle() {
        let p = SimPath {
            ticks: 10,
            step: 2.0,
            heading: 90.0,
            tick_interval: Duration::ZERO,
        };
        let at = p.position(5);
        assert!(at.x.abs() < 1e-4);
        assert!((at.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn short_walk_settles_with_every_visible_chunk_meshed() {
        let source: Arc<dyn TerrainSource> = Arc::new(TerrainGenerator::new(
            HeightMapSettings::default(),
            MeshSettings {
                chunk_size_index: 0,
                ..MeshSettings::default()
            },
        ));
        let settings = StreamSettings {
            lods: vec![LodLevel::new(0, 60.0, true), LodLevel::new(2, 150.0, false)],
            ..StreamSettings::default()
        };
        let mut streamer = TerrainStreamer::with_source(LogHost::default(), source, settings).unwrap();
        let path = SimPath {
            ticks: 40,
            step: 3.0,
            heading: 0.0,
            tick_interval: Duration::ZERO,
        };
        let stats = run(&mut streamer, &path, Duration::from_secs(30));
        assert!(streamer.is_settled());
        assert_eq!(stats.pending_height, 0);
        assert_eq!(stats.pending_mesh, 0);
        assert!(stats.visible > 0);
        assert_eq!(streamer.host().spawned(), stats.chunks);
        assert_eq!(streamer.host().spawned_by_ring().get(&0), Some(&1));
        for coord in streamer.visible_chunks() {
            let obj = streamer.chunk(coord).unwrap().object();
            assert!(obj.active);
            assert!(obj.mesh_vertices > 0);
        }
        let here = ChunkCoord::containing(path.position(path.ticks - 1), streamer.mesh_world_size());
        assert!(streamer.chunk(here).unwrap().object().has_collider);
    }
}
