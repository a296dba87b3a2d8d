use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tessera_geom::{Vec2, Vec3};
use tessera_mesh_cpu::{MeshBuildResult, MeshSettings, build_terrain_mesh};
use tessera_runtime::{Runtime, TerrainGenerator, TerrainSource};
use tessera_stream::{
    ChunkCoord, LodLevel, MAX_WINDOW_RADIUS, RenderObject, SceneHost, StreamSettings,
    TerrainStreamer, select_lod,
};
use tessera_world::{FieldGrid, HeightField, HeightMapSettings};

const CHUNK: f32 = 46.0;

/// Flat fields whose value identifies the chunk; counts every job it runs.
struct CountingSource {
    mesh: MeshSettings,
    heights: Mutex<HashMap<(i32, i32), usize>>,
    meshes: Mutex<HashMap<(i32, u8), usize>>,
}

impl CountingSource {
    fn new() -> Self {
        Self {
            mesh: MeshSettings {
                chunk_size_index: 0,
                ..MeshSettings::default()
            },
            heights: Mutex::new(HashMap::new()),
            meshes: Mutex::new(HashMap::new()),
        }
    }

    fn mesh_calls(&self) -> usize {
        self.meshes.lock().unwrap().values().sum()
    }

    fn mesh_calls_for(&self, coord: ChunkCoord, lod: u8) -> usize {
        let key = (chunk_id(coord), lod);
        self.meshes.lock().unwrap().get(&key).copied().unwrap_or(0)
    }
}

fn chunk_id(c: ChunkCoord) -> i32 {
    c.cx * 1000 + c.cz
}

impl TerrainSource for CountingSource {
    fn mesh_settings(&self) -> &MeshSettings {
        &self.mesh
    }

    fn height_map(&self, sample_center: Vec2) -> HeightField {
        let cx = (sample_center.x / CHUNK).round() as i32;
        let cz = (sample_center.y / CHUNK).round() as i32;
        *self.heights.lock().unwrap().entry((cx, cz)).or_default() += 1;
        let n = self.mesh.num_verts_per_line();
        let id = chunk_id(ChunkCoord::new(cx, cz)) as f32;
        HeightField::from_grid(FieldGrid::from_values(n, n, vec![id; n * n]).unwrap())
    }

    fn mesh(&self, field: &HeightField, lod: u8) -> MeshBuildResult {
        let id = field.get(0, 0) as i32;
        *self.meshes.lock().unwrap().entry((id, lod)).or_default() += 1;
        build_terrain_mesh(field, &self.mesh, lod)
    }
}

#[derive(Debug, Default)]
struct Probe {
    active: bool,
    position: Vec3,
    mesh_sets: usize,
    collider_sets: usize,
}

impl RenderObject for Probe {
    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn set_world_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_mesh(&mut self, _mesh: Arc<MeshBuildResult>) {
        self.mesh_sets += 1;
    }

    fn set_collider_mesh(&mut self, _mesh: Arc<MeshBuildResult>) {
        self.collider_sets += 1;
    }
}

#[derive(Default)]
struct ProbeHost {
    spawned: usize,
}

impl SceneHost for ProbeHost {
    type Object = Probe;

    fn spawn(&mut self, _coord: ChunkCoord) -> Probe {
        self.spawned += 1;
        Probe::default()
    }
}

type Streamer = TerrainStreamer<ProbeHost>;

fn settings() -> StreamSettings {
    StreamSettings {
        lods: vec![
            LodLevel::new(0, 100.0, true),
            LodLevel::new(1, 300.0, false),
            LodLevel::new(2, 450.0, false),
        ],
        ..StreamSettings::default()
    }
}

fn streamer() -> (Streamer, Arc<CountingSource>) {
    let source = Arc::new(CountingSource::new());
    let dyn_source: Arc<dyn TerrainSource> = source.clone();
    let runtime = Arc::new(Runtime::with_workers(dyn_source, 2, 2).unwrap());
    (TerrainStreamer::new(ProbeHost::default(), runtime, settings()), source)
}

fn settle(s: &mut Streamer, viewer: Vec2) {
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        s.update(viewer);
        if s.is_settled() {
            return;
        }
        assert!(Instant::now() < deadline, "streamer never settled");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn assert_visible_set_exact(s: &Streamer) {
    let viewer = s.viewer();
    let max = s.settings().max_view_distance();
    for chunk in s.chunks() {
        let d = chunk.bounds().distance(viewer);
        let expected = d <= max;
        assert_eq!(chunk.is_visible(), expected, "{:?} at {d}", chunk.coord());
        assert_eq!(s.is_visible(chunk.coord()), expected);
        assert_eq!(chunk.object().active, expected);
        if expected {
            assert_eq!(chunk.current_lod(), select_lod(&s.settings().lods, d));
        }
    }
    assert_eq!(s.stats().visible, s.visible_chunks().count());
}

#[test]
fn settled_visible_set_matches_view_distance() {
    let (mut s, _) = streamer();
    settle(&mut s, Vec2::ZERO);
    assert_eq!(s.mesh_world_size(), CHUNK);
    // ceil(450 / 46) = 10 chunks each way.
    assert_eq!(s.stats().chunks, 21 * 21);
    assert_eq!(s.host().spawned, 21 * 21);
    assert_visible_set_exact(&s);

    settle(&mut s, Vec2::new(300.0, -120.0));
    assert_visible_set_exact(&s);
    let stats = s.stats();
    assert_eq!(stats.pending_height, 0);
    assert_eq!(stats.pending_mesh, 0);
    assert_eq!(stats.rescans, 2);
}

#[test]
fn lod_slots_follow_nearest_edge_distance() {
    let (mut s, _) = streamer();
    settle(&mut s, Vec2::ZERO);
    let slot = |cx| s.chunk(ChunkCoord::new(cx, 0)).and_then(|c| c.current_lod());
    assert_eq!(slot(0), Some(0));
    assert_eq!(slot(2), Some(0)); // edge at 69
    assert_eq!(slot(5), Some(1)); // edge at 207
    assert_eq!(slot(7), Some(1)); // edge at 299
    assert_eq!(slot(8), Some(2)); // edge at 345
    assert_eq!(slot(10), Some(2)); // edge at 437
    assert!(!s.chunk(ChunkCoord::new(10, 3)).unwrap().is_visible());
}

#[test]
fn chunks_are_placed_on_the_grid() {
    let (mut s, _) = streamer();
    settle(&mut s, Vec2::ZERO);
    let c = s.chunk(ChunkCoord::new(-2, 3)).unwrap();
    assert_eq!(c.object().position, Vec3::new(-92.0, 0.0, 138.0));
    assert_eq!(c.sample_center(), Vec2::new(-92.0, 138.0));
    assert_eq!(c.bounds().center, Vec2::new(-92.0, 138.0));
}

#[test]
fn walking_never_duplicates_requests_or_drops_chunks() {
    let (mut s, source) = streamer();
    let mut seen: Vec<ChunkCoord> = Vec::new();
    let mut last_count = 0;
    let path = (0..14).chain((0..14).rev()).map(|i| Vec2::new(i as f32 * 30.0, i as f32 * 7.0));
    for p in path {
        settle(&mut s, p);
        let count = s.stats().chunks;
        assert!(count >= last_count);
        last_count = count;
        for c in &seen {
            assert!(s.chunk(*c).is_some(), "{c:?} evicted");
        }
        seen = s.chunks().map(|c| c.coord()).collect();
        assert_visible_set_exact(&s);
    }
    assert!(source.heights.lock().unwrap().values().all(|&n| n == 1));
    assert!(source.meshes.lock().unwrap().values().all(|&n| n == 1));
    assert_eq!(source.heights.lock().unwrap().len(), s.stats().chunks);
}

#[test]
fn returning_to_a_cached_lod_issues_no_request() {
    let (mut s, source) = streamer();
    settle(&mut s, Vec2::ZERO);
    let probe = ChunkCoord::new(5, 0);
    assert_eq!(s.chunk(probe).unwrap().current_lod(), Some(1));
    assert_eq!(source.mesh_calls_for(probe, 1), 1);

    settle(&mut s, Vec2::new(230.0, 0.0));
    assert_eq!(s.chunk(probe).unwrap().current_lod(), Some(0));
    let calls = source.mesh_calls();
    let sets = s.chunk(probe).unwrap().object().mesh_sets;

    settle(&mut s, Vec2::ZERO);
    assert_eq!(s.chunk(probe).unwrap().current_lod(), Some(1));
    assert_eq!(source.mesh_calls(), calls);
    assert_eq!(s.chunk(probe).unwrap().object().mesh_sets, sets + 1);
}

#[test]
fn collider_is_assigned_once_near_the_viewer() {
    let (mut s, _) = streamer();
    settle(&mut s, Vec2::ZERO);
    let here = s.chunk(ChunkCoord::new(0, 0)).unwrap();
    assert!(here.collider_set());
    assert_eq!(here.object().collider_sets, 1);
    // Nearest edge at 23, outside the 5-unit generation distance.
    assert!(!s.chunk(ChunkCoord::new(1, 0)).unwrap().collider_set());

    for p in [Vec2::new(3.0, 4.0), Vec2::new(-10.0, 2.0), Vec2::new(0.5, 0.5)] {
        settle(&mut s, p);
    }
    assert_eq!(s.chunk(ChunkCoord::new(0, 0)).unwrap().object().collider_sets, 1);

    // Step onto the eastern neighbour's edge: within 5 units of it.
    settle(&mut s, Vec2::new(21.0, 0.0));
    let east = s.chunk(ChunkCoord::new(1, 0)).unwrap();
    assert!(east.collider_set());
    assert_eq!(east.object().collider_sets, 1);
}

#[test]
fn small_moves_do_not_rescan() {
    let (mut s, _) = streamer();
    settle(&mut s, Vec2::ZERO);
    let rescans = s.stats().rescans;
    settle(&mut s, Vec2::new(10.0, 10.0));
    assert_eq!(s.stats().rescans, rescans);
    settle(&mut s, Vec2::new(30.0, 0.0));
    assert_eq!(s.stats().rescans, rescans + 1);
}

fn generator_with_scale(mesh_scale: f32) -> Arc<dyn TerrainSource> {
    Arc::new(TerrainGenerator::new(
        HeightMapSettings::default(),
        MeshSettings {
            chunk_size_index: 0,
            mesh_scale,
            ..MeshSettings::default()
        },
    ))
}

#[test]
fn unusable_mesh_scale_keeps_the_window_bounded() {
    for scale in [0.0, -3.0, f32::NAN] {
        let mut s = TerrainStreamer::with_source(
            ProbeHost::default(),
            generator_with_scale(scale),
            settings(),
        )
        .unwrap();
        assert_eq!(s.mesh_world_size(), CHUNK);
        s.update(Vec2::ZERO);
        assert_eq!(s.stats().chunks, 21 * 21);
        let c = s.chunk(ChunkCoord::new(1, -1)).unwrap();
        assert_eq!(c.sample_center(), Vec2::new(CHUNK, -CHUNK));
    }
}

/// Returns a 3x3 field immediately; for tests that only care about the chunk grid.
struct Trivial {
    mesh: MeshSettings,
}

impl TerrainSource for Trivial {
    fn mesh_settings(&self) -> &MeshSettings {
        &self.mesh
    }

    fn height_map(&self, _sample_center: Vec2) -> HeightField {
        HeightField::from_grid(FieldGrid::new(3, 3))
    }

    fn mesh(&self, _field: &HeightField, _lod: u8) -> MeshBuildResult {
        MeshBuildResult::default()
    }
}

#[test]
fn huge_view_distance_is_capped() {
    let settings = StreamSettings {
        lods: vec![LodLevel::new(0, 1.0e12, true)],
        ..StreamSettings::default()
    };
    let source = Arc::new(Trivial {
        mesh: MeshSettings::default(),
    });
    let mut s = TerrainStreamer::with_source(ProbeHost::default(), source, settings).unwrap();
    s.update(Vec2::ZERO);
    let side = (2 * MAX_WINDOW_RADIUS + 1) as usize;
    assert_eq!(s.stats().chunks, side * side);
}
