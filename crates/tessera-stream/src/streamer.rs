use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use tessera_geom::{Bounds2, Vec2, Vec3};
use tessera_mesh_cpu::MeshBuildResult;
use tessera_runtime::{Runtime, TerrainSource, ThreadPoolBuildError};
use tessera_world::HeightField;

use crate::chunk::TerrainChunk;
use crate::coord::ChunkCoord;
use crate::lod::{StreamSettings, select_lod};
use crate::scene::{RenderObject, SceneHost};

/// Upper bound on the candidate window, in chunks from the viewer's chunk.
pub const MAX_WINDOW_RADIUS: i32 = 256;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub chunks: usize,
    pub visible: usize,
    pub pending_height: usize,
    pub pending_mesh: usize,
    pub rescans: u64,
    pub meshes_applied: u64,
}

/// Owns the chunk grid around a moving viewer.
///
/// All chunk state lives here and is mutated only from [`TerrainStreamer::update`] and the
/// completion callbacks it drains, so everything runs on the owning thread.
pub struct TerrainStreamer<H: SceneHost> {
    host: H,
    runtime: Arc<Runtime<Self>>,
    settings: StreamSettings,
    mesh_world_size: f32,
    mesh_scale: f32,
    chunks_visible_in_view_dst: i32,
    collider_slot: Option<usize>,
    chunks: HashMap<ChunkCoord, TerrainChunk<H::Object>>,
    visible: HashSet<ChunkCoord>,
    viewer: Vec2,
    viewer_at_last_scan: Option<Vec2>,
    stats: StreamStats,
}

impl<H: SceneHost + 'static> TerrainStreamer<H> {
    /// Builds a runtime over `source` sized to the machine.
    pub fn with_source(
        host: H,
        source: Arc<dyn TerrainSource>,
        settings: StreamSettings,
    ) -> Result<Self, ThreadPoolBuildError> {
        let runtime = Arc::new(Runtime::new(source)?);
        Ok(Self::new(host, runtime, settings))
    }

    pub fn new(host: H, runtime: Arc<Runtime<Self>>, settings: StreamSettings) -> Self {
        let settings = settings.normalized();
        let mesh = runtime.source().mesh_settings();
        let mesh_scale = if mesh.mesh_scale.is_finite() && mesh.mesh_scale > 0.0 {
            mesh.mesh_scale
        } else {
            log::warn!(target: "stream", "mesh scale {} unusable; using 1", mesh.mesh_scale);
            1.0
        };
        let cells = mesh.num_verts_per_line().saturating_sub(3).max(1);
        let mesh_world_size = cells as f32 * mesh_scale;
        let radius = (settings.max_view_distance() / mesh_world_size).ceil();
        if radius > MAX_WINDOW_RADIUS as f32 {
            log::warn!(
                target: "stream",
                "view distance needs {} chunks each way; capped at {}",
                radius,
                MAX_WINDOW_RADIUS
            );
        }
        let chunks_visible_in_view_dst = (radius as i32).clamp(0, MAX_WINDOW_RADIUS);
        let collider_slot = settings.collider_slot();
        if settings.lods.is_empty() {
            log::warn!(target: "stream", "empty LOD table; no chunk will become visible");
        }
        log::info!(
            target: "stream",
            "streamer ready: chunk {:.1} units, view {:.1}, window radius {}",
            mesh_world_size,
            settings.max_view_distance(),
            chunks_visible_in_view_dst
        );
        Self {
            host,
            runtime,
            settings,
            mesh_world_size,
            mesh_scale,
            chunks_visible_in_view_dst,
            collider_slot,
            chunks: HashMap::new(),
            visible: HashSet::new(),
            viewer: Vec2::ZERO,
            viewer_at_last_scan: None,
            stats: StreamStats::default(),
        }
    }

    /// One tick: collider refresh, re-scan past the move threshold, then drain completions.
    pub fn update(&mut self, viewer: Vec2) {
        let moved = viewer != self.viewer;
        self.viewer = viewer;
        if moved {
            let visible: Vec<ChunkCoord> = self.visible.iter().copied().collect();
            for coord in visible {
                self.update_collision_mesh(coord);
            }
        }

        let threshold_sq = self.settings.move_threshold * self.settings.move_threshold;
        let rescan = match self.viewer_at_last_scan {
            None => true,
            Some(last) => (last - viewer).length_squared() > threshold_sq,
        };
        if rescan {
            self.viewer_at_last_scan = Some(viewer);
            self.update_visible_chunks();
        }

        let runtime = Arc::clone(&self.runtime);
        runtime.drain(self);
    }

    /// Re-evaluates the previously visible chunks, then every chunk in the candidate window.
    pub fn update_visible_chunks(&mut self) {
        self.stats.rescans += 1;
        let mut already_updated: HashSet<ChunkCoord> = HashSet::with_capacity(self.visible.len());
        let previously_visible: Vec<ChunkCoord> = self.visible.iter().copied().collect();
        for coord in previously_visible {
            already_updated.insert(coord);
            self.update_chunk(coord);
        }

        let center = ChunkCoord::containing(self.viewer, self.mesh_world_size);
        let r = self.chunks_visible_in_view_dst;
        let mut created = 0usize;
        for dx in -r..=r {
            for dz in -r..=r {
                let coord = center.offset(dx, dz);
                if already_updated.contains(&coord) {
                    continue;
                }
                if self.chunks.contains_key(&coord) {
                    self.update_chunk(coord);
                } else {
                    self.create_chunk(coord);
                    created += 1;
                }
            }
        }
        log::info!(
            target: "stream",
            "rescan around ({}, {}): {} created, {} total, {} visible",
            center.cx,
            center.cz,
            created,
            self.chunks.len(),
            self.visible.len()
        );
    }

    fn create_chunk(&mut self, coord: ChunkCoord) {
        let position = coord.world_center(self.mesh_world_size);
        let sample_center = position / self.mesh_scale;
        let bounds = Bounds2::new(position, Vec2::ONE * self.mesh_world_size);

        let mut object = self.host.spawn(coord);
        object.set_world_position(Vec3::new(position.x, 0.0, position.y));
        object.set_active(false);

        self.chunks.insert(
            coord,
            TerrainChunk::new(
                coord,
                bounds,
                sample_center,
                object,
                self.settings.lods.len(),
            ),
        );
        self.stats.pending_height += 1;
        log::debug!(target: "stream", "chunk ({}, {}) created", coord.cx, coord.cz);
        self.runtime
            .request_height_map(sample_center, move |s: &mut Self, field| {
                s.on_height_received(coord, field)
            });
    }

    /// Visibility, LOD choice and mesh swap/request for one chunk. No-op until its height arrives.
    pub fn update_chunk(&mut self, coord: ChunkCoord) {
        let viewer = self.viewer;
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let Some(field) = chunk.height.clone() else {
            return;
        };

        let distance = chunk.bounds.distance(viewer);
        let was_visible = chunk.visible;
        let slot = select_lod(&self.settings.lods, distance)
            .filter(|_| distance <= self.settings.max_view_distance());
        let visible = slot.is_some();

        if let Some(slot) = slot {
            if chunk.current_lod != Some(slot) {
                let lod_mesh = &mut chunk.lod_meshes[slot];
                if let Some(mesh) = &lod_mesh.mesh {
                    chunk.current_lod = Some(slot);
                    chunk.object.set_mesh(Arc::clone(mesh));
                    self.stats.meshes_applied += 1;
                    log::trace!(
                        target: "stream",
                        "chunk ({}, {}) -> lod slot {}",
                        coord.cx,
                        coord.cz,
                        slot
                    );
                } else if !lod_mesh.requested {
                    lod_mesh.requested = true;
                    self.stats.pending_mesh += 1;
                    let lod = self.settings.lods[slot].lod;
                    request_lod_mesh(&self.runtime, coord, slot, lod, field);
                }
            }
        }

        if was_visible != visible {
            chunk.visible = visible;
            chunk.object.set_active(visible);
            if visible {
                self.visible.insert(coord);
            } else {
                self.visible.remove(&coord);
            }
        }
    }

    /// Requests the collider slot's mesh once the viewer is inside that slot's threshold and
    /// assigns it as the collision mesh, once, when the viewer is within the generation distance.
    pub fn update_collision_mesh(&mut self, coord: ChunkCoord) {
        let Some(slot) = self.collider_slot else {
            return;
        };
        let viewer = self.viewer;
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        if chunk.collider_set {
            return;
        }
        let Some(field) = chunk.height.clone() else {
            return;
        };

        let sq_dst = chunk.bounds.sqr_distance(viewer);
        let level = self.settings.lods[slot];
        let lod_mesh = &mut chunk.lod_meshes[slot];
        if sq_dst < level.sqr_visible_distance_threshold() && !lod_mesh.requested {
            lod_mesh.requested = true;
            self.stats.pending_mesh += 1;
            request_lod_mesh(&self.runtime, coord, slot, level.lod, field);
        }

        let cgd = self.settings.collider_generation_distance;
        if sq_dst < cgd * cgd {
            if let Some(mesh) = &lod_mesh.mesh {
                chunk.object.set_collider_mesh(Arc::clone(mesh));
                chunk.collider_set = true;
                log::debug!(target: "stream", "chunk ({}, {}) collider set", coord.cx, coord.cz);
            }
        }
    }

    fn on_height_received(&mut self, coord: ChunkCoord, field: Arc<HeightField>) {
        self.stats.pending_height = self.stats.pending_height.saturating_sub(1);
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            log::warn!(target: "stream", "height for unknown chunk ({}, {})", coord.cx, coord.cz);
            return;
        };
        chunk.height = Some(field);
        self.update_chunk(coord);
    }

    fn on_mesh_received(&mut self, coord: ChunkCoord, slot: usize, mesh: Arc<MeshBuildResult>) {
        self.stats.pending_mesh = self.stats.pending_mesh.saturating_sub(1);
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            log::warn!(target: "stream", "mesh for unknown chunk ({}, {})", coord.cx, coord.cz);
            return;
        };
        chunk.lod_meshes[slot].mesh = Some(mesh);
        self.update_chunk(coord);
        if self.collider_slot == Some(slot) {
            self.update_collision_mesh(coord);
        }
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk<H::Object>> {
        self.chunks.get(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk<H::Object>> {
        self.chunks.values()
    }

    pub fn visible_chunks(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.visible.iter().copied()
    }

    pub fn is_visible(&self, coord: ChunkCoord) -> bool {
        self.visible.contains(&coord)
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            chunks: self.chunks.len(),
            visible: self.visible.len(),
            ..self.stats
        }
    }

    /// No generation job queued, running, or awaiting a drain.
    pub fn is_settled(&self) -> bool {
        self.runtime.is_idle()
    }

    pub fn viewer(&self) -> Vec2 {
        self.viewer
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn mesh_world_size(&self) -> f32 {
        self.mesh_world_size
    }

    pub fn runtime(&self) -> &Arc<Runtime<Self>> {
        &self.runtime
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

fn request_lod_mesh<H: SceneHost + 'static>(
    runtime: &Runtime<TerrainStreamer<H>>,
    coord: ChunkCoord,
    slot: usize,
    lod: u8,
    field: Arc<HeightField>,
) {
    log::trace!(
        target: "stream",
        "chunk ({}, {}) requests lod {} (slot {})",
        coord.cx,
        coord.cz,
        lod,
        slot
    );
    runtime.request_mesh(field, lod, move |s: &mut TerrainStreamer<H>, mesh| {
        s.on_mesh_received(coord, slot, mesh)
    });
}
