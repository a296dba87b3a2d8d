use std::sync::Arc;

use tessera_geom::{Bounds2, Vec2};
use tessera_mesh_cpu::MeshBuildResult;
use tessera_world::HeightField;

use crate::coord::ChunkCoord;

#[derive(Clone, Debug, Default)]
pub(crate) struct LodMesh {
    pub(crate) mesh: Option<Arc<MeshBuildResult>>,
    pub(crate) requested: bool,
}

pub struct TerrainChunk<O> {
    pub(crate) coord: ChunkCoord,
    pub(crate) bounds: Bounds2,
    pub(crate) sample_center: Vec2,
    pub(crate) object: O,
    pub(crate) height: Option<Arc<HeightField>>,
    pub(crate) lod_meshes: Vec<LodMesh>,
    pub(crate) current_lod: Option<usize>,
    pub(crate) visible: bool,
    pub(crate) collider_set: bool,
}

impl<O> TerrainChunk<O> {
    pub(crate) fn new(
        coord: ChunkCoord,
        bounds: Bounds2,
        sample_center: Vec2,
        object: O,
        lod_slots: usize,
    ) -> Self {
        Self {
            coord,
            bounds,
            sample_center,
            object,
            height: None,
            lod_meshes: vec![LodMesh::default(); lod_slots],
            current_lod: None,
            visible: false,
            collider_set: false,
        }
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    #[inline]
    pub fn bounds(&self) -> Bounds2 {
        self.bounds
    }

    #[inline]
    pub fn sample_center(&self) -> Vec2 {
        self.sample_center
    }

    pub fn object(&self) -> &O {
        &self.object
    }

    pub fn object_mut(&mut self) -> &mut O {
        &mut self.object
    }

    pub fn height_field(&self) -> Option<&Arc<HeightField>> {
        self.height.as_ref()
    }

    /// LOD slot whose mesh is currently displayed.
    #[inline]
    pub fn current_lod(&self) -> Option<usize> {
        self.current_lod
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn collider_set(&self) -> bool {
        self.collider_set
    }

    pub fn mesh(&self, slot: usize) -> Option<&Arc<MeshBuildResult>> {
        self.lod_meshes.get(slot).and_then(|m| m.mesh.as_ref())
    }

    pub fn mesh_requested(&self, slot: usize) -> bool {
        self.lod_meshes.get(slot).is_some_and(|m| m.requested)
    }
}
