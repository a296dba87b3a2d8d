use std::sync::Arc;

use tessera_geom::Vec3;
use tessera_mesh_cpu::MeshBuildResult;

use crate::coord::ChunkCoord;

/// Renderer-side handle for one chunk. Only the streamer's owning thread touches it.
pub trait RenderObject {
    fn set_active(&mut self, active: bool);
    fn set_world_position(&mut self, position: Vec3);
    fn set_mesh(&mut self, mesh: Arc<MeshBuildResult>);
    fn set_collider_mesh(&mut self, mesh: Arc<MeshBuildResult>);
}

/// Creates render objects for newly discovered chunks.
pub trait SceneHost {
    type Object: RenderObject;

    fn spawn(&mut self, coord: ChunkCoord) -> Self::Object;
}
