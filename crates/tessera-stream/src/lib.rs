//! Chunk streaming around a moving viewer: visibility, LOD selection and collider upkeep.
#![forbid(unsafe_code)]

mod chunk;
mod coord;
mod lod;
mod scene;
mod streamer;

pub use chunk::TerrainChunk;
pub use coord::ChunkCoord;
pub use lod::{LodLevel, StreamSettings, select_lod};
pub use scene::{RenderObject, SceneHost};
pub use streamer::{MAX_WINDOW_RADIUS, StreamStats, TerrainStreamer};
