//! CPU terrain mesher: bordered height field in, chunk mesh out.
#![forbid(unsafe_code)]

mod build;
pub mod constants;
mod mesh_build;
mod settings;

pub use build::build_terrain_mesh;
pub use constants::{
    NUM_SUPPORTED_CHUNK_SIZES, NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES, NUM_SUPPORTED_LODS,
    SUPPORTED_CHUNK_SIZES,
};
pub use mesh_build::{MeshBuildResult, Normals};
pub use settings::{MeshSettings, lod_increment};
