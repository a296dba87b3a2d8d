use crate::constants::{
    NUM_SUPPORTED_CHUNK_SIZES, NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES, NUM_SUPPORTED_LODS,
    SUPPORTED_CHUNK_SIZES,
};

#[derive(Clone, Debug, PartialEq)]
pub struct MeshSettings {
    pub mesh_scale: f32,
    pub use_flat_shading: bool,
    /// Index into [`SUPPORTED_CHUNK_SIZES`] when smooth shaded.
    pub chunk_size_index: usize,
    /// Index into the first [`NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES`] sizes when flat shaded.
    pub flat_chunk_size_index: usize,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            mesh_scale: 1.0,
            use_flat_shading: false,
            chunk_size_index: 4,
            flat_chunk_size_index: 0,
        }
    }
}

impl MeshSettings {
    /// Quads per edge at LOD 0 for the active shading mode.
    pub fn chunk_size(&self) -> usize {
        let idx = if self.use_flat_shading {
            self.flat_chunk_size_index
                .min(NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES - 1)
        } else {
            self.chunk_size_index.min(NUM_SUPPORTED_CHUNK_SIZES - 1)
        };
        SUPPORTED_CHUNK_SIZES[idx]
    }

    /// Vertices per line of a LOD-0 mesh, including the two border cells.
    #[inline]
    pub fn num_verts_per_line(&self) -> usize {
        self.chunk_size() + 1
    }

    /// World-space edge length of one chunk.
    #[inline]
    pub fn mesh_world_size(&self) -> f32 {
        (self.num_verts_per_line() - 3) as f32 * self.mesh_scale
    }
}

/// Sample step for a LOD: 1 at LOD 0, otherwise `2 * lod`. Out-of-range LODs are clamped.
#[inline]
pub fn lod_increment(lod: u8) -> usize {
    let lod = (lod as usize).min(NUM_SUPPORTED_LODS - 1);
    if lod == 0 { 1 } else { lod * 2 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_index_and_shading() {
        let s = MeshSettings {
            chunk_size_index: 8,
            ..MeshSettings::default()
        };
        assert_eq!(s.num_verts_per_line(), 241);
        assert_eq!(s.mesh_world_size(), 238.0);

        let flat = MeshSettings {
            use_flat_shading: true,
            chunk_size_index: 8,
            flat_chunk_size_index: 9,
            mesh_scale: 2.0,
        };
        assert_eq!(flat.chunk_size(), 96);
        assert_eq!(flat.mesh_world_size(), 94.0 * 2.0);
    }

    #[test]
    fn every_chunk_size_is_divisible_by_every_increment() {
        for size in SUPPORTED_CHUNK_SIZES {
            for lod in 0..NUM_SUPPORTED_LODS as u8 {
                assert_eq!(size % lod_increment(lod), 0, "size {size} lod {lod}");
            }
        }
    }

    #[test]
    fn increment_clamps_lod() {
        assert_eq!(lod_increment(0), 1);
        assert_eq!(lod_increment(3), 6);
        assert_eq!(lod_increment(200), 8);
    }
}
