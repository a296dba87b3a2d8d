use std::sync::Arc;

use serde::Deserialize;
use tessera_geom::Vec2;
use tessera_mesh_cpu::{MeshBuildResult, MeshSettings, build_terrain_mesh};
use tessera_world::{
    FalloffCache, FalloffField, FieldGrid, HeightField, HeightMapSettings, generate_falloff_map,
    generate_height_map,
};

/// Pure field and mesh producer run on worker threads.
pub trait TerrainSource: Send + Sync + 'static {
    fn mesh_settings(&self) -> &MeshSettings;

    /// Bordered height field for the chunk sampled around `sample_center`.
    fn height_map(&self, sample_center: Vec2) -> HeightField;

    fn mesh(&self, field: &HeightField, lod: u8) -> MeshBuildResult;
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    #[default]
    #[serde(alias = "noise_map", alias = "noise")]
    NoiseMap,
    Mesh,
    #[serde(alias = "falloff_map", alias = "falloff")]
    FalloffMap,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Preview {
    /// Heights remapped onto [0, 1] between the settings' min and max height.
    NoiseMap(FieldGrid),
    Mesh {
        field: HeightField,
        mesh: MeshBuildResult,
    },
    FalloffMap(FieldGrid),
}

pub struct TerrainGenerator {
    height: HeightMapSettings,
    mesh: MeshSettings,
    falloff: FalloffCache,
}

impl TerrainGenerator {
    pub fn new(height: HeightMapSettings, mesh: MeshSettings) -> Self {
        Self {
            height,
            mesh,
            falloff: FalloffCache::new(),
        }
    }

    pub fn height_settings(&self) -> &HeightMapSettings {
        &self.height
    }

    /// Cells per side of every height field this generator produces.
    #[inline]
    pub fn field_size(&self) -> usize {
        self.mesh.num_verts_per_line()
    }

    fn falloff_mask(&self) -> Option<Arc<FalloffField>> {
        self.height
            .use_falloff
            .then(|| self.falloff.get(self.field_size()))
    }

    /// Runs the whole pipeline on the calling thread around the origin.
    pub fn preview(&self, mode: PreviewMode, lod: u8) -> Preview {
        match mode {
            PreviewMode::NoiseMap => {
                let field = self.height_map(Vec2::ZERO);
                let lo = self.height.min_height();
                let hi = self.height.max_height();
                let mut grid = field.grid().clone();
                for v in grid.values_mut() {
                    *v = if hi > lo {
                        ((*v - lo) / (hi - lo)).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                }
                Preview::NoiseMap(grid)
            }
            PreviewMode::Mesh => {
                let field = self.height_map(Vec2::ZERO);
                let mesh = self.mesh(&field, lod);
                Preview::Mesh { field, mesh }
            }
            PreviewMode::FalloffMap => {
                let mask = generate_falloff_map(self.field_size());
                Preview::FalloffMap(mask.grid().clone())
            }
        }
    }
}

impl TerrainSource for TerrainGenerator {
    fn mesh_settings(&self) -> &MeshSettings {
        &self.mesh
    }

    fn height_map(&self, sample_center: Vec2) -> HeightField {
        let n = self.field_size();
        let mask = self.falloff_mask();
        generate_height_map(n, n, &self.height, sample_center, mask.as_deref())
    }

    fn mesh(&self, field: &HeightField, lod: u8) -> MeshBuildResult {
        build_terrain_mesh(field, &self.mesh, lod)
    }
}
