use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

use tessera_geom::Vec2;
use tessera_mesh_cpu::{
    MeshSettings, NUM_SUPPORTED_CHUNK_SIZES, NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES,
    NUM_SUPPORTED_LODS,
};
use tessera_runtime::PreviewMode;
use tessera_stream::{LodLevel, StreamSettings};
use tessera_world::{HeightCurve, HeightMapSettings, Keyframe, NoiseParameters, NormalizeMode};

/// Smallest noise scale accepted from a config file.
const MIN_CONFIG_SCALE: f32 = 0.01;

#[derive(Clone, Debug, Deserialize)]
pub struct TerrainConfig {
    #[serde(default)]
    pub noise: NoiseConfig,
    #[serde(default)]
    pub height: HeightConfig,
    #[serde(default)]
    pub mesh: MeshConfig,
    #[serde(default = "default_lods")]
    pub lods: Vec<LodConfig>,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            noise: NoiseConfig::default(),
            height: HeightConfig::default(),
            mesh: MeshConfig::default(),
            lods: default_lods(),
            stream: StreamConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NoiseConfig {
    #[serde(default)]
    pub seed: i32,
    #[serde(default = "default_noise_scale")]
    pub scale: f32,
    #[serde(default = "default_octaves")]
    pub octaves: u32,
    #[serde(default = "default_persistence")]
    pub persistence: f32,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f32,
    #[serde(default)]
    pub offset: [f32; 2],
    #[serde(default = "default_normalize")]
    pub normalize: NormalizeMode,
}
fn default_noise_scale() -> f32 {
    50.0
}
fn default_octaves() -> u32 {
    6
}
fn default_persistence() -> f32 {
    0.5
}
fn default_lacunarity() -> f32 {
    2.0
}
fn default_normalize() -> NormalizeMode {
    NormalizeMode::Global
}
impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: default_noise_scale(),
            octaves: default_octaves(),
            persistence: default_persistence(),
            lacunarity: default_lacunarity(),
            offset: [0.0, 0.0],
            normalize: default_normalize(),
        }
    }
}

impl NoiseConfig {
    /// Noise parameters with every field forced into its valid range.
    pub fn validated(&self) -> NoiseParameters {
        let scale = if self.scale.is_finite() {
            self.scale.max(MIN_CONFIG_SCALE)
        } else {
            default_noise_scale()
        };
        NoiseParameters {
            seed: self.seed,
            scale,
            octave_count: self.octaves.max(1),
            persistence: self.persistence.clamp(0.0, 1.0),
            lacunarity: self.lacunarity.max(1.0),
            offset: Vec2::new(self.offset[0], self.offset[1]),
            normalize_mode: self.normalize,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct HeightConfig {
    #[serde(default = "default_height_multiplier")]
    pub multiplier: f32,
    #[serde(default)]
    pub use_falloff: bool,
    /// Response curve keys; an empty list means the identity curve.
    #[serde(default)]
    pub curve: Vec<Keyframe>,
}
fn default_height_multiplier() -> f32 {
    30.0
}
impl Default for HeightConfig {
    fn default() -> Self {
        Self {
            multiplier: default_height_multiplier(),
            use_falloff: false,
            curve: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MeshConfig {
    #[serde(default = "default_mesh_scale")]
    pub scale: f32,
    #[serde(default)]
    pub flat_shading: bool,
    #[serde(default = "default_chunk_size_index")]
    pub chunk_size_index: usize,
    #[serde(default)]
    pub flat_chunk_size_index: usize,
}
fn default_mesh_scale() -> f32 {
    2.5
}
fn default_chunk_size_index() -> usize {
    4
}
impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            scale: default_mesh_scale(),
            flat_shading: false,
            chunk_size_index: default_chunk_size_index(),
            flat_chunk_size_index: 0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LodConfig {
    pub lod: u8,
    pub distance: f32,
    #[serde(default)]
    pub collider: bool,
}
fn default_lods() -> Vec<LodConfig> {
    vec![
        LodConfig {
            lod: 0,
            distance: 200.0,
            collider: true,
        },
        LodConfig {
            lod: 1,
            distance: 400.0,
            collider: false,
        },
        LodConfig {
            lod: 4,
            distance: 600.0,
            collider: false,
        },
    ]
}

#[derive(Clone, Debug, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_move_threshold")]
    pub move_threshold: f32,
    #[serde(default = "default_collider_generation_distance")]
    pub collider_generation_distance: f32,
}
fn default_move_threshold() -> f32 {
    25.0
}
fn default_collider_generation_distance() -> f32 {
    5.0
}
impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            move_threshold: default_move_threshold(),
            collider_generation_distance: default_collider_generation_distance(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PreviewConfig {
    #[serde(default)]
    pub mode: PreviewMode,
    #[serde(default)]
    pub lod: u8,
    /// Colour bands for noise-map previews, ascending by height. Empty means grayscale.
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RegionConfig {
    #[serde(default)]
    pub name: String,
    /// Upper bound (inclusive) of the band on the normalized [0, 1] scale.
    pub height: f32,
    pub color: [u8; 3],
}

impl TerrainConfig {
    pub fn height_settings(&self) -> HeightMapSettings {
        let height_curve = if self.height.curve.is_empty() {
            HeightCurve::linear()
        } else {
            HeightCurve::new(self.height.curve.clone())
        };
        HeightMapSettings {
            noise: self.noise.validated(),
            use_falloff: self.height.use_falloff,
            height_curve,
            height_multiplier: self.height.multiplier.max(0.0),
        }
    }

    pub fn mesh_settings(&self) -> MeshSettings {
        MeshSettings {
            mesh_scale: if self.mesh.scale.is_finite() && self.mesh.scale > 0.0 {
                self.mesh.scale
            } else {
                default_mesh_scale()
            },
            use_flat_shading: self.mesh.flat_shading,
            chunk_size_index: self.mesh.chunk_size_index.min(NUM_SUPPORTED_CHUNK_SIZES - 1),
            flat_chunk_size_index: self
                .mesh
                .flat_chunk_size_index
                .min(NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES - 1),
        }
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            lods: self
                .lods
                .iter()
                .map(|l| LodLevel::new(l.lod, l.distance, l.collider))
                .collect(),
            move_threshold: self.stream.move_threshold,
            collider_generation_distance: self.stream.collider_generation_distance,
        }
        .normalized()
    }

    /// Preview LOD clamped to the supported range.
    pub fn preview_lod(&self) -> u8 {
        self.preview.lod.min((NUM_SUPPORTED_LODS - 1) as u8)
    }

    fn check(&self) -> Result<(), Box<dyn Error>> {
        if self.lods.is_empty() {
            return Err("config needs at least one [[lods]] entry".into());
        }
        if let Some(l) = self.lods.iter().find(|l| !l.distance.is_finite()) {
            return Err(format!("lod {} has a non-finite distance", l.lod).into());
        }
        Ok(())
    }
}

pub fn parse_config(s: &str) -> Result<TerrainConfig, Box<dyn Error>> {
    let cfg: TerrainConfig = toml::from_str(s)?;
    cfg.check()?;
    Ok(cfg)
}

pub fn load_config_from_path(path: &Path) -> Result<TerrainConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}
