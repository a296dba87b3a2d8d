//! Seeded fractal (octave-summed) Perlin sampling.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tessera_geom::Vec2;

use crate::grid::FieldGrid;

/// Smallest scale the sampler accepts; smaller (or non-positive) values are raised to it.
pub const MIN_NOISE_SCALE: f32 = 0.0001;

const OCTAVE_OFFSET_MIN: i32 = -100_000;
const OCTAVE_OFFSET_MAX: i32 = 100_000;

// Empirical headroom for global normalization. Not derived; changing it shifts every height.
const GLOBAL_NORMALIZE_BIAS: f32 = 1.6;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// Stretch this call's observed range onto [0, 1].
    #[default]
    Local,
    /// Normalize against the theoretical amplitude ceiling so separate calls stay comparable.
    Global,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NoiseParameters {
    pub seed: i32,
    pub scale: f32,
    pub octave_count: u32,
    pub persistence: f32,
    pub lacunarity: f32,
    pub offset: Vec2,
    pub normalize_mode: NormalizeMode,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: 50.0,
            octave_count: 6,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::ZERO,
            normalize_mode: NormalizeMode::Local,
        }
    }
}

impl NoiseParameters {
    /// Copy with every field forced into its valid range.
    pub fn clamped(&self) -> Self {
        Self {
            scale: if self.scale.is_finite() {
                self.scale.max(MIN_NOISE_SCALE)
            } else {
                MIN_NOISE_SCALE
            },
            octave_count: self.octave_count.max(1),
            persistence: self.persistence.clamp(0.0, 1.0),
            lacunarity: self.lacunarity.max(1.0),
            ..self.clone()
        }
    }

    /// Sum of octave amplitudes, the largest magnitude the raw fractal sum can reach.
    pub fn max_possible_height(&self) -> f32 {
        let p = self.clamped();
        let mut amplitude = 1.0f32;
        let mut total = 0.0f32;
        for _ in 0..p.octave_count {
            total += amplitude;
            amplitude *= p.persistence;
        }
        total
    }
}

fn octave_offsets(params: &NoiseParameters, sample_center: Vec2) -> (Vec<Vec2>, f32) {
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed as u64);
    let mut offsets = Vec::with_capacity(params.octave_count as usize);
    let mut amplitude = 1.0f32;
    let mut max_possible_height = 0.0f32;
    for _ in 0..params.octave_count {
        // Draw order is X then Y. Y is subtracted: sample-space +y runs along mesh -Z.
        let rx = rng.gen_range(OCTAVE_OFFSET_MIN..OCTAVE_OFFSET_MAX) as f32;
        let ry = rng.gen_range(OCTAVE_OFFSET_MIN..OCTAVE_OFFSET_MAX) as f32;
        offsets.push(Vec2::new(
            rx + params.offset.x + sample_center.x,
            ry - params.offset.y - sample_center.y,
        ));
        max_possible_height += amplitude;
        amplitude *= params.persistence;
    }
    (offsets, max_possible_height)
}

#[inline]
fn inverse_lerp(lo: f32, hi: f32, v: f32) -> f32 {
    if hi > lo {
        ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Samples a `width × height` fractal noise field centered on `sample_center`.
///
/// The result is normalized according to `params.normalize_mode` but is otherwise raw:
/// no response curve or height multiplier has been applied.
pub fn generate_noise_map(
    width: usize,
    height: usize,
    params: &NoiseParameters,
    sample_center: Vec2,
) -> FieldGrid {
    let params = params.clamped();
    let mut map = FieldGrid::new(width, height);
    if width == 0 || height == 0 {
        return map;
    }

    let (offsets, max_possible_height) = octave_offsets(&params, sample_center);

    let mut perlin = FastNoiseLite::with_seed(params.seed);
    perlin.set_noise_type(Some(NoiseType::Perlin));
    perlin.set_frequency(Some(1.0));

    let half_width = width as f32 / 2.0;
    let half_height = height as f32 / 2.0;
    let global_divisor = 2.0 * max_possible_height / GLOBAL_NORMALIZE_BIAS;

    let mut min_local = f32::MAX;
    let mut max_local = f32::MIN;

    for y in 0..height {
        for x in 0..width {
            let mut amplitude = 1.0f32;
            let mut frequency = 1.0f32;
            let mut noise_height = 0.0f32;
            for offset in &offsets {
                let sx = (x as f32 - half_width + offset.x) / params.scale * frequency;
                let sy = (y as f32 - half_height + offset.y) / params.scale * frequency;
                let v = perlin.get_noise_2d(sx, sy).clamp(-1.0, 1.0);
                noise_height += v * amplitude;
                amplitude *= params.persistence;
                frequency *= params.lacunarity;
            }
            min_local = min_local.min(noise_height);
            max_local = max_local.max(noise_height);

            let out = match params.normalize_mode {
                NormalizeMode::Local => noise_height,
                NormalizeMode::Global => ((noise_height + 1.0) / global_divisor).max(0.0),
            };
            map.set(x, y, out);
        }
    }

    if params.normalize_mode == NormalizeMode::Local {
        for v in map.values_mut() {
            *v = inverse_lerp(min_local, max_local, *v);
        }
    }
    map
}
