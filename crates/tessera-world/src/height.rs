use tessera_geom::Vec2;

use crate::curve::HeightCurve;
use crate::falloff::FalloffField;
use crate::grid::FieldGrid;
use crate::noise::{NoiseParameters, generate_noise_map};

#[derive(Clone, Debug, PartialEq)]
pub struct HeightMapSettings {
    pub noise: NoiseParameters,
    pub use_falloff: bool,
    pub height_curve: HeightCurve,
    pub height_multiplier: f32,
}

impl Default for HeightMapSettings {
    fn default() -> Self {
        Self {
            noise: NoiseParameters::default(),
            use_falloff: false,
            height_curve: HeightCurve::linear(),
            height_multiplier: 1.0,
        }
    }
}

impl HeightMapSettings {
    /// Height produced by a raw sample of 0.
    pub fn min_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(0.0)
    }

    /// Height produced by a raw sample of 1.
    pub fn max_height(&self) -> f32 {
        self.height_multiplier * self.height_curve.evaluate(1.0)
    }
}

/// Final terrain heights for one tile plus the extremes they reach.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    grid: FieldGrid,
    min_value: f32,
    max_value: f32,
}

impl HeightField {
    pub fn from_grid(grid: FieldGrid) -> Self {
        let (min_value, max_value) = grid.min_max();
        Self {
            grid,
            min_value,
            max_value,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.grid.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.grid.height()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.grid.get(x, y)
    }

    #[inline]
    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    #[inline]
    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    pub fn grid(&self) -> &FieldGrid {
        &self.grid
    }
}

/// Noise → optional falloff subtraction → `v * curve(v) * multiplier`.
///
/// The falloff mask is applied to the normalized noise before the curve; cells outside the
/// mask (size mismatch) are left untouched.
pub fn generate_height_map(
    width: usize,
    height: usize,
    settings: &HeightMapSettings,
    sample_center: Vec2,
    falloff: Option<&FalloffField>,
) -> HeightField {
    let mut grid = generate_noise_map(width, height, &settings.noise, sample_center);
    let curve = settings.height_curve.evaluator();

    let mut min_value = f32::MAX;
    let mut max_value = f32::MIN;
    for y in 0..height {
        for x in 0..width {
            let mut v = grid.get(x, y);
            if let Some(mask) = falloff.and_then(|f| f.try_get(x, y)) {
                v = (v - mask).clamp(0.0, 1.0);
            }
            v *= curve.evaluate(v) * settings.height_multiplier;
            min_value = min_value.min(v);
            max_value = max_value.max(v);
            grid.set(x, y, v);
        }
    }

    HeightField {
        grid,
        min_value,
        max_value,
    }
}
