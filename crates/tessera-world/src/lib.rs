//! Height field synthesis: fractal noise sampling, response curves and falloff masks.
#![forbid(unsafe_code)]

pub mod curve;
pub mod falloff;
pub mod grid;
pub mod height;
pub mod noise;

pub use curve::{CurveEvaluator, HeightCurve, Keyframe};
pub use falloff::{FalloffCache, FalloffField, generate_falloff_map};
pub use grid::FieldGrid;
pub use height::{HeightField, HeightMapSettings, generate_height_map};
pub use noise::{MIN_NOISE_SCALE, NoiseParameters, NormalizeMode, generate_noise_map};
