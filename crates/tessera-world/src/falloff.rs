//! Square edge-attenuation mask for island-style maps.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::grid::FieldGrid;

const FALLOFF_STEEPNESS: f32 = 3.0;
const FALLOFF_SHIFT: f32 = 2.2;

/// `size × size` mask: ~0 in the middle, rising to 1 at the edges.
#[derive(Clone, Debug, PartialEq)]
pub struct FalloffField {
    grid: FieldGrid,
}

impl FalloffField {
    #[inline]
    pub fn size(&self) -> usize {
        self.grid.width()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.grid.get(x, y)
    }

    #[inline]
    pub fn try_get(&self, x: usize, y: usize) -> Option<f32> {
        self.grid.try_get(x, y)
    }

    pub fn grid(&self) -> &FieldGrid {
        &self.grid
    }
}

#[inline]
fn falloff_curve(v: f32) -> f32 {
    let a = v.powf(FALLOFF_STEEPNESS);
    let b = (FALLOFF_SHIFT - FALLOFF_SHIFT * v).powf(FALLOFF_STEEPNESS);
    if a + b > 0.0 { a / (a + b) } else { 0.0 }
}

pub fn generate_falloff_map(size: usize) -> FalloffField {
    let mut grid = FieldGrid::new(size, size);
    let s = size.max(1) as f32;
    for j in 0..size {
        for i in 0..size {
            let x = i as f32 / s * 2.0 - 1.0;
            let y = j as f32 / s * 2.0 - 1.0;
            let v = x.abs().max(y.abs());
            grid.set(i, j, falloff_curve(v));
        }
    }
    FalloffField { grid }
}

/// Holds the falloff mask for the most recently requested size.
#[derive(Debug, Default)]
pub struct FalloffCache {
    current: RwLock<Option<Arc<FalloffField>>>,
    builds: AtomicUsize,
}

impl FalloffCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, size: usize) -> Arc<FalloffField> {
        if let Ok(guard) = self.current.read() {
            if let Some(field) = guard.as_ref().filter(|f| f.size() == size) {
                return Arc::clone(field);
            }
        }
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        if let Some(field) = guard.as_ref().filter(|f| f.size() == size) {
            return Arc::clone(field);
        }
        let field = Arc::new(generate_falloff_map(size));
        self.builds.fetch_add(1, Ordering::Relaxed);
        log::debug!("falloff mask rebuilt for size {}", size);
        *guard = Some(Arc::clone(&field));
        field
    }

    /// Number of masks generated so far.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}
