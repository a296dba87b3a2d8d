use tessera_mesh_cpu::NUM_SUPPORTED_LODS;

/// One row of the LOD table: meshes at `lod` are used up to `visible_distance_threshold`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodLevel {
    pub lod: u8,
    pub visible_distance_threshold: f32,
    pub use_for_collider: bool,
}

impl LodLevel {
    pub const fn new(lod: u8, visible_distance_threshold: f32, use_for_collider: bool) -> Self {
        Self {
            lod,
            visible_distance_threshold,
            use_for_collider,
        }
    }

    #[inline]
    pub fn sqr_visible_distance_threshold(&self) -> f32 {
        self.visible_distance_threshold * self.visible_distance_threshold
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StreamSettings {
    pub lods: Vec<LodLevel>,
    /// Viewer travel that triggers a full re-scan of the candidate window.
    pub move_threshold: f32,
    /// Viewer distance to a chunk edge under which its collision mesh is assigned.
    pub collider_generation_distance: f32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            lods: vec![
                LodLevel::new(0, 200.0, true),
                LodLevel::new(1, 400.0, false),
                LodLevel::new(4, 600.0, false),
            ],
            move_threshold: 25.0,
            collider_generation_distance: 5.0,
        }
    }
}

impl StreamSettings {
    /// Sorted ascending by threshold, LOD indices clamped to the supported range.
    pub fn normalized(mut self) -> Self {
        let max_lod = (NUM_SUPPORTED_LODS - 1) as u8;
        for level in &mut self.lods {
            level.lod = level.lod.min(max_lod);
            level.visible_distance_threshold = level.visible_distance_threshold.max(0.0);
        }
        self.lods
            .sort_by(|a, b| a.visible_distance_threshold.total_cmp(&b.visible_distance_threshold));
        self.move_threshold = self.move_threshold.max(0.0);
        self.collider_generation_distance = self.collider_generation_distance.max(0.0);
        self
    }

    /// Threshold of the coarsest level; nothing further away is shown.
    pub fn max_view_distance(&self) -> f32 {
        self.lods
            .last()
            .map_or(0.0, |l| l.visible_distance_threshold)
    }

    /// Slot whose mesh doubles as the collision mesh: the first flagged level, else slot 0.
    pub fn collider_slot(&self) -> Option<usize> {
        if self.lods.is_empty() {
            return None;
        }
        Some(
            self.lods
                .iter()
                .position(|l| l.use_for_collider)
                .unwrap_or(0),
        )
    }
}

/// First slot whose threshold is at least `distance`, scanning in ascending order.
/// Distances past every threshold fall back to the last slot.
pub fn select_lod(lods: &[LodLevel], distance: f32) -> Option<usize> {
    if lods.is_empty() {
        return None;
    }
    Some(
        lods.iter()
            .position(|l| distance <= l.visible_distance_threshold)
            .unwrap_or(lods.len() - 1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<LodLevel> {
        vec![
            LodLevel::new(0, 100.0, false),
            LodLevel::new(1, 300.0, true),
            LodLevel::new(2, 450.0, false),
        ]
    }

    #[test]
    fn picks_first_satisfying_threshold() {
        let lods = table();
        assert_eq!(select_lod(&lods, 250.0), Some(1));
        assert_eq!(select_lod(&lods, 0.0), Some(0));
        assert_eq!(select_lod(&lods, 100.0), Some(0));
        assert_eq!(select_lod(&lods, 100.5), Some(1));
        assert_eq!(select_lod(&lods, 450.0), Some(2));
        assert_eq!(select_lod(&lods, 9000.0), Some(2));
        assert_eq!(select_lod(&[], 1.0), None);
    }

    #[test]
    fn normalized_sorts_and_clamps() {
        let s = StreamSettings {
            lods: vec![
                LodLevel::new(9, 450.0, false),
                LodLevel::new(0, 100.0, false),
                LodLevel::new(1, 300.0, true),
            ],
            move_threshold: -1.0,
            collider_generation_distance: 5.0,
        }
        .normalized();
        let thresholds: Vec<f32> = s.lods.iter().map(|l| l.visible_distance_threshold).collect();
        assert_eq!(thresholds, vec![100.0, 300.0, 450.0]);
        assert_eq!(s.lods[2].lod, 4);
        assert_eq!(s.move_threshold, 0.0);
        assert_eq!(s.max_view_distance(), 450.0);
        assert_eq!(s.collider_slot(), Some(1));
    }

    #[test]
    fn collider_slot_defaults_to_first() {
        let s = StreamSettings {
            lods: vec![LodLevel::new(0, 10.0, false), LodLevel::new(2, 20.0, false)],
            ..StreamSettings::default()
        };
        assert_eq!(s.collider_slot(), Some(0));
        let empty = StreamSettings {
            lods: Vec::new(),
            ..StreamSettings::default()
        };
        assert_eq!(empty.collider_slot(), None);
        assert_eq!(empty.max_view_distance(), 0.0);
    }
}
