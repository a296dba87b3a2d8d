use serde::{Deserialize, Serialize};
use tessera_geom::Vec2;

/// Integer position of a chunk on the horizontal chunk grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    /// Chunk whose center is nearest to `p` for chunks `chunk_size` wide.
    #[inline]
    pub fn containing(p: Vec2, chunk_size: f32) -> Self {
        Self {
            cx: (p.x / chunk_size).round() as i32,
            cz: (p.y / chunk_size).round() as i32,
        }
    }

    /// World-space XZ center for chunks `chunk_size` wide.
    #[inline]
    pub fn world_center(self, chunk_size: f32) -> Vec2 {
        Vec2::new(self.cx as f32 * chunk_size, self.cz as f32 * chunk_size)
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}
