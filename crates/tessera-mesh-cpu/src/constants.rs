//! Chunk sizing constants shared by the mesher and the streamer.

/// Number of level-of-detail steps. LOD `i` samples every `2i`th cell (every cell at 0).
pub const NUM_SUPPORTED_LODS: usize = 5;
pub const NUM_SUPPORTED_CHUNK_SIZES: usize = 9;
pub const NUM_SUPPORTED_FLAT_SHADED_CHUNK_SIZES: usize = 3;

/// Quads per chunk edge at LOD 0. Every entry is divisible by each LOD increment.
pub const SUPPORTED_CHUNK_SIZES: [usize; NUM_SUPPORTED_CHUNK_SIZES] =
    [48, 72, 96, 120, 144, 168, 192, 216, 240];
