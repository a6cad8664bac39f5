//! Tunables, deserialized from the user's config file. Every field has a default, so a partial
//! (or empty) file is valid.

use crate::boundary::{BoundaryType, TraceFormat, DEFAULT_THRESHOLD};

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct CoreConfig {
    pub history: HistoryConfig,
    pub tiles: TileConfig,
    pub trace: TraceConfig,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Entries kept regardless of their size.
    pub undo_levels: usize,
    /// Bytes of history to keep beyond `undo_levels`.
    pub undo_size: usize,
}
impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            undo_levels: 5,
            undo_size: 64 * 1024 * 1024,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct TileConfig {
    pub tile_size: u32,
}
impl Default for TileConfig {
    fn default() -> Self {
        Self {
            tile_size: crate::tile::TILE_SIZE,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct TraceConfig {
    /// Values at or above this are inside the mask.
    pub threshold: f32,
    pub bound_type: BoundaryType,
    pub format: TraceFormat,
    /// Merge collinear segments of traced outlines.
    pub simplify: bool,
}
impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            bound_type: BoundaryType::WithinBounds,
            format: TraceFormat::Alpha,
            simplify: true,
        }
    }
}
