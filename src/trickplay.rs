/// Trickplay sprite-sheet geometry and timeline pixel mapping
///
/// The media server packs thumbnails into sheets of `tile_width x tile_height`
/// tiles. These helpers turn a playback time into a tile on a sheet and a pixel
/// offset on the timeline back into ticks. All of them are total: a video that
/// is still loading (zero duration, zero thumbnails) maps to index 0.
use serde::{Deserialize, Serialize};

use crate::time::TICKS_PER_MILLISECOND;

/// Sprite-sheet description for one trickplay resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrickplayInfo {
    /// Resolution key the sheets were generated for
    #[serde(default)]
    pub resolution: Option<u32>,
    /// Pixel width of a single thumbnail
    pub width: u32,
    /// Pixel height of a single thumbnail
    pub height: u32,
    /// Thumbnails per row on a sheet
    pub tile_width: u32,
    /// Thumbnails per column on a sheet
    pub tile_height: u32,
    /// Total thumbnails across all sheets
    pub thumbnail_count: u32,
    /// Milliseconds between thumbnails
    pub interval: u32,
    /// URL prefix, the sheet index and extension are appended
    pub base_url: String,
}

/// Location of one thumbnail inside the sheet set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpriteCoords {
    pub sheet_index: u32,
    pub col: u32,
    pub row: u32,
}

impl SpriteCoords {
    /// CSS-style background offset of this tile at a display scale.
    pub fn background_position(&self, thumb_width: f64, thumb_height: f64, scale: f64) -> (f64, f64) {
        (
            -(self.col as f64) * thumb_width * scale,
            -(self.row as f64) * thumb_height * scale,
        )
    }
}

/// A thumbnail ready to draw: which sheet to load and where to crop it
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteTile {
    pub thumb_index: u32,
    pub sheet_url: String,
    pub coords: SpriteCoords,
    /// Background offset at the requested scale
    pub offset_x: f64,
    pub offset_y: f64,
    /// Scaled size of the whole sheet image
    pub sheet_width: f64,
    pub sheet_height: f64,
}

/// Thumbnail index for a playback time, clamped to `[0, count - 1]`.
pub fn time_to_thumb_index(time_secs: f64, interval_ms: u32, thumbnail_count: u32) -> u32 {
    if interval_ms == 0 || thumbnail_count == 0 || !time_secs.is_finite() || time_secs <= 0.0 {
        return 0;
    }

    let raw = (time_secs * 1000.0 / interval_ms as f64).floor();
    raw.clamp(0.0, (thumbnail_count - 1) as f64) as u32
}

/// Sheet, column and row of a thumbnail index.
pub fn thumb_index_to_sprite_coords(index: u32, tile_width: u32, tile_height: u32) -> SpriteCoords {
    let tiles_per_sheet = tile_width.saturating_mul(tile_height);
    if tiles_per_sheet == 0 {
        return SpriteCoords::default();
    }

    let tile_on_sheet = index % tiles_per_sheet;
    SpriteCoords {
        sheet_index: index / tiles_per_sheet,
        col: tile_on_sheet % tile_width,
        row: tile_on_sheet / tile_width,
    }
}

/// Map a pixel offset on a lane of `lane_width_px` back to ticks.
pub fn pixel_offset_to_ticks(offset_px: f64, lane_width_px: f64, duration_ticks: i64) -> i64 {
    if duration_ticks <= 0 || !(lane_width_px > 0.0) || !offset_px.is_finite() {
        return 0;
    }

    let ticks = (offset_px / lane_width_px * duration_ticks as f64).round() as i64;
    ticks.clamp(0, duration_ticks)
}

/// Inverse of [`pixel_offset_to_ticks`], used to place markers.
pub fn ticks_to_pixel_offset(ticks: i64, lane_width_px: f64, duration_ticks: i64) -> f64 {
    if duration_ticks <= 0 || !(lane_width_px > 0.0) {
        return 0.0;
    }

    let fraction = ticks.clamp(0, duration_ticks) as f64 / duration_ticks as f64;
    fraction * lane_width_px
}

impl TrickplayInfo {
    pub fn tiles_per_sheet(&self) -> u32 {
        self.tile_width.saturating_mul(self.tile_height)
    }

    /// Number of thumbnails the server generates for a video of this length.
    pub fn expected_thumbnail_count(&self, duration_ms: u64) -> u32 {
        if self.interval == 0 {
            return 0;
        }
        duration_ms.div_ceil(self.interval as u64) as u32
    }

    pub fn sheet_count(&self) -> u32 {
        let per_sheet = self.tiles_per_sheet();
        if per_sheet == 0 {
            return 0;
        }
        self.thumbnail_count.div_ceil(per_sheet)
    }

    pub fn sheet_url(&self, sheet_index: u32) -> String {
        format!("{}{}.jpg", self.base_url, sheet_index)
    }

    /// Playback position of a thumbnail in ticks.
    pub fn thumb_start_ticks(&self, index: u32) -> i64 {
        index as i64 * self.interval as i64 * TICKS_PER_MILLISECOND
    }

    pub fn thumb_index_for_time(&self, time_secs: f64) -> u32 {
        time_to_thumb_index(time_secs, self.interval, self.thumbnail_count)
    }

    /// Drawable tile for a thumbnail at a target display width.
    ///
    /// `display_width` is the on-screen width of one thumbnail; the height follows
    /// the sheet aspect ratio.
    pub fn tile(&self, index: u32, display_width: f64) -> SpriteTile {
        let scale = if self.width == 0 { 1.0 } else { display_width / self.width as f64 };
        let coords = thumb_index_to_sprite_coords(index, self.tile_width, self.tile_height);
        let (offset_x, offset_y) =
            coords.background_position(self.width as f64, self.height as f64, scale);

        SpriteTile {
            thumb_index: index,
            sheet_url: self.sheet_url(coords.sheet_index),
            coords,
            offset_x,
            offset_y,
            sheet_width: self.tile_width as f64 * self.width as f64 * scale,
            sheet_height: self.tile_height as f64 * self.height as f64 * scale,
        }
    }

    pub fn tile_for_time(&self, time_secs: f64, display_width: f64) -> SpriteTile {
        self.tile(self.thumb_index_for_time(time_secs), display_width)
    }

    /// Display height of a thumbnail at `display_width`, keeping the aspect ratio.
    pub fn display_height(&self, display_width: f64) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        display_width * self.height as f64 / self.width as f64
    }
}
