//! Static SVG rendering of a timeline model
//!
//! Produces a standalone document with every lane, used by the `render`
//! command and for snapshot-style checks. Thumbnails outside the virtualized
//! window are drawn as empty placeholders.

use std::fmt::Write;

use super::{AudioLane, LaneKind, Marker, TimelineModel};
use crate::trickplay::SpriteTile;

const BACKGROUND: &str = "#111827";
const PLACEHOLDER: &str = "#1f2937";
const SPECTRUM_FILL: &str = "#7c3aed";
const PLAYHEAD: &str = "#f8fafc";

/// Escape text for use in element content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn write_sprite(out: &mut String, tile: &SpriteTile, x: f64, y: f64, width: f64, height: f64) {
    // Nested viewport crops the sheet down to one tile
    let _ = write!(
        out,
        r#"<svg x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" viewBox="{:.2} {:.2} {:.2} {:.2}"><image href="{}" width="{:.2}" height="{:.2}"/></svg>"#,
        x,
        y,
        width,
        height,
        -tile.offset_x,
        -tile.offset_y,
        width,
        height,
        escape_xml(&tile.sheet_url),
        tile.sheet_width,
        tile.sheet_height,
    );
}

fn write_markers(out: &mut String, markers: &[Marker], y: f64, height: f64) {
    for m in markers {
        let _ = write!(
            out,
            r#"<rect class="marker {}" x="{:.2}" y="{:.2}" width="2" height="{:.2}" fill="{}" fill-opacity="{:.2}"/>"#,
            m.kind.as_str(),
            m.x - 1.0,
            y,
            height,
            m.color,
            m.opacity,
        );
    }
}

/// Render the full lane width of `model` as an SVG document.
pub fn render_svg(model: &mut TimelineModel) -> String {
    let width = model.lane_width();
    let height = model.total_height();
    let thumb_width = model.config.thumb_width;
    let mut out = String::new();

    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.2}" height="{:.2}" viewBox="0 0 {:.2} {:.2}">"#,
        width, height, width, height
    );
    let _ = write!(
        out,
        r#"<rect width="{:.2}" height="{:.2}" fill="{}"/>"#,
        width, height, BACKGROUND
    );

    for lane in model.lanes() {
        let _ = write!(out, r#"<g class="lane {:?}">"#, lane.kind);
        match lane.kind {
            LaneKind::Thumbnails => {
                for slot in model.thumbnail_slots() {
                    match &slot.tile {
                        Some(tile) => {
                            let inset = (slot.width - thumb_width) / 2.0;
                            write_sprite(&mut out, tile, slot.x + inset, lane.y, thumb_width, lane.height);
                        }
                        None => {
                            let _ = write!(
                                out,
                                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
                                slot.x, lane.y, slot.width, lane.height, PLACEHOLDER
                            );
                        }
                    }
                }
            }
            LaneKind::Visual => write_markers(&mut out, &model.visual_markers(), lane.y, lane.height),
            LaneKind::Audio => match model.audio_lane() {
                AudioLane::Spectrum { area_path, line_path, bells } => {
                    let _ = write!(
                        out,
                        r#"<g transform="translate(0,{:.2})"><path d="{}" fill="{}" fill-opacity="0.35"/><path d="{}" fill="none" stroke="{}" stroke-width="1"/></g>"#,
                        lane.y, area_path, SPECTRUM_FILL, line_path, SPECTRUM_FILL
                    );
                    write_markers(&mut out, &bells, lane.y, lane.height);
                }
                AudioLane::Markers(markers) => write_markers(&mut out, &markers, lane.y, lane.height),
            },
            LaneKind::Chapters => {
                for segment in model.chapter_segments() {
                    let title = escape_xml(&segment.title);
                    let _ = write!(
                        out,
                        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"><title>{}</title></rect><text x="{:.2}" y="{:.2}" font-size="11" fill="{}">{}</text>"#,
                        segment.x,
                        lane.y,
                        segment.width,
                        lane.height,
                        segment.color,
                        title,
                        segment.x + 4.0,
                        lane.y + lane.height * 0.7,
                        PLAYHEAD,
                        title,
                    );
                }
            }
        }
        out.push_str("</g>");
    }

    let _ = write!(
        out,
        r#"<line class="playhead" x1="{x:.2}" y1="0" x2="{x:.2}" y2="{:.2}" stroke="{}" stroke-width="2"/>"#,
        height,
        PLAYHEAD,
        x = model.playhead_x(),
    );
    out.push_str("</svg>");
    out
}
