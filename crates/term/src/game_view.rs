//! GameView: maps a `core::GameSnapshot` into a terminal framebuffer.
//!
//! This module is pure (no I/O). It can be unit-tested.

use crate::core::GameSnapshot;
use crate::fb::{decimal_digits, CellStyle, FrameBuffer, Rgb};
use crate::types::GRID_SIZE;

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// AI adapter state shown in the side panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterStatusView {
    pub enabled: bool,
    pub client_count: u16,
    pub controller_id: Option<usize>,
    pub streaming_count: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorY {
    Center,
    Top,
}

const FRAME_BG: Rgb = Rgb::new(187, 173, 160);
const EMPTY_BG: Rgb = Rgb::new(205, 193, 180);
const PANEL_BG: Rgb = Rgb::new(0, 0, 0);

/// A lightweight terminal renderer for the 2048 grid.
pub struct GameView {
    /// Tile width in terminal columns.
    cell_w: u16,
    /// Tile height in terminal rows.
    cell_h: u16,
    anchor_y: AnchorY,
}

impl Default for GameView {
    fn default() -> Self {
        // 7x3 fits a 5-digit value with padding at a typical glyph aspect ratio.
        Self {
            cell_w: 7,
            cell_h: 3,
            anchor_y: AnchorY::Center,
        }
    }
}

impl GameView {
    pub fn new(cell_w: u16, cell_h: u16) -> Self {
        Self {
            cell_w: cell_w.max(1),
            cell_h: cell_h.max(1),
            anchor_y: AnchorY::Center,
        }
    }

    pub fn with_anchor_y(mut self, anchor_y: AnchorY) -> Self {
        self.anchor_y = anchor_y;
        self
    }

    /// Outer size of the framed grid in terminal cells.
    pub fn frame_size(&self) -> (u16, u16) {
        (
            GRID_SIZE as u16 * self.cell_w + 2,
            GRID_SIZE as u16 * self.cell_h + 2,
        )
    }

    /// Render the current game state into an existing framebuffer.
    ///
    /// This is the allocation-free hot path. Callers can reuse a framebuffer
    /// across frames and only resize when the terminal size changes.
    pub fn render_into(&self, snap: &GameSnapshot, viewport: Viewport, fb: &mut FrameBuffer) {
        self.render_into_with_adapter(snap, None, viewport, fb);
    }

    pub fn render_into_with_adapter(
        &self,
        snap: &GameSnapshot,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(CellStyle::default().into_cell(' '));

        let (frame_w, frame_h) = self.frame_size();
        let start_x = viewport.width.saturating_sub(frame_w) / 2;
        let start_y = match self.anchor_y {
            AnchorY::Center => viewport.height.saturating_sub(frame_h) / 2,
            AnchorY::Top => 0,
        };

        let border = CellStyle::new(Rgb::new(120, 110, 100), FRAME_BG);
        self.draw_border(fb, start_x, start_y, frame_w, frame_h, border);

        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                let px = start_x + 1 + col as u16 * self.cell_w;
                let py = start_y + 1 + row as u16 * self.cell_h;
                match snap.cells[row][col] {
                    Some(tile) => self.draw_tile(fb, px, py, tile.value, tile.just_merged),
                    None => self.draw_empty(fb, px, py),
                }
            }
        }

        self.draw_side_panel(fb, snap, adapter, viewport, start_x, start_y, frame_w);

        if snap.game_over {
            self.draw_overlay(fb, start_x, start_y, frame_w, frame_h, "GAME OVER", "r: restart");
        } else if snap.awaiting_continue() {
            self.draw_overlay(fb, start_x, start_y, frame_w, frame_h, "YOU WIN!", "c: keep playing");
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, snap: &GameSnapshot, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(snap, viewport, &mut fb);
        fb
    }

    pub fn render_with_adapter(
        &self,
        snap: &GameSnapshot,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
    ) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into_with_adapter(snap, adapter, viewport, &mut fb);
        fb
    }

    fn draw_border(&self, fb: &mut FrameBuffer, x: u16, y: u16, w: u16, h: u16, style: CellStyle) {
        if w < 2 || h < 2 {
            return;
        }

        fb.put_char(x, y, '╭', style);
        fb.put_char(x + w - 1, y, '╮', style);
        fb.put_char(x, y + h - 1, '╰', style);
        fb.put_char(x + w - 1, y + h - 1, '╯', style);

        for dx in 1..w - 1 {
            fb.put_char(x + dx, y, '─', style);
            fb.put_char(x + dx, y + h - 1, '─', style);
        }
        for dy in 1..h - 1 {
            fb.put_char(x, y + dy, '│', style);
            fb.put_char(x + w - 1, y + dy, '│', style);
        }
    }

    fn draw_empty(&self, fb: &mut FrameBuffer, px: u16, py: u16) {
        let style = CellStyle::new(Rgb::new(170, 158, 146), EMPTY_BG).dim();
        fb.fill_rect(px, py, self.cell_w, self.cell_h, ' ', style);
        fb.put_char(px + self.cell_w / 2, py + self.cell_h / 2, '·', style);
    }

    fn draw_tile(&self, fb: &mut FrameBuffer, px: u16, py: u16, value: u32, just_merged: bool) {
        let (fg, bg) = tile_colors(value);
        let mut style = CellStyle::new(fg, bg).bold();
        fb.fill_rect(px, py, self.cell_w, self.cell_h, ' ', style);

        // Separator so neighbouring tiles of equal colour stay distinguishable.
        let edge = CellStyle::new(FRAME_BG, bg);
        for dy in 0..self.cell_h {
            fb.put_char(px + self.cell_w - 1, py + dy, '▕', edge);
        }

        if just_merged {
            style.fg = Rgb::new(255, 255, 255);
        }

        let mut digits = [0u8; 10];
        let len = decimal_digits(value, &mut digits) as u16;
        let inner_w = self.cell_w.saturating_sub(1);
        let tx = px + inner_w.saturating_sub(len) / 2;
        fb.put_u32(tx, py + self.cell_h / 2, value, style);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_side_panel(
        &self,
        fb: &mut FrameBuffer,
        snap: &GameSnapshot,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
        start_x: u16,
        start_y: u16,
        frame_w: u16,
    ) {
        let panel_x = start_x.saturating_add(frame_w).saturating_add(2);
        if panel_x >= viewport.width {
            return;
        }
        let panel_w = viewport.width - panel_x;
        if panel_w < 10 {
            return;
        }

        let label = CellStyle::new(Rgb::new(220, 220, 220), PANEL_BG).bold();
        let value = CellStyle::new(Rgb::new(200, 200, 200), PANEL_BG);

        let mut y = start_y;
        for (name, v) in [
            ("SCORE", snap.score),
            ("BEST", snap.best_score),
            ("MAX", snap.max_tile),
            ("MOVES", snap.moves),
        ] {
            fb.put_str(panel_x, y, name, label);
            y = y.saturating_add(1);
            fb.put_u32(panel_x, y, v, value);
            y = y.saturating_add(2);
        }

        fb.put_str(panel_x, y, "AI", label);
        y = y.saturating_add(1);
        match adapter {
            Some(st) if st.enabled => {
                fb.put_str(panel_x, y, "ON", value);
                y = y.saturating_add(1);
                fb.put_str(panel_x, y, "C", value);
                fb.put_u32(panel_x + 2, y, st.client_count as u32, value);
                y = y.saturating_add(1);
                fb.put_str(panel_x, y, "S", value);
                fb.put_u32(panel_x + 2, y, st.streaming_count as u32, value);
                y = y.saturating_add(1);
                fb.put_str(panel_x, y, "CTRL", value);
                match st.controller_id {
                    Some(id) => {
                        fb.put_u32(panel_x + 5, y, id as u32, value);
                    }
                    None => fb.put_str(panel_x + 5, y, "-", value),
                }
            }
            _ => fb.put_str(panel_x, y, "OFF", value),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_overlay(
        &self,
        fb: &mut FrameBuffer,
        start_x: u16,
        start_y: u16,
        frame_w: u16,
        frame_h: u16,
        title: &str,
        hint: &str,
    ) {
        let mid_y = start_y.saturating_add(frame_h / 2);
        let style = CellStyle::new(Rgb::new(255, 255, 255), Rgb::new(0, 0, 0)).bold();
        let hint_style = CellStyle::new(Rgb::new(200, 200, 200), Rgb::new(0, 0, 0));

        for (dy, text, st) in [(0u16, title, style), (1, hint, hint_style)] {
            let text_w = text.chars().count() as u16;
            let x = start_x.saturating_add(frame_w.saturating_sub(text_w) / 2);
            fb.put_str(x, mid_y.saturating_add(dy).saturating_sub(1), text, st);
        }
    }
}

/// Foreground/background for a tile value (classic palette, dark past 2048).
fn tile_colors(value: u32) -> (Rgb, Rgb) {
    let dark = Rgb::new(119, 110, 101);
    let light = Rgb::new(249, 246, 242);
    match value {
        2 => (dark, Rgb::new(238, 228, 218)),
        4 => (dark, Rgb::new(237, 224, 200)),
        8 => (light, Rgb::new(242, 177, 121)),
        16 => (light, Rgb::new(245, 149, 99)),
        32 => (light, Rgb::new(246, 124, 95)),
        64 => (light, Rgb::new(246, 94, 59)),
        128 => (light, Rgb::new(237, 207, 114)),
        256 => (light, Rgb::new(237, 204, 97)),
        512 => (light, Rgb::new(237, 200, 80)),
        1024 => (light, Rgb::new(237, 197, 63)),
        2048 => (light, Rgb::new(237, 194, 46)),
        _ => (light, Rgb::new(60, 58, 50)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TileSnapshot;

    #[test]
    fn frame_size_matches_cells() {
        assert_eq!(GameView::default().frame_size(), (30, 14));
        assert_eq!(GameView::new(5, 1).frame_size(), (22, 6));
    }

    #[test]
    fn tile_value_is_centered_in_cell() {
        let mut snap = GameSnapshot::default();
        snap.cells[0][0] = Some(TileSnapshot {
            id: 1,
            value: 64,
            just_merged: false,
        });
        let view = GameView::default();
        let fb = view.render(&snap, Viewport::new(30, 14));

        // Inner origin (1,1); 6 usable columns, 2 digits => offset 2; middle row 1.
        assert_eq!(fb.get(3, 2).unwrap().ch, '6');
        assert_eq!(fb.get(4, 2).unwrap().ch, '4');
        assert_eq!(fb.get(3, 2).unwrap().style.bg, Rgb::new(246, 94, 59));
    }

    #[test]
    fn palette_falls_back_past_2048() {
        assert_eq!(tile_colors(4096), tile_colors(1 << 16));
        assert_ne!(tile_colors(2), tile_colors(4));
    }
}
