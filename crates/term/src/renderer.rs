//! TerminalRenderer: flushes a framebuffer to a real terminal.
//!
//! Frames are encoded into a reusable byte buffer with crossterm commands and
//! written in one syscall. After the first frame only changed runs are sent.

use std::io::{self, Write};

use anyhow::Result;

use crossterm::{
    cursor,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal, QueueableCommand,
};

use crate::fb::{Cell, CellStyle, FrameBuffer, Rgb};

/// Unchanged cells shorter than this between two dirty runs are re-sent
/// instead of emitting another cursor move.
const RUN_BRIDGE: u16 = 3;

pub struct TerminalRenderer<W: Write = io::Stdout> {
    out: W,
    last: Option<FrameBuffer>,
    buf: Vec<u8>,
}

impl TerminalRenderer<io::Stdout> {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Switch the terminal into raw mode on the alternate screen.
    pub fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.buf.clear();
        self.buf.queue(terminal::EnterAlternateScreen)?;
        self.buf.queue(cursor::Hide)?;
        self.buf.queue(terminal::DisableLineWrap)?;
        self.flush_buf()
    }

    /// Restore the terminal. Safe to call after a failed `enter`.
    pub fn exit(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.queue(ResetColor)?;
        self.buf.queue(SetAttribute(Attribute::Reset))?;
        self.buf.queue(terminal::EnableLineWrap)?;
        self.buf.queue(cursor::Show)?;
        self.buf.queue(terminal::LeaveAlternateScreen)?;
        self.flush_buf()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }
}

impl Default for TerminalRenderer<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out,
            last: None,
            buf: Vec::with_capacity(16 * 1024),
        }
    }

    /// Force the next draw to be a full redraw (terminal resize).
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Draw `fb`, then swap it with the previous frame.
    ///
    /// After the call `fb` holds stale content from an older frame; callers
    /// re-render into it before the next draw.
    pub fn draw_swap(&mut self, fb: &mut FrameBuffer) -> Result<()> {
        self.buf.clear();
        match self.last.take() {
            Some(mut prev) if prev.width() == fb.width() && prev.height() == fb.height() => {
                encode_diff_into(&prev, fb, &mut self.buf)?;
                std::mem::swap(&mut prev, fb);
                self.last = Some(prev);
            }
            _ => {
                encode_full_into(fb, &mut self.buf)?;
                let mut prev = FrameBuffer::new(fb.width(), fb.height());
                std::mem::swap(&mut prev, fb);
                self.last = Some(prev);
            }
        }
        if !self.buf.is_empty() {
            self.flush_buf()?;
        }
        Ok(())
    }

    /// Bytes of the most recent draw.
    pub fn last_output(&self) -> &[u8] {
        &self.buf
    }

    fn flush_buf(&mut self) -> Result<()> {
        self.out.write_all(&self.buf)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Tracks the style last sent so unchanged attributes are not repeated.
struct StyleState {
    current: Option<CellStyle>,
}

impl StyleState {
    fn new() -> Self {
        Self { current: None }
    }

    fn print(&mut self, out: &mut Vec<u8>, cell: Cell) -> Result<()> {
        if self.current != Some(cell.style) {
            let prev = self.current;
            let attrs_changed =
                prev.map_or(true, |p| p.bold != cell.style.bold || p.dim != cell.style.dim);
            if attrs_changed {
                out.queue(SetAttribute(Attribute::Reset))?;
                if cell.style.bold {
                    out.queue(SetAttribute(Attribute::Bold))?;
                }
                if cell.style.dim {
                    out.queue(SetAttribute(Attribute::Dim))?;
                }
            }
            // Attribute::Reset also resets colours.
            if attrs_changed || prev.map(|p| p.fg) != Some(cell.style.fg) {
                out.queue(SetForegroundColor(rgb_to_color(cell.style.fg)))?;
            }
            if attrs_changed || prev.map(|p| p.bg) != Some(cell.style.bg) {
                out.queue(SetBackgroundColor(rgb_to_color(cell.style.bg)))?;
            }
            self.current = Some(cell.style);
        }
        out.queue(Print(cell.ch))?;
        Ok(())
    }

    fn finish(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.current.is_some() {
            out.queue(ResetColor)?;
            out.queue(SetAttribute(Attribute::Reset))?;
        }
        Ok(())
    }
}

/// Encode a full-frame redraw into `out`.
pub fn encode_full_into(fb: &FrameBuffer, out: &mut Vec<u8>) -> Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let mut style = StyleState::new();
    let width = fb.width() as usize;
    if width == 0 {
        return Ok(());
    }
    for (y, row) in fb.cells().chunks(width).enumerate() {
        out.queue(cursor::MoveTo(0, y as u16))?;
        for &cell in row {
            style.print(out, cell)?;
        }
    }
    style.finish(out)
}

/// Encode only the cells that differ between `prev` and `next`.
///
/// Both buffers must have the same dimensions; otherwise a full redraw is
/// encoded instead.
pub fn encode_diff_into(prev: &FrameBuffer, next: &FrameBuffer, out: &mut Vec<u8>) -> Result<()> {
    if prev.width() != next.width() || prev.height() != next.height() {
        return encode_full_into(next, out);
    }
    let mut style = StyleState::new();
    for_each_changed_run(prev, next, |x, y, run| {
        out.queue(cursor::MoveTo(x, y))?;
        for &cell in run {
            style.print(out, cell)?;
        }
        Ok(())
    })?;
    style.finish(out)
}

fn rgb_to_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}

/// Call `f(x, y, cells)` for each dirty run of `next` (same-size buffers).
fn for_each_changed_run(
    prev: &FrameBuffer,
    next: &FrameBuffer,
    mut f: impl FnMut(u16, u16, &[Cell]) -> Result<()>,
) -> Result<()> {
    let width = next.width() as usize;
    if width == 0 {
        return Ok(());
    }

    for (y, (a, b)) in prev
        .cells()
        .chunks(width)
        .zip(next.cells().chunks(width))
        .enumerate()
    {
        let mut run: Option<(usize, usize)> = None;
        for x in 0..width {
            if a[x] == b[x] {
                continue;
            }
            run = match run {
                Some((start, end)) if x - end <= RUN_BRIDGE as usize => Some((start, x + 1)),
                Some((start, end)) => {
                    f(start as u16, y as u16, &b[start..end])?;
                    Some((x, x + 1))
                }
                None => Some((x, x + 1)),
            };
        }
        if let Some((start, end)) = run {
            f(start as u16, y as u16, &b[start..end])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(a: &FrameBuffer, b: &FrameBuffer) -> Vec<(u16, u16, usize)> {
        let mut out = Vec::new();
        for_each_changed_run(a, b, |x, y, cells| {
            out.push((x, y, cells.len()));
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn identical_frames_produce_no_runs() {
        let a = FrameBuffer::new(8, 3);
        assert!(runs(&a, &a.clone()).is_empty());
    }

    #[test]
    fn nearby_changes_are_bridged() {
        let style = CellStyle::default();
        let a = FrameBuffer::new(12, 1);
        let mut b = a.clone();
        b.put_char(1, 0, 'x', style);
        b.put_char(3, 0, 'y', style);
        b.put_char(10, 0, 'z', style);
        assert_eq!(runs(&a, &b), vec![(1, 0, 3), (10, 0, 1)]);
    }

    #[test]
    fn runs_do_not_cross_rows() {
        let style = CellStyle::default();
        let a = FrameBuffer::new(4, 2);
        let mut b = a.clone();
        b.put_char(3, 0, 'x', style);
        b.put_char(0, 1, 'y', style);
        assert_eq!(runs(&a, &b), vec![(3, 0, 1), (0, 1, 1)]);
    }

    #[test]
    fn draw_swap_sends_full_then_diff() {
        let style = CellStyle::default();
        let mut renderer = TerminalRenderer::with_writer(Vec::new());
        let mut fb = FrameBuffer::new(6, 2);
        fb.put_str(0, 0, "2048", style);
        renderer.draw_swap(&mut fb).unwrap();
        let full_len = renderer.last_output().len();
        assert!(String::from_utf8_lossy(renderer.last_output()).contains("2048"));

        // Re-render the same frame: nothing to send.
        fb.clear(Cell::default());
        fb.put_str(0, 0, "2048", style);
        renderer.draw_swap(&mut fb).unwrap();
        assert!(renderer.last_output().is_empty());

        fb.clear(Cell::default());
        fb.put_str(0, 0, "4096", style);
        renderer.draw_swap(&mut fb).unwrap();
        let diff = String::from_utf8_lossy(renderer.last_output()).into_owned();
        assert!(diff.contains("409"));
        assert!(renderer.last_output().len() < full_len);
    }

    #[test]
    fn size_change_forces_full_redraw() {
        let mut renderer = TerminalRenderer::with_writer(Vec::new());
        let mut fb = FrameBuffer::new(3, 1);
        renderer.draw_swap(&mut fb).unwrap();
        let mut bigger = FrameBuffer::new(5, 2);
        renderer.draw_swap(&mut bigger).unwrap();
        let clear = {
            let mut v = Vec::new();
            v.queue(terminal::Clear(terminal::ClearType::All)).unwrap();
            v
        };
        assert!(renderer.last_output().starts_with(&clear));
    }
}
