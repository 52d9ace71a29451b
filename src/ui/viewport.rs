//! Scrollable window over a list of lines.
//!
//! The document pane and both sidebar panes each own a [`Viewport`]; only
//! the line counts differ.

use std::ops::Range;

/// The visible slice of a line list.
///
/// # Example
///
/// ```
/// use docshelf::ui::viewport::Viewport;
///
/// let mut vp = Viewport::new(80, 24, 100);
/// assert_eq!(vp.visible_range(), 0..24);
///
/// vp.scroll_down(10);
/// assert_eq!(vp.visible_range(), 10..34);
///
/// vp.reveal_line(60);
/// assert!(vp.visible_range().contains(&60));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    width: u16,
    height: u16,
    offset: usize,
    total_lines: usize,
}

impl Viewport {
    /// Create a viewport of `width` x `height` cells over `total_lines` lines.
    pub const fn new(width: u16, height: u16, total_lines: usize) -> Self {
        Self {
            width,
            height,
            offset: 0,
            total_lines,
        }
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub const fn width(&self) -> u16 {
        self.width
    }

    pub const fn height(&self) -> u16 {
        self.height
    }

    pub const fn total_lines(&self) -> usize {
        self.total_lines
    }

    /// Line indices currently on screen.
    pub fn visible_range(&self) -> Range<usize> {
        let end = (self.offset + self.height as usize).min(self.total_lines);
        self.offset..end
    }

    /// How far through the list the bottom edge is, 0-100.
    pub fn scroll_percent(&self) -> u8 {
        let max = self.max_offset();
        if max == 0 {
            return 100;
        }
        #[allow(clippy::cast_possible_truncation)]
        let percent = (self.offset.min(max) * 100 / max) as u8;
        percent
    }

    pub const fn can_scroll_up(&self) -> bool {
        self.offset > 0
    }

    pub const fn can_scroll_down(&self) -> bool {
        self.offset < self.max_offset()
    }

    pub const fn scroll_up(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.max_offset());
    }

    pub const fn page_up(&mut self) {
        self.scroll_up(self.page_step());
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.page_step());
    }

    pub const fn half_page_up(&mut self) {
        self.scroll_up(self.height as usize / 2);
    }

    pub fn half_page_down(&mut self) {
        self.scroll_down(self.height as usize / 2);
    }

    pub const fn go_to_top(&mut self) {
        self.offset = 0;
    }

    pub const fn go_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    /// Put `line` at the top of the window, as far as the list allows.
    pub fn go_to_line(&mut self, line: usize) {
        self.offset = line.min(self.max_offset());
    }

    /// Scroll the least amount that brings `line` on screen.
    pub fn reveal_line(&mut self, line: usize) {
        if line < self.offset {
            self.offset = line;
        } else if self.height > 0 && line >= self.offset + self.height as usize {
            self.offset = (line + 1 - self.height as usize).min(self.max_offset());
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Replace the line count, keeping the offset in range.
    pub fn set_total_lines(&mut self, total: usize) {
        self.total_lines = total;
        self.offset = self.offset.min(self.max_offset());
    }

    /// A page keeps one line of context.
    const fn page_step(&self) -> usize {
        let height = self.height as usize;
        if height > 1 { height - 1 } else { 1 }
    }

    const fn max_offset(&self) -> usize {
        self.total_lines.saturating_sub(self.height as usize)
    }
}
