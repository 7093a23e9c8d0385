//! Row-addressed drawing surface for the scrolled settings list
//!
//! Content is laid out in content rows starting at 0; the canvas maps them
//! onto the viewport using the scroll offset and drops anything outside it.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

/// Pure scroll state - knows nothing about content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    /// Scroll offset in rows
    pub offset: u16,
    /// Viewport height
    pub viewport: u16,
    /// Total content height
    pub content_height: u16,
}

impl ScrollState {
    pub fn new(viewport: u16) -> Self {
        Self {
            offset: 0,
            viewport,
            content_height: 0,
        }
    }

    pub fn set_viewport(&mut self, height: u16) {
        self.viewport = height;
        self.clamp_offset();
    }

    pub fn set_content_height(&mut self, height: u16) {
        self.content_height = height;
        self.clamp_offset();
    }

    pub fn max_offset(&self) -> u16 {
        self.content_height.saturating_sub(self.viewport)
    }

    fn clamp_offset(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    /// Scroll to ensure a region is visible
    /// If region is taller than viewport, shows the top
    pub fn ensure_visible(&mut self, y: u16, height: u16) {
        if y < self.offset {
            self.offset = y;
        } else if y.saturating_add(height) > self.offset.saturating_add(self.viewport) {
            if height > self.viewport {
                self.offset = y;
            } else {
                self.offset = y + height - self.viewport;
            }
        }
        self.clamp_offset();
    }

    pub fn needs_scrollbar(&self) -> bool {
        self.content_height > self.viewport
    }
}

/// Viewport onto content rows
pub struct Canvas<'a> {
    buf: &'a mut Buffer,
    area: Rect,
    offset: u16,
}

impl<'a> Canvas<'a> {
    pub fn new(buf: &'a mut Buffer, area: Rect, offset: u16) -> Self {
        Self { buf, area, offset }
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn viewport_height(&self) -> u16 {
        self.area.height
    }

    /// Screen rect of a content row, `None` when scrolled out of view
    pub fn row(&self, content_y: u16) -> Option<Rect> {
        if content_y < self.offset {
            return None;
        }
        let screen_y = content_y - self.offset;
        if screen_y >= self.area.height {
            return None;
        }
        Some(Rect::new(
            self.area.x,
            self.area.y + screen_y,
            self.area.width,
            1,
        ))
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        self.buf
    }
}
