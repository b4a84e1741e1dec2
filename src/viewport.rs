//! Per-frame tracking of the viewport panel reported by the UI.
//!
//! The UI lays out a dedicated panel each frame and reports its content
//! rectangle. [`ViewportTracker`] turns those reports into a [`Viewport`] with
//! edge-triggered `resized`/`moved` flags. It only reports facts: deciding
//! when to reallocate render targets is the frame driver's job.

use glam::Vec2;

/// What the UI reports about the viewport panel for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelReport {
    /// Top-left corner of the content region in window pixels.
    pub position: Vec2,
    /// Size of the content region in pixels. May be zero or negative while
    /// the panel is collapsed or being docked.
    pub size: Vec2,
    /// Pointer is over the panel.
    pub hovered: bool,
    /// The panel's window has keyboard focus.
    pub window_focused: bool,
}

impl PanelReport {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            hovered: false,
            window_focused: false,
        }
    }
}

/// Resolved viewport state for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub position: Vec2,
    pub width: u32,
    pub height: u32,
    pub hovered: bool,
    /// Window focus with moves and resizes filtered out.
    pub focused: bool,
    /// Size changed since the previous frame. Cleared by
    /// [`ViewportTracker::take_resize`].
    pub resized: bool,
    /// Position changed since the previous frame.
    pub moved: bool,
}

impl Viewport {
    /// Viewport of the given size at the origin, with no pending flags.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            position: Vec2::ZERO,
            width: width.max(1),
            height: height.max(1),
            hovered: false,
            focused: false,
            resized: false,
            moved: false,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Clamp a UI extent to a whole pixel count of at least one.
pub fn clamp_extent(value: f32) -> u32 {
    if value.is_finite() && value >= 1.0 {
        value.min(u32::MAX as f32) as u32
    } else {
        1
    }
}

/// Tracks the viewport panel across frames.
#[derive(Debug)]
pub struct ViewportTracker {
    viewport: Viewport,
    refreshed: bool,
}

impl ViewportTracker {
    /// Start tracking from the size the render targets were created with, so
    /// the first report only raises `resized` when the panel differs.
    pub fn new(initial_width: u32, initial_height: u32) -> Self {
        Self {
            viewport: Viewport::with_size(initial_width, initial_height),
            refreshed: false,
        }
    }

    /// Fold this frame's panel report into the viewport state.
    ///
    /// Call once per UI frame before anything reads the viewport.
    pub fn refresh(&mut self, report: PanelReport) -> &Viewport {
        let width = clamp_extent(report.size.x);
        let height = clamp_extent(report.size.y);

        let resized = width != self.viewport.width || height != self.viewport.height;
        // The first report has no previous position to compare against.
        let moved = self.refreshed && report.position != self.viewport.position;

        let vp = &mut self.viewport;
        vp.resized |= resized;
        vp.moved = moved;
        vp.width = width;
        vp.height = height;
        vp.position = report.position;
        vp.hovered = report.hovered;
        vp.focused = report.window_focused && !(moved || resized);

        self.refreshed = true;
        &self.viewport
    }

    /// Consume the resize edge, returning the new size if one is pending.
    pub fn take_resize(&mut self) -> Option<(u32, u32)> {
        if self.viewport.resized {
            self.viewport.resized = false;
            Some(self.viewport.size())
        } else {
            None
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(x: f32, y: f32, w: f32, h: f32) -> PanelReport {
        PanelReport::new(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[test]
    fn test_same_size_is_not_a_resize() {
        let mut tracker = ViewportTracker::new(640, 480);
        assert!(!tracker.refresh(report(0.0, 0.0, 640.0, 480.0)).resized);
        assert_eq!(tracker.take_resize(), None);
    }

    #[test]
    fn test_resize_edge_is_consumed_once() {
        let mut tracker = ViewportTracker::new(640, 480);
        assert!(tracker.refresh(report(0.0, 0.0, 800.0, 600.0)).resized);
        assert_eq!(tracker.take_resize(), Some((800, 600)));
        assert_eq!(tracker.take_resize(), None);
    }

    #[test]
    fn test_degenerate_panel_clamps_to_one() {
        let mut tracker = ViewportTracker::new(10, 10);
        let vp = tracker.refresh(report(0.0, 0.0, 0.0, -25.0));
        assert_eq!(vp.size(), (1, 1));
        let vp = tracker.refresh(report(0.0, 0.0, f32::NAN, 0.4));
        assert_eq!(vp.size(), (1, 1));
    }

    #[test]
    fn test_move_suppresses_focus() {
        let mut tracker = ViewportTracker::new(100, 100);
        let mut r = report(10.0, 10.0, 100.0, 100.0);
        r.window_focused = true;
        assert!(tracker.refresh(r).focused);

        r.position = Vec2::new(20.0, 10.0);
        let vp = tracker.refresh(r);
        assert!(vp.moved);
        assert!(!vp.focused);

        // Settled in the new spot: focus comes back.
        let vp = tracker.refresh(r);
        assert!(!vp.moved);
        assert!(vp.focused);
    }

    #[test]
    fn test_resize_suppresses_focus() {
        let mut tracker = ViewportTracker::new(100, 100);
        let mut r = report(0.0, 0.0, 120.0, 100.0);
        r.window_focused = true;
        r.hovered = true;
        let vp = tracker.refresh(r);
        assert!(vp.resized);
        assert!(vp.hovered);
        assert!(!vp.focused);
    }

    #[test]
    fn test_fractional_sizes_truncate() {
        let mut tracker = ViewportTracker::new(1, 1);
        assert_eq!(tracker.refresh(report(0.0, 0.0, 799.7, 600.2)).size(), (799, 600));
    }
}
