use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::canvas::{Color, PixelBuffer, PixelPos, WHITE};
use crate::components::history::CanvasSnapshot;
use crate::ops::fill::flood_fill;
use crate::ops::line::rasterize;
use crate::ops::symmetry::{Symmetry, mirror_path, mirror_points};
use crate::view::ViewPos;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Brush,
    Line,
    Bucket,
    Picker,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[Tool::Brush, Tool::Line, Tool::Bucket, Tool::Picker]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tool::Brush => "Brush",
            Tool::Line => "Line",
            Tool::Bucket => "Fill",
            Tool::Picker => "Color Picker",
        }
    }

    /// Whether the tool reacts to pointer movement with no button held.
    pub fn has_hover(&self) -> bool {
        matches!(self, Tool::Picker)
    }

    /// Whether a gesture with this tool can change pixels (and so needs a
    /// before-snapshot).
    pub fn modifies_canvas(&self) -> bool {
        !matches!(self, Tool::Picker)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tool::Brush => "brush",
            Tool::Line => "line",
            Tool::Bucket => "bucket",
            Tool::Picker => "picker",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown tool '{0}' (expected brush, line, bucket or picker)")]
pub struct UnknownTool(pub String);

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brush" => Ok(Tool::Brush),
            "line" => Ok(Tool::Line),
            "bucket" | "fill" => Ok(Tool::Bucket),
            "picker" | "eyedropper" | "color_picker" => Ok(Tool::Picker),
            _ => Err(UnknownTool(s.to_string())),
        }
    }
}

/// What the color-picker preview should do after a pointer move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HoverPreview {
    /// Show `color` next to the cursor at `at`.
    Show { color: Color, at: ViewPos },
    Hide,
}

/// Emitted on pointer-up for gestures that may have changed the canvas.
pub struct StrokeEvent {
    pub tool: Tool,
    /// Canvas contents at pointer-down.
    pub before: CanvasSnapshot,
}

impl StrokeEvent {
    pub fn description(&self) -> &'static str {
        self.tool.label()
    }

    /// True when `canvas` differs from the pointer-down state.
    pub fn changed(&self, canvas: &PixelBuffer) -> bool {
        self.before.pixels() != canvas
    }
}

/// Active tool, draw color, symmetry and the in-progress gesture.
///
/// Holds no canvas; every event borrows the session's buffer for its duration.
pub struct ToolController {
    active: Tool,
    previous: Tool,
    color: Color,
    pub symmetry: Symmetry,
    pointer_down: bool,
    /// Pixel under the pointer at pointer-down (Line tool start point).
    anchor: Option<PixelPos>,
    /// Tool that owns the current gesture.
    stroke_tool: Tool,
    stroke_before: Option<CanvasSnapshot>,
    /// Set once a one-shot action (picker) has fired; remaining moves are ignored.
    gesture_consumed: bool,
}

impl Default for ToolController {
    fn default() -> Self {
        Self::new(WHITE, Symmetry::NONE)
    }
}

impl ToolController {
    pub fn new(color: Color, symmetry: Symmetry) -> Self {
        Self {
            active: Tool::Brush,
            previous: Tool::Brush,
            color,
            symmetry,
            pointer_down: false,
            anchor: None,
            stroke_tool: Tool::Brush,
            stroke_before: None,
            gesture_consumed: false,
        }
    }

    pub fn active_tool(&self) -> Tool {
        self.active
    }

    pub fn previous_tool(&self) -> Tool {
        self.previous
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn is_pointer_down(&self) -> bool {
        self.pointer_down
    }

    pub fn anchor(&self) -> Option<PixelPos> {
        self.anchor
    }

    /// Switch tools. Ignored mid-gesture; returns whether the tool changed.
    pub fn select_tool(&mut self, tool: Tool) -> bool {
        if self.pointer_down || tool == self.active {
            return false;
        }
        debug!("tool {} -> {}", self.active, tool);
        self.previous = self.active;
        self.active = tool;
        true
    }

    /// Start a gesture at `pixel`. Returns whether a redraw is needed.
    ///
    /// A second press before `pointer_up` is ignored; the open gesture keeps
    /// its anchor and before-snapshot.
    pub fn pointer_down(&mut self, canvas: &mut PixelBuffer, pixel: PixelPos) -> bool {
        if self.pointer_down {
            return false;
        }
        self.pointer_down = true;
        self.anchor = Some(pixel);
        self.stroke_tool = self.active;
        self.gesture_consumed = false;
        self.stroke_before = if self.active.modifies_canvas() {
            Some(CanvasSnapshot::capture(canvas))
        } else {
            None
        };
        self.on_primary(canvas, pixel)
    }

    /// Continue the gesture; a no-op when the button is up.
    pub fn pointer_move(&mut self, canvas: &mut PixelBuffer, pixel: PixelPos) -> bool {
        if !self.pointer_down || self.gesture_consumed {
            return false;
        }
        self.on_primary(canvas, pixel)
    }

    /// Hover handler, run on every pointer move regardless of button state.
    /// `None` when the active tool has no hover behavior.
    pub fn hover(&self, canvas: &PixelBuffer, pixel: PixelPos, at: ViewPos) -> Option<HoverPreview> {
        if !self.active.has_hover() {
            return None;
        }
        Some(match canvas.get_at(pixel) {
            Ok(color) => HoverPreview::Show { color, at },
            Err(_) => HoverPreview::Hide,
        })
    }

    /// End the gesture, handing back its before-snapshot for history.
    pub fn pointer_up(&mut self) -> Option<StrokeEvent> {
        if !self.pointer_down {
            return None;
        }
        self.pointer_down = false;
        self.anchor = None;
        self.gesture_consumed = false;
        self.stroke_before.take().map(|before| StrokeEvent {
            tool: self.stroke_tool,
            before,
        })
    }

    /// Abort the gesture and put the canvas back as it was at pointer-down.
    pub fn cancel(&mut self, canvas: &mut PixelBuffer) -> bool {
        if !self.pointer_down {
            return false;
        }
        if let Some(before) = self.stroke_before.take() {
            before.restore_into(canvas);
        }
        self.pointer_down = false;
        self.anchor = None;
        self.gesture_consumed = false;
        true
    }

    fn on_primary(&mut self, canvas: &mut PixelBuffer, pixel: PixelPos) -> bool {
        match self.active {
            Tool::Brush => self.brush(canvas, pixel),
            Tool::Line => self.line(canvas, pixel),
            Tool::Bucket => self.bucket(canvas, pixel),
            Tool::Picker => self.pick(canvas, pixel),
        }
    }

    fn brush(&self, canvas: &mut PixelBuffer, pixel: PixelPos) -> bool {
        if !canvas.contains(pixel) {
            return false;
        }
        let points = mirror_points(pixel, canvas.size(), self.symmetry);
        canvas.set_many(points, self.color);
        true
    }

    /// Redraw the whole line from the pointer-down state each move.
    fn line(&self, canvas: &mut PixelBuffer, pixel: PixelPos) -> bool {
        let Some(anchor) = self.anchor else {
            return false;
        };
        if !canvas.contains(anchor) || !canvas.contains(pixel) {
            return false;
        }
        if let Some(ref before) = self.stroke_before {
            before.restore_into(canvas);
        }
        let path = rasterize(anchor, pixel);
        let points = mirror_path(&path, canvas.size(), self.symmetry);
        canvas.set_many(points, self.color);
        true
    }

    // Not mirrored: the fill already covers a whole region.
    fn bucket(&self, canvas: &mut PixelBuffer, pixel: PixelPos) -> bool {
        if !canvas.contains(pixel) {
            return false;
        }
        flood_fill(canvas, pixel, self.color) > 0
    }

    fn pick(&mut self, canvas: &PixelBuffer, pixel: PixelPos) -> bool {
        let Ok(color) = canvas.get_at(pixel) else {
            return false;
        };
        self.color = color;
        let back = self.previous;
        self.previous = Tool::Picker;
        self.active = back;
        self.gesture_consumed = true;
        debug!("picked {:?}, back to {}", color.0, back);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::BLACK;
    use image::Rgb;

    const RED: Color = Rgb([255, 0, 0]);

    fn p(x: i32, y: i32) -> PixelPos {
        PixelPos::new(x, y)
    }

    fn canvas(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::new(w, h).unwrap()
    }

    #[test]
    fn test_tool_names_parse() {
        assert_eq!("brush".parse::<Tool>().unwrap(), Tool::Brush);
        assert_eq!("Line".parse::<Tool>().unwrap(), Tool::Line);
        assert_eq!("bucket".parse::<Tool>().unwrap(), Tool::Bucket);
        assert_eq!(" picker ".parse::<Tool>().unwrap(), Tool::Picker);
        assert!("lasso".parse::<Tool>().is_err());
        for tool in Tool::all() {
            assert_eq!(tool.to_string().parse::<Tool>().unwrap(), *tool);
        }
    }

    #[test]
    fn test_brush_paints_on_down_and_drag() {
        let mut c = canvas(5, 5);
        let mut tools = ToolController::new(RED, Symmetry::NONE);
        assert!(tools.pointer_down(&mut c, p(1, 1)));
        assert!(tools.pointer_move(&mut c, p(2, 1)));
        tools.pointer_up();
        assert!(!tools.pointer_move(&mut c, p(3, 1)));
        assert_eq!(c.get(1, 1).unwrap(), RED);
        assert_eq!(c.get(2, 1).unwrap(), RED);
        assert_eq!(c.get(3, 1).unwrap(), BLACK);
    }

    #[test]
    fn test_brush_outside_canvas_is_noop() {
        let mut c = canvas(3, 3);
        let mut tools = ToolController::new(RED, Symmetry::NONE);
        assert!(!tools.pointer_down(&mut c, p(-1, 0)));
        assert!(!tools.pointer_move(&mut c, p(3, 3)));
        assert_eq!(c, canvas(3, 3));
    }

    #[test]
    fn test_brush_with_both_symmetries() {
        let mut c = canvas(10, 10);
        let both = Symmetry {
            horizontal: true,
            vertical: true,
        };
        let mut tools = ToolController::new(RED, both);
        tools.pointer_down(&mut c, p(2, 3));
        for (x, y) in [(2, 3), (7, 3), (2, 6), (7, 6)] {
            assert_eq!(c.get(x, y).unwrap(), RED);
        }
    }

    #[test]
    fn test_line_redraws_from_anchor_without_accumulating() {
        let mut c = canvas(10, 10);
        let mut tools = ToolController::new(RED, Symmetry::NONE);
        tools.select_tool(Tool::Line);
        tools.pointer_down(&mut c, p(0, 0));
        tools.pointer_move(&mut c, p(0, 5));
        assert_eq!(c.get(0, 4).unwrap(), RED);

        // Moving elsewhere erases the previous preview line
        tools.pointer_move(&mut c, p(5, 0));
        assert_eq!(c.get(0, 4).unwrap(), BLACK);
        assert_eq!(c.get(3, 0).unwrap(), RED);
    }

    #[test]
    fn test_line_ignores_out_of_bounds_end() {
        let mut c = canvas(4, 4);
        let mut tools = ToolController::new(RED, Symmetry::NONE);
        tools.select_tool(Tool::Line);
        tools.pointer_down(&mut c, p(0, 0));
        tools.pointer_move(&mut c, p(0, 3));
        let drawn = c.clone();
        assert!(!tools.pointer_move(&mut c, p(9, 9)));
        assert_eq!(c, drawn);
    }

    #[test]
    fn test_line_with_anchor_outside_draws_nothing() {
        let mut c = canvas(4, 4);
        let mut tools = ToolController::new(RED, Symmetry::NONE);
        tools.select_tool(Tool::Line);
        tools.pointer_down(&mut c, p(-2, 0));
        assert!(!tools.pointer_move(&mut c, p(2, 2)));
        assert_eq!(c, canvas(4, 4));
    }

    #[test]
    fn test_line_is_mirrored() {
        let mut c = canvas(6, 6);
        let h = Symmetry {
            horizontal: true,
            vertical: false,
        };
        let mut tools = ToolController::new(RED, h);
        tools.select_tool(Tool::Line);
        tools.pointer_down(&mut c, p(0, 0));
        tools.pointer_move(&mut c, p(0, 3));
        assert_eq!(c.get(5, 0).unwrap(), RED);
        assert_eq!(c.get(5, 2).unwrap(), RED);
    }

    #[test]
    fn test_bucket_is_not_mirrored() {
        let mut c = canvas(4, 1);
        c.set(1, 0, WHITE).unwrap();
        let both = Symmetry {
            horizontal: true,
            vertical: true,
        };
        let mut tools = ToolController::new(RED, both);
        tools.select_tool(Tool::Bucket);
        assert!(tools.pointer_down(&mut c, p(0, 0)));
        assert_eq!(c.get(0, 0).unwrap(), RED);
        assert_eq!(c.get(1, 0).unwrap(), WHITE);
        assert_eq!(c.get(3, 0).unwrap(), BLACK);
    }

    #[test]
    fn test_picker_sets_color_and_returns_to_previous_tool() {
        let mut c = canvas(3, 3);
        c.set(2, 2, RED).unwrap();
        let mut tools = ToolController::new(WHITE, Symmetry::NONE);
        tools.select_tool(Tool::Line);
        tools.select_tool(Tool::Picker);

        assert!(tools.pointer_down(&mut c, p(2, 2)));
        assert_eq!(tools.color(), RED);
        assert_eq!(tools.active_tool(), Tool::Line);

        // The rest of the gesture does not draw with the restored tool
        assert!(!tools.pointer_move(&mut c, p(0, 0)));
        assert!(tools.pointer_up().is_none());
        assert_eq!(c.get(0, 0).unwrap(), BLACK);
    }

    #[test]
    fn test_picker_outside_canvas_keeps_picker() {
        let mut c = canvas(3, 3);
        let mut tools = ToolController::new(WHITE, Symmetry::NONE);
        tools.select_tool(Tool::Picker);
        assert!(!tools.pointer_down(&mut c, p(5, 5)));
        assert_eq!(tools.active_tool(), Tool::Picker);
        assert_eq!(tools.color(), WHITE);
    }

    #[test]
    fn test_picker_hover_preview() {
        let mut c = canvas(3, 3);
        c.set(1, 1, RED).unwrap();
        let mut tools = ToolController::default();
        let at = ViewPos::new(12.0, 12.0);
        assert_eq!(tools.hover(&c, p(1, 1), at), None);

        tools.select_tool(Tool::Picker);
        assert_eq!(
            tools.hover(&c, p(1, 1), at),
            Some(HoverPreview::Show { color: RED, at })
        );
        assert_eq!(tools.hover(&c, p(3, 0), at), Some(HoverPreview::Hide));
    }

    #[test]
    fn test_select_tool_ignored_mid_gesture() {
        let mut c = canvas(3, 3);
        let mut tools = ToolController::default();
        tools.pointer_down(&mut c, p(0, 0));
        assert!(!tools.select_tool(Tool::Line));
        assert_eq!(tools.active_tool(), Tool::Brush);
        tools.pointer_up();
        assert!(tools.select_tool(Tool::Line));
        assert_eq!(tools.previous_tool(), Tool::Brush);
    }

    #[test]
    fn test_stroke_event_reports_change() {
        let mut c = canvas(3, 3);
        let mut tools = ToolController::new(RED, Symmetry::NONE);
        tools.pointer_down(&mut c, p(1, 1));
        let stroke = tools.pointer_up().unwrap();
        assert_eq!(stroke.description(), "Brush");
        assert!(stroke.changed(&c));
        assert_eq!(stroke.before.pixels(), &canvas(3, 3));
    }

    #[test]
    fn test_repeated_down_keeps_first_snapshot() {
        let mut c = canvas(4, 4);
        let mut tools = ToolController::new(RED, Symmetry::NONE);
        tools.pointer_down(&mut c, p(0, 0));
        assert!(!tools.pointer_down(&mut c, p(3, 3)));
        assert_eq!(tools.anchor(), Some(p(0, 0)));
        // The second press did not paint
        assert_eq!(c.get(3, 3).unwrap(), BLACK);
        tools.pointer_move(&mut c, p(1, 0));

        let stroke = tools.pointer_up().unwrap();
        assert_eq!(stroke.before.pixels(), &canvas(4, 4));
        assert!(tools.pointer_up().is_none());
    }

    #[test]
    fn test_tool_flags() {
        assert!(Tool::Picker.has_hover());
        assert!(!Tool::Brush.has_hover());
        assert!(!Tool::Picker.modifies_canvas());
        assert!(Tool::Bucket.modifies_canvas());
    }

    #[test]
    fn test_cancel_restores_canvas() {
        let mut c = canvas(3, 3);
        let mut tools = ToolController::new(RED, Symmetry::NONE);
        tools.pointer_down(&mut c, p(1, 1));
        tools.pointer_move(&mut c, p(2, 2));
        assert!(tools.cancel(&mut c));
        assert_eq!(c, canvas(3, 3));
        assert!(!tools.is_pointer_down());
        assert!(tools.pointer_up().is_none());
    }
}
