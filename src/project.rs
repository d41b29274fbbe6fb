use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use image::{DynamicImage, RgbaImage};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::canvas::{Color, PixelBuffer};
use crate::components::history::HistoryManager;
use crate::components::shortcuts::{Shortcut, ShortcutOutcome};
use crate::components::tools::{HoverPreview, Tool, ToolController, UnknownTool};
use crate::error::{LoadWarning, ProjectError};
use crate::io::{
    ExportFormat, FileStore, MAX_CANVAS_DIM, PROJECT_EXTENSION, ProjectFile, ProjectKind,
    ProjectStore, autosave_path,
};
use crate::ops::symmetry::{Axis, Symmetry};
use crate::render::{self, RenderRegion};
use crate::settings::EditorSettings;
use crate::view::{ViewPos, Viewport};

/// Storage backend shared with the background autosave writer.
pub type SharedStore = Arc<dyn ProjectStore + Send + Sync>;

// ============================================================================
// NEW PROJECT
// ============================================================================

/// Parameters collected by the new-project dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewProjectRequest {
    pub name: String,
    pub size: (u32, u32),
    pub kind: ProjectKind,
    /// Where the first save goes; `None` leaves the project untitled.
    pub path: Option<PathBuf>,
}

impl NewProjectRequest {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            size: (width, height),
            kind: ProjectKind::Bracelet,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<(), ProjectError> {
        if self.name.trim().is_empty() {
            return Err(ProjectError::InvalidRequest("project name is empty".into()));
        }
        let (w, h) = self.size;
        if w == 0 || h == 0 || w > MAX_CANVAS_DIM || h > MAX_CANVAS_DIM {
            return Err(ProjectError::InvalidRequest(format!(
                "canvas size {}x{} is outside 1..={}",
                w, h, MAX_CANVAS_DIM
            )));
        }
        Ok(())
    }
}

const UNSAFE_FILE_CHARS: &[char] = &[
    '#', '%', '&', '{', '}', '\\', '<', '>', '*', '?', '/', ' ', '$', '!', '\'', '"', ':', '@',
    '+', '`', '|', '=',
];

/// Replace characters that are awkward in file names with `_`.
pub fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_FILE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// `<default_save_location>/<safe name>.dpct`
pub fn default_project_path(settings: &EditorSettings, name: &str) -> PathBuf {
    settings
        .default_save_location
        .join(format!("{}.{}", safe_file_name(name), PROJECT_EXTENSION))
}

/// Canvas length in beads for a bracelet of `length_cm`, with beads
/// `bead_width_tenths_mm` tenths of a millimetre wide.
pub fn bracelet_length_px(length_cm: f64, bead_width_tenths_mm: u32) -> Result<u32, ProjectError> {
    if bead_width_tenths_mm == 0 {
        return Err(ProjectError::InvalidRequest("bead width must be greater than zero".into()));
    }
    if !length_cm.is_finite() || length_cm < 0.0 {
        return Err(ProjectError::InvalidRequest(format!("invalid length {} cm", length_cm)));
    }
    let bead_mm = bead_width_tenths_mm as f64 / 10.0;
    let px = (length_cm * 10.0 / bead_mm).round_ties_even();
    if px > MAX_CANVAS_DIM as f64 {
        return Err(ProjectError::InvalidRequest(format!(
            "{} beads exceeds the {} limit",
            px, MAX_CANVAS_DIM
        )));
    }
    Ok(px as u32)
}

// ============================================================================
// AUTOSAVE
// ============================================================================

/// A project record being written on the rayon pool.
pub struct AutosaveJob {
    pub path: PathBuf,
    rx: Receiver<Result<(), ProjectError>>,
}

impl AutosaveJob {
    fn spawn(file: ProjectFile, path: PathBuf, store: SharedStore) -> Self {
        let (tx, rx) = mpsc::channel();
        let dest = path.clone();
        rayon::spawn(move || {
            let result = store.save(&file, &dest);
            // Receiver may already be gone if the project was closed.
            let _ = tx.send(result);
        });
        Self { path, rx }
    }

    /// Non-blocking check. `None` while the write is still running.
    pub fn try_result(&self) -> Option<Result<(), ProjectError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(self.lost())),
        }
    }

    /// Block until the write finishes.
    pub fn wait(self) -> Result<(), ProjectError> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(self.lost()),
        }
    }

    fn lost(&self) -> ProjectError {
        ProjectError::WriteFailure {
            path: self.path.clone(),
            reason: "autosave worker exited without reporting".into(),
        }
    }
}

// ============================================================================
// EDITING SESSION
// ============================================================================

/// What the shell should do after a pointer event.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerOutcome {
    pub redraw: bool,
    pub hover: Option<HoverPreview>,
}

/// Single open document.
pub struct Project {
    pub id: Uuid,
    /// Display name, stored in the project file.
    pub name: String,
    pub kind: ProjectKind,
    /// `None` for untitled projects.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    canvas: PixelBuffer,
    tools: ToolController,
    viewport: Viewport,
    history: HistoryManager,
    settings: EditorSettings,
    store: SharedStore,

    last_save: Instant,
    autosave: Option<AutosaveJob>,
}

impl Project {
    /// Fresh canvas filled with the settings' default color.
    pub fn new(request: NewProjectRequest, settings: EditorSettings) -> Result<Self, ProjectError> {
        request.validate()?;
        let (w, h) = request.size;
        let canvas = PixelBuffer::filled(w, h, settings.default_color())?;
        info!("new project '{}' ({}x{})", request.name, w, h);
        Ok(Self::assemble(
            request.name,
            request.kind,
            request.path,
            canvas,
            settings,
            Arc::new(FileStore),
        ))
    }

    /// Load `path` through the filesystem store.
    pub fn open(
        path: &Path,
        settings: EditorSettings,
    ) -> Result<(Self, Option<LoadWarning>), ProjectError> {
        Self::open_with(path, Arc::new(FileStore), settings)
    }

    pub fn open_with(
        path: &Path,
        store: SharedStore,
        settings: EditorSettings,
    ) -> Result<(Self, Option<LoadWarning>), ProjectError> {
        let loaded = store.load(path)?;
        let project = Self::assemble(
            loaded.file.name,
            loaded.file.kind,
            Some(path.to_path_buf()),
            loaded.canvas,
            settings,
            store,
        );
        Ok((project, loaded.warning))
    }

    /// Swap the storage backend (used by embedders and tests).
    pub fn with_store(mut self, store: SharedStore) -> Self {
        self.store = store;
        self
    }

    fn assemble(
        name: String,
        kind: ProjectKind,
        path: Option<PathBuf>,
        canvas: PixelBuffer,
        settings: EditorSettings,
        store: SharedStore,
    ) -> Self {
        let symmetry = Symmetry {
            horizontal: settings.symmetry.horizontal,
            vertical: settings.symmetry.vertical,
        };
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            path,
            is_dirty: false,
            canvas,
            tools: ToolController::new(settings.default_color(), symmetry),
            viewport: Viewport::new(settings.zoom_mode),
            history: HistoryManager::new(settings.history_capacity),
            settings,
            store,
            last_save: Instant::now(),
            autosave: None,
        }
    }

    pub fn canvas(&self) -> &PixelBuffer {
        &self.canvas
    }

    pub fn tools(&self) -> &ToolController {
        &self.tools
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Snapshot of the document as a serializable record.
    pub fn to_file(&self) -> ProjectFile {
        ProjectFile::from_canvas(&self.name, self.kind, &self.canvas)
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    // -- tool state --------------------------------------------------------

    pub fn select_tool(&mut self, tool: Tool) -> bool {
        self.tools.select_tool(tool)
    }

    /// Select a tool by its API name (`brush`, `line`, `bucket`, `picker`).
    pub fn select_tool_named(&mut self, name: &str) -> Result<bool, UnknownTool> {
        Ok(self.select_tool(name.parse()?))
    }

    pub fn set_color(&mut self, color: Color) {
        self.tools.set_color(color);
    }

    pub fn color(&self) -> Color {
        self.tools.color()
    }

    pub fn toggle_symmetry(&mut self, axis: Axis) {
        self.tools.symmetry.toggle(axis);
    }

    pub fn set_symmetry(&mut self, symmetry: Symmetry) {
        self.tools.symmetry = symmetry;
    }

    pub fn symmetry(&self) -> Symmetry {
        self.tools.symmetry
    }

    // -- view ----------------------------------------------------------------

    pub fn set_zoom(&mut self, factor: f32) {
        self.viewport.set_zoom(factor);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Mouse-wheel zoom.
    pub fn scroll_zoom(&mut self, delta: f32) {
        self.viewport.apply_wheel(delta);
    }

    /// Where the canvas' top-left corner sits in the view.
    pub fn set_canvas_origin(&mut self, origin: ViewPos) {
        self.viewport.origin = origin;
    }

    /// Whole canvas at the current zoom. Allocation grows with zoom squared;
    /// interactive shells should prefer [`Project::render_visible`].
    pub fn render(&self) -> RgbaImage {
        render::render(&self.canvas, self.viewport.zoom(), &self.settings.grid)
    }

    /// The part of the canvas inside a `view_width x view_height` viewport,
    /// plus the view position to draw it at. `None` when the canvas is
    /// scrolled fully out of view.
    pub fn render_visible(&self, view_width: u32, view_height: u32) -> Option<(RgbaImage, ViewPos)> {
        let origin = self.viewport.origin;
        let x = (-origin.x).max(0.0).floor();
        let y = (-origin.y).max(0.0).floor();
        let region = RenderRegion {
            x: x as u32,
            y: y as u32,
            width: (view_width as f32 - origin.x.max(0.0)).max(0.0).ceil() as u32,
            height: (view_height as f32 - origin.y.max(0.0)).max(0.0).ceil() as u32,
        };
        let image = render::render_region(&self.canvas, self.viewport.zoom(), &self.settings.grid, region)?;
        Some((image, ViewPos::new(origin.x + x, origin.y + y)))
    }

    // -- pointer -------------------------------------------------------------

    pub fn pointer_down(&mut self, view: ViewPos) -> PointerOutcome {
        let pixel = self.viewport.to_image(view);
        let was_picker = self.tools.active_tool() == Tool::Picker;
        let redraw = self.tools.pointer_down(&mut self.canvas, pixel);
        // A pick hands control back to the previous tool; drop its preview.
        let hover = (was_picker && self.tools.active_tool() != Tool::Picker)
            .then_some(HoverPreview::Hide);
        PointerOutcome { redraw, hover }
    }

    pub fn pointer_move(&mut self, view: ViewPos) -> PointerOutcome {
        let pixel = self.viewport.to_image(view);
        let redraw = self.tools.pointer_move(&mut self.canvas, pixel);
        let hover = self.tools.hover(&self.canvas, pixel, view);
        PointerOutcome { redraw, hover }
    }

    /// End the gesture. Records one undo step if the canvas changed.
    pub fn pointer_up(&mut self) -> PointerOutcome {
        if let Some(stroke) = self.tools.pointer_up() {
            if stroke.changed(&self.canvas) {
                debug!("history: {}", stroke.description());
                self.history.push_undo(stroke.description(), stroke.before);
                self.is_dirty = true;
            }
        }
        PointerOutcome::default()
    }

    pub fn is_pointer_down(&self) -> bool {
        self.tools.is_pointer_down()
    }

    /// Abandon the current gesture (e.g. Escape or focus loss) and put the
    /// canvas back as it was at pointer-down. Nothing is recorded in history.
    pub fn cancel_gesture(&mut self) -> bool {
        self.tools.cancel(&mut self.canvas)
    }

    // -- history -------------------------------------------------------------

    /// Ignored while a gesture is in progress. Returns whether the canvas changed.
    pub fn undo(&mut self) -> bool {
        if self.tools.is_pointer_down() {
            return false;
        }
        match self.history.undo(&mut self.canvas) {
            Some(desc) => {
                debug!("undo: {}", desc);
                self.is_dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.tools.is_pointer_down() {
            return false;
        }
        match self.history.redo(&mut self.canvas) {
            Some(desc) => {
                debug!("redo: {}", desc);
                self.is_dirty = true;
                true
            }
            None => false,
        }
    }

    // -- persistence ---------------------------------------------------------

    /// Save to the current path. Untitled projects must use [`Project::save_as`].
    pub fn save(&mut self) -> Result<(), ProjectError> {
        let Some(path) = self.path.clone() else {
            return Err(ProjectError::InvalidRequest("project has no save location".into()));
        };
        self.write_to(&path)
    }

    /// Save to `path` and adopt it as the current path on success.
    pub fn save_as(&mut self, path: &Path) -> Result<(), ProjectError> {
        self.write_to(path)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn write_to(&mut self, path: &Path) -> Result<(), ProjectError> {
        if let Err(e) = self.store.save(&self.to_file(), path) {
            warn!("save failed: {}", e);
            return Err(e);
        }
        self.is_dirty = false;
        self.last_save = Instant::now();
        Ok(())
    }

    /// Write the canvas at native size. `format` defaults to the one
    /// implied by the path's extension.
    pub fn export_raster(
        &self,
        path: &Path,
        format: Option<ExportFormat>,
    ) -> Result<(), ProjectError> {
        let format = match format.or_else(|| ExportFormat::from_path(path)) {
            Some(f) => f,
            None => {
                return Err(ProjectError::InvalidRequest(format!(
                    "cannot infer an export format from {}",
                    path.display()
                )));
            }
        };
        let image = DynamicImage::ImageRgb8(self.canvas.as_image().clone());
        crate::io::export_raster(image, path, format).inspect_err(|e| warn!("export failed: {}", e))
    }

    /// Dispatch a keyboard command. `destination` answers a previous
    /// [`ShortcutOutcome::NeedsPath`].
    pub fn handle_shortcut(
        &mut self,
        shortcut: Shortcut,
        destination: Option<&Path>,
    ) -> Result<ShortcutOutcome, ProjectError> {
        if shortcut.needs_destination() && destination.is_none() {
            return Ok(ShortcutOutcome::NeedsPath(shortcut));
        }
        match shortcut {
            Shortcut::Undo => Ok(self.history_outcome(|p| p.undo())),
            Shortcut::Redo => Ok(self.history_outcome(|p| p.redo())),
            Shortcut::Save => match (destination, self.path.is_some()) {
                (Some(path), _) => self.save_as(path).map(|_| ShortcutOutcome::Done { redraw: false }),
                (None, true) => self.save().map(|_| ShortcutOutcome::Done { redraw: false }),
                (None, false) => Ok(ShortcutOutcome::NeedsPath(Shortcut::Save)),
            },
            Shortcut::SaveAs | Shortcut::Export => {
                let Some(path) = destination else {
                    return Ok(ShortcutOutcome::NeedsPath(shortcut));
                };
                if shortcut == Shortcut::SaveAs {
                    self.save_as(path)?;
                } else {
                    self.export_raster(path, None)?;
                }
                Ok(ShortcutOutcome::Done { redraw: false })
            }
        }
    }

    fn history_outcome(&mut self, op: impl FnOnce(&mut Self) -> bool) -> ShortcutOutcome {
        if op(self) {
            ShortcutOutcome::Done { redraw: true }
        } else {
            ShortcutOutcome::Ignored
        }
    }

    // -- autosave ------------------------------------------------------------

    /// Start a background autosave when the interval has elapsed since the
    /// last save. Needs a save path; skipped mid-gesture, when clean, or while
    /// a previous autosave is still running. Returns whether a write started.
    pub fn autosave_if_due(&mut self, now: Instant) -> bool {
        if self.settings.autosave_seconds == 0 || self.autosave.is_some() {
            return false;
        }
        if !self.is_dirty || self.tools.is_pointer_down() {
            return false;
        }
        let Some(ref path) = self.path else {
            return false;
        };
        let interval = Duration::from_secs(self.settings.autosave_seconds);
        if now.saturating_duration_since(self.last_save) < interval {
            return false;
        }

        let target = autosave_path(path);
        info!("autosaving to {}", target.display());
        self.autosave = Some(AutosaveJob::spawn(self.to_file(), target, Arc::clone(&self.store)));
        self.last_save = now;
        true
    }

    /// Collect a finished autosave, if any. Failures are logged and returned.
    pub fn poll_autosave(&mut self) -> Option<Result<PathBuf, ProjectError>> {
        let result = self.autosave.as_ref()?.try_result()?;
        let job = self.autosave.take()?;
        Some(Self::finish_autosave(job.path, result))
    }

    /// Block until the in-flight autosave (if any) completes.
    pub fn wait_autosave(&mut self) -> Option<Result<PathBuf, ProjectError>> {
        let job = self.autosave.take()?;
        let path = job.path.clone();
        Some(Self::finish_autosave(path, job.wait()))
    }

    fn finish_autosave(
        path: PathBuf,
        result: Result<(), ProjectError>,
    ) -> Result<PathBuf, ProjectError> {
        match result {
            Ok(()) => {
                debug!("autosave complete: {}", path.display());
                Ok(path)
            }
            Err(e) => {
                warn!("autosave failed: {}", e);
                Err(e)
            }
        }
    }
}
