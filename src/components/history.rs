use std::collections::VecDeque;

use crate::canvas::PixelBuffer;

/// Undo steps kept when settings do not say otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

// ============================================================================
// SNAPSHOT - full-canvas copy taken before an edit
// ============================================================================

/// Immutable deep copy of the canvas at one instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanvasSnapshot {
    pixels: PixelBuffer,
}

impl CanvasSnapshot {
    pub fn capture(canvas: &PixelBuffer) -> Self {
        Self {
            pixels: canvas.clone(),
        }
    }

    pub fn restore_into(&self, canvas: &mut PixelBuffer) {
        canvas.restore_from(&self.pixels);
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn memory_bytes(&self) -> usize {
        self.pixels.memory_bytes()
    }
}

impl From<PixelBuffer> for CanvasSnapshot {
    fn from(pixels: PixelBuffer) -> Self {
        Self { pixels }
    }
}

/// A snapshot plus the name of the action that replaced it.
struct HistoryEntry {
    description: String,
    snapshot: CanvasSnapshot,
}

// ============================================================================
// HISTORY MANAGER - bounded undo/redo stacks
// ============================================================================

/// Undo/redo stacks of full-canvas snapshots with a step cap.
///
/// Both stacks evict from the oldest end, so the most recent `capacity`
/// steps always survive regardless of canvas size.
pub struct HistoryManager {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    capacity: usize,
    /// Running memory total across both stacks.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            capacity: capacity.max(1),
            total_memory: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record the state that existed before a new edit. Clears redo.
    pub fn push_undo(&mut self, description: impl Into<String>, snapshot: CanvasSnapshot) {
        for entry in self.redo_stack.drain(..) {
            self.total_memory = self
                .total_memory
                .saturating_sub(entry.snapshot.memory_bytes());
        }
        self.push_entry_undo(HistoryEntry {
            description: description.into(),
            snapshot,
        });
    }

    /// Restore the newest undo snapshot into `canvas`, moving the current
    /// contents onto the redo stack. Returns the undone action's name, or
    /// `None` (without touching anything) when there is nothing to undo.
    pub fn undo(&mut self, canvas: &mut PixelBuffer) -> Option<String> {
        let entry = self.undo_stack.pop_back()?;
        self.total_memory = self
            .total_memory
            .saturating_sub(entry.snapshot.memory_bytes());

        let current = CanvasSnapshot::capture(canvas);
        entry.snapshot.restore_into(canvas);
        self.push_entry_redo(HistoryEntry {
            description: entry.description.clone(),
            snapshot: current,
        });
        Some(entry.description)
    }

    /// Mirror of [`undo`](Self::undo) against the redo stack.
    pub fn redo(&mut self, canvas: &mut PixelBuffer) -> Option<String> {
        let entry = self.redo_stack.pop_back()?;
        self.total_memory = self
            .total_memory
            .saturating_sub(entry.snapshot.memory_bytes());

        let current = CanvasSnapshot::capture(canvas);
        entry.snapshot.restore_into(canvas);
        self.push_entry_undo(HistoryEntry {
            description: entry.description.clone(),
            snapshot: current,
        });
        Some(entry.description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    /// Undo descriptions, most recent first.
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack
            .iter()
            .rev()
            .map(|e| e.description.clone())
            .collect()
    }

    /// Snapshots on the undo stack, oldest first.
    pub fn undo_snapshots(&self) -> impl Iterator<Item = &CanvasSnapshot> {
        self.undo_stack.iter().map(|e| &e.snapshot)
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    fn push_entry_undo(&mut self, entry: HistoryEntry) {
        self.total_memory += entry.snapshot.memory_bytes();
        self.undo_stack.push_back(entry);
        self.prune();
    }

    fn push_entry_redo(&mut self, entry: HistoryEntry) {
        self.total_memory += entry.snapshot.memory_bytes();
        self.redo_stack.push_back(entry);
        while self.redo_stack.len() > self.capacity {
            if let Some(removed) = self.redo_stack.pop_front() {
                self.total_memory = self
                    .total_memory
                    .saturating_sub(removed.snapshot.memory_bytes());
            }
        }
    }

    /// Drop the oldest undo steps beyond the step cap.
    fn prune(&mut self) {
        while self.undo_stack.len() > self.capacity {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self
                    .total_memory
                    .saturating_sub(removed.snapshot.memory_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// 1x1 buffer whose single pixel encodes `n`.
    fn marked(n: u8) -> PixelBuffer {
        PixelBuffer::filled(1, 1, Rgb([n, 0, 0])).unwrap()
    }

    fn mark_of(buf: &PixelBuffer) -> u8 {
        buf.get(0, 0).unwrap().0[0]
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = HistoryManager::new(20);
        for n in 0..25 {
            history.push_undo("Brush", marked(n).into());
        }
        assert_eq!(history.undo_count(), 20);
        let kept: Vec<u8> = history.undo_snapshots().map(|s| mark_of(s.pixels())).collect();
        assert_eq!(kept, (5..25).collect::<Vec<u8>>());
    }

    #[test]
    fn test_undo_restores_prior_content_exactly() {
        let mut canvas = PixelBuffer::new(3, 3).unwrap();
        let before = canvas.clone();
        let mut history = HistoryManager::default();

        history.push_undo("Brush", CanvasSnapshot::capture(&canvas));
        canvas.set(1, 1, Rgb([9, 9, 9])).unwrap();
        let edited = canvas.clone();

        assert_eq!(history.undo(&mut canvas).as_deref(), Some("Brush"));
        assert_eq!(canvas.to_flat(), before.to_flat());

        assert_eq!(history.redo(&mut canvas).as_deref(), Some("Brush"));
        assert_eq!(canvas.to_flat(), edited.to_flat());
    }

    #[test]
    fn test_empty_undo_and_redo_do_nothing() {
        let mut canvas = marked(7);
        let mut history = HistoryManager::default();
        assert!(history.undo(&mut canvas).is_none());
        assert!(history.redo(&mut canvas).is_none());
        assert_eq!(mark_of(&canvas), 7);
        assert_eq!(history.undo_count(), 0);
        assert_eq!(history.redo_count(), 0);
    }

    #[test]
    fn test_new_push_clears_redo() {
        let mut canvas = marked(2);
        let mut history = HistoryManager::default();
        history.push_undo("A", marked(0).into());
        history.push_undo("B", marked(1).into());

        history.undo(&mut canvas);
        assert_eq!(history.redo_count(), 1);

        history.push_undo("C", CanvasSnapshot::capture(&canvas));
        assert_eq!(history.redo_count(), 0);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_redo_applies_capacity_to_undo_stack() {
        let mut canvas = marked(100);
        let mut history = HistoryManager::new(3);
        for n in 0..3 {
            history.push_undo("Brush", marked(n).into());
        }
        history.undo(&mut canvas);
        assert_eq!(history.undo_count(), 2);
        history.redo(&mut canvas);
        assert_eq!(history.undo_count(), 3);
        assert_eq!(mark_of(&canvas), 100);
    }

    #[test]
    fn test_undo_redo_sequence_walks_states() {
        let mut canvas = marked(0);
        let mut history = HistoryManager::default();
        for n in 1..=3 {
            history.push_undo("Brush", CanvasSnapshot::capture(&canvas));
            canvas = marked(n);
        }
        history.undo(&mut canvas);
        history.undo(&mut canvas);
        assert_eq!(mark_of(&canvas), 1);
        history.redo(&mut canvas);
        assert_eq!(mark_of(&canvas), 2);
        history.redo(&mut canvas);
        assert_eq!(mark_of(&canvas), 3);
        assert!(history.redo(&mut canvas).is_none());
    }

    #[test]
    fn test_memory_accounting() {
        let mut canvas = PixelBuffer::new(2, 2).unwrap();
        let mut history = HistoryManager::default();
        history.push_undo("Fill", CanvasSnapshot::capture(&canvas));
        assert_eq!(history.memory_usage(), 12);
        history.undo(&mut canvas);
        assert_eq!(history.memory_usage(), 12);
        history.clear();
        assert_eq!(history.memory_usage(), 0);
    }

    #[test]
    fn test_large_canvas_keeps_twenty_steps() {
        // 2200x2200 RGB is ~14.5 MB per snapshot, ~290 MB for the full stack
        let mut history = HistoryManager::default();
        for n in 0..25 {
            history.push_undo("Brush", PixelBuffer::filled(2200, 2200, Rgb([n, 0, 0])).unwrap().into());
        }
        assert_eq!(history.undo_count(), 20);
        assert_eq!(history.memory_usage(), 20 * 2200 * 2200 * 3);
        let oldest = history.undo_snapshots().next().unwrap();
        assert_eq!(oldest.pixels().get(0, 0).unwrap(), Rgb([5, 0, 0]));
    }

    #[test]
    fn test_redo_stack_does_not_evict_undo_steps() {
        let mut canvas = PixelBuffer::filled(2200, 2200, Rgb([99, 0, 0])).unwrap();
        let mut history = HistoryManager::default();
        for n in 0..20 {
            history.push_undo("Brush", PixelBuffer::filled(2200, 2200, Rgb([n, 0, 0])).unwrap().into());
        }
        for _ in 0..5 {
            history.undo(&mut canvas);
        }
        history.redo(&mut canvas);
        assert_eq!(history.undo_count(), 16);
        assert_eq!(history.redo_count(), 4);
    }

    #[test]
    fn test_undo_history_lists_newest_first() {
        let mut history = HistoryManager::default();
        history.push_undo("Brush", marked(0).into());
        history.push_undo("Line", marked(1).into());
        assert_eq!(history.undo_history(), vec!["Line".to_string(), "Brush".to_string()]);
        assert_eq!(history.undo_description(), Some("Line"));
    }
}
