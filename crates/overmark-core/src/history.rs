//! Bounded undo/redo history of the committed stroke sequence.

use crate::shapes::Stroke;

/// Maximum number of undo states to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// Undo and redo stacks of full stroke-sequence snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<Vec<Stroke>>,
    redo_stack: Vec<Vec<Stroke>>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_UNDO_HISTORY)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Push a copy of `current` to the undo stack (call before making changes).
    pub fn record_before_mutation(&mut self, current: &[Stroke]) {
        self.undo_stack.push(current.to_vec());

        // A new mutation invalidates any undone future
        self.redo_stack.clear();

        if self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..excess);
        }
    }

    /// Undo the last change.
    ///
    /// Returns the strokes to restore and moves `current` onto the redo
    /// stack, or hands `current` back if there is nothing to undo.
    pub fn undo(&mut self, current: Vec<Stroke>) -> Result<Vec<Stroke>, Vec<Stroke>> {
        match self.undo_stack.pop() {
            Some(snapshot) => {
                self.redo_stack.push(current);
                Ok(snapshot)
            }
            None => Err(current),
        }
    }

    /// Redo the last undone change. Mirror of [`History::undo`].
    pub fn redo(&mut self, current: Vec<Stroke>) -> Result<Vec<Stroke>, Vec<Stroke>> {
        match self.redo_stack.pop() {
            Some(snapshot) => {
                self.undo_stack.push(current);
                Ok(snapshot)
            }
            None => Err(current),
        }
    }

    /// Drop both stacks.
    pub fn reset(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{SerializableColor, StrokeKind};
    use kurbo::Point;

    fn stroke(x: f64) -> Stroke {
        Stroke::from_points(
            StrokeKind::Rectangle { filled: false },
            SerializableColor::black(),
            2.0,
            vec![Point::new(x, 0.0), Point::new(x + 10.0, 10.0)],
        )
    }

    #[test]
    fn test_undo_restores_snapshot() {
        let mut history = History::default();
        let mut strokes = Vec::new();

        history.record_before_mutation(&strokes);
        strokes.push(stroke(0.0));

        let restored = history.undo(strokes).unwrap();
        assert!(restored.is_empty());
        assert!(history.can_redo());
        assert!(!history.can_undo());
    }

    #[test]
    fn test_redo_restores_undone_state() {
        let mut history = History::default();
        let first = stroke(0.0);
        let strokes = vec![first.clone()];
        history.record_before_mutation(&[]);

        let undone = history.undo(strokes).unwrap();
        let redone = history.redo(undone).unwrap();
        assert_eq!(redone, vec![first]);
        assert!(history.can_undo());
    }

    #[test]
    fn test_new_mutation_clears_redo() {
        let mut history = History::default();
        history.record_before_mutation(&[]);
        let undone = history.undo(vec![stroke(0.0)]).unwrap();
        assert!(history.can_redo());

        history.record_before_mutation(&undone);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut history = History::default();
        let current = vec![stroke(1.0)];
        assert_eq!(history.undo(current.clone()), Err(current.clone()));
        assert_eq!(history.redo(current.clone()), Err(current));
        assert_eq!(history.undo_len(), 0);
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::default();
        let mut strokes = Vec::new();
        for i in 0..51 {
            history.record_before_mutation(&strokes);
            strokes.push(stroke(i as f64));
        }
        assert_eq!(history.undo_len(), 50);

        // Undo all the way: the oldest surviving snapshot holds one stroke.
        let mut current = strokes;
        while let Ok(previous) = history.undo(current.clone()) {
            current = previous;
        }
        assert_eq!(current.len(), 1);
    }

    #[test]
    fn test_snapshots_are_independent_copies() {
        let mut history = History::default();
        let mut strokes = vec![stroke(0.0)];
        history.record_before_mutation(&strokes);
        strokes.clear();
        strokes.push(stroke(5.0));

        let restored = history.undo(strokes).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].first_point(), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_reset() {
        let mut history = History::default();
        history.record_before_mutation(&[]);
        history.reset();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
