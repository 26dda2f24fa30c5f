//! Canvas state and the operations the application shell calls.

use crate::config::CanvasConfig;
use crate::history::History;
use crate::input::InputShaper;
use crate::selection;
use crate::shapes::{SerializableColor, Stroke, StrokeId};
use crate::snapshot::{Compositor, SnapshotCache};
use crate::tools::{Gesture, ToolSettings, positive_or};
use kurbo::{Point, Size, Vec2};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Change notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    StrokeCommitted(StrokeId),
    /// Strokes removed by deletion or by the stroke limit.
    StrokesRemoved(Vec<StrokeId>),
    Cleared,
    SelectionChanged(Option<StrokeId>),
    /// Undo or redo replaced the stroke list.
    HistoryRestored,
    /// The text tool captured an anchor; the shell should ask for text.
    TextInputRequested(Point),
    /// A new snapshot cache image (or an empty cache) was published.
    CachePublished(u64),
}

/// What starting a gesture did.
#[derive(Debug, Clone, PartialEq)]
pub enum BeginOutcome {
    /// A new in-progress stroke.
    Drawing(StrokeId),
    /// Selection tool hit-test result.
    Selected(Option<StrokeId>),
    /// Text tool anchor; finish with [`CanvasState::request_text_commit`].
    TextRequested(Point),
}

/// Everything the rendering layer needs for one frame.
#[derive(Debug)]
pub struct DisplayState<'a, I> {
    /// Stroke currently being drawn.
    pub in_progress: Option<&'a Stroke>,
    /// Finished gestures whose commit is still pending, in gesture order.
    pub pending: Vec<&'a Stroke>,
    /// Latest published cache image.
    pub cache: Option<Arc<I>>,
    /// Whether the published image reflects the current strokes and selection.
    pub cache_is_current: bool,
    /// The latest rebuild failed; the published image cannot be trusted.
    pub cache_failed: bool,
    /// Generation of the published image.
    pub generation: u64,
    pub selected: Option<StrokeId>,
    /// Selected stroke, drawn live with a highlight.
    pub selected_stroke: Option<&'a Stroke>,
    /// All committed strokes, for drawing when there is no usable image.
    pub strokes: &'a [Stroke],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveGesture {
    Idle,
    Drawing,
    Selecting,
}

/// A gesture whose geometry has been built.
#[derive(Debug)]
struct FinishedGesture {
    sequence: u64,
    /// `None` if building the geometry panicked.
    stroke: Option<Stroke>,
}

/// The annotation canvas: committed strokes, in-progress gesture, selection,
/// history, tool settings and the snapshot cache.
///
/// Owned by the interaction thread. Background work only ever reports back
/// through channels drained by [`CanvasState::poll`] or [`CanvasState::settle`].
#[derive(Debug)]
pub struct CanvasState<C: Compositor> {
    config: CanvasConfig,
    /// Committed strokes in commit order.
    strokes: Vec<Stroke>,
    shaper: InputShaper,
    gesture: ActiveGesture,
    settings: ToolSettings,
    selected: Option<StrokeId>,
    history: History,
    cache: SnapshotCache<C>,
    viewport: Size,
    /// Anchor captured by the text tool, awaiting text from the shell.
    pending_text_anchor: Option<Point>,
    /// Finished gestures by sequence; uncommitted until their geometry arrives.
    pending: BTreeMap<u64, Stroke>,
    next_sequence: u64,
    /// Gestures below this sequence were cleared before they committed.
    discard_below: u64,
    geometry_tx: Sender<FinishedGesture>,
    geometry_rx: Receiver<FinishedGesture>,
    geometry_in_flight: usize,
    subscribers: Vec<Sender<CanvasEvent>>,
}

impl<C: Compositor> CanvasState<C> {
    pub fn new(compositor: C, config: CanvasConfig) -> Self {
        let (geometry_tx, geometry_rx) = channel();
        Self {
            shaper: InputShaper::new(config.min_sample_distance),
            history: History::new(config.history_limit),
            cache: SnapshotCache::new(compositor, config.rebuild_mode),
            viewport: config.viewport,
            config,
            strokes: Vec::new(),
            gesture: ActiveGesture::Idle,
            settings: ToolSettings::default(),
            selected: None,
            pending_text_anchor: None,
            pending: BTreeMap::new(),
            next_sequence: 0,
            discard_below: 0,
            geometry_tx,
            geometry_rx,
            geometry_in_flight: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Register an observer. Events are sent until the receiver is dropped.
    pub fn subscribe(&mut self) -> Receiver<CanvasEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: CanvasEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Replace the tool and style used for new strokes.
    ///
    /// A non-positive width or font size falls back to its default.
    pub fn set_tool_settings(&mut self, settings: ToolSettings) {
        self.settings = settings.sanitized();
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport
    }

    /// Resize the cache image.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        let size = Size::new(width, height);
        if size != self.viewport {
            self.viewport = size;
            self.invalidate();
        }
    }

    /// Committed strokes in commit order.
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn stroke(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.iter().find(|s| s.id() == id)
    }

    pub fn selected(&self) -> Option<StrokeId> {
        self.selected
    }

    pub fn selected_stroke(&self) -> Option<&Stroke> {
        self.selected.and_then(|id| self.stroke(id))
    }

    pub fn in_progress(&self) -> Option<&Stroke> {
        self.shaper.current()
    }

    pub fn pending_text_anchor(&self) -> Option<Point> {
        self.pending_text_anchor
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn cache(&self) -> &SnapshotCache<C> {
        &self.cache
    }

    pub fn is_dirty(&self) -> bool {
        self.cache.is_dirty()
    }

    /// Start a gesture at `point` with `settings`.
    pub fn begin_stroke(&mut self, point: Point, settings: ToolSettings) -> BeginOutcome {
        if self.shaper.is_active() {
            self.shaper.cancel();
        }
        self.set_tool_settings(settings);

        match self.settings.gesture() {
            Gesture::Draw(kind) => {
                let id = self.shaper.begin(point, kind, &self.settings).id();
                self.gesture = ActiveGesture::Drawing;
                BeginOutcome::Drawing(id)
            }
            Gesture::Select => {
                self.gesture = ActiveGesture::Selecting;
                BeginOutcome::Selected(self.select_at(point))
            }
            Gesture::PlaceText => {
                self.gesture = ActiveGesture::Idle;
                self.pending_text_anchor = Some(point);
                self.emit(CanvasEvent::TextInputRequested(point));
                BeginOutcome::TextRequested(point)
            }
        }
    }

    /// Feed a drag sample with the platform-reported velocity (units/second).
    pub fn extend_stroke(&mut self, point: Point, velocity: Vec2) {
        match self.gesture {
            ActiveGesture::Drawing => {
                self.shaper.extend(point, velocity);
            }
            ActiveGesture::Selecting => {
                self.select_at(point);
            }
            ActiveGesture::Idle => {}
        }
    }

    /// Finish the gesture. Returns the id the committed stroke will carry.
    ///
    /// With `offload_geometry` the geometry is built on the rayon pool and the
    /// commit happens in a later [`CanvasState::poll`].
    pub fn end_stroke(&mut self) -> Option<StrokeId> {
        let gesture = std::mem::replace(&mut self.gesture, ActiveGesture::Idle);
        if gesture != ActiveGesture::Drawing {
            return None;
        }
        let stroke = self.shaper.end()?;
        let id = stroke.id();
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        if self.config.offload_geometry {
            self.pending.insert(sequence, stroke.clone());
            self.spawn_geometry(sequence, move || stroke.into_committed());
        } else {
            self.accept(FinishedGesture {
                sequence,
                stroke: Some(stroke.into_committed()),
            });
        }
        Some(id)
    }

    /// Build a pending gesture's geometry on the rayon pool.
    fn spawn_geometry(&mut self, sequence: u64, build: impl FnOnce() -> Stroke + Send + 'static) {
        self.geometry_in_flight += 1;
        let sender = self.geometry_tx.clone();
        rayon::spawn(move || {
            let stroke = std::panic::catch_unwind(std::panic::AssertUnwindSafe(build))
                .map_err(|_| log::error!("Geometry for gesture {sequence} panicked; dropping it"))
                .ok();
            let _ = sender.send(FinishedGesture { sequence, stroke });
        });
    }

    /// Abandon the current gesture.
    pub fn cancel_stroke(&mut self) {
        self.gesture = ActiveGesture::Idle;
        self.shaper.cancel();
        self.pending_text_anchor = None;
    }

    /// Commit a text stroke once the shell has collected the text.
    ///
    /// Blank text commits nothing. A non-positive font size falls back to the
    /// current tool's.
    pub fn request_text_commit(
        &mut self,
        anchor: Point,
        text: &str,
        font_size: f64,
        color: SerializableColor,
    ) -> Option<StrokeId> {
        self.pending_text_anchor = None;
        if text.trim().is_empty() {
            log::debug!("Ignoring empty text commit at {anchor:?}");
            return None;
        }

        let font_size = positive_or(font_size, self.settings.font_size, "font size");
        let stroke = Stroke::text(anchor, text.to_string(), font_size, color);
        let id = stroke.id();
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.accept(FinishedGesture {
            sequence,
            stroke: Some(stroke),
        });
        Some(id)
    }

    /// Hit-test committed strokes and update the selection.
    pub fn select_at(&mut self, point: Point) -> Option<StrokeId> {
        let hit = selection::stroke_at(&self.strokes, point);
        self.set_selection(hit);
        hit
    }

    fn set_selection(&mut self, selected: Option<StrokeId>) {
        if selected == self.selected {
            return;
        }
        self.selected = selected;
        self.emit(CanvasEvent::SelectionChanged(selected));
        self.invalidate();
    }

    /// Delete the selected stroke. Returns its id if one was removed.
    pub fn delete_selected(&mut self) -> Option<StrokeId> {
        let id = self.selected?;
        let Some(index) = self.strokes.iter().position(|s| s.id() == id) else {
            self.set_selection(None);
            return None;
        };

        self.history.record_before_mutation(&self.strokes);
        self.strokes.remove(index);
        self.selected = None;
        self.emit(CanvasEvent::StrokesRemoved(vec![id]));
        self.emit(CanvasEvent::SelectionChanged(None));
        self.invalidate();
        Some(id)
    }

    /// Remove every stroke. Not undoable: both history stacks are emptied.
    pub fn clear(&mut self) {
        self.cancel_stroke();
        self.pending.clear();
        self.discard_below = self.next_sequence;
        self.strokes.clear();
        self.selected = None;
        self.history.reset();
        log::info!("Canvas cleared");
        self.emit(CanvasEvent::Cleared);
        self.invalidate();
    }

    /// Undo the last change. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let current = std::mem::take(&mut self.strokes);
        match self.history.undo(current) {
            Ok(restored) => {
                self.strokes = restored;
                self.after_restore();
                true
            }
            Err(current) => {
                self.strokes = current;
                false
            }
        }
    }

    /// Redo the last undone change. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let current = std::mem::take(&mut self.strokes);
        match self.history.redo(current) {
            Ok(restored) => {
                self.strokes = restored;
                self.after_restore();
                true
            }
            Err(current) => {
                self.strokes = current;
                false
            }
        }
    }

    fn after_restore(&mut self) {
        log::debug!(
            "History restored: {} strokes, {} undo / {} redo",
            self.strokes.len(),
            self.history.undo_len(),
            self.history.redo_len()
        );
        if self.selected.take().is_some() {
            self.emit(CanvasEvent::SelectionChanged(None));
        }
        self.emit(CanvasEvent::HistoryRestored);
        self.invalidate();
    }

    /// Apply finished background work without blocking.
    ///
    /// Returns `true` if a stroke was committed or a cache image published.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(finished) = self.geometry_rx.try_recv() {
            self.geometry_in_flight = self.geometry_in_flight.saturating_sub(1);
            changed |= self.accept(finished);
        }
        if self.cache.poll() {
            self.emit(CanvasEvent::CachePublished(self.cache.published_generation()));
            changed = true;
        }
        changed
    }

    /// Block until all background geometry and cache rebuilds have finished.
    pub fn settle(&mut self) {
        while self.geometry_in_flight > 0 {
            match self.geometry_rx.recv() {
                Ok(finished) => {
                    self.geometry_in_flight -= 1;
                    self.accept(finished);
                }
                Err(_) => break,
            }
        }
        if self.cache.wait_idle() {
            self.emit(CanvasEvent::CachePublished(self.cache.published_generation()));
        }
    }

    /// Take a finished gesture and commit every gesture that is now in order.
    fn accept(&mut self, finished: FinishedGesture) -> bool {
        if finished.sequence < self.discard_below {
            log::debug!("Dropping gesture {} finished after clear", finished.sequence);
            return false;
        }
        match finished.stroke {
            Some(stroke) => {
                self.pending.insert(finished.sequence, stroke);
            }
            None => {
                self.pending.remove(&finished.sequence);
            }
        }

        let mut committed = false;
        while let Some(entry) = self.pending.first_entry() {
            if !entry.get().is_committed() {
                break;
            }
            let stroke = entry.remove();
            self.commit(stroke);
            committed = true;
        }
        committed
    }

    fn commit(&mut self, stroke: Stroke) {
        self.history.record_before_mutation(&self.strokes);
        let id = stroke.id();
        self.strokes.push(stroke);

        if self.strokes.len() > self.config.stroke_limit {
            let excess = self.strokes.len() - self.config.stroke_limit;
            let evicted: Vec<StrokeId> = self.strokes.drain(..excess).map(|s| s.id()).collect();
            log::debug!("Evicted {} oldest strokes", evicted.len());
            if self.selected.is_some_and(|sel| evicted.contains(&sel)) {
                self.selected = None;
                self.emit(CanvasEvent::SelectionChanged(None));
            }
            self.emit(CanvasEvent::StrokesRemoved(evicted));
        }

        self.emit(CanvasEvent::StrokeCommitted(id));
        self.invalidate();
    }

    /// Mark the cache dirty and request a rebuild of the current state.
    fn invalidate(&mut self) {
        self.cache.mark_dirty();
        let generation = self
            .cache
            .request_rebuild(&self.strokes, self.selected, self.viewport);
        if self.cache.published_generation() == generation {
            self.emit(CanvasEvent::CachePublished(generation));
        }
    }

    /// Snapshot of what the rendering layer should draw.
    pub fn current_display_state(&self) -> DisplayState<'_, C::Image> {
        DisplayState {
            in_progress: self.shaper.current(),
            pending: self.pending.values().collect(),
            cache: self.cache.image(),
            cache_is_current: !self.cache.is_dirty(),
            cache_failed: self.cache.last_rebuild_failed(),
            generation: self.cache.published_generation(),
            selected: self.selected,
            selected_stroke: self.selected_stroke(),
            strokes: &self.strokes,
        }
    }
}
