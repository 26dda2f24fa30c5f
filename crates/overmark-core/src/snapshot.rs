//! Snapshot cache: one rasterized image of every committed, non-selected stroke.
//!
//! Rebuilds run off the interaction thread against an immutable copy of the
//! stroke list. Each request takes a new generation number; a worker whose
//! generation is no longer the latest stops compositing and never publishes,
//! and the owning thread only installs a result whose generation is still the
//! latest. The last *requested* rebuild wins, not the last finished one.

use crate::shapes::{Stroke, StrokeId};
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};

/// Raster backend used by the snapshot cache.
///
/// Vector strokes and text strokes go through separate calls because text
/// shaping usually takes a different rendering path.
pub trait Compositor: Send + Sync + 'static {
    /// Drawing target while a rebuild is in progress.
    type Surface;
    /// Finished image handed to the display layer.
    type Image: Send + Sync + 'static;

    /// Create a cleared surface, or `None` if one of that size can't be made.
    fn begin(&self, size: Size) -> Option<Self::Surface>;

    /// Stroke and fill one non-text stroke according to its kind.
    fn composite_stroke(&self, surface: &mut Self::Surface, stroke: &Stroke);

    /// Draw one text stroke.
    fn composite_text(&self, surface: &mut Self::Surface, stroke: &Stroke);

    fn finish(&self, surface: Self::Surface) -> Self::Image;
}

/// Where rebuilds run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildMode {
    /// On the rayon pool, results picked up by [`SnapshotCache::poll`].
    #[default]
    Background,
    /// Synchronously inside the request.
    Inline,
}

/// Result of running a [`RebuildJob`].
#[derive(Debug)]
pub enum RebuildOutcome<I> {
    Finished { generation: u64, image: I },
    /// A newer rebuild was requested while this one ran.
    Superseded { generation: u64 },
    /// The compositor could not produce a surface, or panicked.
    Failed { generation: u64 },
}

impl<I> RebuildOutcome<I> {
    pub fn generation(&self) -> u64 {
        match self {
            RebuildOutcome::Finished { generation, .. }
            | RebuildOutcome::Superseded { generation }
            | RebuildOutcome::Failed { generation } => *generation,
        }
    }
}

/// A rebuild request: immutable stroke snapshot plus its generation.
#[derive(Debug, Clone)]
pub struct RebuildJob {
    generation: u64,
    latest: Arc<AtomicU64>,
    strokes: Arc<[Stroke]>,
    selected: Option<StrokeId>,
    size: Size,
}

impl RebuildJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether no newer rebuild has been requested since this one.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::Acquire) == self.generation
    }

    /// Strokes that belong in the cache: everything but the selection.
    fn visible(&self) -> impl Iterator<Item = &Stroke> + '_ {
        let selected = self.selected;
        self.strokes
            .iter()
            .filter(move |stroke| Some(stroke.id()) != selected)
    }

    /// Composite the snapshot, abandoning as soon as the job goes stale.
    pub fn run<C: Compositor>(&self, compositor: &C) -> RebuildOutcome<C::Image> {
        let generation = self.generation;
        let Some(mut surface) = compositor.begin(self.size) else {
            return RebuildOutcome::Failed { generation };
        };

        for stroke in self.visible().filter(|stroke| !stroke.kind().is_text()) {
            if !self.is_current() {
                return RebuildOutcome::Superseded { generation };
            }
            compositor.composite_stroke(&mut surface, stroke);
        }

        for stroke in self.visible().filter(|stroke| stroke.kind().is_text()) {
            if !self.is_current() {
                return RebuildOutcome::Superseded { generation };
            }
            compositor.composite_text(&mut surface, stroke);
        }

        if !self.is_current() {
            return RebuildOutcome::Superseded { generation };
        }

        RebuildOutcome::Finished {
            generation,
            image: compositor.finish(surface),
        }
    }
}

/// Cached composite of the committed strokes.
///
/// Owned by the interaction thread; only [`SnapshotCache::apply`] swaps the
/// published image.
pub struct SnapshotCache<C: Compositor> {
    compositor: Arc<C>,
    mode: RebuildMode,
    /// Generation of the most recent request, shared with workers.
    latest: Arc<AtomicU64>,
    published_generation: u64,
    image: Option<Arc<C::Image>>,
    dirty: bool,
    /// The most recent rebuild could not produce an image.
    failed: bool,
    in_flight: usize,
    result_tx: Sender<RebuildOutcome<C::Image>>,
    result_rx: Receiver<RebuildOutcome<C::Image>>,
}

impl<C: Compositor> std::fmt::Debug for SnapshotCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("mode", &self.mode)
            .field("latest", &self.latest_generation())
            .field("published", &self.published_generation)
            .field("has_image", &self.image.is_some())
            .field("dirty", &self.dirty)
            .field("failed", &self.failed)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl<C: Compositor> SnapshotCache<C> {
    pub fn new(compositor: C, mode: RebuildMode) -> Self {
        let (result_tx, result_rx) = channel();
        Self {
            compositor: Arc::new(compositor),
            mode,
            latest: Arc::new(AtomicU64::new(0)),
            published_generation: 0,
            image: None,
            dirty: false,
            failed: false,
            in_flight: 0,
            result_tx,
            result_rx,
        }
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn mode(&self) -> RebuildMode {
        self.mode
    }

    /// Latest published image, if any.
    pub fn image(&self) -> Option<Arc<C::Image>> {
        self.image.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the latest requested rebuild failed to produce an image.
    pub fn last_rebuild_failed(&self) -> bool {
        self.failed
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    pub fn published_generation(&self) -> u64 {
        self.published_generation
    }

    /// Number of background rebuilds that have not reported back.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Take the next generation and snapshot the inputs for a rebuild.
    ///
    /// Every job prepared earlier becomes stale.
    pub fn prepare_job(
        &mut self,
        strokes: &[Stroke],
        selected: Option<StrokeId>,
        size: Size,
    ) -> RebuildJob {
        self.dirty = true;
        let generation = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        RebuildJob {
            generation,
            latest: Arc::clone(&self.latest),
            strokes: strokes.into(),
            selected,
            size,
        }
    }

    /// Request a rebuild of the cache from `strokes`.
    ///
    /// Returns the generation assigned to the request. With no strokes at
    /// all the cache is cleared on the spot.
    pub fn request_rebuild(
        &mut self,
        strokes: &[Stroke],
        selected: Option<StrokeId>,
        size: Size,
    ) -> u64 {
        if strokes.is_empty() {
            let generation = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
            self.image = None;
            self.published_generation = generation;
            self.dirty = false;
            self.failed = false;
            log::debug!("Snapshot cache cleared at generation {generation}");
            return generation;
        }

        let job = self.prepare_job(strokes, selected, size);
        let generation = job.generation();
        match self.mode {
            RebuildMode::Inline => {
                let outcome = job.run(self.compositor.as_ref());
                self.apply(outcome);
            }
            RebuildMode::Background => self.spawn(job),
        }
        generation
    }

    /// Run a prepared job on the rayon pool.
    pub fn spawn(&mut self, job: RebuildJob) {
        let compositor = Arc::clone(&self.compositor);
        let sender = self.result_tx.clone();
        self.in_flight += 1;
        rayon::spawn(move || {
            let generation = job.generation();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                job.run(compositor.as_ref())
            }))
            .unwrap_or_else(|_| {
                log::error!("Snapshot rebuild {generation} panicked");
                RebuildOutcome::Failed { generation }
            });
            let _ = sender.send(outcome);
        });
    }

    /// Install a finished rebuild if it is still the latest request.
    ///
    /// Returns `true` if a new image was published.
    pub fn apply(&mut self, outcome: RebuildOutcome<C::Image>) -> bool {
        match outcome {
            RebuildOutcome::Finished { generation, image } => {
                if generation != self.latest_generation() || generation <= self.published_generation
                {
                    log::debug!(
                        "Discarding stale snapshot {generation} (latest {})",
                        self.latest_generation()
                    );
                    return false;
                }
                self.image = Some(Arc::new(image));
                self.published_generation = generation;
                self.dirty = false;
                self.failed = false;
                log::debug!("Published snapshot generation {generation}");
                true
            }
            RebuildOutcome::Superseded { generation } => {
                log::debug!("Snapshot rebuild {generation} superseded");
                false
            }
            RebuildOutcome::Failed { generation } => {
                log::warn!("Snapshot rebuild {generation} failed; cache stays dirty");
                if generation == self.latest_generation() {
                    self.failed = true;
                }
                false
            }
        }
    }

    /// Pick up finished background rebuilds without blocking.
    ///
    /// Returns `true` if a new image was published.
    pub fn poll(&mut self) -> bool {
        let mut published = false;
        while let Ok(outcome) = self.result_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            published |= self.apply(outcome);
        }
        published
    }

    /// Block until every background rebuild has reported back.
    pub fn wait_idle(&mut self) -> bool {
        let mut published = false;
        while self.in_flight > 0 {
            match self.result_rx.recv() {
                Ok(outcome) => {
                    self.in_flight -= 1;
                    published |= self.apply(outcome);
                }
                Err(_) => break,
            }
        }
        published
    }
}
