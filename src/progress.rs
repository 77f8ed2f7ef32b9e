//! Progress events, the reporter trait, and the weighted-stage progress model.
//!
//! The pipeline never talks to a UI directly. It publishes [`ProgressEvent`]s
//! through a [`ProgressReporter`]; the crate ships a channel-backed reporter
//! (see [`crate::channel`]) for the usual worker-thread / UI-thread split, and
//! callers can plug in anything else (a log sink, a test recorder).
//!
//! # Percentages
//!
//! Each [`Stage`] declares its share of the total work in a [`ProgressPlan`].
//! The percentage after `k` of `n` units of a stage is the sum of all earlier
//! stages' shares plus `share × k / n`. Adding or removing a stage therefore
//! only changes the plan, never the call sites that report progress.
//!
//! ```rust
//! use edgequake_pdf2docx::progress::{ProgressPlan, Stage};
//!
//! let plan = ProgressPlan::for_run(false);
//! assert_eq!(plan.percent_at(Stage::Rasterize, 0.0, 1), 0.0);
//! assert_eq!(plan.percent_at(Stage::Finalize, 1.0, 1), 100.0);
//! ```

use tracing::info;

/// One progress update: a status message and an optional percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Human-readable status line.
    pub message: String,
    /// Completion in `0.0..=100.0`, or `None` for message-only updates.
    pub percent: Option<f32>,
}

impl ProgressEvent {
    pub fn new(message: impl Into<String>, percent: Option<f32>) -> Self {
        Self {
            message: message.into(),
            percent,
        }
    }
}

/// Receives progress events from the pipeline.
///
/// The pipeline runs on a single worker thread and is the only producer, so
/// implementations need to be `Send` but not `Sync`.
pub trait ProgressReporter: Send {
    fn report(&self, event: ProgressEvent);
}

/// A reporter that drops every event.
///
/// Useful for library callers that only want the final result.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

// ── Weighted stages ──────────────────────────────────────────────────────

/// Coarse stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// PDF → page images.
    Rasterize,
    /// Optional sharpening pass.
    Enhance,
    /// Slide identifier assignment and renaming.
    Order,
    /// Per-page OCR → translate → record loop.
    Pages,
    /// Document save and cleanup.
    Finalize,
}

impl Stage {
    /// Relative cost of the stage. Shares are normalised over the stages a
    /// plan actually contains.
    pub fn weight(self) -> f32 {
        match self {
            Stage::Rasterize => 10.0,
            Stage::Enhance => 10.0,
            Stage::Order => 5.0,
            Stage::Pages => 70.0,
            Stage::Finalize => 5.0,
        }
    }
}

/// Sub-steps of a single page inside [`Stage::Pages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    Recognized,
    Translated,
    Recorded,
}

impl PageStep {
    /// Cumulative fraction of a page's share that is done after this step.
    /// Translation dominates because it is network-bound and chunked.
    pub fn fraction_done(self) -> f32 {
        match self {
            PageStep::Recognized => 0.3,
            PageStep::Translated => 0.9,
            PageStep::Recorded => 1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct PlanEntry {
    stage: Stage,
    /// Percentage points reached before this stage starts.
    start: f32,
    /// Percentage points this stage accounts for.
    share: f32,
}

/// Ordered stages with normalised shares summing to 100.
#[derive(Debug, Clone)]
pub struct ProgressPlan {
    entries: Vec<PlanEntry>,
}

impl ProgressPlan {
    /// Build a plan from stages in execution order.
    pub fn new(stages: &[Stage]) -> Self {
        let total: f32 = stages.iter().map(|s| s.weight()).sum();
        let mut start = 0.0;
        let entries = stages
            .iter()
            .map(|&stage| {
                let share = if total > 0.0 {
                    stage.weight() / total * 100.0
                } else {
                    0.0
                };
                let entry = PlanEntry {
                    stage,
                    start,
                    share,
                };
                start += share;
                entry
            })
            .collect();
        Self { entries }
    }

    /// The plan for one document run.
    pub fn for_run(enhance: bool) -> Self {
        if enhance {
            Self::new(&[
                Stage::Rasterize,
                Stage::Enhance,
                Stage::Order,
                Stage::Pages,
                Stage::Finalize,
            ])
        } else {
            Self::new(&[Stage::Rasterize, Stage::Order, Stage::Pages, Stage::Finalize])
        }
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.entries.iter().any(|e| e.stage == stage)
    }

    /// Percentage once `done` of `total` units of `stage` are complete.
    ///
    /// Stages absent from the plan contribute nothing; `total == 0` counts
    /// the stage as complete.
    pub fn percent_at(&self, stage: Stage, done: f32, total: usize) -> f32 {
        let Some(entry) = self.entries.iter().find(|e| e.stage == stage) else {
            return self.percent_before(stage);
        };
        let fraction = if total == 0 {
            1.0
        } else {
            (done / total as f32).clamp(0.0, 1.0)
        };
        (entry.start + entry.share * fraction).min(100.0)
    }

    /// Percentage of a page sub-step inside [`Stage::Pages`].
    ///
    /// `page` is 1-based.
    pub fn page_percent(&self, page: usize, total_pages: usize, step: PageStep) -> f32 {
        let done = page.saturating_sub(1) as f32 + step.fraction_done();
        self.percent_at(Stage::Pages, done, total_pages)
    }

    /// Start of a stage that is not part of the plan: the end of the last
    /// planned stage preceding it.
    fn percent_before(&self, stage: Stage) -> f32 {
        let order = |s: Stage| match s {
            Stage::Rasterize => 0,
            Stage::Enhance => 1,
            Stage::Order => 2,
            Stage::Pages => 3,
            Stage::Finalize => 4,
        };
        self.entries
            .iter()
            .filter(|e| order(e.stage) < order(stage))
            .map(|e| e.start + e.share)
            .fold(0.0, f32::max)
    }
}

/// Turns stage progress into events and publishes them.
///
/// Percentages are clamped so they never go backwards within a run.
pub struct ProgressTracker<'a> {
    plan: ProgressPlan,
    reporter: &'a dyn ProgressReporter,
    last_percent: f32,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(plan: ProgressPlan, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            plan,
            reporter,
            last_percent: 0.0,
        }
    }

    /// Report `done` of `total` units of `stage`.
    pub fn stage(&mut self, stage: Stage, done: usize, total: usize, message: impl Into<String>) {
        let pct = self.plan.percent_at(stage, done as f32, total);
        self.emit(message.into(), Some(pct));
    }

    /// Report a per-page sub-step (1-based `page`).
    pub fn page(&mut self, page: usize, total_pages: usize, step: PageStep, message: impl Into<String>) {
        let pct = self.plan.page_percent(page, total_pages, step);
        self.emit(message.into(), Some(pct));
    }

    /// Report a status message without moving the bar.
    pub fn message(&mut self, message: impl Into<String>) {
        self.emit(message.into(), None);
    }

    /// Report completion at 100%.
    pub fn complete(&mut self, message: impl Into<String>) {
        self.emit(message.into(), Some(100.0));
    }

    pub fn last_percent(&self) -> f32 {
        self.last_percent
    }

    fn emit(&mut self, message: String, percent: Option<f32>) {
        let percent = percent.map(|p| {
            let p = p.max(self.last_percent).min(100.0);
            self.last_percent = p;
            p
        });
        info!("{}", message);
        self.reporter.report(ProgressEvent { message, percent });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressReporter for Recorder {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn shares_sum_to_one_hundred() {
        for enhance in [false, true] {
            let plan = ProgressPlan::for_run(enhance);
            assert!(approx(plan.percent_at(Stage::Finalize, 1.0, 1), 100.0));
            assert_eq!(plan.percent_at(Stage::Rasterize, 0.0, 1), 0.0);
        }
    }

    #[test]
    fn enhance_stage_only_in_enhanced_plan() {
        assert!(ProgressPlan::for_run(true).contains(Stage::Enhance));
        let plan = ProgressPlan::for_run(false);
        assert!(!plan.contains(Stage::Enhance));
        // Absent stage reports the end of the stage before it.
        assert!(approx(
            plan.percent_at(Stage::Enhance, 1.0, 3),
            plan.percent_at(Stage::Rasterize, 1.0, 1)
        ));
    }

    #[test]
    fn page_steps_are_monotonic_across_pages() {
        let plan = ProgressPlan::for_run(true);
        let mut last = plan.percent_at(Stage::Order, 1.0, 1);
        for page in 1..=4 {
            for step in [PageStep::Recognized, PageStep::Translated, PageStep::Recorded] {
                let p = plan.page_percent(page, 4, step);
                assert!(p > last, "page {page} {step:?}: {p} <= {last}");
                last = p;
            }
        }
        assert!(approx(last, plan.percent_at(Stage::Pages, 1.0, 1)));
    }

    #[test]
    fn zero_total_counts_as_complete() {
        let plan = ProgressPlan::for_run(false);
        assert!(approx(
            plan.percent_at(Stage::Pages, 0.0, 0),
            plan.percent_at(Stage::Pages, 1.0, 1)
        ));
    }

    #[test]
    fn tracker_never_goes_backwards() {
        let recorder = Recorder::default();
        let mut tracker = ProgressTracker::new(ProgressPlan::for_run(false), &recorder);
        tracker.stage(Stage::Order, 1, 1, "renamed");
        tracker.stage(Stage::Rasterize, 0, 1, "late rasterize event");
        tracker.message("just a message");
        tracker.complete("done");

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].percent, events[0].percent);
        assert_eq!(events[2].percent, None);
        assert_eq!(events[3].percent, Some(100.0));
    }
}
