//! Debounced theme analysis.
//!
//! The pipeline lives on the store's actor task. It never blocks: timers and
//! tool invocations run in spawned tasks that report back through a
//! [`PipelineSink`], and the owner feeds those events back in with
//! [`AnalysisPipeline::on_debounce_elapsed`] and [`AnalysisPipeline::on_queried`].
//!
//! Every scheduled computation takes a new ticket. Results carrying an older
//! ticket are discarded, so only the most recent wallpaper is ever cached or
//! notified.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::analysis::{self, AnalysisSource};
use super::cache::ThemeCache;
use super::notifier::NotificationSink;
use super::tool::{ThemeTool, ToolError};
use super::types::{OverrideState, ThemeAnalysis};

/// Default delay between a wallpaper change and its analysis.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Messages produced by pipeline tasks for the owner to handle.
#[derive(Debug)]
pub enum PipelineEvent {
    /// The debounce timer for `ticket` fired.
    DebounceElapsed { ticket: u64 },
    /// The theme query for `ticket` finished.
    Queried {
        ticket: u64,
        path: PathBuf,
        /// Failure of the apply step that preceded the query, if any.
        apply_error: Option<ToolError>,
        output: Result<String, ToolError>,
    },
}

/// Delivers [`PipelineEvent`]s back to the pipeline's owner.
pub type PipelineSink = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Result of a completed, non-stale analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub path: PathBuf,
    /// Analysis produced by the tool or the fallback; this is what gets cached.
    pub auto: ThemeAnalysis,
    /// Analysis after applying manual overrides; this is what gets notified.
    pub effective: ThemeAnalysis,
    pub source: AnalysisSource,
    /// Errors to report to observers.
    pub errors: Vec<String>,
    /// Whether the cache needs a flush scheduled.
    pub flush_needed: bool,
}

pub struct AnalysisPipeline {
    debounce: Duration,
    tool: Arc<dyn ThemeTool>,
    notifier: Arc<dyn NotificationSink>,
    sink: PipelineSink,
    ticket: u64,
    target: Option<PathBuf>,
    timer: Option<JoinHandle<()>>,
}

impl AnalysisPipeline {
    #[must_use]
    pub fn new(
        debounce: Duration,
        tool: Arc<dyn ThemeTool>,
        notifier: Arc<dyn NotificationSink>,
        sink: PipelineSink,
    ) -> Self {
        Self {
            debounce,
            tool,
            notifier,
            sink,
            ticket: 0,
            target: None,
            timer: None,
        }
    }

    /// Arms the debounce timer for `path`, replacing any pending computation.
    pub fn schedule(&mut self, path: &Path) -> u64 {
        let ticket = self.supersede(path);
        let sink = Arc::clone(&self.sink);
        let delay = self.debounce;

        tracing::debug!(path = %path.display(), ticket, ?delay, "theme analysis scheduled");
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink(PipelineEvent::DebounceElapsed { ticket });
        }));

        ticket
    }

    /// Re-applies `path` with `overrides` and analyzes it without waiting for
    /// the debounce delay.
    pub fn run_now(&mut self, path: &Path, overrides: OverrideState) -> u64 {
        let ticket = self.supersede(path);
        let apply = self.tool.apply_wallpaper(path, overrides);
        let query = self.tool.query_theme();
        let sink = Arc::clone(&self.sink);
        let path = path.to_path_buf();

        tracing::debug!(path = %path.display(), ticket, ?overrides, "re-applying theme with overrides");
        tokio::spawn(async move {
            let apply_error = apply.await.err();
            let output = query.await;
            sink(PipelineEvent::Queried { ticket, path, apply_error, output });
        });

        ticket
    }

    /// Starts the theme query once the debounce for `ticket` has elapsed.
    pub fn on_debounce_elapsed(&mut self, ticket: u64) {
        if ticket != self.ticket {
            tracing::trace!(ticket, latest = self.ticket, "ignoring stale debounce timer");
            return;
        }
        self.timer = None;

        let Some(path) = self.target.clone() else {
            return;
        };

        let query = self.tool.query_theme();
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            let output = query.await;
            sink(PipelineEvent::Queried { ticket, path, apply_error: None, output });
        });
    }

    /// Resolves a finished query: caches the automatic analysis, merges
    /// `overrides` and notifies.
    ///
    /// Returns `None` when the result is stale.
    pub fn on_queried(
        &mut self,
        ticket: u64,
        path: &Path,
        apply_error: Option<ToolError>,
        output: Result<String, ToolError>,
        cache: &mut ThemeCache,
        overrides: OverrideState,
    ) -> Option<AnalysisOutcome> {
        if ticket != self.ticket || self.target.as_deref() != Some(path) {
            tracing::debug!(path = %path.display(), ticket, "discarding stale theme analysis");
            return None;
        }
        self.target = None;

        let mut errors = Vec::new();
        if let Some(err) = apply_error {
            tracing::error!(path = %path.display(), error = %err, "failed to re-apply wallpaper");
            errors.push(format!("Failed to apply theme overrides: {err}"));
        }
        if let Err(err) = &output {
            errors.push(format!("Theme query failed: {err}"));
        }

        let (auto, source) = analysis::resolve(path, output);
        let flush_needed = cache.put(path, auto);
        let effective = overrides.apply(auto);

        tracing::info!(
            path = %path.display(),
            mode = %effective.mode,
            scheme = %effective.scheme,
            fallback = matches!(source, AnalysisSource::Fallback(_)),
            "theme applied"
        );
        self.notifier.theme_applied(path, &effective);

        Some(AnalysisOutcome {
            path: path.to_path_buf(),
            auto,
            effective,
            source,
            errors,
            flush_needed,
        })
    }

    /// Cancels the timer and invalidates any computation in flight.
    pub fn dispose(&mut self) {
        self.cancel_timer();
        self.ticket += 1;
        self.target = None;
    }

    fn supersede(&mut self, path: &Path) -> u64 {
        self.cancel_timer();
        self.ticket += 1;
        self.target = Some(path.to_path_buf());
        self.ticket
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for AnalysisPipeline {
    fn drop(&mut self) { self.cancel_timer(); }
}

impl std::fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("debounce", &self.debounce)
            .field("ticket", &self.ticket)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::JsonConfigStore;
    use crate::wallpaper::notifier::NullNotifier;
    use crate::wallpaper::types::{ModeOverride, SchemeOverride, ThemeMode, ThemeScheme};

    #[derive(Default)]
    struct FakeTool {
        applied: Mutex<Vec<(PathBuf, OverrideState)>>,
        queries: Mutex<usize>,
    }

    impl ThemeTool for FakeTool {
        fn apply_wallpaper(
            &self,
            path: &Path,
            overrides: OverrideState,
        ) -> BoxFuture<'static, Result<(), ToolError>> {
            self.applied.lock().push((path.to_path_buf(), overrides));
            Box::pin(async { Ok(()) })
        }

        fn query_theme(&self) -> BoxFuture<'static, Result<String, ToolError>> {
            *self.queries.lock() += 1;
            Box::pin(async { Ok("dark\nrainbow".to_string()) })
        }
    }

    fn pipeline(tool: Arc<FakeTool>) -> (AnalysisPipeline, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: PipelineSink = Arc::new(move |event| {
            let _ = tx.send(event);
        });
        (AnalysisPipeline::new(DEFAULT_DEBOUNCE, tool, Arc::new(NullNotifier), sink), rx)
    }

    fn cache() -> ThemeCache { ThemeCache::new(Arc::new(JsonConfigStore::in_memory()), 10) }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_schedules_coalesce() {
        let tool = Arc::new(FakeTool::default());
        let (mut pipeline, mut rx) = pipeline(Arc::clone(&tool));

        pipeline.schedule(Path::new("/w/a.png"));
        let latest = pipeline.schedule(Path::new("/w/b.png"));

        let Some(PipelineEvent::DebounceElapsed { ticket }) = rx.recv().await else {
            panic!("expected debounce event");
        };
        assert_eq!(ticket, latest);

        pipeline.on_debounce_elapsed(ticket);
        let Some(PipelineEvent::Queried { ticket, path, apply_error, output }) = rx.recv().await
        else {
            panic!("expected query result");
        };
        assert_eq!(path, Path::new("/w/b.png"));
        assert_eq!(*tool.queries.lock(), 1);

        let mut cache = cache();
        let outcome = pipeline
            .on_queried(ticket, &path, apply_error, output, &mut cache, OverrideState::default())
            .unwrap();
        assert_eq!(outcome.auto.mode, ThemeMode::Dark);
        assert!(outcome.errors.is_empty());
        assert!(cache.get(Path::new("/w/b.png")).is_some());
        assert!(cache.get(Path::new("/w/a.png")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_results_are_discarded() {
        let tool = Arc::new(FakeTool::default());
        let (mut pipeline, _rx) = pipeline(tool);
        let mut cache = cache();

        let stale = pipeline.schedule(Path::new("/w/a.png"));
        pipeline.schedule(Path::new("/w/b.png"));

        let outcome = pipeline.on_queried(
            stale,
            Path::new("/w/a.png"),
            None,
            Ok("light".to_string()),
            &mut cache,
            OverrideState::default(),
        );
        assert!(outcome.is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_now_applies_overrides_then_queries() {
        let tool = Arc::new(FakeTool::default());
        let (mut pipeline, mut rx) = pipeline(Arc::clone(&tool));
        let overrides = OverrideState {
            mode: ModeOverride::Light,
            scheme: SchemeOverride::Auto,
        };

        pipeline.run_now(Path::new("/w/a.png"), overrides);
        let Some(PipelineEvent::Queried { ticket, path, apply_error, output }) = rx.recv().await
        else {
            panic!("expected query result");
        };
        assert_eq!(tool.applied.lock().as_slice(), [(PathBuf::from("/w/a.png"), overrides)]);

        let mut cache = cache();
        let outcome =
            pipeline.on_queried(ticket, &path, apply_error, output, &mut cache, overrides).unwrap();

        assert_eq!(outcome.effective.mode, ThemeMode::Light);
        assert_eq!(outcome.effective.scheme, ThemeScheme::Rainbow);
        assert_eq!(outcome.effective.tone, 20);
        assert_eq!(cache.get(&path).unwrap().analysis.mode, ThemeMode::Dark);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_timer() {
        let tool = Arc::new(FakeTool::default());
        let (mut pipeline, mut rx) = pipeline(Arc::clone(&tool));

        pipeline.schedule(Path::new("/w/a.png"));
        pipeline.dispose();

        tokio::time::sleep(DEFAULT_DEBOUNCE * 5).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(*tool.queries.lock(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_failure_reports_error_and_falls_back() {
        let tool = Arc::new(FakeTool::default());
        let (mut pipeline, _rx) = pipeline(tool);
        let mut cache = cache();

        let ticket = pipeline.schedule(Path::new("/w/dark-night.png"));
        let outcome = pipeline
            .on_queried(
                ticket,
                Path::new("/w/dark-night.png"),
                None,
                Err(ToolError::NotFound("chromash".into())),
                &mut cache,
                OverrideState::default(),
            )
            .unwrap();

        assert!(matches!(outcome.source, AnalysisSource::Fallback(_)));
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.auto.tone, 20);
    }
}
