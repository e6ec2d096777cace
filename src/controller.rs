//! Fetches the build history and drives the chart on a host page
//!
//! Nothing here reports failure to the page: an unsupported page, an empty
//! history or a failed request all leave the page untouched.

use crate::chart::{build_chart_config, Chart, ChartFactory};
use crate::error::Result;
use crate::page::{is_header_click_target, repo_from_link_path, HostPage, RepoSlug, UiEvent};
use crate::series::{assemble, Series};
use crate::store::KeyValueStore;
use crate::travis::{BuildFeed, BuildRecord};
use crate::visibility::{Visibility, VisibilityStore};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// What a call to [`ChartController::show_chart`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    /// No chart container or no repository link on the page
    NotApplicable,
    /// The feed had no builds
    NoBuilds,
    /// The request, the feed body or the page insertion failed
    Failed,
    /// The chart was inserted and drawn
    Rendered,
    /// The chart was inserted but kept collapsed, without drawing it
    Hidden,
}

/// Owns the chart UI state of one page view
pub struct ChartController<P, S, F: ChartFactory> {
    page: P,
    visibility: VisibilityStore<S>,
    factory: F,
    chart: Option<F::Chart>,
    series: Option<Series>,
    rendered: bool,
    toggle_bound: bool,
}

impl<P, S, F> ChartController<P, S, F>
where
    P: HostPage,
    S: KeyValueStore,
    F: ChartFactory,
{
    pub fn new(page: P, store: S, factory: F) -> Self {
        Self {
            page,
            visibility: VisibilityStore::new(store),
            factory,
            chart: None,
            series: None,
            rendered: false,
            toggle_bound: false,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Series of the most recent successful fetch
    pub fn series(&self) -> Option<&Series> {
        self.series.as_ref()
    }

    pub fn chart(&self) -> Option<&F::Chart> {
        self.chart.as_ref()
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    /// Visibility as currently persisted
    pub fn persisted_visibility(&self) -> Visibility {
        self.visibility.load()
    }

    pub fn is_chart_nonexistent(&self) -> bool {
        !self.page.chart_exists()
    }

    /// Repository the page belongs to, if the page supports the chart at all
    pub fn repository(&self) -> Option<RepoSlug> {
        if !self.page.has_container() {
            return None;
        }

        let path = self.page.repository_link_path()?;
        let slug = repo_from_link_path(&path);
        if slug.is_none() {
            debug!("Repository link {:?} is not an owner/repo path", path);
        }
        slug
    }

    /// Fetch the build history and insert the chart
    ///
    /// `is_first_time` is true for the initial page load; only then is the
    /// persisted hidden state honored and the header handler attached.
    pub async fn show_chart<B: BuildFeed>(&mut self, feed: &B, is_first_time: bool) -> ShowOutcome {
        let Some(repo) = self.repository() else {
            debug!("Page has no chart anchor, skipping");
            return ShowOutcome::NotApplicable;
        };

        let builds = match feed.fetch_builds(&repo).await {
            Ok(builds) => builds,
            Err(e) => {
                warn!("Failed to fetch builds for {}: {}", repo, e);
                return ShowOutcome::Failed;
            }
        };

        self.present(feed, &repo, &builds, is_first_time, Utc::now())
    }

    /// Insert and (unless collapsed) draw the chart for already fetched builds
    pub fn present<B: BuildFeed>(
        &mut self,
        feed: &B,
        repo: &RepoSlug,
        builds: &[BuildRecord],
        is_first_time: bool,
        now: DateTime<Utc>,
    ) -> ShowOutcome {
        if builds.is_empty() {
            debug!("No builds for {}", repo);
            return ShowOutcome::NoBuilds;
        }

        if let Err(e) = self.page.insert_chart() {
            warn!("Failed to insert chart: {}", e);
            return ShowOutcome::Failed;
        }

        let series = assemble(builds, now);
        let config = build_chart_config(
            &series,
            self.page.header_width(),
            &self.page.background_color(),
            |index| {
                builds
                    .get(index)
                    .and_then(|b| b.id)
                    .map(|id| feed.build_url(repo, id))
            },
        );
        info!("Built chart for {} with {} builds", repo, series.real_count());

        self.series = Some(series);
        self.chart = Some(self.factory.construct(config));
        self.rendered = false;

        let outcome = if is_first_time && self.visibility.load().is_hidden() {
            self.page.hide_chart();
            ShowOutcome::Hidden
        } else {
            match self.render() {
                Ok(()) => ShowOutcome::Rendered,
                Err(e) => {
                    warn!("Failed to render chart: {}", e);
                    ShowOutcome::Failed
                }
            }
        };

        if is_first_time && !self.toggle_bound {
            self.page.bind_header_toggle();
            self.toggle_bound = true;
        }

        outcome
    }

    /// Handle a click on the chart area
    ///
    /// Clicks outside the header are ignored. A header click slides the chart,
    /// then persists the new state and draws the chart if it is revealed for
    /// the first time. Returns the new visibility when a toggle happened.
    pub fn on_header_click(&mut self, event: &UiEvent) -> Result<Option<Visibility>> {
        if !self.toggle_bound || !is_header_click_target(event) {
            return Ok(None);
        }

        let visibility = Visibility::from_hidden(self.page.slide_toggle_chart());
        self.visibility.save(visibility)?;
        debug!("Chart is now {:?}", visibility);

        if !visibility.is_hidden() && !self.rendered {
            self.render()?;
        }

        Ok(Some(visibility))
    }

    fn render(&mut self) -> Result<()> {
        if let Some(chart) = self.chart.as_mut() {
            chart.render()?;
            self.rendered = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartConfig;
    use crate::error::Error;
    use crate::page::{StaticPage, HEADER_LABEL};
    use crate::store::MemoryStore;
    use crate::travis::BuildState;
    use crate::visibility::HIDDEN_KEY;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeFeed {
        builds: Option<Vec<BuildRecord>>,
        calls: Cell<usize>,
    }

    impl FakeFeed {
        fn with(builds: Vec<BuildRecord>) -> Self {
            Self {
                builds: Some(builds),
                calls: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                builds: None,
                calls: Cell::new(0),
            }
        }
    }

    impl BuildFeed for FakeFeed {
        async fn fetch_builds(&self, _repo: &RepoSlug) -> Result<Vec<BuildRecord>> {
            self.calls.set(self.calls.get() + 1);
            self.builds
                .clone()
                .ok_or_else(|| Error::FeedError("connection refused".to_string()))
        }

        fn build_url(&self, repo: &RepoSlug, build_id: u64) -> String {
            format!("https://ci.test/{}/builds/{}", repo, build_id)
        }
    }

    #[derive(Default)]
    struct RecordingFactory {
        renders: Rc<Cell<usize>>,
    }

    struct RecordingChart {
        config: ChartConfig,
        renders: Rc<Cell<usize>>,
    }

    impl ChartFactory for RecordingFactory {
        type Chart = RecordingChart;

        fn construct(&self, config: ChartConfig) -> RecordingChart {
            RecordingChart {
                config,
                renders: Rc::clone(&self.renders),
            }
        }
    }

    impl Chart for RecordingChart {
        fn render(&mut self) -> Result<()> {
            self.renders.set(self.renders.get() + 1);
            Ok(())
        }
    }

    fn builds(n: u64) -> Vec<BuildRecord> {
        (0..n)
            .map(|i| BuildRecord {
                id: Some(5000 + n - i),
                number: Some((100 + n - i).to_string()),
                state: BuildState::Finished,
                result: Some(1),
                duration: Some(60.0),
                message: Some("commit".to_string()),
                ..Default::default()
            })
            .collect()
    }

    fn repo_page() -> StaticPage {
        StaticPage::new(Some(RepoSlug::new("owner", "repo")))
    }

    fn hidden_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.set(HIDDEN_KEY, "true").unwrap();
        store
    }

    fn header_click() -> UiEvent {
        UiEvent::on(format!(" {}", HEADER_LABEL))
    }

    #[tokio::test]
    async fn test_inapplicable_page_does_nothing() {
        let factory = RecordingFactory::default();
        let renders = Rc::clone(&factory.renders);
        let mut controller = ChartController::new(StaticPage::new(None), MemoryStore::new(), factory);
        let feed = FakeFeed::with(builds(3));

        assert_eq!(controller.show_chart(&feed, true).await, ShowOutcome::NotApplicable);
        assert_eq!(feed.calls.get(), 0);
        assert!(controller.is_chart_nonexistent());
        assert_eq!(renders.get(), 0);
    }

    #[tokio::test]
    async fn test_empty_feed_creates_no_ui() {
        let mut controller =
            ChartController::new(repo_page(), MemoryStore::new(), RecordingFactory::default());
        let feed = FakeFeed::with(Vec::new());

        assert_eq!(controller.show_chart(&feed, true).await, ShowOutcome::NoBuilds);
        assert!(controller.is_chart_nonexistent());
        assert_eq!(controller.page().header_bindings(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_silent() {
        let mut controller =
            ChartController::new(repo_page(), MemoryStore::new(), RecordingFactory::default());

        let outcome = controller.show_chart(&FakeFeed::failing(), true).await;
        assert_eq!(outcome, ShowOutcome::Failed);
        assert!(controller.is_chart_nonexistent());
        assert!(controller.series().is_none());
    }

    #[tokio::test]
    async fn test_first_render_visible() {
        let factory = RecordingFactory::default();
        let renders = Rc::clone(&factory.renders);
        let mut controller = ChartController::new(repo_page().with_width(720), MemoryStore::new(), factory);

        let outcome = controller.show_chart(&FakeFeed::with(builds(4)), true).await;
        assert_eq!(outcome, ShowOutcome::Rendered);
        assert!(!controller.is_chart_nonexistent());
        assert!(controller.is_rendered());
        assert_eq!(renders.get(), 1);
        assert_eq!(controller.page().header_bindings(), 1);

        let config = &controller.chart().unwrap().config;
        assert_eq!(config.width, 720);
        let points = &config.data[0].data_points;
        assert_eq!(points[9].url.as_deref(), Some("https://ci.test/owner/repo/builds/5004"));
        assert!(points[0].url.is_none());
    }

    #[tokio::test]
    async fn test_hidden_state_defers_render_until_reveal() {
        let factory = RecordingFactory::default();
        let renders = Rc::clone(&factory.renders);
        let mut controller = ChartController::new(repo_page(), hidden_store(), factory);

        let outcome = controller.show_chart(&FakeFeed::with(builds(2)), true).await;
        assert_eq!(outcome, ShowOutcome::Hidden);
        assert!(controller.page().is_chart_hidden());
        assert_eq!(renders.get(), 0);

        let visibility = controller.on_header_click(&header_click()).unwrap();
        assert_eq!(visibility, Some(Visibility::Visible));
        assert_eq!(controller.persisted_visibility(), Visibility::Visible);
        assert_eq!(renders.get(), 1);

        // Collapsing and reopening does not draw again
        controller.on_header_click(&header_click()).unwrap();
        controller.on_header_click(&header_click()).unwrap();
        assert_eq!(renders.get(), 1);
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let mut controller =
            ChartController::new(repo_page(), MemoryStore::new(), RecordingFactory::default());
        controller.show_chart(&FakeFeed::with(builds(5)), true).await;

        let before = controller.persisted_visibility();
        assert_eq!(before, Visibility::Visible);

        controller.on_header_click(&header_click()).unwrap();
        assert_eq!(controller.persisted_visibility(), before.toggled());

        controller.on_header_click(&header_click()).unwrap();
        assert_eq!(controller.persisted_visibility(), before);
    }

    #[tokio::test]
    async fn test_clicks_in_chart_body_are_ignored() {
        let mut controller =
            ChartController::new(repo_page(), MemoryStore::new(), RecordingFactory::default());
        controller.show_chart(&FakeFeed::with(builds(5)), true).await;

        assert_eq!(controller.on_header_click(&UiEvent::on("#103")).unwrap(), None);
        assert_eq!(controller.persisted_visibility(), Visibility::Visible);
        assert!(!controller.page().is_chart_hidden());
    }

    #[tokio::test]
    async fn test_header_bound_once() {
        let mut controller = ChartController::new(repo_page(), hidden_store(), RecordingFactory::default());
        let feed = FakeFeed::with(builds(5));

        controller.show_chart(&feed, true).await;
        controller.show_chart(&feed, true).await;
        controller.show_chart(&feed, false).await;

        assert_eq!(controller.page().header_bindings(), 1);
        assert_eq!(feed.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_later_loads_ignore_hidden_state() {
        let factory = RecordingFactory::default();
        let renders = Rc::clone(&factory.renders);
        let mut controller = ChartController::new(repo_page(), hidden_store(), factory);

        let outcome = controller.show_chart(&FakeFeed::with(builds(5)), false).await;
        assert_eq!(outcome, ShowOutcome::Rendered);
        assert_eq!(renders.get(), 1);
        assert_eq!(controller.page().header_bindings(), 0);
    }

    #[tokio::test]
    async fn test_click_before_binding_is_ignored() {
        let mut controller =
            ChartController::new(repo_page(), MemoryStore::new(), RecordingFactory::default());
        assert_eq!(controller.on_header_click(&header_click()).unwrap(), None);
    }

    #[test]
    fn test_present_uses_given_time() {
        let start = Utc::now();
        let running = vec![BuildRecord {
            id: Some(1),
            number: Some("9".to_string()),
            state: BuildState::Started,
            started_at: Some(start.to_rfc3339()),
            ..Default::default()
        }];
        let feed = FakeFeed::with(Vec::new());
        let repo = RepoSlug::new("owner", "repo");

        let mut controller =
            ChartController::new(repo_page(), MemoryStore::new(), RecordingFactory::default());
        controller.present(&feed, &repo, &running, true, start + chrono::Duration::minutes(3));

        let latest = &controller.series().unwrap().points()[9];
        assert_eq!(latest.label, "Latest:#9");
        assert_eq!(latest.value_minutes, 3.0);
    }
}
