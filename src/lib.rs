//! travis-chart - Travis-CI build chart for GitHub repository pages
//!
//! This library turns a repository's recent Travis-CI build history into a
//! ten-column chart and remembers whether the user keeps it collapsed.
//!
//! # Features
//!
//! - Fetch and leniently parse the public build history feed
//! - Map builds to plotted minutes, outcome colors and HTML tooltips
//! - Assemble the fixed ten-column series with build-page links
//! - Persist the show/hide state and draw the chart lazily on first reveal
//! - Render the chart as a standalone HTML page
//!
//! # Example
//!
//! ```no_run
//! use travis_chart::{chart::HtmlChartFactory, controller::ChartController};
//! use travis_chart::{page::{RepoSlug, StaticPage}, store::MemoryStore};
//! use travis_chart::travis::{FeedConfig, TravisClient};
//!
//! # async fn run() -> travis_chart::Result<()> {
//! let repo = RepoSlug::new("rust-lang", "cargo");
//! let client = TravisClient::new(FeedConfig::default())?;
//! let factory = HtmlChartFactory::new("travis-chart".as_ref(), repo.to_string());
//!
//! let mut controller = ChartController::new(StaticPage::new(Some(repo)), MemoryStore::new(), factory);
//! let outcome = controller.show_chart(&client, true).await;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod chart;
pub mod controller;
pub mod error;
pub mod format;
pub mod git;
pub mod mapper;
pub mod page;
pub mod series;
pub mod store;
pub mod travis;
pub mod visibility;

pub use error::{Error, Result};
