//! Host page capability and repository identification

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Text of the clickable chart header
pub const HEADER_LABEL: &str = "Travis-CI Build Chart";

/// Owner and name of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Link path as found on a repository page (`/owner/repo`)
    pub fn link_path(&self) -> String {
        format!("/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Derive the repository from the path of the page's repository link
pub fn repo_from_link_path(path: &str) -> Option<RepoSlug> {
    static LINK_PATH_RE: OnceLock<Regex> = OnceLock::new();
    let re = LINK_PATH_RE.get_or_init(|| {
        Regex::new(r"^/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)/?$").expect("link path regex compiles")
    });

    re.captures(path.trim())
        .map(|caps| RepoSlug::new(&caps[1], &caps[2]))
}

/// Parse a GitHub repository string into a slug
///
/// Accepts `owner/repo`, `https://github.com/owner/repo`,
/// `git@github.com:owner/repo.git` and `github.com/owner/repo`. URLs on
/// other hosts are rejected.
pub fn parse_github_repo(repo: &str) -> Result<RepoSlug> {
    let trimmed = repo.trim();
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let slug = if let Some(path) = trimmed.strip_prefix("git@github.com:") {
        // scp-style ssh remote
        slug_from_segments(path)
    } else if let Some(path) = trimmed.strip_prefix("github.com/") {
        slug_from_segments(path)
    } else if trimmed.contains("://") {
        // owner and name lead the URL path; anything after them is ignored
        url::Url::parse(trimmed)
            .ok()
            .filter(|url| matches!(url.host_str(), Some("github.com" | "www.github.com")))
            .and_then(|url| slug_from_segments(url.path()))
    } else if !trimmed.contains('@') && trimmed.matches('/').count() == 1 {
        slug_from_segments(trimmed)
    } else {
        None
    };

    slug.ok_or_else(|| {
        Error::ConfigError(format!("Could not parse GitHub repository from: {}", repo))
    })
}

/// First two non-empty `/`-separated segments as owner and name
fn slug_from_segments(path: &str) -> Option<RepoSlug> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let name = segments.next()?;
    Some(RepoSlug::new(owner, name))
}

/// A user interaction on the page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiEvent {
    /// Text content of the element the event landed on
    pub target_text: String,
}

impl UiEvent {
    pub fn on(target_text: impl Into<String>) -> Self {
        Self {
            target_text: target_text.into(),
        }
    }
}

/// Whether an event came from the chart header rather than the chart body
pub fn is_header_click_target(event: &UiEvent) -> bool {
    event.target_text.contains(HEADER_LABEL)
}

/// What the controller needs from the page it decorates
pub trait HostPage {
    /// The navigation container the chart is anchored to exists
    fn has_container(&self) -> bool;

    /// Path of the repository link element, e.g. `/owner/repo`
    fn repository_link_path(&self) -> Option<String>;

    /// Insert the chart header and the (empty) chart container after the anchor
    fn insert_chart(&mut self) -> Result<()>;

    /// The chart container element is present
    fn chart_exists(&self) -> bool;

    /// Hide the chart container without animation
    fn hide_chart(&mut self);

    /// Slide the chart container open or closed; returns whether it is hidden
    /// once the animation has completed
    fn slide_toggle_chart(&mut self) -> bool;

    /// Attach the header click handler
    fn bind_header_toggle(&mut self);

    /// Width available to the chart, in pixels
    fn header_width(&self) -> u32;

    /// Background color of the page body
    fn background_color(&self) -> String;
}

/// Page model without a browser: the container exists when a repository is known
#[derive(Debug, Clone)]
pub struct StaticPage {
    repo: Option<RepoSlug>,
    width: u32,
    background: String,
    chart_inserted: bool,
    chart_hidden: bool,
    header_bindings: usize,
}

impl StaticPage {
    pub fn new(repo: Option<RepoSlug>) -> Self {
        Self {
            repo,
            width: 980,
            background: "#ffffff".to_string(),
            chart_inserted: false,
            chart_hidden: false,
            header_bindings: 0,
        }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn is_chart_hidden(&self) -> bool {
        self.chart_hidden
    }

    /// How many times the header handler was attached
    pub fn header_bindings(&self) -> usize {
        self.header_bindings
    }
}

impl HostPage for StaticPage {
    fn has_container(&self) -> bool {
        self.repo.is_some()
    }

    fn repository_link_path(&self) -> Option<String> {
        self.repo.as_ref().map(RepoSlug::link_path)
    }

    fn insert_chart(&mut self) -> Result<()> {
        self.chart_inserted = true;
        Ok(())
    }

    fn chart_exists(&self) -> bool {
        self.chart_inserted
    }

    fn hide_chart(&mut self) {
        self.chart_hidden = true;
    }

    fn slide_toggle_chart(&mut self) -> bool {
        self.chart_hidden = !self.chart_hidden;
        self.chart_hidden
    }

    fn bind_header_toggle(&mut self) {
        self.header_bindings += 1;
    }

    fn header_width(&self) -> u32 {
        self.width
    }

    fn background_color(&self) -> String {
        self.background.clone()
    }
}
