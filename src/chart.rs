//! Chart widget interface, chart configuration and the HTML backend

use crate::error::Result;
use crate::page::HEADER_LABEL;
use crate::series::Series;
use crate::visibility::HIDDEN_KEY;
use minijinja::{context, Environment};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CHART_TITLE: &str = "Build Status (Recent 10 builds)";
pub const CHART_HEIGHT: u32 = 298;
pub const FONT_FAMILY: &str =
    "-apple-system, BlinkMacSystemFont, Segoe UI, Helvetica, Arial, sans-serif";
pub const TITLE_COLOR: &str = "#767676";

/// Declarative chart description handed to the widget
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub background_color: String,
    pub animation_enabled: bool,
    pub title: ChartTitle,
    pub axis_x: AxisTitle,
    pub axis_y: AxisTitle,
    pub tool_tip: ToolTipStyle,
    pub data: Vec<DataSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartTitle {
    pub text: String,
    pub font_family: String,
    pub font_weight: String,
    pub font_color: String,
    pub font_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisTitle {
    pub title: String,
    pub title_font_family: String,
    pub title_font_weight: String,
    pub title_font_size: u32,
}

impl AxisTitle {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            title_font_family: FONT_FAMILY.to_string(),
            title_font_weight: "normal".to_string(),
            title_font_size: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolTipStyle {
    pub font_family: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSeries {
    #[serde(rename = "type")]
    pub chart_type: String,
    pub data_points: Vec<ChartPoint>,
}

/// One column as the widget sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub label: String,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub tool_tip_content: String,
    /// Build page opened when the column is clicked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Build the widget configuration for a series
///
/// `link_for` returns the build page of the feed record at a given index.
pub fn build_chart_config<F>(
    series: &Series,
    width: u32,
    background_color: &str,
    link_for: F,
) -> ChartConfig
where
    F: Fn(usize) -> Option<String>,
{
    let data_points = series
        .points()
        .iter()
        .enumerate()
        .map(|(column, point)| {
            let url = series.resolve_click(column).and_then(&link_for);
            ChartPoint {
                label: point.label.clone(),
                y: point.value_minutes,
                color: point.color.map(|c| c.hex().to_string()),
                tool_tip_content: point.tooltip.clone(),
                cursor: url.as_ref().map(|_| "pointer".to_string()),
                url,
            }
        })
        .collect();

    ChartConfig {
        width,
        height: CHART_HEIGHT,
        background_color: background_color.to_string(),
        animation_enabled: true,
        title: ChartTitle {
            text: CHART_TITLE.to_string(),
            font_family: FONT_FAMILY.to_string(),
            font_weight: "normal".to_string(),
            font_color: TITLE_COLOR.to_string(),
            font_size: 20,
        },
        axis_x: AxisTitle::new("Build Number"),
        axis_y: AxisTitle::new("Build Time (Minutes)"),
        tool_tip: ToolTipStyle {
            font_family: FONT_FAMILY.to_string(),
        },
        data: vec![DataSeries {
            chart_type: "column".to_string(),
            data_points,
        }],
    }
}

/// A constructed chart that can draw itself
pub trait Chart {
    fn render(&mut self) -> Result<()>;
}

/// Creates charts from a configuration
pub trait ChartFactory {
    type Chart: Chart;

    fn construct(&self, config: ChartConfig) -> Self::Chart;
}

const CHART_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{{ repo }} - {{ header_label }}</title>
    <script src="https://cdn.canvasjs.com/canvasjs.min.js"></script>
    <style>
        body {
            font-family: {{ font_family }};
            background: {{ background_color }};
            margin: 2rem;
        }

        #chartHeader {
            width: 100%;
            padding: 5px 10px;
            cursor: pointer;
            border: 1px solid #e1e4e8;
            border-radius: 3px 3px 0 0;
        }

        #chartHeader h5 {
            margin: 0;
            font-size: 14px;
        }

        #chartContainer {
            height: 300px;
            width: 100%;
        }
    </style>
</head>
<body>
    <div id="chartHeader"><h5>{{ header_label }}</h5></div>
    <div id="chartContainer"></div>

    <script>
        const config = {{ config_json | safe }};
        const storageKey = "{{ storage_key }}";

        config.data.forEach(series => {
            series.dataPoints.forEach(point => {
                if (point.url) {
                    point.click = () => window.open(point.url, '_blank');
                }
            });
        });

        const container = document.getElementById('chartContainer');
        const chart = new CanvasJS.Chart('chartContainer', config);
        let rendered = false;

        if (localStorage[storageKey] === 'true') {
            container.style.display = 'none';
        } else {
            chart.render();
            rendered = true;
        }

        document.getElementById('chartHeader').addEventListener('click', () => {
            const hidden = container.style.display !== 'none';
            container.style.display = hidden ? 'none' : '';
            localStorage[storageKey] = hidden;
            if (!hidden && !rendered) {
                chart.render();
                rendered = true;
            }
        });
    </script>
</body>
</html>
"#;

/// Serialize for embedding in an inline `<script>`
///
/// Feed strings may contain `</script>` or line separators; they only ever
/// appear inside JSON strings, where the `\uXXXX` forms are equivalent.
fn script_safe_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    Ok(out)
}

/// Builds [`HtmlChart`]s writing into one output directory
#[derive(Debug, Clone)]
pub struct HtmlChartFactory {
    output_dir: PathBuf,
    repo: String,
}

impl HtmlChartFactory {
    pub fn new(output_dir: &Path, repo: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            repo: repo.into(),
        }
    }
}

impl ChartFactory for HtmlChartFactory {
    type Chart = HtmlChart;

    fn construct(&self, config: ChartConfig) -> HtmlChart {
        HtmlChart {
            config,
            output_dir: self.output_dir.clone(),
            repo: self.repo.clone(),
        }
    }
}

/// Chart rendered as a standalone HTML page plus its JSON configuration
#[derive(Debug, Clone)]
pub struct HtmlChart {
    config: ChartConfig,
    output_dir: PathBuf,
    repo: String,
}

impl HtmlChart {
    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn index_path(&self) -> PathBuf {
        self.output_dir.join("index.html")
    }

    /// Produce the page markup
    pub fn to_html(&self) -> Result<String> {
        let mut env = Environment::new();
        env.add_template("chart.html", CHART_TEMPLATE)?;
        let template = env.get_template("chart.html")?;

        let html = template.render(context! {
            repo => &self.repo,
            header_label => HEADER_LABEL,
            font_family => FONT_FAMILY,
            background_color => &self.config.background_color,
            storage_key => HIDDEN_KEY,
            config_json => script_safe_json(&self.config)?,
        })?;

        Ok(html)
    }
}

impl Chart for HtmlChart {
    fn render(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;

        let html = self.to_html()?;
        std::fs::write(self.index_path(), html)?;

        let json = serde_json::to_string_pretty(&self.config)?;
        std::fs::write(self.output_dir.join("chart.json"), json)?;

        debug!("Rendered chart to {:?}", self.index_path());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::assemble;
    use crate::travis::{BuildRecord, BuildState};
    use chrono::Utc;
    use tempfile::TempDir;

    fn two_build_series() -> Series {
        let records = vec![
            BuildRecord {
                id: Some(2002),
                number: Some("102".to_string()),
                state: BuildState::Finished,
                result: Some(0),
                duration: Some(65.0),
                message: Some("fix <bug>".to_string()),
                ..Default::default()
            },
            BuildRecord {
                id: Some(2001),
                number: Some("101".to_string()),
                state: BuildState::Finished,
                result: None,
                duration: Some(120.0),
                message: Some("ok".to_string()),
                ..Default::default()
            },
        ];
        assemble(&records, Utc::now())
    }

    #[test]
    fn test_chart_config_links_only_real_columns() {
        let series = two_build_series();
        let ids = [2002u64, 2001];
        let config = build_chart_config(&series, 640, "#fff", |idx| {
            ids.get(idx).map(|id| format!("https://travis-ci.org/o/r/builds/{}", id))
        });

        let points = &config.data[0].data_points;
        assert_eq!(points.len(), 10);
        assert!(points[..8].iter().all(|p| p.url.is_none() && p.cursor.is_none()));
        assert_eq!(
            points[9].url.as_deref(),
            Some("https://travis-ci.org/o/r/builds/2002")
        );
        assert_eq!(
            points[8].url.as_deref(),
            Some("https://travis-ci.org/o/r/builds/2001")
        );
        assert_eq!(points[9].cursor.as_deref(), Some("pointer"));
        assert_eq!(config.width, 640);
        assert_eq!(config.height, CHART_HEIGHT);
    }

    #[test]
    fn test_chart_config_serializes_widget_keys() {
        let config = build_chart_config(&two_build_series(), 640, "#fff", |_| None);
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["title"]["text"], CHART_TITLE);
        assert_eq!(json["axisX"]["title"], "Build Number");
        assert_eq!(json["axisY"]["title"], "Build Time (Minutes)");
        assert_eq!(json["data"][0]["type"], "column");
        assert_eq!(json["data"][0]["dataPoints"][9]["label"], "Latest:#102");
        assert!(json["data"][0]["dataPoints"][0].get("color").is_none());
    }

    #[test]
    fn test_html_chart_render_writes_files() {
        let dir = TempDir::new().unwrap();
        let factory = HtmlChartFactory::new(dir.path(), "owner/repo");
        let config = build_chart_config(&two_build_series(), 640, "#fff", |_| None);

        let mut chart = factory.construct(config);
        chart.render().unwrap();

        let html = std::fs::read_to_string(chart.index_path()).unwrap();
        assert!(html.contains(HEADER_LABEL));
        assert!(html.contains("Latest:#102"));
        assert!(html.contains("fix \\u0026lt;bug\\u0026gt;"));
        assert!(html.contains(HIDDEN_KEY));
        assert!(dir.path().join("chart.json").exists());
    }

    #[test]
    fn test_html_chart_keeps_feed_text_inside_script() {
        let body = r#"[{"id": 1, "number": "1</script><script>alert(1)</script>",
                        "state": "finished", "result": 1, "duration": 30,
                        "message": "line\u2028break"}]"#;
        let builds = crate::travis::parse_builds(body).unwrap();
        let series = assemble(&builds, Utc::now());
        let config = build_chart_config(&series, 640, "#fff", |_| None);

        let chart = HtmlChartFactory::new(Path::new("unused"), "<b>owner</b>/repo").construct(config);
        let html = chart.to_html().unwrap();

        assert_eq!(html.matches("</script>").count(), 2);
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("Latest:#1\\u003c/script\\u003e"));
        assert!(!html.contains('\u{2028}'));
        assert!(!html.contains("<b>owner</b>"));

        let json_start = html.find("const config = ").unwrap() + "const config = ".len();
        let json_end = json_start + html[json_start..].find(";\n").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&html[json_start..json_end]).unwrap();
        assert_eq!(
            parsed["data"][0]["dataPoints"][9]["label"],
            "Latest:#1</script><script>alert(1)</script>"
        );
    }

    #[test]
    fn test_script_safe_json_escapes_markup() {
        let json = script_safe_json(&"</script>&\u{2028}").unwrap();
        assert_eq!(json, r#""\u003c/script\u003e\u0026\u2028""#);
        let back: String = serde_json::from_str(&json).unwrap();
        assert_eq!(back, "</script>&\u{2028}");
    }
}
