//! Fixed ten-column series for the build chart
//!
//! The feed lists builds newest first. The chart plots them oldest to newest,
//! left to right, so column `i` shows record `COLUMN_AMOUNT - 1 - i`. When fewer
//! than ten builds exist the leftmost columns are `#` placeholders.

use crate::mapper::{map_build, BuildColor};
use crate::travis::BuildRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of columns the chart always shows
pub const COLUMN_AMOUNT: usize = 10;

/// Label of a column without a build
pub const PLACEHOLDER_LABEL: &str = "#";

/// One plotted column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPoint {
    /// `#<number>`, `Latest:#<number>` or `#` for padding
    pub label: String,
    pub value_minutes: f64,
    /// Absent for padding columns
    pub color: Option<BuildColor>,
    /// HTML tooltip; empty for padding columns
    pub tooltip: String,
    /// Index into the feed list this column was built from
    pub build_index: Option<usize>,
}

impl DisplayPoint {
    fn placeholder() -> Self {
        Self {
            label: PLACEHOLDER_LABEL.to_string(),
            value_minutes: 0.0,
            color: None,
            tooltip: String::new(),
            build_index: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.build_index.is_none()
    }
}

/// The assembled chart columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    points: Vec<DisplayPoint>,
}

impl Series {
    /// Columns, left to right
    pub fn points(&self) -> &[DisplayPoint] {
        &self.points
    }

    /// Number of columns backed by a build
    pub fn real_count(&self) -> usize {
        self.points.iter().filter(|p| !p.is_placeholder()).count()
    }

    /// Feed index of the build behind column `column`, if any
    pub fn resolve_click(&self, column: usize) -> Option<usize> {
        let order = column_to_record_index(column)?;
        self.points
            .get(column)
            .and_then(|p| p.build_index)
            .filter(|&idx| idx == order)
    }
}

/// Record index shown at a column, ignoring whether that record exists
pub fn column_to_record_index(column: usize) -> Option<usize> {
    (COLUMN_AMOUNT - 1).checked_sub(column)
}

/// Build the ten chart columns from the feed list at time `now`
pub fn assemble(records: &[BuildRecord], now: DateTime<Utc>) -> Series {
    let range = records.len().min(COLUMN_AMOUNT);

    let mut newest_first: Vec<DisplayPoint> = records[..range]
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let mapped = map_build(record, now);
            DisplayPoint {
                label: mapped.label,
                value_minutes: mapped.value_minutes,
                color: Some(mapped.color),
                tooltip: mapped.tooltip,
                build_index: Some(index),
            }
        })
        .collect();

    if let Some(latest) = newest_first.first_mut() {
        latest.label = format!("Latest:{}", latest.label);
    }

    newest_first.resize_with(COLUMN_AMOUNT, DisplayPoint::placeholder);
    newest_first.reverse();

    Series {
        points: newest_first,
    }
}
