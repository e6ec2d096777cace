//! Per-build display attributes: plotted value, color and tooltip

use crate::format::{format_duration, to_minute_scale, truncate_message};
use crate::travis::{BuildRecord, BuildState};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Palette slot for a build outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildColor {
    Failure,
    Success,
    /// Unknown outcomes and builds still in progress
    Other,
}

impl BuildColor {
    /// Palette lookup by feed `result` code
    pub fn from_result(result: i64) -> Self {
        match result {
            0 => BuildColor::Failure,
            1 => BuildColor::Success,
            _ => BuildColor::Other,
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            BuildColor::Failure => "#cb2431",
            BuildColor::Success => "#28a745",
            BuildColor::Other => "#dbab09",
        }
    }
}

/// Builds that are not finished yet share the "other" slot.
pub const PENDING: BuildColor = BuildColor::Other;

/// `result` value a completed build without a result is treated as
const SUCCESS_RESULT: i64 = 1;

/// Label of a build whose number is missing; distinct from the padding label `#`
pub const UNKNOWN_NUMBER_LABEL: &str = "#?";

/// Display fields derived from one build record
#[derive(Debug, Clone, PartialEq)]
pub struct MappedBuild {
    /// `#<number>`
    pub label: String,
    pub value_minutes: f64,
    pub color: BuildColor,
    /// HTML tooltip content
    pub tooltip: String,
}

/// Map one build record to its display fields at time `now`
pub fn map_build(record: &BuildRecord, now: DateTime<Utc>) -> MappedBuild {
    let message = truncate_message(record.message.as_deref());
    let label = match record.number.as_deref().map(str::trim) {
        Some(number) if !number.is_empty() => format!("#{}", number),
        _ => UNKNOWN_NUMBER_LABEL.to_string(),
    };

    if record.state == BuildState::Started {
        if record.has_started_at() && record.finished_at.is_none() {
            let elapsed = record
                .started_time()
                .map(|started| (now - started).num_milliseconds() as f64 / 1000.0);

            return MappedBuild {
                label,
                value_minutes: to_minute_scale(elapsed),
                color: PENDING,
                tooltip: format!(
                    "<b>Running</b>, elapsed = {}<br/><span><b>Message:</b> {}</span>",
                    format_duration(elapsed),
                    message
                ),
            };
        }

        return MappedBuild {
            label,
            value_minutes: to_minute_scale(record.duration),
            color: PENDING,
            tooltip: format!(
                "Oops, the build may be cancelled.<br/><span><b>Message:</b> {}</span>",
                message
            ),
        };
    }

    let result = record.result.unwrap_or(SUCCESS_RESULT);
    MappedBuild {
        label,
        value_minutes: to_minute_scale(record.duration),
        color: BuildColor::from_result(result),
        tooltip: format!(
            "<b>Build Time</b>: {}<br/><span><b>Message:</b> {}</span>",
            format_duration(record.duration),
            message
        ),
    }
}
