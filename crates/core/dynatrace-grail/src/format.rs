//! Human-readable summaries of query results.

use std::fmt::Write as _;

use crate::budget::{bytes_to_gb, BudgetState};
use crate::types::QueryResult;

/// Records shown in the JSON preview by default.
pub const DEFAULT_MAX_PREVIEW_RECORDS: usize = 100;

/// Formatting options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Number of records rendered in the preview.
    pub max_preview_records: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            max_preview_records: DEFAULT_MAX_PREVIEW_RECORDS,
        }
    }
}

/// Cost tier of a query by bytes scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScanTier {
    NoData,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl ScanTier {
    /// Classify a scan size.
    pub fn from_bytes(bytes: u64) -> Self {
        let gb = bytes as f64 / crate::budget::BYTES_PER_GB;
        if bytes == 0 {
            Self::NoData
        } else if gb > 500.0 {
            Self::VeryHigh
        } else if gb > 50.0 {
            Self::High
        } else if gb > 5.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Advice shown next to the scanned size.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NoData => "💡 **No Data:** The query did not scan any data.",
            Self::Low => "💡 **Low Data Usage:** This query scanned a small amount of data.",
            Self::Moderate => {
                "💡 **Moderate Data Usage:** Consider narrowing the timeframe or adding filters \
                 for frequent queries."
            }
            Self::High => {
                "⚠️ **High Data Usage:** Consider narrowing the timeframe, adding filters or \
                 sampling to reduce cost."
            }
            Self::VeryHigh => {
                "⚠️ **Very High Data Usage:** This query scanned a very large amount of data. \
                 Narrow the timeframe and filter early to reduce cost."
            }
        }
    }
}

/// Render a query result as markdown text for the assistant.
///
/// Fields that are absent from the result are left out.
pub fn format_query_result(result: &QueryResult, options: &FormatOptions) -> String {
    let mut out = String::from("📊 **DQL Query Results**\n\n");

    if let Some(records) = result.scanned_records {
        let _ = writeln!(out, "- **Scanned Records:** {}", records);
    }

    if let Some(bytes) = result.scanned_bytes {
        let _ = writeln!(out, "- **Scanned Bytes:** {:.2} GB", bytes_to_gb(bytes_i64(bytes)));
        if let Some(state) = &result.budget_state {
            write_budget_usage(&mut out, state);
        }
        let _ = writeln!(out, "    - {}", ScanTier::from_bytes(bytes).advice());
    }

    if let Some(sampled) = result.sampled {
        let _ = writeln!(
            out,
            "- **Sampling Used:** {}",
            if sampled { "Yes" } else { "No" }
        );
    }

    if let Some(warning) = &result.budget_warning {
        let _ = write!(out, "\n{}\n", warning);
    }

    match result.records.as_deref() {
        Some(records) if !records.is_empty() => {
            let shown = records.len().min(options.max_preview_records);
            let preview = serde_json::to_string_pretty(&records[..shown])
                .unwrap_or_else(|e| format!("<unrenderable records: {}>", e));
            let _ = write!(
                out,
                "\n📋 **Query Results** ({} records):\n\n```json\n{}\n```\n",
                records.len(),
                preview
            );
            if shown < records.len() {
                let _ = writeln!(
                    out,
                    "\n*Showing first {} of {} records.*",
                    shown,
                    records.len()
                );
            }
        }
        _ => out.push_str("\nNo records returned.\n"),
    }

    out
}

fn write_budget_usage(out: &mut String, state: &BudgetState) {
    let total_gb = bytes_to_gb(state.total_bytes_scanned);
    match (state.budget_limit_gb, state.usage_percentage) {
        (Some(limit_gb), Some(usage)) => {
            let _ = writeln!(
                out,
                "    - **Session Budget:** {:.2} GB / {} GB, {:.1}% used",
                total_gb, limit_gb, usage
            );
        }
        _ => {
            let _ = writeln!(out, "    - **Session Total:** {:.2} GB (no budget limit)", total_gb);
        }
    }
}

fn bytes_i64(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}
