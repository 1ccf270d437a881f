//! Grail budget tracking for MCP sessions.
//!
//! Tracks the bytes scanned by DQL queries against a session budget so AI
//! assistants don't run up unexpected Grail consumption. Warns when usage
//! approaches the ceiling and lets callers block further queries once it is
//! exceeded.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GrailError, GrailResult};

/// Bytes per GB (base 1000, as billed by Grail).
pub const BYTES_PER_GB: f64 = 1_000_000_000.0;

/// Share of the budget at which the approaching warning starts.
pub const WARNING_THRESHOLD_RATIO: f64 = 0.8;

/// Configuration value that disables the budget.
pub const UNLIMITED_BUDGET_SENTINEL: f64 = -1.0;

/// Default session budget in GB.
pub const DEFAULT_BUDGET_GB: f64 = 1000.0;

/// A validated session budget ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetLimit {
    gb: Option<f64>,
}

impl BudgetLimit {
    /// Budget without a ceiling. Usage is still counted.
    pub const fn unlimited() -> Self {
        Self { gb: None }
    }

    /// Validate a ceiling in GB.
    ///
    /// Accepts positive finite values and the `-1` sentinel for unlimited.
    pub fn from_gb(gb: f64) -> GrailResult<Self> {
        if gb == UNLIMITED_BUDGET_SENTINEL {
            return Ok(Self::unlimited());
        }
        let bytes = gb * BYTES_PER_GB;
        if !gb.is_finite() || gb <= 0.0 || bytes.round() < 1.0 || bytes > i64::MAX as f64 {
            return Err(GrailError::InvalidBudget { value: gb });
        }
        Ok(Self { gb: Some(gb) })
    }

    /// Ceiling in GB, `None` when unlimited.
    pub fn gb(&self) -> Option<f64> {
        self.gb
    }

    /// Ceiling in bytes, `None` when unlimited.
    pub fn bytes(&self) -> Option<i64> {
        self.gb.map(|gb| (gb * BYTES_PER_GB).round() as i64)
    }

    /// Check whether this is the unlimited budget.
    pub fn is_unlimited(&self) -> bool {
        self.gb.is_none()
    }
}

impl Default for BudgetLimit {
    fn default() -> Self {
        Self {
            gb: Some(DEFAULT_BUDGET_GB),
        }
    }
}

impl fmt::Display for BudgetLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.gb {
            Some(gb) => write!(f, "{} GB", gb),
            None => write!(f, "unlimited"),
        }
    }
}

/// Kind of budget warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Usage is at or above 80% of the ceiling.
    Approaching,
    /// Usage is at or above the ceiling.
    Exceeded,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approaching => write!(f, "approaching"),
            Self::Exceeded => write!(f, "exceeded"),
        }
    }
}

/// Warning produced when a query pushes usage over a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetWarning {
    /// Which threshold was crossed.
    pub kind: WarningKind,
    /// Human-readable message for the assistant.
    pub message: String,
    /// Usage after the query, in percent of the ceiling.
    pub usage_percentage: f64,
}

impl BudgetWarning {
    fn approaching(usage_percentage: f64, limit_gb: f64) -> Self {
        Self {
            kind: WarningKind::Approaching,
            message: format!(
                "⚠️ **Approaching Grail Budget Limit!** ({:.1}% of {} GB limit used)\n\n\
                 You are approaching your Grail query budget limit. Consider optimizing your \
                 queries or resetting the budget if needed.",
                usage_percentage, limit_gb
            ),
            usage_percentage,
        }
    }

    fn exceeded(usage_percentage: f64, limit_gb: f64) -> Self {
        Self {
            kind: WarningKind::Exceeded,
            message: format!(
                "🚫 **Grail Budget Exceeded!** ({:.1}% of {} GB limit used)\n\n\
                 Your session has exceeded the Grail query budget limit. No further DQL queries \
                 will be executed until you reset the budget using the \"reset_grail_budget\" tool.\n\n\
                 Consider optimizing your queries or increasing the DT_GRAIL_QUERY_BUDGET_GB \
                 environment variable.",
                usage_percentage, limit_gb
            ),
            usage_percentage,
        }
    }
}

/// Snapshot of a tracker, for display and JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetState {
    /// Bytes scanned so far in this session.
    pub total_bytes_scanned: i64,
    /// Ceiling in bytes (absent when unlimited).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_limit_bytes: Option<i64>,
    /// Ceiling in GB as configured (absent when unlimited).
    #[serde(rename = "budgetLimitGB", skip_serializing_if = "Option::is_none")]
    pub budget_limit_gb: Option<f64>,
    /// Whether the ceiling has been reached.
    pub is_budget_exceeded: bool,
    /// Usage in bytes at which warnings start (absent when unlimited).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_threshold_bytes: Option<i64>,
    /// Usage in percent of the ceiling (absent when unlimited).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_percentage: Option<f64>,
}

/// Budget tracker for one session.
///
/// Thread-safe: the counter is updated with a single atomic read-modify-write
/// and the warning is evaluated from the value that update produced.
#[derive(Debug)]
pub struct BudgetTracker {
    /// Configured ceiling.
    limit: BudgetLimit,
    /// Bytes scanned so far.
    total_bytes_scanned: AtomicI64,
}

impl BudgetTracker {
    /// Create a tracker with nothing scanned yet.
    pub fn new(limit: BudgetLimit) -> Self {
        Self {
            limit,
            total_bytes_scanned: AtomicI64::new(0),
        }
    }

    /// Get the configured ceiling.
    pub fn limit(&self) -> BudgetLimit {
        self.limit
    }

    /// Get the bytes scanned so far.
    pub fn total_bytes_scanned(&self) -> i64 {
        self.total_bytes_scanned.load(Ordering::Acquire)
    }

    /// Record scanned bytes and return a warning if a threshold is crossed.
    ///
    /// Any delta is accepted, negative ones included; the sum saturates at
    /// the `i64` range. A warning is returned on every call made while usage
    /// is above the threshold, not only on the first crossing.
    pub fn add_bytes_scanned(&self, bytes: i64) -> Option<BudgetWarning> {
        let previous = self
            .total_bytes_scanned
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(bytes))
            })
            .unwrap_or_else(|current| current);
        let total = previous.saturating_add(bytes);

        let (limit_bytes, limit_gb) = (self.limit.bytes()?, self.limit.gb()?);
        let usage_percentage = usage_percentage(total, limit_bytes);

        if total >= limit_bytes {
            Some(BudgetWarning::exceeded(usage_percentage, limit_gb))
        } else if total >= warning_threshold(limit_bytes) {
            Some(BudgetWarning::approaching(usage_percentage, limit_gb))
        } else {
            None
        }
    }

    /// Check whether scanning `additional_bytes` more would reach the ceiling.
    pub fn would_exceed_budget(&self, additional_bytes: i64) -> bool {
        match self.limit.bytes() {
            Some(limit_bytes) => {
                self.total_bytes_scanned().saturating_add(additional_bytes) >= limit_bytes
            }
            None => false,
        }
    }

    /// Check whether the ceiling has been reached.
    pub fn is_budget_exceeded(&self) -> bool {
        self.limit
            .bytes()
            .is_some_and(|limit_bytes| self.total_bytes_scanned() >= limit_bytes)
    }

    /// Take a snapshot of the current usage.
    pub fn state(&self) -> BudgetState {
        let total = self.total_bytes_scanned();
        let limit_bytes = self.limit.bytes();

        BudgetState {
            total_bytes_scanned: total,
            budget_limit_bytes: limit_bytes,
            budget_limit_gb: self.limit.gb(),
            is_budget_exceeded: limit_bytes.is_some_and(|limit| total >= limit),
            warning_threshold_bytes: limit_bytes.map(warning_threshold),
            usage_percentage: limit_bytes.map(|limit| usage_percentage(total, limit)),
        }
    }

    /// Zero the counter. The ceiling is unchanged.
    pub fn reset(&self) {
        self.total_bytes_scanned.store(0, Ordering::Release);
    }
}

/// The budget ledger of one server session.
///
/// Creates its tracker lazily on first use. The ceiling passed on that first
/// call wins: later lookups with a different ceiling return the existing
/// tracker unchanged until [`BudgetRegistry::clear`] is called.
#[derive(Debug, Default)]
pub struct BudgetRegistry {
    tracker: RwLock<Option<Arc<BudgetTracker>>>,
}

impl BudgetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session tracker, creating it with `limit` if none exists.
    pub fn tracker(&self, limit: BudgetLimit) -> Arc<BudgetTracker> {
        if let Some(existing) = self.current() {
            if existing.limit() != limit {
                warn!(
                    active_limit = %existing.limit(),
                    requested_limit = %limit,
                    "Budget tracker already exists, ignoring requested limit"
                );
            }
            return existing;
        }

        let mut slot = self
            .tracker
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(existing) => Arc::clone(existing),
            None => {
                debug!(limit = %limit, "Creating Grail budget tracker");
                let tracker = Arc::new(BudgetTracker::new(limit));
                *slot = Some(Arc::clone(&tracker));
                tracker
            }
        }
    }

    /// Get the session tracker if it has been created.
    pub fn current(&self) -> Option<Arc<BudgetTracker>> {
        self.tracker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record scanned bytes on the session tracker.
    pub fn add_bytes_scanned(&self, bytes: i64, limit: BudgetLimit) -> Option<BudgetWarning> {
        self.tracker(limit).add_bytes_scanned(bytes)
    }

    /// Get the budget status of the session.
    pub fn budget_status(&self, limit: BudgetLimit) -> BudgetState {
        self.tracker(limit).state()
    }

    /// Check whether scanning `additional_bytes` more would reach the ceiling.
    pub fn would_exceed_budget(&self, additional_bytes: i64, limit: BudgetLimit) -> bool {
        self.tracker(limit).would_exceed_budget(additional_bytes)
    }

    /// Zero the session counter, keeping the tracker and its ceiling.
    pub fn reset(&self) {
        if let Some(tracker) = self.current() {
            info!(
                previous_bytes = tracker.total_bytes_scanned(),
                "Grail budget reset"
            );
            tracker.reset();
        }
    }

    /// Drop the tracker so the next lookup creates a fresh one.
    pub fn clear(&self) {
        *self
            .tracker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Fail if the session budget has been exceeded.
    ///
    /// Call this before issuing a query.
    pub fn enforce_budget_limit(&self, limit: BudgetLimit) -> GrailResult<()> {
        let tracker = self.tracker(limit);
        if !tracker.is_budget_exceeded() {
            return Ok(());
        }

        let state = tracker.state();
        Err(GrailError::BudgetExceeded {
            usage_percentage: state.usage_percentage.unwrap_or_default(),
            limit_gb: state.budget_limit_gb.unwrap_or_default(),
        })
    }
}

/// Convert bytes to GB (base 1000).
pub fn bytes_to_gb(bytes: i64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

fn warning_threshold(limit_bytes: i64) -> i64 {
    (limit_bytes as f64 * WARNING_THRESHOLD_RATIO).round() as i64
}

fn usage_percentage(total: i64, limit_bytes: i64) -> f64 {
    total as f64 / limit_bytes as f64 * 100.0
}
