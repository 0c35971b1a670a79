//! Stable-promotion requirement checking.
//!
//! Pure evaluation of an update's accumulated signals (karma, days in
//! testing, automated test results) against policy thresholds loaded from
//! configuration. Nothing here touches storage or mutates the update.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enums::TestGatingStatus;
use crate::model::Update;
use crate::types::Timestamp;

/// Default minimum karma before an update may go stable.
pub const DEFAULT_MIN_KARMA: i32 = 3;

/// Default minimum whole days in testing before an update may go stable.
pub const DEFAULT_MIN_DAYS_IN_TESTING: i64 = 7;

/// Default critical-path karma threshold.
pub const DEFAULT_CRITPATH_MIN_KARMA: i32 = 3;

/// Default critical-path days-in-testing threshold.
pub const DEFAULT_CRITPATH_MIN_DAYS: i64 = 14;

/// Policy thresholds consumed read-only by [`check_requirements`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSettings {
    pub min_karma: i32,
    pub min_days_in_testing: i64,
    pub critpath_min_karma: i32,
    pub critpath_min_days: i64,
    /// When set, automated tests must have passed (or been waived).
    pub require_passing_tests: bool,
}

impl Default for RequirementSettings {
    fn default() -> Self {
        Self {
            min_karma: DEFAULT_MIN_KARMA,
            min_days_in_testing: DEFAULT_MIN_DAYS_IN_TESTING,
            critpath_min_karma: DEFAULT_CRITPATH_MIN_KARMA,
            critpath_min_days: DEFAULT_CRITPATH_MIN_DAYS,
            require_passing_tests: false,
        }
    }
}

impl RequirementSettings {
    fn thresholds_for(&self, update: &Update) -> (i32, i64) {
        if update.critpath {
            (self.critpath_min_karma, self.critpath_min_days)
        } else {
            (self.min_karma, self.min_days_in_testing)
        }
    }
}

/// The first criterion an update failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "criterion")]
pub enum UnmetRequirement {
    TestsNotPassed { status: TestGatingStatus },
    InsufficientDaysInTesting { days: i64, required: i64 },
    InsufficientKarma { karma: i32, required: i32 },
}

impl fmt::Display for UnmetRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestsNotPassed { status } => {
                write!(f, "required tests have not passed (status: {status})")
            }
            Self::InsufficientDaysInTesting { days, required } => write!(
                f,
                "update has been in testing for {days} days, {required} required"
            ),
            Self::InsufficientKarma { karma, required } => {
                write!(f, "update has {karma} karma, {required} required")
            }
        }
    }
}

/// Check whether `update` may be requested for stable as of `now`.
///
/// Criteria are evaluated in order (tests, days in testing, karma) and the
/// first failure is returned.
pub fn check_requirements(
    update: &Update,
    settings: &RequirementSettings,
    now: Timestamp,
) -> Result<(), UnmetRequirement> {
    if settings.require_passing_tests && !update.test_gating_status.is_satisfied() {
        return Err(UnmetRequirement::TestsNotPassed {
            status: update.test_gating_status,
        });
    }

    let (min_karma, min_days) = settings.thresholds_for(update);

    let days = update.days_in_testing(now);
    if days < min_days {
        return Err(UnmetRequirement::InsufficientDaysInTesting {
            days,
            required: min_days,
        });
    }

    if update.karma < min_karma {
        return Err(UnmetRequirement::InsufficientKarma {
            karma: update.karma,
            required: min_karma,
        });
    }

    Ok(())
}
