//! Closed enumerations for the update workflow.
//!
//! Every enum is stored as its snake_case string in the database and on the
//! wire. The generated `VALUES` slice is the registry consulted by model
//! parsing, query parsing, and the edit-form option lists, so no other module
//! compares raw strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

macro_rules! define_str_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every accepted value, in registry order.
            pub const VALUES: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// Convert to the stored string value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }

            /// Convert from a stored or user-supplied string value.
            pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
                match s {
                    $( $val => Ok($name::$variant), )+
                    _ => Err(CoreError::Validation(format!(
                        "Invalid {} '{s}'. Must be one of: {}",
                        $label,
                        Self::names().join(", ")
                    ))),
                }
            }

            /// String values of every variant, in registry order.
            pub fn names() -> Vec<&'static str> {
                Self::VALUES.iter().map(|v| v.as_str()).collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_str_value(s)
            }
        }
    };
}

define_str_enum! {
    /// Current lifecycle stage of an update.
    UpdateStatus ("status") {
        Pending => "pending",
        Testing => "testing",
        Stable => "stable",
        Obsolete => "obsolete",
        Unpushed => "unpushed",
        SideTagActive => "side_tag_active",
        SideTagExpired => "side_tag_expired",
    }
}

impl UpdateStatus {
    /// Terminal statuses mark end-of-life; the row is kept for history.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Obsolete | Self::Unpushed)
    }
}

define_str_enum! {
    /// Desired next workflow state of an update.
    UpdateRequest ("request") {
        /// No pending request.
        None => "none",
        Testing => "testing",
        Stable => "stable",
        Obsolete => "obsolete",
        Revoke => "revoke",
    }
}

define_str_enum! {
    /// Kind of change an update carries.
    UpdateType ("type") {
        Bugfix => "bugfix",
        Enhancement => "enhancement",
        Security => "security",
        Newpackage => "newpackage",
    }
}

define_str_enum! {
    UpdateSeverity ("severity") {
        Unspecified => "unspecified",
        Urgent => "urgent",
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

define_str_enum! {
    /// What the user should do after installing the update.
    UpdateSuggestion ("suggest") {
        Unspecified => "unspecified",
        Reboot => "reboot",
        Logout => "logout",
    }
}

define_str_enum! {
    /// Aggregate result of the automated tests attached to an update.
    TestGatingStatus ("test gating status") {
        Waiting => "waiting",
        Ignored => "ignored",
        Queued => "queued",
        Running => "running",
        Passed => "passed",
        Failed => "failed",
    }
}

impl TestGatingStatus {
    /// Whether the test results allow promotion.
    pub fn is_satisfied(self) -> bool {
        matches!(self, Self::Passed | Self::Ignored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        let terminal: Vec<_> = UpdateStatus::VALUES
            .iter()
            .filter(|s| s.is_terminal())
            .copied()
            .collect();
        assert_eq!(terminal, vec![UpdateStatus::Obsolete, UpdateStatus::Unpushed]);
    }

    #[test]
    fn from_str_value_accepts_every_registered_value() {
        for status in UpdateStatus::VALUES {
            assert_eq!(UpdateStatus::from_str_value(status.as_str()).unwrap(), *status);
        }
        for request in UpdateRequest::VALUES {
            assert_eq!(request.as_str().parse::<UpdateRequest>().unwrap(), *request);
        }
    }

    #[test]
    fn unknown_value_lists_valid_choices() {
        let err = UpdateSeverity::from_str_value("catastrophic").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Invalid severity 'catastrophic'"));
        assert!(msg.contains("urgent"));
    }

    #[test]
    fn serde_matches_stored_strings() {
        for status in UpdateStatus::VALUES {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        for kind in UpdateType::VALUES {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert_eq!(
            serde_json::from_str::<UpdateRequest>("\"none\"").unwrap(),
            UpdateRequest::None
        );
    }

    #[test]
    fn gating_satisfied_only_for_passed_or_ignored() {
        assert!(TestGatingStatus::Passed.is_satisfied());
        assert!(TestGatingStatus::Ignored.is_satisfied());
        assert!(!TestGatingStatus::Failed.is_satisfied());
        assert!(!TestGatingStatus::Waiting.is_satisfied());
    }
}
