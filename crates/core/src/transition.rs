//! Request transition engine.
//!
//! [`apply_request`] is the pure check-then-act step behind `set_request`:
//! it inspects a borrowed update and either rejects the transition with a
//! specific error or returns the [`Revision`] to commit. Callers run it under
//! exclusive access via [`crate::store::UpdateStore::modify`].

use crate::enums::UpdateRequest;
use crate::error::CoreError;
use crate::model::{Comment, Update};
use crate::requirements::{check_requirements, RequirementSettings};
use crate::store::Revision;
use crate::types::Timestamp;

/// Validate and apply a request change.
///
/// The lock check runs before anything else; the requirement check only
/// applies to `stable`. On failure the input is untouched and no revision is
/// produced. Repeating a successful request produces another revision with
/// another audit comment.
pub fn apply_request(
    update: &Update,
    requested: UpdateRequest,
    actor: &str,
    settings: &RequirementSettings,
    now: Timestamp,
) -> Result<Revision, CoreError> {
    if update.locked {
        return Err(CoreError::LockedUpdate {
            update: update.alias.clone(),
        });
    }

    if requested == UpdateRequest::Stable {
        check_requirements(update, settings, now)
            .map_err(|unmet| CoreError::RequirementNotMet(unmet.to_string()))?;
    }

    let mut next = update.clone();
    next.request = requested;
    next.date_modified = Some(now);

    Ok(Revision {
        update: next,
        comment: Comment {
            author: actor.to_string(),
            text: request_comment(requested, actor),
            timestamp: now,
        },
    })
}

/// Audit text recorded for a request change.
pub fn request_comment(requested: UpdateRequest, actor: &str) -> String {
    match requested {
        UpdateRequest::None => format!("{actor} cleared the request."),
        UpdateRequest::Revoke => format!("{actor} revoked the pending request."),
        other => format!("This update has been submitted for {other} by {actor}."),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::enums::UpdateStatus;
    use crate::model::fixtures::{at, update};

    fn promotable() -> Update {
        let mut up = update(1, "bash-5.2-1.fc40", "F40", at(1));
        up.status = UpdateStatus::Testing;
        up.date_pushed = Some(at(1));
        up.karma = 5;
        up
    }

    #[test]
    fn locked_update_rejected_for_every_request() {
        let mut up = promotable();
        up.locked = true;
        for requested in UpdateRequest::VALUES {
            let err = apply_request(&up, *requested, "bob", &RequirementSettings::default(), at(20))
                .unwrap_err();
            assert_matches!(err, CoreError::LockedUpdate { update: ref alias } if *alias == up.alias);
        }
    }

    #[test]
    fn lock_checked_before_requirements() {
        let mut up = update(1, "bash-5.2-1.fc40", "F40", at(1));
        up.locked = true;
        let err = apply_request(
            &up,
            UpdateRequest::Stable,
            "bob",
            &RequirementSettings::default(),
            at(2),
        )
        .unwrap_err();
        assert_matches!(err, CoreError::LockedUpdate { .. });
    }

    #[test]
    fn stable_blocked_by_requirements() {
        let up = update(1, "bash-5.2-1.fc40", "F40", at(1));
        let err = apply_request(
            &up,
            UpdateRequest::Stable,
            "bob",
            &RequirementSettings::default(),
            at(2),
        )
        .unwrap_err();
        assert_matches!(err, CoreError::RequirementNotMet(reason) if reason.contains("in testing for 0 days"));
    }

    #[test]
    fn stable_allowed_when_requirements_met() {
        let up = promotable();
        let rev = apply_request(
            &up,
            UpdateRequest::Stable,
            "bob",
            &RequirementSettings::default(),
            at(20),
        )
        .unwrap();
        assert_eq!(rev.update.request, UpdateRequest::Stable);
        assert_eq!(rev.update.date_modified, Some(at(20)));
        assert_eq!(rev.comment.author, "bob");
        assert_eq!(
            rev.comment.text,
            "This update has been submitted for stable by bob."
        );
        // The input is borrowed, never modified.
        assert_eq!(up.request, UpdateRequest::Testing);
    }

    #[test]
    fn requirements_ignored_for_non_stable_requests() {
        let up = update(1, "bash-5.2-1.fc40", "F40", at(1));
        for requested in [
            UpdateRequest::None,
            UpdateRequest::Testing,
            UpdateRequest::Obsolete,
            UpdateRequest::Revoke,
        ] {
            let rev = apply_request(&up, requested, "bob", &RequirementSettings::default(), at(2))
                .unwrap();
            assert_eq!(rev.update.request, requested);
        }
    }

    #[test]
    fn gating_agrees_with_requirement_checker() {
        let settings = RequirementSettings::default();
        for karma in [-2, 0, 2, 3, 10] {
            for day in [1, 5, 8, 16, 28] {
                let mut up = promotable();
                up.karma = karma;
                let now = at(day);
                let checked = check_requirements(&up, &settings, now).is_ok();
                let applied =
                    apply_request(&up, UpdateRequest::Stable, "bob", &settings, now).is_ok();
                assert_eq!(checked, applied, "karma={karma} day={day}");
            }
        }
    }

    #[test]
    fn comment_wording() {
        assert_eq!(
            request_comment(UpdateRequest::Testing, "eve"),
            "This update has been submitted for testing by eve."
        );
        assert_eq!(
            request_comment(UpdateRequest::Revoke, "eve"),
            "eve revoked the pending request."
        );
        assert_eq!(
            request_comment(UpdateRequest::None, "eve"),
            "eve cleared the request."
        );
    }
}
