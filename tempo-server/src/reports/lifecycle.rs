//! Report Lifecycle Engine
//!
//! One approval sequence for all three report granularities:
//!
//! ```text
//! DRAFT → SUBMITTED → REVIEWED → HEAD_REVIEWED → APPROVED
//!                  ↘──────────↘──────────────↘ REJECTED
//! ```
//!
//! Every advancing stage requires a non-empty signature; comments are
//! optional everywhere. Transitions are never re-entrant: each write carries
//! the observed status as a precondition, and a lost race (zero affected
//! rows) surfaces as a conflict instead of being silently re-applied.

use shared::models::{
    Account, Report, ReportStatus, Role, TransitionPayload, report::skips_supervisor_tier,
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{account, report};
use crate::reports::rollup;
use crate::services::notification;
use crate::utils::validation::{MAX_NOTE_LEN, MAX_SIGNATURE_LEN, validate_optional_text, validate_required_text};
use crate::utils::AppError;

const RESOURCE: &str = "report";

async fn load_report(state: &ServerState, id: i64) -> Result<Report, AppError> {
    report::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Report {} not found", id)))
}

async fn load_owner(state: &ServerState, rep: &Report) -> Result<Account, AppError> {
    account::find_by_id(&state.pool, rep.account_id)
        .await?
        .ok_or_else(|| AppError::internal(format!("Report {} owner missing", rep.id)))
}

fn validate_payload(payload: &TransitionPayload) -> Result<(), AppError> {
    validate_required_text(&payload.signature, "signature", MAX_SIGNATURE_LEN)?;
    validate_optional_text(&payload.comment, "comment", MAX_NOTE_LEN)?;
    Ok(())
}

/// 零行更新 → 重新读当前状态，报冲突（绝不盲目重放）
async fn transition_conflict(
    state: &ServerState,
    id: i64,
    attempted: &str,
) -> AppError {
    match report::find_by_id(&state.pool, id).await {
        Ok(Some(rep)) => AppError::invalid_transition(format!(
            "Cannot {} a report in status {}",
            attempted, rep.status
        )),
        _ => AppError::not_found(format!("Report {} not found", id)),
    }
}

/// DRAFT → SUBMITTED (员工签名)。Only the owner submits their own report.
pub async fn submit(
    state: &ServerState,
    report_id: i64,
    actor: &CurrentUser,
    payload: &TransitionPayload,
) -> Result<Report, AppError> {
    validate_payload(payload)?;

    let rep = load_report(state, report_id).await?;
    if rep.account_id != actor.id {
        return Err(AppError::forbidden("Only the owner can submit a report"));
    }
    if rep.status != ReportStatus::Draft {
        return Err(AppError::invalid_transition(format!(
            "Cannot submit a report in status {}",
            rep.status
        )));
    }

    let now = state.clock.now_millis();
    if !report::mark_submitted(&state.pool, report_id, &payload.signature, now).await? {
        return Err(transition_conflict(state, report_id, "submit").await);
    }

    let updated = load_report(state, report_id).await?;
    state
        .broadcast_sync(RESOURCE, "status_changed", &report_id.to_string(), Some(&updated))
        .await;
    Ok(updated)
}

/// SUBMITTED → REVIEWED (主管签名)
pub async fn supervisor_approve(
    state: &ServerState,
    report_id: i64,
    actor: &CurrentUser,
    payload: &TransitionPayload,
) -> Result<Report, AppError> {
    validate_payload(payload)?;
    if !actor.has_role(Role::Supervisor) {
        return Err(AppError::forbidden("Requires SUPERVISOR role or above"));
    }

    let rep = load_report(state, report_id).await?;
    if rep.status != ReportStatus::Submitted {
        return Err(AppError::invalid_transition(format!(
            "Cannot review a report in status {}",
            rep.status
        )));
    }

    let owner = load_owner(state, &rep).await?;
    if skips_supervisor_tier(owner.role) {
        return Err(AppError::invalid_transition(
            "Management-authored reports skip supervisor review",
        ));
    }

    let now = state.clock.now_millis();
    if !report::mark_reviewed(
        &state.pool,
        report_id,
        &payload.signature,
        payload.comment.as_deref(),
        now,
    )
    .await?
    {
        return Err(transition_conflict(state, report_id, "review").await);
    }

    let updated = load_report(state, report_id).await?;
    state
        .broadcast_sync(RESOURCE, "status_changed", &report_id.to_string(), Some(&updated))
        .await;
    Ok(updated)
}

/// {REVIEWED | SUBMITTED-by-management} → HEAD_REVIEWED (部门主任签名)
pub async fn head_approve(
    state: &ServerState,
    report_id: i64,
    actor: &CurrentUser,
    payload: &TransitionPayload,
) -> Result<Report, AppError> {
    validate_payload(payload)?;
    if !actor.has_role(Role::Manager) {
        return Err(AppError::forbidden("Requires MANAGER role or above"));
    }

    let rep = load_report(state, report_id).await?;
    let owner = load_owner(state, &rep).await?;

    let expected = match rep.status {
        ReportStatus::Reviewed => ReportStatus::Reviewed,
        ReportStatus::Submitted if skips_supervisor_tier(owner.role) => ReportStatus::Submitted,
        other => {
            return Err(AppError::invalid_transition(format!(
                "Cannot head-review a report in status {}",
                other
            )));
        }
    };

    let now = state.clock.now_millis();
    if !report::mark_head_reviewed(
        &state.pool,
        report_id,
        expected,
        &payload.signature,
        payload.comment.as_deref(),
        now,
    )
    .await?
    {
        return Err(transition_conflict(state, report_id, "head-review").await);
    }

    let updated = load_report(state, report_id).await?;
    state
        .broadcast_sync(RESOURCE, "status_changed", &report_id.to_string(), Some(&updated))
        .await;
    Ok(updated)
}

/// {REVIEWED | HEAD_REVIEWED} → APPROVED (经理签名)
///
/// 副作用：同步触发所属部门该期间的汇总，best-effort——汇总失败只记
/// 日志，审批不回滚。
pub async fn manager_approve(
    state: &ServerState,
    report_id: i64,
    actor: &CurrentUser,
    payload: &TransitionPayload,
) -> Result<Report, AppError> {
    validate_payload(payload)?;
    if !actor.has_role(Role::Manager) {
        return Err(AppError::forbidden("Requires MANAGER role or above"));
    }

    let rep = load_report(state, report_id).await?;
    let expected = match rep.status {
        ReportStatus::Reviewed => ReportStatus::Reviewed,
        ReportStatus::HeadReviewed => ReportStatus::HeadReviewed,
        other => {
            return Err(AppError::invalid_transition(format!(
                "Cannot final-approve a report in status {}",
                other
            )));
        }
    };

    let now = state.clock.now_millis();
    if !report::mark_approved(
        &state.pool,
        report_id,
        expected,
        &payload.signature,
        payload.comment.as_deref(),
        now,
    )
    .await?
    {
        return Err(transition_conflict(state, report_id, "final-approve").await);
    }

    let updated = load_report(state, report_id).await?;

    // Departmental rollup, best-effort
    if let Some(department_id) = updated.department_id {
        if let Err(e) = rollup::aggregate(
            &state.pool,
            &state.clock,
            department_id,
            updated.period_type,
            &updated.period_key,
        )
        .await
        {
            tracing::error!(
                report_id,
                department_id,
                "Rollup aggregation after approval failed: {}",
                e
            );
        }
    }

    notification::notify(
        state,
        updated.account_id,
        shared::models::NotificationKind::ReportGenerated,
        &format!("{} report approved", updated.period_type),
        &format!("Your {} report for {} was approved", updated.period_type, updated.period_key),
    )
    .await;

    state
        .broadcast_sync(RESOURCE, "status_changed", &report_id.to_string(), Some(&updated))
        .await;
    Ok(updated)
}

/// {SUBMITTED | REVIEWED | HEAD_REVIEWED} → REJECTED (终态)
pub async fn reject(
    state: &ServerState,
    report_id: i64,
    actor: &CurrentUser,
    comment: Option<&str>,
) -> Result<Report, AppError> {
    if !actor.has_role(Role::Supervisor) {
        return Err(AppError::forbidden("Requires SUPERVISOR role or above"));
    }
    validate_optional_text(&comment.map(|c| c.to_string()), "comment", MAX_NOTE_LEN)?;

    let rep = load_report(state, report_id).await?;
    let expected = match rep.status {
        ReportStatus::Submitted => ReportStatus::Submitted,
        ReportStatus::Reviewed => ReportStatus::Reviewed,
        ReportStatus::HeadReviewed => ReportStatus::HeadReviewed,
        other => {
            return Err(AppError::invalid_transition(format!(
                "Cannot reject a report in status {}",
                other
            )));
        }
    };

    let now = state.clock.now_millis();
    if !report::mark_rejected(&state.pool, report_id, expected, actor.id, comment, now).await? {
        return Err(transition_conflict(state, report_id, "reject").await);
    }

    let updated = load_report(state, report_id).await?;
    notification::notify(
        state,
        updated.account_id,
        shared::models::NotificationKind::ReportGenerated,
        &format!("{} report rejected", updated.period_type),
        &format!(
            "Your {} report for {} was rejected{}",
            updated.period_type,
            updated.period_key,
            comment.map(|c| format!(": {c}")).unwrap_or_default()
        ),
    )
    .await;

    state
        .broadcast_sync(RESOURCE, "status_changed", &report_id.to_string(), Some(&updated))
        .await;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Clock;
    use shared::models::{AccountCreate, PeriodType, ReportCreate};

    use crate::auth::credential;
    use crate::core::Config;
    use crate::db::DbService;

    async fn test_state() -> ServerState {
        let db = DbService::in_memory().await.expect("in-memory db");
        let config = Config::with_overrides("/tmp/tempo-test", 0);
        ServerState::with_pool(config, db.pool, Clock::fixed_at(1_700_000_000_000))
    }

    async fn seed_user(state: &ServerState, email: &str, role: Role) -> CurrentUser {
        let hash = credential::hash_password("pw").unwrap();
        let acct = account::create(
            &state.pool,
            AccountCreate {
                email: email.into(),
                password: String::new(),
                display_name: None,
                role,
                department_id: None,
                month_end_day: None,
            },
            hash,
            state.clock.now_millis(),
        )
        .await
        .unwrap();

        CurrentUser {
            id: acct.id,
            email: acct.email,
            display_name: acct.display_name,
            role,
            session_id: 1,
        }
    }

    async fn seed_draft(state: &ServerState, owner: &CurrentUser) -> Report {
        report::create(
            &state.pool,
            owner.id,
            None,
            &ReportCreate {
                period_type: PeriodType::Daily,
                period_key: "2026-08-07".into(),
                content: "wrote quarterly summary".into(),
                signature: None,
            },
            state.clock.now_millis(),
        )
        .await
        .unwrap()
    }

    fn sig(name: &str) -> TransitionPayload {
        TransitionPayload {
            signature: format!("sig:{name}"),
            comment: None,
        }
    }

    #[tokio::test]
    async fn full_chain_for_employee_author() {
        let state = test_state().await;
        let employee = seed_user(&state, "emp@example.com", Role::Employee).await;
        let supervisor = seed_user(&state, "sup@example.com", Role::Supervisor).await;
        let manager = seed_user(&state, "mgr@example.com", Role::Manager).await;

        let draft = seed_draft(&state, &employee).await;

        let rep = submit(&state, draft.id, &employee, &sig("emp")).await.unwrap();
        assert_eq!(rep.status, ReportStatus::Submitted);
        assert!(rep.submitted_at.is_some());

        // Re-submitting an already advanced report is a conflict, not a reapply
        let err = submit(&state, draft.id, &employee, &sig("emp")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        let rep = supervisor_approve(&state, draft.id, &supervisor, &sig("sup"))
            .await
            .unwrap();
        assert_eq!(rep.status, ReportStatus::Reviewed);

        let rep = head_approve(&state, draft.id, &manager, &sig("head")).await.unwrap();
        assert_eq!(rep.status, ReportStatus::HeadReviewed);

        let rep = manager_approve(&state, draft.id, &manager, &sig("mgr")).await.unwrap();
        assert_eq!(rep.status, ReportStatus::Approved);
        assert_eq!(rep.manager_signature.as_deref(), Some("sig:mgr"));
    }

    #[tokio::test]
    async fn management_author_skips_supervisor_tier() {
        let state = test_state().await;
        let author = seed_user(&state, "boss@example.com", Role::Manager).await;
        let supervisor = seed_user(&state, "sup@example.com", Role::Supervisor).await;
        let reviewer = seed_user(&state, "mgr@example.com", Role::Manager).await;

        let draft = seed_draft(&state, &author).await;
        submit(&state, draft.id, &author, &sig("boss")).await.unwrap();

        // The supervisor tier does not apply to management-authored reports
        let err = supervisor_approve(&state, draft.id, &supervisor, &sig("sup"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        // Head review accepts SUBMITTED directly for them
        let rep = head_approve(&state, draft.id, &reviewer, &sig("head")).await.unwrap();
        assert_eq!(rep.status, ReportStatus::HeadReviewed);
    }

    #[tokio::test]
    async fn manager_approve_requires_reviewed_or_head_reviewed() {
        let state = test_state().await;
        let employee = seed_user(&state, "emp@example.com", Role::Employee).await;
        let manager = seed_user(&state, "mgr@example.com", Role::Manager).await;

        let draft = seed_draft(&state, &employee).await;

        // From DRAFT
        let err = manager_approve(&state, draft.id, &manager, &sig("mgr"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        // From SUBMITTED (employee author, no skip)
        submit(&state, draft.id, &employee, &sig("emp")).await.unwrap();
        let err = manager_approve(&state, draft.id, &manager, &sig("mgr"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        // Status unchanged by the failed attempts
        let rep = report::find_by_id(&state.pool, draft.id).await.unwrap().unwrap();
        assert_eq!(rep.status, ReportStatus::Submitted);
    }

    #[tokio::test]
    async fn reject_is_terminal() {
        let state = test_state().await;
        let employee = seed_user(&state, "emp@example.com", Role::Employee).await;
        let supervisor = seed_user(&state, "sup@example.com", Role::Supervisor).await;

        let draft = seed_draft(&state, &employee).await;
        submit(&state, draft.id, &employee, &sig("emp")).await.unwrap();

        let rep = reject(&state, draft.id, &supervisor, Some("numbers do not add up"))
            .await
            .unwrap();
        assert_eq!(rep.status, ReportStatus::Rejected);
        assert_eq!(rep.rejected_by, Some(supervisor.id));

        // Nothing moves a rejected report
        let err = supervisor_approve(&state, draft.id, &supervisor, &sig("sup"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
        let err = reject(&state, draft.id, &supervisor, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn wrong_tier_role_is_unauthorized() {
        let state = test_state().await;
        let employee = seed_user(&state, "emp@example.com", Role::Employee).await;
        let other = seed_user(&state, "peer@example.com", Role::Employee).await;

        let draft = seed_draft(&state, &employee).await;
        submit(&state, draft.id, &employee, &sig("emp")).await.unwrap();

        let err = supervisor_approve(&state, draft.id, &other, &sig("peer"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
