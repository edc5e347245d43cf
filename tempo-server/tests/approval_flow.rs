//! End-to-end scenarios through the full HTTP stack (router + middleware).
//!
//! Each test builds an in-memory server state with a pinned clock
//! (Friday 2026-08-07 09:00 Asia/Jakarta) and drives the axum app with
//! `tower::ServiceExt::oneshot`.

use axum::Router;
use axum::body::Body;
use chrono::{NaiveTime, TimeZone};
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use shared::Clock;
use shared::models::{AccountCreate, Role};
use tempo_server::api::build_app;
use tempo_server::audit::types::AuditQuery;
use tempo_server::audit::{AuditAction, worker};
use tempo_server::auth::credential;
use tempo_server::auth::two_factor;
use tempo_server::core::{Config, ServerState};
use tempo_server::db::DbService;
use tempo_server::db::repository::{account, department};
use tempo_server::access::WorkingHours;

/// Friday 2026-08-07 09:00 in the organizational timezone
fn friday_morning() -> i64 {
    chrono_tz::Asia::Jakarta
        .with_ymd_and_hms(2026, 8, 7, 9, 0, 0)
        .unwrap()
        .timestamp_millis()
}

fn hhmm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

async fn test_state() -> (ServerState, Clock, Router) {
    let db = DbService::in_memory().await.expect("in-memory db");
    let clock = Clock::fixed_at(friday_morning());

    let mut config = Config::with_overrides("/tmp/tempo-it", 0);
    // Wide weekday window so the attendance gate (not the global gate)
    // decides the after-clock-out scenarios; Sunday stays closed.
    config.working_hours = WorkingHours::new(
        Some((hhmm(7, 30), hhmm(22, 0))),
        Some((hhmm(7, 30), hhmm(13, 0))),
        None,
    );

    let state = ServerState::with_pool(config, db.pool, clock.clone());

    // Audit entries flow through the worker; run it like the server does.
    if let Some(rx) = state.take_audit_rx() {
        let storage = state.audit.storage().clone();
        tokio::spawn(async move {
            worker::run(storage, rx, tokio_util::sync::CancellationToken::new()).await;
        });
    }

    let app = build_app(&state);
    (state, clock, app)
}

async fn seed_account(
    state: &ServerState,
    email: &str,
    role: Role,
    department_id: Option<i64>,
) -> i64 {
    let hash = credential::hash_password("correct horse battery").unwrap();
    let acct = account::create(
        &state.pool,
        AccountCreate {
            email: email.into(),
            password: String::new(),
            display_name: Some(email.split('@').next().unwrap().to_string()),
            role,
            department_id,
            month_end_day: None,
        },
        hash,
        state.clock.now_millis(),
    )
    .await
    .unwrap();
    acct.id
}

async fn send(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

async fn login_token(app: &Router, email: &str) -> String {
    let (status, body) = login(app, email, "correct horse battery").await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn clock_in(app: &Router, token: &str) {
    let (status, body) = send(
        app,
        "POST",
        "/api/attendance/clock-in",
        Some(token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "clock-in failed: {body}");
}

async fn wait_for_audit(state: &ServerState, action: AuditAction, account_id: i64) -> bool {
    for _ in 0..100 {
        let (items, _) = state
            .audit
            .query(&AuditQuery {
                from: None,
                to: None,
                action: Some(action),
                account_id: Some(account_id),
                offset: 0,
                limit: 10,
            })
            .await
            .unwrap();
        if !items.is_empty() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}

// ── Scenario A: lockout after five failures, lazy unlock ────────────

#[tokio::test]
async fn lockout_after_five_failures_then_lazy_unlock() {
    let (state, clock, app) = test_state().await;
    let id = seed_account(&state, "dina@example.com", Role::Employee, None).await;

    for attempt in 1..=4 {
        let (status, body) = login(&app, "dina@example.com", "wrong password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "attempt {attempt}: {body}");
        assert_eq!(body["code"], "E1001");
    }

    // Fifth wrong attempt trips the lock
    let (status, body) = login(&app, "dina@example.com", "wrong password").await;
    assert_eq!(status, StatusCode::LOCKED, "{body}");
    assert_eq!(body["code"], "E1002");

    // Even the correct password fails while locked
    let (status, body) = login(&app, "dina@example.com", "correct horse battery").await;
    assert_eq!(status, StatusCode::LOCKED);
    assert!(body["message"].as_str().unwrap().contains("minute"));

    assert!(wait_for_audit(&state, AuditAction::UserLock, id).await);

    // Past the lock window the correct password works and resets the counter
    clock.advance(chrono::Duration::minutes(31));
    let (status, _) = login(&app, "dina@example.com", "correct horse battery").await;
    assert_eq!(status, StatusCode::OK);

    let attempts: i64 =
        sqlx::query_scalar("SELECT failed_attempts FROM account WHERE id = ?")
            .bind(id)
            .fetch_one(&state.pool)
            .await
            .unwrap();
    assert_eq!(attempts, 0);
}

// ── Second factor: re-prompt signal, TOTP, single-use backup codes ──

#[tokio::test]
async fn second_factor_flow() {
    let (state, _clock, app) = test_state().await;
    let id = seed_account(&state, "rafi@example.com", Role::Employee, None).await;

    let token = login_token(&app, "rafi@example.com").await;
    clock_in(&app, &token).await;

    let (status, body) = send(&app, "POST", "/api/auth/two-factor/setup", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let secret_hex = body["data"]["secret"].as_str().unwrap().to_string();
    let backup_code = body["data"]["backup_codes"][0].as_str().unwrap().to_string();

    // Correct password, no code → re-prompt signal, counter untouched
    let (status, body) = login(&app, "rafi@example.com", "correct horse battery").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "E1003");

    let attempts: i64 =
        sqlx::query_scalar("SELECT failed_attempts FROM account WHERE id = ?")
            .bind(id)
            .fetch_one(&state.pool)
            .await
            .unwrap();
    assert_eq!(attempts, 0);

    // Valid TOTP passes (with normalization)
    let secret = hex::decode(&secret_hex).unwrap();
    let code = two_factor::totp_at(&secret, state.clock.now_millis());
    let spaced = format!("{} {}", &code[..3], &code[3..]);
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({
            "email": "rafi@example.com",
            "password": "correct horse battery",
            "code": spaced,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // Backup code works exactly once
    for (expected, label) in [(StatusCode::OK, "first use"), (StatusCode::UNAUTHORIZED, "replay")] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({
                "email": "rafi@example.com",
                "password": "correct horse battery",
                "code": backup_code,
            })),
        )
        .await;
        assert_eq!(status, expected, "{label}: {body}");
    }
}

// ── Session registry: the 4th login evicts the oldest session ───────

#[tokio::test]
async fn fourth_login_evicts_oldest_session() {
    let (state, _clock, app) = test_state().await;
    seed_account(&state, "sari@example.com", Role::Employee, None).await;

    let first = login_token(&app, "sari@example.com").await;
    let second = login_token(&app, "sari@example.com").await;
    clock_in(&app, &first).await;

    // Both sessions usable
    for token in [&first, &second] {
        let (status, _) = send(&app, "GET", "/api/reports", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let _third = login_token(&app, "sari@example.com").await;
    let _fourth = login_token(&app, "sari@example.com").await;

    // Oldest (first) session was deactivated, the second still works
    let (status, body) = send(&app, "GET", "/api/reports", Some(&first), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert_eq!(body["message"], "SESSION_INVALID");

    let (status, _) = send(&app, "GET", "/api/reports", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);
}

// ── Scenario B: submitted daily report freezes the day's tasks ──────

#[tokio::test]
async fn submitted_report_locks_tasks_and_rollup_is_idempotent() {
    let (state, _clock, app) = test_state().await;
    let dept = department::create(&state.pool, "Operations", state.clock.now_millis())
        .await
        .unwrap();
    seed_account(&state, "eko@example.com", Role::Employee, Some(dept.id)).await;
    seed_account(&state, "tia@example.com", Role::Supervisor, Some(dept.id)).await;
    seed_account(&state, "gus@example.com", Role::Manager, Some(dept.id)).await;

    let employee = login_token(&app, "eko@example.com").await;
    clock_in(&app, &employee).await;

    // 11:00 — a task with a sub-task
    let (status, task) = send(
        &app,
        "POST",
        "/api/tasks",
        Some(&employee),
        Some(json!({ "title": "inventory count" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{task}");
    let task_id = task["id"].as_i64().unwrap();

    let (status, sub) = send(
        &app,
        "POST",
        &format!("/api/tasks/{task_id}/sub-tasks"),
        Some(&employee),
        Some(json!({ "title": "cold storage shelf" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{sub}");
    let sub_id = sub["id"].as_i64().unwrap();

    // 12:00 — manual same-day submission (born SUBMITTED)
    let (status, report) = send(
        &app,
        "POST",
        "/api/reports",
        Some(&employee),
        Some(json!({
            "period_type": "DAILY",
            "period_key": "2026-08-07",
            "content": "counted inventory, filed discrepancies",
            "signature": "sig:eko",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["status"], "SUBMITTED");
    let report_id = report["id"].as_i64().unwrap();

    // Deleting the 11:00 sub-task now fails with the lock error
    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/tasks/sub-tasks/{sub_id}"),
        Some(&employee),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED, "{body}");
    assert_eq!(body["code"], "E4002");
    assert!(body["message"].as_str().unwrap().contains("already submitted"));

    // Reads stay unaffected
    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/tasks/{task_id}/sub-tasks"),
        Some(&employee),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Manager approval straight from DRAFT must be rejected...
    let manager = login_token(&app, "gus@example.com").await;
    let supervisor = login_token(&app, "tia@example.com").await;
    clock_in(&app, &supervisor).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/reports/{report_id}/manager-approve"),
        Some(&manager),
        Some(json!({ "signature": "sig:gus" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["code"], "E4001");

    // ...and a missing signature is a validation failure, not a transition
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/reports/{report_id}/supervisor-approve"),
        Some(&supervisor),
        Some(json!({ "signature": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    // Full chain: supervisor → manager (from REVIEWED)
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/reports/{report_id}/supervisor-approve"),
        Some(&supervisor),
        Some(json!({ "signature": "sig:tia", "comment": "numbers check out" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "REVIEWED");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/reports/{report_id}/manager-approve"),
        Some(&manager),
        Some(json!({ "signature": "sig:gus" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "APPROVED");

    // Approval triggered the departmental rollup; re-running it is a no-op
    let (status, rollups) = send(
        &app,
        "GET",
        &format!("/api/departments/{}/reports?period_type=DAILY", dept.id),
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rollups.as_array().unwrap().len(), 1);
    let summary = rollups[0]["summary"].as_str().unwrap();
    assert!(summary.contains("eko"));

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/departments/{}/rollup", dept.id),
        Some(&manager),
        Some(json!({ "period_type": "DAILY", "period_key": "2026-08-07" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, rollups) = send(
        &app,
        "GET",
        &format!("/api/departments/{}/reports?period_type=DAILY", dept.id),
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(rollups.as_array().unwrap().len(), 1, "upsert must not duplicate");
}

// ── Scenario C: clock-out, denial, extension window ─────────────────

#[tokio::test]
async fn extension_reopens_access_after_clock_out() {
    let (state, clock, app) = test_state().await;
    seed_account(&state, "nina@example.com", Role::Employee, None).await;
    seed_account(&state, "tono@example.com", Role::Supervisor, None).await;

    let employee = login_token(&app, "nina@example.com").await;
    clock_in(&app, &employee).await;

    // 17:00 — clock out
    clock.advance(chrono::Duration::hours(8));
    let (status, _) = send(
        &app,
        "POST",
        "/api/attendance/clock-out",
        Some(&employee),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // 17:05 — protected page denied
    clock.advance(chrono::Duration::minutes(5));
    let (status, body) = send(&app, "GET", "/api/reports", Some(&employee), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert_eq!(body["message"], "CLOCKED_OUT");

    // Employee files an extension until 19:00 (exempt path, still reachable)
    let extended_until = friday_morning() + 10 * 60 * 60 * 1000; // 19:00
    let (status, ext) = send(
        &app,
        "POST",
        "/api/extensions",
        Some(&employee),
        Some(json!({ "extended_until": extended_until, "reason": "finish audit prep" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{ext}");
    let ext_id = ext["id"].as_i64().unwrap();

    // 17:05 is still before the supervisor cutoff, so the approver gets in
    let supervisor = login_token(&app, "tono@example.com").await;
    clock_in(&app, &supervisor).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/extensions/{ext_id}/approve"),
        Some(&supervisor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // Immediately after approval the same request passes with EXTENSION
    let (status, _) = send(&app, "GET", "/api/reports", Some(&employee), None).await;
    assert_eq!(status, StatusCode::OK);

    // A second decision on the same extension is a conflict (terminal)
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/extensions/{ext_id}/reject"),
        Some(&supervisor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    // Past 19:00 the window has lapsed
    clock.advance(chrono::Duration::hours(2));
    let (status, body) = send(&app, "GET", "/api/reports", Some(&employee), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert_eq!(body["message"], "CLOCKED_OUT");
}

// ── Global working-hours gate redirects outside the window ──────────

#[tokio::test]
async fn outside_working_hours_redirects_to_info_page() {
    let (state, clock, app) = test_state().await;
    seed_account(&state, "ami@example.com", Role::Employee, None).await;
    seed_account(&state, "boss@example.com", Role::Administrator, None).await;

    let employee = login_token(&app, "ami@example.com").await;
    clock_in(&app, &employee).await;

    // 23:00 — outside the 07:30-22:00 window
    clock.advance(chrono::Duration::hours(14));
    let request = Request::builder()
        .method("GET")
        .uri("/api/reports")
        .header(header::AUTHORIZATION, format!("Bearer {employee}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/api/info/outside-hours"
    );

    // Administrators are exempt from the global gate
    let admin = login_token(&app, "boss@example.com").await;
    let (status, _) = send(&app, "GET", "/api/accounts", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    // The info page itself stays reachable
    let (status, body) = send(&app, "GET", "/api/info/outside-hours", Some(&employee), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timezone"], "Asia/Jakarta");
}
