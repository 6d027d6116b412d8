mod common;

use anyhow::Result;
use serde_json::json;
use std::sync::atomic::Ordering;

use console_core::router::guard::{GuardState, NavigationOutcome};

#[tokio::test]
async fn unauthenticated_navigation_is_gated_by_the_allow_list() -> Result<()> {
    let backend = common::spawn_backend().await;
    let (console, _redirect, _dir) = common::test_console(&backend, &[]);

    assert_eq!(console.guard.state(), GuardState::Anonymous);
    assert_eq!(
        console.guard.handle_navigation("/login").await,
        NavigationOutcome::Allow
    );

    // The original destination survives the redirect, percent-encoded.
    assert_eq!(
        console.guard.handle_navigation("/dashboard?tab=2").await,
        NavigationOutcome::Redirect("/login?redirect=%2Fdashboard%3Ftab%3D2".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn authenticated_users_never_see_the_login_form() -> Result<()> {
    let backend = common::spawn_backend().await;
    let (console, _redirect, _dir) = common::test_console(&backend, &[]);

    console.session.login(&common::login_request()).await?;
    assert_eq!(
        console.guard.handle_navigation("/login").await,
        NavigationOutcome::Redirect("/".to_string())
    );
    Ok(())
}

/// Login, then a first navigation against an empty client route table: the
/// guard generates routes from the menu and the same navigation resolves.
#[tokio::test]
async fn first_navigation_materializes_routes_and_resolves() -> Result<()> {
    let backend = common::spawn_backend().await;
    let (console, _redirect, _dir) = common::test_console(&backend, &["dashboard"]);

    console.session.login(&common::login_request()).await?;
    assert_eq!(console.guard.state(), GuardState::RoutesPending);

    assert_eq!(
        console.guard.handle_navigation("/dashboard").await,
        NavigationOutcome::Allow
    );
    assert_eq!(console.guard.state(), GuardState::RoutesReady);
    assert_eq!(backend.state.menu_calls.load(Ordering::SeqCst), 1);

    // Second navigation reuses the installed table; no second fetch.
    assert_eq!(
        console.guard.handle_navigation("/dashboard").await,
        NavigationOutcome::Allow
    );
    assert_eq!(backend.state.menu_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

/// The menu fetch itself can hit an expired token; the refresh coordinator
/// recovers it transparently and generation still succeeds.
#[tokio::test]
async fn route_generation_survives_an_expired_token() -> Result<()> {
    let backend = common::spawn_backend().await;
    let (console, _redirect, _dir) = common::test_console(&backend, &["dashboard"]);

    console.session.login(&common::login_request()).await?;
    backend.state.expire_current_token();

    assert_eq!(
        console.guard.handle_navigation("/dashboard").await,
        NavigationOutcome::Allow
    );
    assert_eq!(backend.state.refresh_calls.load(Ordering::SeqCst), 1);
    assert!(console.guard.is_route_generated());
    Ok(())
}

#[tokio::test]
async fn unknown_destination_redirects_to_not_found() -> Result<()> {
    let backend = common::spawn_backend().await;
    let (console, _redirect, _dir) = common::test_console(&backend, &["dashboard"]);

    console.session.login(&common::login_request()).await?;
    assert_eq!(
        console.guard.handle_navigation("/nope").await,
        NavigationOutcome::Redirect("/404".to_string())
    );
    // Routes were generated once; the zero-match path does not regenerate
    // when generation already succeeded.
    assert_eq!(backend.state.menu_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn api_and_favicon_requests_pass_through_unmatched() -> Result<()> {
    let backend = common::spawn_backend().await;
    let (console, _redirect, _dir) = common::test_console(&backend, &["dashboard"]);

    console.session.login(&common::login_request()).await?;
    assert_eq!(
        console.guard.handle_navigation("/api/health").await,
        NavigationOutcome::Allow
    );
    assert_eq!(
        console.guard.handle_navigation("/favicon.ico").await,
        NavigationOutcome::Allow
    );
    Ok(())
}

/// Structurally invalid routes are installed anyway and reported through
/// the validation issues, not dropped.
#[tokio::test]
async fn invalid_routes_install_with_recorded_issues() -> Result<()> {
    let backend = common::spawn_backend().await;
    let (console, _redirect, _dir) = common::test_console(&backend, &["dashboard"]);

    backend.state.set_menu(json!([
        {
            "menuCode": "SYS",
            "menuName": "System",
            "routingAddress": "/system",
            "type": "container",
            "children": [
                {
                    "menuCode": "SYS_GRP",
                    "menuName": "Empty Group",
                    "routingAddress": "/system/group",
                    "type": "container"
                }
            ]
        }
    ]));

    console.session.login(&common::login_request()).await?;
    assert_eq!(
        console.guard.handle_navigation("/system").await,
        NavigationOutcome::Allow
    );

    let issues = console.guard.validation_issues();
    assert!(
        issues.iter().any(|issue| issue.contains("no component and no children")),
        "expected the empty grouping node to be flagged, got {issues:?}"
    );
    // Flagged, not blocked: the invalid node is still in the table.
    assert_eq!(
        console.guard.handle_navigation("/system/group").await,
        NavigationOutcome::Allow
    );
    Ok(())
}

/// A timed-out menu fetch is the guard's fatal path: full state reset and a
/// forced trip to the login page, with no partial table installed.
#[tokio::test]
async fn generation_timeout_resets_state_and_redirects() -> Result<()> {
    let backend = common::spawn_backend().await;
    let (console, _redirect, _dir) =
        common::test_console_with(&backend, &["dashboard"], |config| {
            config.routing.generation_timeout_secs = 1;
        });

    backend.state.menu_delay_ms.store(3_000, Ordering::SeqCst);
    console.session.login(&common::login_request()).await?;

    assert_eq!(
        console.guard.handle_navigation("/dashboard").await,
        NavigationOutcome::Redirect("/login".to_string())
    );
    assert!(!console.guard.is_route_generated());
    assert!(console.store.get().is_none(), "fatal path clears credentials");
    Ok(())
}

/// An unexpected backend failure mid-pipeline resets everything rather than
/// leaving a half-authenticated, half-routed session.
#[tokio::test]
async fn profile_failure_is_fatal_and_resets_all_state() -> Result<()> {
    let backend = common::spawn_backend().await;
    let (console, _redirect, _dir) = common::test_console(&backend, &["dashboard"]);

    console.session.login(&common::login_request()).await?;
    backend.state.fail_profile.store(true, Ordering::SeqCst);

    assert_eq!(
        console.guard.handle_navigation("/dashboard").await,
        NavigationOutcome::Redirect("/login".to_string())
    );
    assert_eq!(console.guard.state(), GuardState::Anonymous);
    assert!(console.store.get().is_none());
    Ok(())
}
