use formnav_core::navigation::InputOptions;
use formnav_core::screen::{EntityScreenContext, ScreenKind, USE_SELECTED_VALUES};
use formnav_core::session::{MenuSession, NewSessionRequest, SessionIdentity};
use formnav_core::testing::{self, FakeInstalledApp, SnapshotSerializer, Step};
use std::sync::Arc;

fn identity() -> SessionIdentity {
    SessionIdentity::create(
        NewSessionRequest {
            username: "worker".to_string(),
            domain: "demo".to_string(),
            app_id: "app-7".to_string(),
            locale: "en".to_string(),
            ..NewSessionRequest::default()
        },
        "https://www.example.org/",
    )
}

fn registration_flow() -> Vec<Step> {
    vec![
        Step::view_command("m9"),
        Step::command("m0"),
        Step::computed("today", "'2026-10-16'"),
        Step::multi_select("selected_cases", "instance('casedb')/casedb/case[@status='open']"),
        Step::computed("household", "$today"),
        Step::form_id("xmlns", "'http://example.org/forms/followup'"),
        Step::done(),
    ]
}

#[test]
fn test_full_navigation_to_form_entry() {
    let app = Arc::new(FakeInstalledApp::new("Household Visits"));
    let services = testing::services(app, registration_flow());
    let serializer = SnapshotSerializer::new(services.frames.clone());
    let mut session = MenuSession::new(identity(), services, "commcarehq.org");
    let none = EntityScreenContext::default();

    assert_eq!(
        session.identity().install_reference,
        "https://www.example.org/a/demo/apps/api/download_ccz/?app_id=app-7"
    );

    // The view-only command is popped and the menu is shown.
    let menu = session.get_next_screen(true, &none).unwrap().unwrap();
    assert_eq!(menu.kind(), ScreenKind::Menu);
    assert!(session.handle_input(Some(menu), "0", InputOptions::default(), &none).unwrap());

    let selected = EntityScreenContext::with_selected_values(vec![
        "case-a".to_string(),
        "case-b".to_string(),
    ]);
    assert!(
        session
            .handle_input(None, USE_SELECTED_VALUES, InputOptions::default(), &selected)
            .unwrap()
    );

    assert!(session.get_next_screen(true, &none).unwrap().is_none());
    assert_eq!(session.breadcrumbs().len(), 3);
    assert_eq!(session.selections().len(), 1);
    assert_ne!(session.selections()[0], USE_SELECTED_VALUES);

    let handoff = session.form_entry_handoff(&serializer).unwrap();
    assert_eq!(handoff.xmlns, "http://example.org/forms/followup");
    let keys: Vec<&str> = handoff.session_data.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["today", "selected_cases", "household", ""]);
    assert_eq!(handoff.session_data[2].1, "2026-10-16");
}

#[test]
fn test_restored_session_resumes_where_it_stopped() {
    let app = Arc::new(FakeInstalledApp::new("Household Visits"));
    let services = testing::services(app, registration_flow());
    let serializer = SnapshotSerializer::new(services.frames.clone());
    let none = EntityScreenContext::default();

    let mut first = MenuSession::new(identity(), services.clone(), "commcarehq.org");
    first.handle_input(None, "0", InputOptions::default(), &none).unwrap();
    let record = first.serialize(&serializer).unwrap();

    let mut second = MenuSession::restore(record, services, &serializer, "commcarehq.org").unwrap();
    let screen = second.get_next_screen(true, &none).unwrap().unwrap();
    assert_eq!(screen.kind(), ScreenKind::MultiSelectEntity);
    assert_eq!(second.session_data()[0].0, "today");
}

#[test]
fn test_stale_menu_index_reports_reload_advice() {
    let app = Arc::new(FakeInstalledApp::new("Household Visits"));
    let mut session = MenuSession::new(
        identity(),
        testing::services(app, registration_flow()),
        "commcarehq.org",
    );

    let err = session
        .handle_input(None, "12", InputOptions::default(), &EntityScreenContext::default())
        .unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Screen MenuScreen[menu] handling input 12 threw exception"));
    assert!(message.ends_with("please report a bug."));
}
