//! Export wizard and raw data browser against a mock backend.

use std::sync::Arc;
use std::time::Duration;

use awrc_client::{ExportFailurePolicy, ReportKind, ReportingClient, Session};
use awrc_core::Ccid;
use awrc_views::{
    Entry, ExportWizard, RawDataScreen, Route, ViewError, WizardError, WizardStep,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "/mcc/1234567890";

fn mcc() -> Ccid {
    Ccid::parse("123-456-7890").unwrap()
}

fn ccid(raw: &str) -> Ccid {
    Ccid::parse(raw).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn verified_session(server: &MockServer) -> Arc<Session> {
    let client = ReportingClient::with_base_url(&server.uri()).unwrap();
    let session = Arc::new(Session::new(Arc::new(client)));
    session.mark_verified(mcc());
    session
}

fn availability(pending_exports: u32) -> Value {
    json!({
        "reports_available": [
            {
                "ReportType": "ReportAccount",
                "startMonth": "2024-01-01", "endMonth": "2024-06-01",
                "startDay": "2024-01-01", "endDay": "2024-06-30"
            },
            {
                "ReportType": "ReportCampaign",
                "startMonth": "2024-03-01", "endMonth": "2024-06-01",
                "startDay": "2024-03-01", "endDay": "2024-06-30"
            }
        ],
        "pending_process_tasks": 0,
        "pending_export_tasks": pending_exports,
        "pending_refresh_accounts_tasks": 0
    })
}

async fn mount_get(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_reference_data(server: &MockServer) {
    mount_get(
        server,
        "/mcc",
        json!([{ "topAccountId": 1_234_567_890u64, "name": "Acme" }]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/accounts")))
        .and(query_param("live", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1_112_223_333u64, "name": "Blue Shoes" },
            { "id": 2_223_334_444u64, "name": "Red Shoes" },
            { "id": 3_334_445_555u64, "name": "Garden Tools" }
        ])))
        .mount(server)
        .await;
}

async fn mount_templates(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/template"))
        .and(query_param("public", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 7, "templateName": "Monthly", "isPublic": true }
        ])))
        .mount(server)
        .await;
}

async fn opened_wizard(server: &MockServer) -> ExportWizard {
    let Entry::Screen(mut wizard) = ExportWizard::open(verified_session(server), mcc()) else {
        panic!("verified MCC should open the wizard");
    };
    wizard.load().await.unwrap();
    wizard
}

#[tokio::test]
async fn wizard_loads_reference_data() {
    let server = MockServer::start().await;
    mount_reference_data(&server).await;
    mount_templates(&server).await;
    mount_get(&server, &format!("{BASE}/dataavailable"), availability(0)).await;

    let wizard = opened_wizard(&server).await;
    let data = wizard.data().unwrap();
    assert_eq!(data.mcc.display_name(), "Acme");
    assert_eq!(data.templates.len(), 1);
    assert_eq!(data.accounts.len(), 3);
    assert_eq!(data.month_bounds, (Some(day(2024, 1, 1)), Some(day(2024, 6, 1))));
    assert_eq!(wizard.picker().matches().len(), 3);
    assert_eq!(wizard.step(), &WizardStep::ChooseAccount);
}

#[tokio::test]
async fn wizard_load_failure_names_the_stage() {
    let server = MockServer::start().await;
    mount_reference_data(&server).await;
    Mock::given(method("GET"))
        .and(path("/template"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "internal_error",
            "message": "boom"
        })))
        .mount(&server)
        .await;

    let Entry::Screen(mut wizard) = ExportWizard::open(verified_session(&server), mcc()) else {
        panic!("verified MCC should open the wizard");
    };
    assert!(wizard.load().await.is_err());
    assert_eq!(
        wizard.load_error(),
        Some("Unable to load templates (internal_error): boom")
    );
    assert!(wizard.data().is_none());
}

#[tokio::test]
async fn wizard_exports_selected_accounts_best_effort_then_waits() {
    let server = MockServer::start().await;
    mount_reference_data(&server).await;
    mount_templates(&server).await;
    // Idle on load, then the first poll sees the queued exports.
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/dataavailable")))
        .respond_with(ResponseTemplate::new(200).set_body_json(availability(0)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/dataavailable")))
        .respond_with(ResponseTemplate::new(200).set_body_json(availability(2)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_get(&server, &format!("{BASE}/dataavailable"), availability(0)).await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/exportreports/account/1112223333")))
        .and(query_param("templateId", "7"))
        .and(query_param("monthStart", "202402"))
        .and(query_param("monthEnd", "202403"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "internal_error",
            "message": "queue full"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/exportreports/account/2223334444")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "queued": true })))
        .expect(1)
        .mount(&server)
        .await;

    let mut wizard = opened_wizard(&server).await;
    wizard.picker_mut().set_filter("shoes");
    assert_eq!(wizard.picker_mut().shift_matches(), 2);
    wizard.choose_selected_accounts().unwrap();
    wizard.choose_template(7).unwrap();
    wizard.choose_dates(day(2024, 2, 10), day(2024, 3, 20)).unwrap();

    let outcome = wizard.submit(ExportFailurePolicy::BestEffort).await.unwrap();
    assert_eq!(outcome.requested(), 2);
    assert_eq!(outcome.succeeded(), 1);
    assert_eq!(outcome.failed[0].account, ccid("1112223333"));
    assert!(matches!(wizard.step(), WizardStep::Exporting { .. }));
    assert!(!wizard.is_busy());

    wizard
        .wait_for_exports(Duration::from_millis(10))
        .await
        .unwrap();
    let WizardStep::Done { outcome } = wizard.step() else {
        panic!("expected done step");
    };
    assert_eq!(outcome.failed.len(), 1);
}

#[tokio::test]
async fn wizard_exports_all_accounts_in_one_request() {
    let server = MockServer::start().await;
    mount_reference_data(&server).await;
    mount_templates(&server).await;
    mount_get(&server, &format!("{BASE}/dataavailable"), availability(0)).await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/exportreports")))
        .and(query_param("monthStart", "202401"))
        .and(query_param("monthEnd", "202406"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut wizard = opened_wizard(&server).await;
    wizard.choose_all_accounts().unwrap();
    wizard.choose_template(7).unwrap();
    wizard.choose_dates(day(2024, 1, 1), day(2024, 6, 30)).unwrap();
    let outcome = wizard
        .submit(ExportFailurePolicy::StopOnFirstError)
        .await
        .unwrap();
    assert_eq!(outcome.requested(), 1);
    assert!(outcome.failed.is_empty());
}

#[tokio::test]
async fn wizard_stays_on_confirm_when_export_fails() {
    let server = MockServer::start().await;
    mount_reference_data(&server).await;
    mount_templates(&server).await;
    mount_get(&server, &format!("{BASE}/dataavailable"), availability(0)).await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/exportreports")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut wizard = opened_wizard(&server).await;
    wizard.choose_all_accounts().unwrap();
    wizard.choose_template(7).unwrap();
    wizard.choose_dates(day(2024, 1, 1), day(2024, 2, 1)).unwrap();
    let err = wizard
        .submit(ExportFailurePolicy::BestEffort)
        .await
        .unwrap_err();
    assert!(matches!(err, ViewError::Client(_)));
    assert!(matches!(wizard.step(), WizardStep::Confirm { .. }));
}

#[tokio::test]
async fn wizard_refuses_to_export_while_jobs_are_queued() {
    let server = MockServer::start().await;
    mount_reference_data(&server).await;
    mount_templates(&server).await;
    let mut busy_backend = availability(2);
    busy_backend["pending_process_tasks"] = json!(5);
    mount_get(&server, &format!("{BASE}/dataavailable"), busy_backend).await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/exportreports")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut wizard = opened_wizard(&server).await;
    assert_eq!(wizard.data().unwrap().blocking_jobs(), 7);
    wizard.choose_all_accounts().unwrap();
    wizard.choose_template(7).unwrap();
    wizard.choose_dates(day(2024, 1, 1), day(2024, 6, 30)).unwrap();

    let err = wizard
        .submit(ExportFailurePolicy::BestEffort)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ViewError::Wizard(WizardError::JobsPending { remaining: 7 })
    ));
    assert!(matches!(wizard.step(), WizardStep::Confirm { .. }));
}

#[tokio::test]
async fn wizard_is_usable_after_a_cancelled_submit() {
    let server = MockServer::start().await;
    mount_reference_data(&server).await;
    mount_templates(&server).await;
    mount_get(&server, &format!("{BASE}/dataavailable"), availability(0)).await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/exportreports")))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut wizard = opened_wizard(&server).await;
    wizard.choose_all_accounts().unwrap();
    wizard.choose_template(7).unwrap();
    wizard.choose_dates(day(2024, 1, 1), day(2024, 6, 30)).unwrap();

    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        wizard.submit(ExportFailurePolicy::BestEffort),
    )
    .await;
    assert!(cancelled.is_err());
    assert!(!wizard.is_busy());
    assert!(matches!(wizard.step(), WizardStep::Confirm { .. }));
    wizard.restart();
    assert_eq!(wizard.step(), &WizardStep::ChooseAccount);
}

#[tokio::test]
async fn raw_data_redirects_until_verified() {
    let client = ReportingClient::with_base_url("http://127.0.0.1:9/").unwrap();
    let session = Arc::new(Session::new(Arc::new(client)));
    match RawDataScreen::open(session, mcc(), 10) {
        Entry::Redirect(route) => assert_eq!(route, Route::Account(mcc())),
        Entry::Screen(_) => panic!("expected redirect"),
    }
}

async fn loaded_raw_data(server: &MockServer) -> RawDataScreen {
    mount_reference_data(server).await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/dataavailable")))
        .and(query_param("dateRangeType", "day"))
        .respond_with(ResponseTemplate::new(200).set_body_json(availability(0)))
        .mount(server)
        .await;

    let Entry::Screen(mut screen) = RawDataScreen::open(verified_session(server), mcc(), 25)
    else {
        panic!("verified MCC should open raw data");
    };
    screen.load().await.unwrap();
    screen
}

#[tokio::test]
async fn raw_data_fetches_sorted_account_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/reportaccount/1112223333")))
        .and(query_param("dateStart", "20240101"))
        .and(query_param("dateEnd", "20240131"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "day": "2024-01-03", "clicks": "30", "impressions": 300 },
            { "day": "2024-01-01", "clicks": 10, "impressions": "1,000" },
            { "day": "2024-01-02", "clicks": 20, "impressions": 200 }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    let mut screen = loaded_raw_data(&server).await;

    assert_eq!(screen.bounds(), (Some(day(2024, 1, 1)), Some(day(2024, 6, 30))));
    assert!(matches!(
        screen.fetch().await,
        Err(ViewError::NoAccountSelected)
    ));

    screen.set_account_filter("blue");
    assert_eq!(screen.filtered_accounts().len(), 1);
    screen.select_account(ccid("1112223333")).unwrap();

    screen.set_dates(Some(day(2024, 1, 31)), Some(day(2024, 1, 1)));
    assert!(!screen.valid_date_range());
    assert!(matches!(
        screen.fetch().await,
        Err(ViewError::InvalidDateRange { .. })
    ));

    screen.set_dates(Some(day(2024, 1, 1)), Some(day(2024, 1, 31)));
    assert_eq!(screen.fetch().await.unwrap().len(), 3);
    assert_eq!(screen.paginator().page_size(), 25);
    assert_eq!(screen.paginator().current_page(), 1);

    for column in ["cost", "ctr", "avgCpm", "avgCpc"] {
        screen.columns_mut().set(ReportKind::Account, column, false);
    }
    assert_eq!(
        screen.page_cells(),
        [
            ["2024-01-01", "10", "1000"],
            ["2024-01-02", "20", "200"],
            ["2024-01-03", "30", "300"],
        ]
    );
}

#[tokio::test]
async fn raw_data_switching_kind_clears_out_of_range_dates() {
    let server = MockServer::start().await;
    let mut screen = loaded_raw_data(&server).await;

    screen.set_dates(Some(day(2024, 1, 15)), Some(day(2024, 2, 15)));
    screen.set_report_kind(ReportKind::Campaign);
    assert_eq!(screen.bounds(), (Some(day(2024, 3, 1)), Some(day(2024, 6, 30))));
    assert!(!screen.valid_date_range());

    screen.set_dates(Some(day(2024, 4, 1)), Some(day(2024, 4, 30)));
    screen.set_report_kind(ReportKind::Account);
    assert!(screen.valid_date_range());
}

#[tokio::test]
async fn raw_data_fetch_failure_is_rendered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/reportcampaign/2223334444")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "internal_error",
            "message": "boom"
        })))
        .mount(&server)
        .await;
    let mut screen = loaded_raw_data(&server).await;

    screen.set_report_kind(ReportKind::Campaign);
    screen.select_account(ccid("2223334444")).unwrap();
    screen.set_dates(Some(day(2024, 3, 1)), Some(day(2024, 3, 31)));
    assert!(screen.fetch().await.is_err());

    let text = screen.fetch_error().unwrap();
    assert!(
        text.starts_with("Unable to load report data (error_loading_report: Can't get campaign report for 222-333-4444"),
        "got {text}"
    );
    assert!(screen.rows().is_none());
    assert!(!screen.is_busy());
}

#[tokio::test]
async fn raw_data_is_usable_after_a_cancelled_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/reportaccount/1112223333")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let mut screen = loaded_raw_data(&server).await;
    screen.select_account(ccid("1112223333")).unwrap();
    screen.set_dates(Some(day(2024, 1, 1)), Some(day(2024, 1, 31)));

    let cancelled = tokio::time::timeout(Duration::from_millis(50), screen.fetch()).await;
    assert!(cancelled.is_err());
    assert!(!screen.is_busy());
    assert!(screen.rows().is_none());
}
