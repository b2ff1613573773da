//! Dev server and relay integration tests.
//!
//! Routers are driven in-process with `tower::ServiceExt::oneshot`; the CRM
//! endpoint is a mockito server.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use common::Site;
use sitepipe::build::{create_build_plan, BuildPipeline};
use sitepipe::config::default_config;
use sitepipe::reload::BroadcastReload;
use sitepipe::server::dev::RELOAD_CLIENT;
use sitepipe::server::{
    dev_router, relay_router, CrmClient, DevServer, RecordingMailer, RelaySettings, RelayState,
};

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("should read body");
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}

fn settings() -> RelaySettings {
    RelaySettings {
        path: "/mail.php".into(),
        recipients: vec!["sales@example.com".into(), "owner@example.com".into()],
        from: "no-reply@example.com".into(),
        landing: "example.com".into(),
        source_id: 57,
    }
}

fn form(body: &str) -> Request<Body> {
    Request::post("/mail.php")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("should build request")
}

// ============================================================================
// Dev server
// ============================================================================

fn built_site(mode: &str) -> (Site, Router) {
    let site = Site::landing();
    let context = Arc::new(site.context(mode));
    let plan = create_build_plan(context.config());
    BuildPipeline::new(Arc::clone(&context)).run(&plan).expect("build should run");

    let router = dev_router(DevServer {
        root: context.out_dir(),
        index: "_site-map.html".into(),
        error_stem: "error".into(),
        reload: BroadcastReload::default(),
        relay: None,
    });
    (site, router)
}

#[tokio::test]
async fn test_root_serves_site_map_with_reload_client() {
    let (_site, router) = built_site("development");

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).expect("should build request"))
        .await
        .expect("should respond");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("index.html"));
    assert!(body.contains(RELOAD_CLIENT));
}

#[tokio::test]
async fn test_static_files_are_not_rewritten() {
    let (_site, router) = built_site("development");

    let response = router
        .oneshot(Request::get("/statics/scripts/script.js").body(Body::empty()).expect("should build request"))
        .await
        .expect("should respond");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "const menu = 1;\nconsole.log(menu);\n");
}

#[tokio::test]
async fn test_unknown_path_gets_production_error_page() {
    let (_site, router) = built_site("production");

    let response = router
        .oneshot(Request::get("/no/such/page").body(Body::empty()).expect("should build request"))
        .await
        .expect("should respond");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_text(response).await;
    assert!(body.contains("Страница"));
    assert!(!body.contains("<?php"));
}

#[tokio::test]
async fn test_livereload_stream_is_event_stream() {
    let (_site, router) = built_site("development");

    let response = router
        .oneshot(Request::get("/__livereload").body(Body::empty()).expect("should build request"))
        .await
        .expect("should respond");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().expect("ascii header");
    assert!(content_type.starts_with("text/event-stream"));
}

// ============================================================================
// Relay
// ============================================================================

#[tokio::test]
async fn test_empty_post_is_not_found() {
    let mailer = Arc::new(RecordingMailer::new());
    let router = relay_router(RelayState::new(settings(), mailer.clone(), None));

    let response = router.oneshot(form("")).await.expect("should respond");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "");
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_post_sends_one_mail_per_recipient() {
    let mailer = Arc::new(RecordingMailer::new());
    let router = relay_router(RelayState::new(settings(), mailer.clone(), None));

    let response = router
        .oneshot(form(
            "form_name=%D0%97%D0%B2%D0%BE%D0%BD%D0%BE%D0%BA&phone=%2B7+900+000-00-00&agree=on&message=hi%3Cscript%3Ex()%3C%2Fscript%3E",
        ))
        .await
        .expect("should respond");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "1");

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, "sales@example.com");
    assert_eq!(sent[1].to, "owner@example.com");
    assert_eq!(sent[0].subject, "example.com - новая заявка");
    assert_eq!(sent[0].from, "no-reply@example.com");

    let html = &sent[0].html;
    assert!(html.starts_with("<html><body><h4>Новая заявка с сайта example.com</h4>"));
    assert!(html.contains("<tr><td>Название формы:</td><td>Звонок</td></tr>"));
    assert!(html.contains("<tr><td>Телефон:</td><td>+7 900 000-00-00</td></tr>"));
    assert!(html.contains("<tr><td>Сообщение:</td><td>hi</td></tr>"));
    assert!(!html.contains("agree"));
    assert!(!html.contains("script"));
}

#[tokio::test]
async fn test_post_forwards_lead_with_utm_cookies() {
    let mut crm = mockito::Server::new_async().await;
    let mock = crm
        .mock("POST", "/external-form/external-form")
        .match_body(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("landing".into(), "example.com".into()),
            mockito::Matcher::UrlEncoded("sourceId".into(), "57".into()),
            mockito::Matcher::UrlEncoded("phone".into(), "+7 900".into()),
            mockito::Matcher::UrlEncoded(
                "params_json".into(),
                r#"{"UTM_CAMPAIGN":"spring","UTM_CONTENT":"","UTM_MEDIUM":"","UTM_SOURCE":"yandex","UTM_TERM":""}"#.into(),
            ),
            mockito::Matcher::UrlEncoded("comment".into(), "Телефон: +7 900\r\n".into()),
        ]))
        .with_status(200)
        .create_async()
        .await;

    let client = CrmClient::new(&format!("{}/external-form/external-form", crm.url()), false)
        .expect("should build client");
    let mailer = Arc::new(RecordingMailer::new());
    let router = relay_router(RelayState::new(settings(), mailer, Some(client)));

    let mut request = form("phone=%2B7+900");
    request.headers_mut().insert(
        header::COOKIE,
        "_uc_utm_source=yandex; _uc_utm_campaign=spring".parse().expect("valid header"),
    );
    let response = router.oneshot(request).await.expect("should respond");

    assert_eq!(body_text(response).await, "1");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_bare_angle_brackets_reach_mail_and_crm() {
    let mut crm = mockito::Server::new_async().await;
    let mock = crm
        .mock("POST", "/crm")
        .match_body(mockito::Matcher::UrlEncoded(
            "comment".into(),
            "Сообщение: бюджет < 5000, срок > 2 недель\r\n".into(),
        ))
        .with_status(200)
        .create_async()
        .await;
    let client = CrmClient::new(&format!("{}/crm", crm.url()), false).expect("should build client");
    let mailer = Arc::new(RecordingMailer::new());
    let router = relay_router(RelayState::new(settings(), mailer.clone(), Some(client)));

    let response = router
        .oneshot(form(
            "message=%D0%B1%D1%8E%D0%B4%D0%B6%D0%B5%D1%82+%3C+5000%2C+%D1%81%D1%80%D0%BE%D0%BA+%3E+2+%D0%BD%D0%B5%D0%B4%D0%B5%D0%BB%D1%8C",
        ))
        .await
        .expect("should respond");

    assert_eq!(body_text(response).await, "1");
    assert!(mailer.sent()[0]
        .html
        .contains("<tr><td>Сообщение:</td><td>бюджет &lt; 5000, срок &gt; 2 недель</td></tr>"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_crm_failure_still_answers_one() {
    let mut crm = mockito::Server::new_async().await;
    let _mock = crm.mock("POST", "/crm").with_status(502).create_async().await;
    let client = CrmClient::new(&format!("{}/crm", crm.url()), false).expect("should build client");
    let router = relay_router(RelayState::new(settings(), Arc::new(RecordingMailer::new()), Some(client)));

    let response = router.oneshot(form("name=Ann")).await.expect("should respond");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "1");
}

#[tokio::test]
async fn test_relay_mounted_in_dev_server() {
    let site = Site::empty();
    let mailer = Arc::new(RecordingMailer::new());
    let relay = RelayState::from_config(&default_config(), mailer.clone()).expect("relay state");
    let router = dev_router(DevServer {
        root: site.root().to_path_buf(),
        index: "_site-map.html".into(),
        error_stem: "error".into(),
        reload: BroadcastReload::default(),
        relay: Some(relay),
    });

    let response = router.oneshot(form("phone=1")).await.expect("should respond");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "1");
}
