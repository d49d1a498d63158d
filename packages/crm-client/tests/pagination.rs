//! Integration tests for the CRM client against a stub server.
//!
//! These use wiremock to script multi-page responses and verify the
//! cursor-mode pagination contract end to end: items concatenated in
//! arrival order, fail-fast on HTTP errors, and the page-count guard.

use crm_client::{CrmClient, CrmError, SummaryFields, UpdateOutcome};
use paginate_core::PageLimit;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> CrmClient {
    CrmClient::new("test-token").with_base_url(server.uri())
}

fn field(id: &str, kind: &str, data: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "name": id,
        "enrichmentSource": "vendor",
        "value": { "type": kind, "data": data },
    })
}

#[tokio::test]
async fn entry_fields_follows_next_url_across_pages() {
    let server = MockServer::start().await;
    let fields_path = "/lists/51750/list-entries/14355566/fields";

    let page_two_url = format!("{}{}?cursor=abc", server.uri(), fields_path);

    Mock::given(method("GET"))
        .and(path(fields_path))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [field("c", "text", json!("third"))],
            "pagination": { "nextUrl": null },
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(fields_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                field("a", "text", json!("first")),
                field("b", "text", json!("second")),
            ],
            "pagination": { "nextUrl": page_two_url },
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let records = client.entry_fields(51750, 14355566).await.unwrap();

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn entry_profile_normalizes_and_summarizes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lists/1/list-entries/2/fields"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                field("vendor-description", "text", json!("Builds satellites")),
                field("vendor-industry", "ranked-dropdown", json!(["Space", "Hardware"])),
                field("employees", "number", json!("250")),
                field("hq", "location", json!({"city": "Madrid", "country": "Spain"})),
                field("unset", "text", serde_json::Value::Null),
            ],
        })))
        .mount(&server)
        .await;

    let ids = SummaryFields {
        description: "vendor-description".into(),
        industries: "vendor-industry".into(),
        employee_range: "employees".into(),
        location: "hq".into(),
        ..Default::default()
    };

    let client = client_for(&server);
    let profile = client.entry_profile(1, 2, &ids).await.unwrap();

    assert!(!profile.fields.contains_key("unset"));
    assert_eq!(profile.fields["employees"].data, json!(250));
    assert_eq!(profile.summary.description, Some(json!("Builds satellites")));
    assert_eq!(
        profile.summary.industries,
        vec![json!("Space"), json!("Hardware")]
    );
    assert_eq!(profile.summary.location_str.as_deref(), Some("Madrid, Spain"));
}

#[tokio::test]
async fn http_error_aborts_with_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lists/1/list-entries/2/fields"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.entry_fields(1, 2).await.unwrap_err();

    match err {
        CrmError::Api { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "forbidden");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn endless_pagination_trips_the_page_limit() {
    let server = MockServer::start().await;
    let fields_path = "/lists/1/list-entries/2/fields";
    let self_url = format!("{}{}", server.uri(), fields_path);

    // The server always points back at itself.
    Mock::given(method("GET"))
        .and(path(fields_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [field("a", "text", json!("x"))],
            "pagination": { "nextUrl": self_url },
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).with_page_limit(PageLimit(3));
    let err = client.entry_fields(1, 2).await.unwrap_err();

    match err {
        CrmError::PageLimit(e) => assert_eq!(e.max_pages, 3),
        other => panic!("expected PageLimit error, got {other:?}"),
    }
}

#[tokio::test]
async fn companies_concatenate_across_pages() {
    let server = MockServer::start().await;

    let page_two = format!("{}/companies?cursor=next", server.uri());

    Mock::given(method("GET"))
        .and(path("/companies"))
        .and(query_param("cursor", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 3, "name": "Gamma"}],
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/companies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": 1, "name": "Alpha", "domain": "alpha.io"},
                {"id": 2, "name": "Beta"},
            ],
            "pagination": { "nextUrl": page_two },
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let companies = client.companies(Some(2)).await.unwrap();

    let names: Vec<&str> = companies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
    assert_eq!(companies[0].domain.as_deref(), Some("alpha.io"));
}

#[tokio::test]
async fn missing_field_reads_as_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lists/1/list-entries/2/fields/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let field = client.field(1, 2, "nope").await.unwrap();
    assert!(field.is_none());
}

#[tokio::test]
async fn present_field_parses() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lists/1/list-entries/2/fields/last-event"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(field("last-event", "text", json!("call"))),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let record = client.field(1, 2, "last-event").await.unwrap().unwrap();
    assert_eq!(record.id, "last-event");
    assert_eq!(record.value.data, Some(json!("call")));
}

#[tokio::test]
async fn update_field_reports_outcome_instead_of_raising() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/lists/1/list-entries/2/fields/hq"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/lists/1/list-entries/2/fields/locked"))
        .respond_with(ResponseTemplate::new(400).set_body_string("read-only field"))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let ok = client
        .update_field(1, 2, "hq", "location", json!("Australia"))
        .await
        .unwrap();
    assert!(ok.is_applied());

    let rejected = client
        .update_field(1, 2, "locked", "text", json!("x"))
        .await
        .unwrap();
    assert_eq!(
        rejected,
        UpdateOutcome::Rejected {
            status: 400,
            body: "read-only field".into(),
        }
    );
}

#[tokio::test]
async fn whoami_returns_the_user() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/whoami"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "id": 41826372, "emailAddress": "ops@example.com" },
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let me = client.whoami().await.unwrap();
    assert_eq!(me.user["id"], json!(41826372));
}
