//! Zoho connector against a mock CRM.

use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use consultant_index::config::{CrmConfig, CrmCredentials};
use consultant_index::connector_zoho::ZohoConnector;
use consultant_index::error::SourceError;
use consultant_index::extract::AttachmentText;
use consultant_index::models::AttachmentMeta;
use consultant_index::traits::CrmSource;

const AUTH: &str = "Zoho-oauthtoken tok-1";

fn connector(server: &MockServer) -> ZohoConnector {
    let config = CrmConfig {
        accounts_url: server.uri(),
        api_url: server.uri(),
        page_size: 2,
        timeout_secs: 5,
    };
    let credentials = CrmCredentials {
        client_id: "cid".to_string(),
        client_secret: "secret".to_string(),
        refresh_token: "rt-1".to_string(),
    };
    ZohoConnector::new(&config, credentials, false).unwrap()
}

fn page(ids: &[&str], more: bool) -> serde_json::Value {
    let data: Vec<_> = ids
        .iter()
        .map(|id| json!({"id": id, "Contact_Type": "Consultant"}))
        .collect();
    json!({"data": data, "info": {"more_records": more, "per_page": 2}})
}

#[tokio::test]
async fn authenticate_exchanges_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .and(body_string_contains("client_id=cid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = connector(&server).authenticate().await.unwrap();
    assert_eq!(token, "tok-1");
}

#[tokio::test]
async fn authenticate_surfaces_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "invalid_code"})))
        .mount(&server)
        .await;

    match connector(&server).authenticate().await {
        Err(SourceError::Auth(msg)) => assert_eq!(msg, "invalid_code"),
        other => panic!("expected auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn pages_until_more_records_is_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Contacts"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "2"))
        .and(header("Authorization", AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["1", "2"], true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Contacts"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["3"], false)))
        .expect(1)
        .mount(&server)
        .await;

    let fetched = connector(&server).fetch_all_records("tok-1", None).await;
    assert_eq!(fetched.pages, 2);
    assert!(fetched.error.is_none());
    let ids: Vec<&str> = fetched
        .records
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn failed_page_keeps_earlier_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Contacts"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["1", "2"], true)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Contacts"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetched = connector(&server).fetch_all_records("tok-1", None).await;
    assert_eq!(fetched.records.len(), 2);
    assert_eq!(fetched.pages, 1);
    let error = fetched.error.unwrap();
    assert!(error.starts_with("page 2:"), "{}", error);
    assert!(error.contains("500"));
}

#[tokio::test]
async fn no_content_means_no_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Contacts"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let fetched = connector(&server).fetch_all_records("tok-1", None).await;
    assert!(fetched.records.is_empty());
    assert!(fetched.error.is_none());
}

#[tokio::test]
async fn incremental_fetch_sends_if_modified_since() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Contacts"))
        .and(header("If-Modified-Since", "2024-03-01T12:30:00+00:00"))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let since = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
    let fetched = connector(&server).fetch_all_records("tok-1", Some(since)).await;
    assert!(fetched.records.is_empty());
    assert!(fetched.error.is_none());
}

#[tokio::test]
async fn lists_attachments_with_normalized_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Contacts/42/Attachments"))
        .and(header("Authorization", AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "a1", "File_Name": "cv.pdf", "Size": 1234, "Created_Time": "2024-01-02T03:04:05+00:00"},
                {"id": "a2", "File_Name": "notes.txt", "Size": "12"}
            ],
            "info": {"more_records": false}
        })))
        .mount(&server)
        .await;

    let attachments = connector(&server)
        .fetch_attachments("42", "tok-1")
        .await
        .unwrap();
    assert_eq!(attachments.len(), 2);
    assert_eq!(attachments[0].file_name(), "cv.pdf");
    assert_eq!(attachments[0].size.as_deref(), Some("1234"));
    assert_eq!(attachments[1].id.as_deref(), Some("a2"));
}

#[tokio::test]
async fn no_attachments_is_an_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Contacts/42/Attachments"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let attachments = connector(&server)
        .fetch_attachments("42", "tok-1")
        .await
        .unwrap();
    assert!(attachments.is_empty());
}

fn meta(id: Option<&str>, name: &str) -> AttachmentMeta {
    AttachmentMeta {
        id: id.map(str::to_string),
        file_name: Some(name.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn downloads_become_text_or_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Contacts/42/Attachments/t1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/plain")
                .set_body_string("Fractional CFO for nonprofits"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Contacts/42/Attachments/p1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/pdf")
                .set_body_bytes(vec![0u8; 64]),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Contacts/42/Attachments/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let zoho = connector(&server);

    let text = zoho
        .fetch_attachment_content(&meta(Some("t1"), "bio.txt"), "42", "tok-1")
        .await;
    assert_eq!(
        text,
        AttachmentText::Text("Fractional CFO for nonprofits".to_string())
    );

    let pdf = zoho
        .fetch_attachment_content(&meta(Some("p1"), "cv.pdf"), "42", "tok-1")
        .await;
    assert_eq!(
        pdf,
        AttachmentText::Placeholder("[PDF File: cv.pdf - Size: 64 bytes]".to_string())
    );

    let missing = zoho
        .fetch_attachment_content(&meta(Some("gone"), "old.docx"), "42", "tok-1")
        .await;
    match missing {
        AttachmentText::Error(msg) => {
            assert!(msg.starts_with("[Error extracting old.docx:"), "{}", msg);
            assert!(msg.contains("404"));
        }
        other => panic!("expected error placeholder, got {:?}", other),
    }

    let no_id = zoho
        .fetch_attachment_content(&meta(None, "cv.pdf"), "42", "tok-1")
        .await;
    assert_eq!(no_id, AttachmentText::metadata_only("cv.pdf"));

    let nameless = zoho
        .fetch_attachment_content(&AttachmentMeta::default(), "42", "tok-1")
        .await;
    assert_eq!(nameless, AttachmentText::Empty);
}
