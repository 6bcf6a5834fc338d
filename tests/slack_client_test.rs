//! Slack Web API client integration tests

mod common;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatsdj::slack::{
    PostMessageOptions, ReplyMetadata, SlackApi, SlackWebClient, UpdateMessageOptions,
};

use common::slack_config;

fn client(server: &MockServer) -> SlackWebClient {
    SlackWebClient::new(&slack_config(&server.uri())).unwrap()
}

#[tokio::test]
async fn test_post_message_sends_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-test"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("channel=C1"))
        .and(body_string_contains("thread_ts=1700000000.000100"))
        .and(body_string_contains("reply_broadcast=true"))
        .and(body_string_contains("icon_emoji=egg"))
        .and(body_string_contains("chatsdj_reply"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "channel": "C1",
            "ts": "1700000000.000200",
            "message": {"text": "..."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let posted = client(&server)
        .post_message(
            "C1",
            "thinking",
            PostMessageOptions {
                thread_ts: Some("1700000000.000100".to_string()),
                reply_broadcast: true,
                username: Some("Counsellor".to_string()),
                icon_emoji: Some("egg".to_string()),
                metadata: Some(ReplyMetadata::Text),
            },
        )
        .await
        .unwrap();

    assert_eq!(posted.channel, "C1");
    assert_eq!(posted.ts, "1700000000.000200");
}

#[tokio::test]
async fn test_not_ok_response_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.update"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "error": "message_not_found"})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .update_message(
            "C1",
            "1700000000.000200",
            UpdateMessageOptions::text("done", ReplyMetadata::Text),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Slack API error: chat.update failed: message_not_found"
    );
}

#[tokio::test]
async fn test_broadcast_update_sends_only_flag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.update"))
        .and(body_string_contains("reply_broadcast=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .update_message("C1", "1700000000.000200", UpdateMessageOptions::broadcast())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(!body.contains("text="), "{}", body);
}

#[tokio::test]
async fn test_delete_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.delete"))
        .and(body_string_contains("ts=1700000000.000200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .delete_message("C1", "1700000000.000200")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_fetch_thread_replies_follows_cursor_and_reads_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations.replies"))
        .and(body_string_contains("cursor=PAGE2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "has_more": false,
            "messages": [{
                "ts": "1700000000.000300",
                "user": "UBOT",
                "app_id": "A_APP",
                "text": "a reply",
                "metadata": {"event_type": "chatsdj_reply", "event_payload": {"ignored": false}}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/conversations.replies"))
        .and(body_string_contains("include_all_metadata=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "has_more": true,
            "messages": [{"ts": "1700000000.000100", "user": "U1", "text": "<@UBOT> hi"}],
            "response_metadata": {"next_cursor": "PAGE2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let replies = client(&server)
        .fetch_thread_replies("C1", "1700000000.000100")
        .await
        .unwrap();

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].text, "<@UBOT> hi");
    assert_eq!(replies[0].reply_metadata(), None);
    assert_eq!(replies[1].reply_metadata(), Some(ReplyMetadata::Text));
    assert!(replies[1].is_authored_by("UBOT", "A_APP"));
}

#[tokio::test]
async fn test_upload_image_returns_share_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files.upload"))
        .and(header("authorization", "Bearer xoxb-test"))
        .and(body_string_contains("name=\"channels\""))
        .and(body_string_contains("name=\"thread_ts\""))
        .and(body_string_contains("filename=\"chatsdj.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "file": {
                "id": "F1",
                "is_public": false,
                "channels": [],
                "groups": ["G1"],
                "ims": [],
                "shares": {"private": {"G1": [{"ts": "1700000000.000400"}]}}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = client(&server)
        .upload_image(
            b"PNGDATA".to_vec(),
            "chatsdj.png",
            "a red fox",
            "G1",
            Some("1700000000.000100"),
        )
        .await
        .unwrap();

    assert_eq!(file.id, "F1");
    assert_eq!(file.share_location(), Some(("G1", "1700000000.000400")));
}
