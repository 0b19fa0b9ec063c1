// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn raw_updates_decode_and_map() {
    let json = r#"[
        {
            "update_id": 7001,
            "message": {
                "message_id": 1,
                "text": "status please",
                "chat": {"id": -100123, "type": "supergroup"},
                "message_thread_id": 42,
                "reply_to_message": {"message_id": 9}
            }
        },
        {
            "update_id": 7002,
            "message": {
                "message_id": 2,
                "chat": {"id": -100123, "type": "supergroup"},
                "photo": [{"file_id": "x"}]
            }
        },
        {
            "update_id": 7003,
            "edited_message": {"message_id": 3}
        }
    ]"#;

    let raw: Vec<RawUpdate> = serde_json::from_str(json).unwrap();
    let updates = to_updates(raw);

    // Non-text and non-message updates are dropped
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0],
        ChatUpdate {
            update_id: 7001,
            chat_id: -100123,
            thread_id: Some(42),
            reply_to: Some(9),
            text: "status please".to_string(),
        }
    );
}

#[test]
fn thread_errors_classify_as_thread_gone() {
    assert!(matches!(
        api_error_from("Bad Request: message thread not found".to_string()),
        GatewayError::ThreadGone(_)
    ));
    assert!(matches!(
        api_error_from("Bad Request: TOPIC_DELETED".to_string()),
        GatewayError::ThreadGone(_)
    ));
    assert!(matches!(
        api_error_from("Unauthorized".to_string()),
        GatewayError::Api(_)
    ));
}

#[test]
fn api_response_decodes_failure_shape() {
    let json = r#"{"ok": false, "description": "Unauthorized"}"#;
    let resp: ApiResponse<Vec<RawUpdate>> = serde_json::from_str(json).unwrap();
    assert!(!resp.ok);
    assert_eq!(resp.description.as_deref(), Some("Unauthorized"));
    assert!(resp.result.is_none());
}
