use super::*;
use serde_json::json;

#[test]
fn test_decode_task_update() {
    let text = r#"{
        "id": "m1",
        "type": "task.update",
        "payload": {"id": "t1", "title": "X", "status": "running", "progress": 50},
        "timestamp": "2026-10-16T09:30:00Z"
    }"#;

    let msg = decode(text).unwrap();
    assert_eq!(msg.id, "m1");
    assert_eq!(msg.msg_type, MessageType::TaskUpdate);
    assert_eq!(
        msg.payload,
        json!({"id": "t1", "title": "X", "status": "running", "progress": 50})
    );
}

#[test]
fn test_decode_server_pong_with_null_payload() {
    // Server pongs carry no payload body
    let text = r#"{"id":"p1","type":"pong","payload":null,"timestamp":"2026-10-16T09:30:00.123456+08:00"}"#;

    let msg = decode(text).unwrap();
    assert_eq!(msg.msg_type, MessageType::Pong);
    assert!(msg.payload.is_null());
}

#[test]
fn test_decode_unknown_type_is_kept() {
    let text = r#"{"id":"x","type":"office.redecorated","payload":{},"timestamp":"2026-10-16T09:30:00Z"}"#;

    let msg = decode(text).unwrap();
    assert_eq!(msg.msg_type, MessageType::Other("office.redecorated".to_string()));
}

#[test]
fn test_decode_rejects_non_json() {
    match decode("not json at all") {
        Err(DecodeError::Malformed(_)) => {}
        other => panic!("Expected Malformed, got {:?}", other),
    }
}

#[test]
fn test_decode_rejects_missing_fields() {
    let missing_payload = r#"{"id":"m1","type":"task.update","timestamp":"2026-10-16T09:30:00Z"}"#;
    match decode(missing_payload) {
        Err(DecodeError::InvalidShape(e)) => assert!(e.contains("payload")),
        other => panic!("Expected InvalidShape, got {:?}", other),
    }

    let missing_type = r#"{"id":"m1","payload":{},"timestamp":"2026-10-16T09:30:00Z"}"#;
    assert!(matches!(decode(missing_type), Err(DecodeError::InvalidShape(_))));
}

#[test]
fn test_decode_passes_timestamp_through() {
    for ts in ["2026-10-16T09:30:00", "2026-10-16T09:30:00.123", "20261016T093000Z", "..."] {
        let text = json!({"id": "m1", "type": "task.update", "payload": {}, "timestamp": ts}).to_string();

        let msg = decode(&text).unwrap();
        assert_eq!(msg.timestamp, ts);
        assert!(msg.sent_at().is_none());
    }
}

#[test]
fn test_sent_at_normalizes_offset() {
    let text = r#"{"id":"m1","type":"ping","payload":{},"timestamp":"2026-10-16T17:30:00+08:00"}"#;

    let sent_at = decode(text).unwrap().sent_at().unwrap();
    assert_eq!(sent_at.to_rfc3339(), "2026-10-16T09:30:00+00:00");
}

#[test]
fn test_decode_rejects_non_string_timestamp() {
    let text = r#"{"id":"m1","type":"ping","payload":{},"timestamp":1760607000}"#;
    assert!(matches!(decode(text), Err(DecodeError::InvalidShape(_))));
}

#[test]
fn test_ping_has_fresh_id() {
    let a = WsMessage::ping();
    let b = WsMessage::ping();

    assert_eq!(a.msg_type, MessageType::Ping);
    assert_eq!(a.payload, json!({}));
    assert_eq!(a.id.len(), 36); // UUID format
    assert_ne!(a.id, b.id);
}

#[test]
fn test_ping_wire_shape() {
    let ping = WsMessage::ping();
    let value: serde_json::Value = serde_json::from_str(&ping.to_json().unwrap()).unwrap();

    assert_eq!(value["type"], "ping");
    assert_eq!(value["id"], ping.id.as_str());
    assert_eq!(value["payload"], json!({}));
    assert!(value["timestamp"].as_str().unwrap().contains('T'));
    assert!(ping.sent_at().is_some());
}

#[test]
fn test_message_type_tags() {
    for msg_type in MessageType::INBOUND.iter() {
        assert_eq!(&MessageType::from(msg_type.as_str()), msg_type);
    }
    assert_eq!(MessageType::from("ping"), MessageType::Ping);
    assert_eq!(MessageType::EmployeeOffline.to_string(), "employee.offline");
    assert_eq!(String::from(MessageType::Other("custom".into())), "custom");
}

#[test]
fn test_typed_payloads() {
    let task: TaskUpdatePayload = serde_json::from_value(json!({
        "id": "t1", "title": "Quarterly report", "status": "completed", "progress": 100,
        "assigned_to": "e7"
    }))
    .unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.status.is_terminal());
    assert_eq!(task.assigned_to.as_deref(), Some("e7"));

    let task: TaskUpdatePayload = serde_json::from_value(json!({
        "id": "t2", "title": "Triage", "status": "archived", "progress": 0
    }))
    .unwrap();
    assert_eq!(task.status, TaskStatus::Other("archived".to_string()));
    assert!(!task.status.is_terminal());

    let note: NotificationPayload = serde_json::from_value(json!({
        "title": "Done", "message": "All tasks complete", "level": "success"
    }))
    .unwrap();
    assert_eq!(note.level, NotificationLevel::Success);

    let chat: ChatMessagePayload = serde_json::from_value(json!({
        "session_id": "s1", "content": "hello", "role": "assistant"
    }))
    .unwrap();
    assert_eq!(chat.role, ChatRole::Assistant);

    let employee: EmployeeUpdatePayload = serde_json::from_value(json!({
        "id": "e1", "name": "Ada", "status": "busy"
    }))
    .unwrap();
    assert!(employee.current_task_id.is_none());
}
