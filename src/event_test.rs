use super::*;
use serde_json::json;

fn parse(value: serde_json::Value) -> Result<ClientEvent, serde_json::Error> {
    serde_json::from_value(value)
}

// =============================================================================
// Inbound
// =============================================================================

#[test]
fn parses_draw_events() {
    let event = parse(json!({"event": "pencil-draw", "data": {"x": 3, "y": 4, "color": 7}})).unwrap();
    assert_eq!(event, ClientEvent::PencilDraw { x: 3, y: 4, color: 7 });

    let event = parse(json!({"event": "brush-draw", "data": {"x": 0, "y": 0, "color": 31}})).unwrap();
    assert_eq!(event.name(), "brush-draw");
}

#[test]
fn parses_unit_undo_without_data() {
    assert_eq!(parse(json!({"event": "undo"})).unwrap(), ClientEvent::Undo);
}

#[test]
fn parses_access_events() {
    let target = Uuid::new_v4();
    let event = parse(json!({"event": "authorize", "data": {"user_id": target}})).unwrap();
    assert_eq!(event, ClientEvent::Authorize { user_id: target });
}

#[test]
fn rejects_negative_coordinates() {
    assert!(parse(json!({"event": "pencil-draw", "data": {"x": -1, "y": 0, "color": 1}})).is_err());
}

#[test]
fn rejects_color_wider_than_a_byte() {
    assert!(parse(json!({"event": "pencil-draw", "data": {"x": 0, "y": 0, "color": 256}})).is_err());
}

#[test]
fn rejects_unknown_event_tag() {
    assert!(parse(json!({"event": "erase-everything", "data": {}})).is_err());
}

#[test]
fn rejects_missing_fields_and_bad_uuid() {
    assert!(parse(json!({"event": "pencil-draw", "data": {"x": 1}})).is_err());
    assert!(parse(json!({"event": "deauthorize", "data": {"user_id": "nope"}})).is_err());
}

// =============================================================================
// Outbound
// =============================================================================

#[test]
fn unit_variants_serialize_with_tag_only() {
    let value = serde_json::to_value(ServerEvent::UserAuthorized).unwrap();
    assert_eq!(value, json!({"event": "user-authorized"}));
}

#[test]
fn load_data_flattens_snapshot() {
    let event = ServerEvent::LoadData {
        room: RoomName::new("abc"),
        snapshot: GridSnapshot { width: 1, height: 1, grid: vec![vec![31]], placer: vec![vec![None]] },
        contributors: vec![],
        is_owner: true,
        is_authorized: true,
    };
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["event"], "load-data");
    assert_eq!(value["data"]["room"], "abc");
    assert_eq!(value["data"]["width"], 1);
    assert_eq!(value["data"]["grid"], json!([[31]]));
    assert_eq!(value["data"]["placer"], json!([[null]]));
    assert_eq!(value["data"]["is_owner"], true);
}

#[test]
fn connected_user_flattens_profile() {
    let id = Uuid::new_v4();
    let event = ServerEvent::ConnectedUsers {
        users: vec![ConnectedUser {
            profile: Profile { id, name: "alice".into(), avatar: None },
            is_authorized: false,
            is_owner: false,
        }],
    };
    let value = serde_json::to_value(&event).unwrap();
    let user = &value["data"]["users"][0];

    assert_eq!(user["id"], json!(id));
    assert_eq!(user["name"], "alice");
    assert_eq!(user["is_authorized"], false);
}

#[test]
fn error_from_carries_code_and_message() {
    #[derive(Debug, thiserror::Error)]
    #[error("room is busy")]
    struct Busy;

    impl ErrorCode for Busy {
        fn error_code(&self) -> &'static str {
            "E_BUSY"
        }

        fn retryable(&self) -> bool {
            true
        }
    }

    let event = ServerEvent::error_from(&Busy);
    assert_eq!(
        event,
        ServerEvent::Error { code: "E_BUSY".into(), message: "room is busy".into(), retryable: true }
    );
}

#[test]
fn stroke_events_are_flagged() {
    let user = Profile::unknown(Uuid::new_v4());
    assert!(ServerEvent::PencilDraw { x: 0, y: 0, color: 0, user }.is_stroke());
    assert!(ServerEvent::ReceiveUndo { x: 0, y: 0, color: 0, user: None }.is_stroke());
    assert!(!ServerEvent::UserDeauthorized.is_stroke());
}

#[test]
fn now_ms_is_after_2020() {
    assert!(now_ms() > 1_577_836_800_000);
}
