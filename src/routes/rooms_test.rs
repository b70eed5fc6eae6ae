use super::*;
use crate::canvas::identity::Identity;
use crate::canvas::name::NameError;
use crate::state::test_helpers::{MemoryStore, identity, seed_room, test_app_state_with_store};
use std::sync::Arc;
use tokio::sync::mpsc;

fn auth(identity: &Identity) -> AuthUser {
    AuthUser { identity: identity.clone(), token: "test".into() }
}

#[tokio::test]
async fn create_returns_201_and_stores_room() {
    let store = Arc::new(MemoryStore::default());
    let state = test_app_state_with_store(store.clone());
    let alice = identity("alice");

    let response = create_room(State(state), auth(&alice), Json(CreateRoomBody { name: "Mine".into() })).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(store.room("mine").unwrap().owner_id, Some(alice.id()));
}

#[tokio::test]
async fn create_maps_taken_name_to_409() {
    let store = Arc::new(MemoryStore::default());
    seed_room(&store, "abc", &identity("owner"));
    let state = test_app_state_with_store(store);

    let response = create_room(State(state), auth(&identity("bob")), Json(CreateRoomBody { name: "abc".into() })).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[test]
fn create_error_statuses() {
    assert_eq!(create_error_status(&CreateRoomError::InvalidName(NameError::Length)), StatusCode::BAD_REQUEST);
    assert_eq!(create_error_status(&CreateRoomError::AlreadyOwner), StatusCode::FORBIDDEN);
    assert_eq!(create_error_status(&CreateRoomError::NameTaken(RoomName::new("abc"))), StatusCode::CONFLICT);
}

#[tokio::test]
async fn get_unknown_room_is_404() {
    let state = test_app_state_with_store(Arc::new(MemoryStore::default()));
    let result = get_room(State(state), Path("nope".into())).await;
    assert!(matches!(result, Err(StatusCode::NOT_FOUND)));
}

#[tokio::test]
async fn get_inactive_room_reports_stored_shape() {
    let store = Arc::new(MemoryStore::default());
    let owner = identity("owner");
    seed_room(&store, "abc", &owner);
    let state = test_app_state_with_store(store);

    let Json(info) = get_room(State(state), Path("ABC".into())).await.unwrap();

    assert_eq!(
        info,
        RoomInfo {
            name: RoomName::new("abc"),
            width: 100,
            height: 100,
            owner_id: Some(owner.id()),
            active: false,
            connected: 0,
        }
    );
}

#[tokio::test]
async fn get_active_room_reports_live_grid_and_presence() {
    let store = Arc::new(MemoryStore::default());
    let owner = identity("owner");
    let name = seed_room(&store, "abc", &owner);
    let state = test_app_state_with_store(store);
    let (tx, _rx) = mpsc::channel(8);
    state.rooms.join(&name, Uuid::new_v4(), &owner, tx).await.unwrap();
    state.rooms.with_room(&name, |room| room.expand(owner.id(), 5)).await.unwrap().unwrap();

    let Json(info) = get_room(State(state), Path("abc".into())).await.unwrap();

    assert!(info.active);
    assert_eq!(info.connected, 1);
    assert_eq!((info.width, info.height), (105, 105));
}
