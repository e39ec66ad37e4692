//! 会话并发测试
//!
//! 使用 ServerState::initialize 完整初始化 (磁盘 redb)，多张桌台上的设备
//! 同时加入同组，验证容量与同组唯一性

use shared::session::{CreateSession, EndSession, GroupType, GuestCounts, JoinSession, TableUpsert};
use shared::ErrorCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use table_server::{Config, ServerState};

const TABLE_COUNT: usize = 8;
const DEVICES_PER_TABLE: usize = 8;
const TABLE_CAPACITY: u32 = 10;
const ADULTS_PER_DEVICE: u32 = 2;

fn init_state(dir: &tempfile::TempDir) -> ServerState {
    let mut config = Config::with_overrides(dir.path().to_string_lossy(), 0);
    config.environment = "test".into();
    config.waiter_pins = "1234:Ana".into();
    ServerState::initialize(&config).expect("server state")
}

fn table_id(idx: usize) -> String {
    format!("table-{}", idx)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_joins_respect_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let state = init_state(&dir);

    for idx in 0..TABLE_COUNT {
        let id = table_id(idx);
        state
            .run_blocking(move |m| {
                m.upsert_table(
                    &id,
                    TableUpsert {
                        number: idx as i32 + 1,
                        capacity: TABLE_CAPACITY,
                    },
                )
            })
            .await
            .unwrap();

        let id = table_id(idx);
        state
            .run_blocking(move |m| {
                m.create_session(CreateSession {
                    table_id: id,
                    device_id: "host".into(),
                    guest_counts: GuestCounts::adults(ADULTS_PER_DEVICE),
                    group_type: GroupType::Same,
                    join_existing: false,
                    waiter_pin: None,
                })
            })
            .await
            .unwrap();
    }

    let accepted = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for idx in 0..TABLE_COUNT {
        for device in 0..DEVICES_PER_TABLE {
            let state = state.clone();
            let accepted = accepted.clone();
            let rejected = rejected.clone();
            handles.push(tokio::spawn(async move {
                let req = JoinSession {
                    table_id: table_id(idx),
                    device_id: format!("ipad-{}-{}", idx, device),
                    guest_counts: GuestCounts::adults(ADULTS_PER_DEVICE),
                    group_type: GroupType::Same,
                    waiter_pin: Some("1234".into()),
                };
                match state.run_blocking(move |m| m.join_session(req)).await {
                    Ok(_) => {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        assert_eq!(e.code, ErrorCode::CapacityExceeded);
                        rejected.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // host + 4 joiners fill each table
    let seats = (TABLE_CAPACITY / ADULTS_PER_DEVICE) as usize;
    assert_eq!(accepted.load(Ordering::SeqCst), TABLE_COUNT * (seats - 1));
    assert_eq!(
        rejected.load(Ordering::SeqCst),
        TABLE_COUNT * (DEVICES_PER_TABLE - (seats - 1))
    );

    for idx in 0..TABLE_COUNT {
        let id = table_id(idx);
        let table = state.run_blocking(move |m| m.get_table(&id)).await.unwrap();
        assert_eq!(table.current_guests, TABLE_CAPACITY);

        let id = table_id(idx);
        let group = state.run_blocking(move |m| m.get_group(&id)).await.unwrap();
        assert_eq!(group.devices.len(), seats);
        assert_eq!(group.guest_counts.adults, TABLE_CAPACITY);
    }

    let stats = state.sessions.storage().get_stats().unwrap();
    assert_eq!(stats.active_session_count, TABLE_COUNT as u64);
    assert_eq!(stats.active_group_count, TABLE_COUNT as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_end_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let state = init_state(&dir);

    let id = table_id(0);
    state
        .run_blocking(move |m| {
            m.upsert_table(&id, TableUpsert { number: 1, capacity: 4 })?;
            m.create_session(CreateSession {
                table_id: id.clone(),
                device_id: "host".into(),
                guest_counts: GuestCounts::adults(2),
                group_type: GroupType::Same,
                join_existing: false,
                waiter_pin: None,
            })
        })
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            state
                .run_blocking(|m| {
                    m.end_session(EndSession {
                        table_id: table_id(0),
                        reason: Default::default(),
                    })
                })
                .await
        }));
    }
    for handle in handles {
        let ended = handle.await.unwrap().unwrap();
        assert_eq!(ended.table.current_guests, 0);
    }

    let stats = state.sessions.storage().get_stats().unwrap();
    assert_eq!(stats.active_session_count, 0);
    assert_eq!(stats.active_group_count, 0);
    assert_eq!(stats.device_session_count, 1);
}
