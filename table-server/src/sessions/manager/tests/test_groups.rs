use super::*;
use std::thread;

#[test]
fn test_same_join_over_capacity() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Same);

    let err = join_same(&manager, "t1", "b", 3).unwrap_err();
    assert!(matches!(err, SessionError::CapacityExceeded { remaining: 2 }));

    // nothing of b's attempt was kept
    let snapshot = manager.get_session("t1").unwrap();
    assert_eq!(snapshot.table.current_guests, 2);
    assert_eq!(snapshot.group.as_ref().unwrap().devices, vec!["a".to_string()]);
    assert_eq!(snapshot.devices.len(), 1);
}

#[test]
fn test_same_group_merges_guests_and_cart() {
    let (manager, bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Same);
    let joined = join_same(&manager, "t1", "b", 1).unwrap();

    let group = joined.snapshot.group.as_ref().unwrap();
    assert_eq!(group.guest_counts.adults, 3);
    assert_eq!(group.devices, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(group.master_device_id, "a");
    let b = joined.device.as_ref().unwrap();
    assert_eq!(b.device.group_id.as_deref(), Some(group.group_id.as_str()));
    assert!(b.device.waiter_verified);
    assert_eq!(b.device.waiter_name.as_deref(), Some("Ana"));

    let mut rx = bus.subscribe();
    add_item(&manager, "t1", Some("a"), gyoza(), 1).unwrap();

    // pull path
    let view = manager.get_device_view("t1", "b").unwrap();
    assert_eq!(view.cart.len(), 1);
    assert_eq!(view.cart[0].menu_item_id, "gyoza");

    // push path: table room snapshot and b's private room
    let events = drain(&mut rx);
    let table_events = events_in(&events, "table-t1");
    let RoomPayload::SessionUpdate(Some(snapshot)) = &table_events[0].payload else {
        panic!("expected a snapshot");
    };
    assert_eq!(snapshot.group.as_ref().unwrap().shared_cart.len(), 1);
    let b_events = events_in(&events, "device-b");
    assert_eq!(b_events.len(), 1);
    let RoomPayload::DeviceUpdate(Some(view)) = &b_events[0].payload else {
        panic!("expected a device view");
    };
    assert_eq!(view.cart[0].quantity, 1);
}

#[test]
fn test_rejected_pin_leaves_no_state() {
    let (manager, bus) = create_test_manager();
    add_table(&manager, "t1", 6);
    create(&manager, "t1", "a", 2, GroupType::Same);
    let before = manager.get_session("t1").unwrap();
    let mut rx = bus.subscribe();

    let err = manager
        .join_session(join_cmd("t1", "b", 1, GroupType::Same, Some("0000")))
        .unwrap_err();
    assert!(matches!(err, SessionError::Unauthorized));

    let err = manager
        .join_session(join_cmd("t1", "b", 1, GroupType::Same, None))
        .unwrap_err();
    assert!(matches!(err, SessionError::Unauthorized));

    let after = manager.get_session("t1").unwrap();
    assert_eq!(after, before);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_different_join_needs_no_pin() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 6);
    create(&manager, "t1", "a", 2, GroupType::Same);

    let update = manager
        .join_session(join_cmd("t1", "b", 1, GroupType::Different, None))
        .unwrap();
    let group = update.snapshot.group.as_ref().unwrap();
    assert_eq!(group.devices, vec!["a".to_string()]);
    assert_eq!(group.guest_counts.adults, 2);
    assert_eq!(update.snapshot.session.guest_counts.adults, 3);
}

#[test]
fn test_rejoin_returns_existing_membership() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Same);
    let first = join_same(&manager, "t1", "b", 1).unwrap();
    let again = join_same(&manager, "t1", "b", 1).unwrap();

    assert_eq!(again.snapshot.table.current_guests, 3);
    assert_eq!(
        again.device.as_ref().unwrap().device.session_id,
        first.device.as_ref().unwrap().device.session_id
    );
    assert_eq!(again.snapshot.group.as_ref().unwrap().devices.len(), 2);
}

#[test]
fn test_master_leaving_hands_over() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 6);
    create(&manager, "t1", "a", 2, GroupType::Same);
    join_same(&manager, "t1", "b", 1).unwrap();
    join_same(&manager, "t1", "c", 1).unwrap();

    manager
        .leave_session(LeaveSession {
            table_id: "t1".to_string(),
            device_id: "a".to_string(),
        })
        .unwrap();

    let group = manager.get_group("t1").unwrap();
    assert_eq!(group.master_device_id, "b");
    assert_eq!(group.devices, vec!["b".to_string(), "c".to_string()]);
    assert_eq!(group.guest_counts.adults, 2);
    assert_capacity_invariant(&manager, "t1");
}

#[test]
fn test_group_timer() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);

    create(&manager, "t1", "a", 2, GroupType::Different);
    let timer = running_timer();
    let err = manager
        .update_group_timer(UpdateTimer {
            table_id: "t1".to_string(),
            timer,
        })
        .unwrap_err();
    assert!(matches!(err, SessionError::GroupNotFound(_)));

    join_same(&manager, "t1", "b", 1).unwrap();
    let update = manager
        .update_group_timer(UpdateTimer {
            table_id: "t1".to_string(),
            timer,
        })
        .unwrap();
    assert_eq!(update.snapshot.group.unwrap().session_timer, timer);
}

fn running_timer() -> shared::session::SessionTimer {
    shared::session::SessionTimer {
        start_time: 1_000,
        end_time: Some(91_000),
        remaining_time: 90_000,
    }
}

#[test]
fn test_concurrent_same_joins_form_one_group() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 20);
    create(&manager, "t1", "host", 1, GroupType::Different);
    let manager = Arc::new(manager);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || join_same(&manager, "t1", &format!("d{}", i), 1))
        })
        .collect();

    let mut group_ids = Vec::new();
    for handle in handles {
        let update = handle.join().unwrap().unwrap();
        group_ids.push(update.device.unwrap().device.group_id.unwrap());
    }
    group_ids.dedup();
    assert_eq!(group_ids.len(), 1);

    let group = manager.get_group("t1").unwrap();
    assert_eq!(group.group_id, group_ids[0]);
    assert_eq!(group.devices.len(), 8);
    assert_eq!(group.guest_counts.adults, 8);
    assert_capacity_invariant(&manager, "t1");
}

#[test]
fn test_concurrent_joins_never_exceed_capacity() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 5);
    create(&manager, "t1", "host", 1, GroupType::Different);
    let manager = Arc::new(manager);

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                manager.join_session(join_cmd("t1", &format!("d{}", i), 1, GroupType::Different, None))
            })
        })
        .collect();

    let joined = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(joined, 4);
    assert_eq!(manager.get_table("t1").unwrap().current_guests, 5);
    assert_capacity_invariant(&manager, "t1");
}

#[test]
fn test_capacity_invariant_over_join_leave_sequence() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 1, GroupType::Same);

    let steps: &[(&str, bool, u32)] = &[
        ("b", true, 2),
        ("c", true, 2),
        ("b", false, 0),
        ("c", true, 2),
        ("d", true, 1),
        ("a", false, 0),
        ("e", true, 3),
        ("c", false, 0),
        ("e", true, 2),
    ];
    for (device, joining, adults) in steps {
        let _ = if *joining {
            join_same(&manager, "t1", device, *adults).map(|_| ())
        } else {
            manager
                .leave_session(LeaveSession {
                    table_id: "t1".to_string(),
                    device_id: device.to_string(),
                })
                .map(|_| ())
        };
        assert_capacity_invariant(&manager, "t1");
    }
}
