use super::*;
use shared::session::CartMutation;
use std::thread;

fn subtract(manager: &SessionManager, device_id: Option<&str>, id: &str, quantity: i32) -> SessionUpdate {
    manager
        .mutate_cart(MutateCart {
            table_id: "t1".to_string(),
            device_id: device_id.map(str::to_string),
            mutation: CartMutation::Subtract {
                menu_item_id: id.to_string(),
                quantity,
            },
        })
        .unwrap()
}

#[test]
fn test_isolated_carts_stay_private() {
    let (manager, bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Different);
    let joined = manager
        .join_session(join_cmd("t1", "b", 1, GroupType::Different, None))
        .unwrap();
    assert_eq!(joined.snapshot.table.current_guests, 3);

    let mut rx = bus.subscribe();
    add_item(&manager, "t1", Some("a"), gyoza(), 2).unwrap();
    add_item(&manager, "t1", Some("b"), ramen(), 1).unwrap();

    let a = manager.get_device_view("t1", "a").unwrap();
    let b = manager.get_device_view("t1", "b").unwrap();
    assert_eq!(a.cart.len(), 1);
    assert_eq!(a.cart[0].menu_item_id, "gyoza");
    assert_eq!(b.cart.len(), 1);
    assert_eq!(b.cart[0].menu_item_id, "ramen");

    // the shared snapshot carries no isolated cart
    let snapshot = manager.get_session("t1").unwrap();
    assert!(snapshot.session.cart_items.is_empty());
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(!json.contains("gyoza"));
    assert!(!json.contains("ramen"));

    // a's cart only reached a's room
    let events = drain(&mut rx);
    assert_eq!(events_in(&events, "device-a").len(), 1);
    assert_eq!(events_in(&events, "device-b").len(), 1);
    for event in events_in(&events, "device-b") {
        let RoomPayload::DeviceUpdate(Some(view)) = &event.payload else {
            panic!("expected a device view");
        };
        assert!(view.cart.iter().all(|line| line.menu_item_id != "gyoza"));
    }
}

#[test]
fn test_repeated_add_folds() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Different);

    add_item(&manager, "t1", None, gyoza(), 2).unwrap();
    let update = add_item(&manager, "t1", None, CartItemInput::id_only("gyoza"), 3).unwrap();

    let cart = &update.snapshot.session.cart_items;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 5);
}

#[test]
fn test_add_then_subtract_restores() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Different);
    add_item(&manager, "t1", Some("a"), ramen(), 1).unwrap();
    let before = manager.get_device_view("t1", "a").unwrap().cart;

    add_item(&manager, "t1", Some("a"), gyoza(), 4).unwrap();
    add_item(&manager, "t1", Some("a"), CartItemInput::id_only("ramen"), 2).unwrap();
    subtract(&manager, Some("a"), "gyoza", 4);
    let update = subtract(&manager, Some("a"), "ramen", 2);

    assert_eq!(update.device.unwrap().cart, before);
}

#[test]
fn test_first_add_without_details_fails() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Different);

    let err = add_item(&manager, "t1", None, CartItemInput::id_only("gyoza"), 1).unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
    assert!(manager.get_session("t1").unwrap().session.cart_items.is_empty());
}

#[test]
fn test_cart_of_unknown_device() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Different);

    let err = add_item(&manager, "t1", Some("ghost"), gyoza(), 1).unwrap_err();
    assert!(matches!(err, SessionError::DeviceNotFound { .. }));
}

#[test]
fn test_update_cart_replaces_and_normalizes() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Different);
    add_item(&manager, "t1", None, gyoza(), 1).unwrap();

    let line = |id: &str, quantity: i32| CartItem {
        menu_item_id: id.to_string(),
        name: id.to_string(),
        price: 2.0,
        quantity,
        category_id: "c".to_string(),
    };
    let update = manager
        .update_cart(UpdateCart {
            table_id: "t1".to_string(),
            device_id: None,
            cart_items: vec![line("edamame", 1), line("tea", 0), line("edamame", 2)],
        })
        .unwrap();

    let cart = &update.snapshot.session.cart_items;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].menu_item_id, "edamame");
    assert_eq!(cart[0].quantity, 3);

    let err = manager
        .update_cart(UpdateCart {
            table_id: "t1".to_string(),
            device_id: None,
            cart_items: vec![line("", 1)],
        })
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
}

#[test]
fn test_cart_without_session() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    let err = add_item(&manager, "t1", None, gyoza(), 1).unwrap_err();
    assert!(matches!(err, SessionError::SessionNotFound(_)));
}

#[test]
fn test_submit_isolated_order() {
    let storage = SessionStorage::open_in_memory().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let pins = StaticPinVerifier::from_list("1234:Ana");
    let manager = SessionManager::new(storage, Arc::new(MessageBus::new()), Arc::new(pins))
        .with_order_sink(sink.clone())
        .with_order_cooldown(Duration::from_secs(60));
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Different);
    add_item(&manager, "t1", Some("a"), gyoza(), 2).unwrap();

    let before = now_millis();
    let submitted = manager
        .submit_order(SubmitOrder {
            table_id: "t1".to_string(),
            device_id: "a".to_string(),
        })
        .unwrap();

    assert_eq!(submitted.order.items.len(), 1);
    assert_eq!(submitted.order.total(), 9.0);
    let view = submitted.update.device.as_ref().unwrap();
    assert!(view.cart.is_empty());
    assert_eq!(view.device.orders, vec![submitted.order.clone()]);
    let until = submitted
        .update
        .snapshot
        .session
        .next_order_available_until
        .unwrap();
    assert!(until >= before + 60_000);

    let dispatched = sink.orders.lock();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].0, "t1");
    assert_eq!(dispatched[0].1.order_id, submitted.order.order_id);
}

#[test]
fn test_submit_group_order() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Same);
    join_same(&manager, "t1", "b", 1).unwrap();
    add_item(&manager, "t1", Some("a"), gyoza(), 1).unwrap();
    add_item(&manager, "t1", Some("b"), ramen(), 1).unwrap();

    let submitted = manager
        .submit_order(SubmitOrder {
            table_id: "t1".to_string(),
            device_id: "b".to_string(),
        })
        .unwrap();
    assert_eq!(submitted.order.items.len(), 2);
    assert_eq!(submitted.order.device_id, "b");

    let group = manager.get_group("t1").unwrap();
    assert!(group.shared_cart.is_empty());
    assert_eq!(group.shared_orders.len(), 1);
}

#[test]
fn test_submit_empty_cart_fails() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Different);

    let err = manager
        .submit_order(SubmitOrder {
            table_id: "t1".to_string(),
            device_id: "a".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
    assert!(
        manager
            .get_session("t1")
            .unwrap()
            .session
            .next_order_available_until
            .is_none()
    );
}

#[test]
fn test_orders_survive_rejoin() {
    let (manager, _bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Different);
    manager
        .join_session(join_cmd("t1", "b", 1, GroupType::Different, None))
        .unwrap();
    add_item(&manager, "t1", Some("b"), ramen(), 1).unwrap();
    manager
        .submit_order(SubmitOrder {
            table_id: "t1".to_string(),
            device_id: "b".to_string(),
        })
        .unwrap();

    manager
        .leave_session(LeaveSession {
            table_id: "t1".to_string(),
            device_id: "b".to_string(),
        })
        .unwrap();
    let back = manager
        .join_session(join_cmd("t1", "b", 1, GroupType::Different, None))
        .unwrap();
    assert_eq!(back.device.unwrap().device.orders.len(), 1);
}

#[test]
fn test_concurrent_cart_edits_publish_in_commit_order() {
    let (manager, bus) = create_test_manager();
    add_table(&manager, "t1", 4);
    create(&manager, "t1", "a", 2, GroupType::Different);
    let mut rx = bus.subscribe();
    let manager = Arc::new(manager);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for _ in 0..5 {
                    add_item(&manager, "t1", None, gyoza(), 1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // each commit adds one, so a newer version always carries a bigger cart
    let events = drain(&mut rx);
    let table_events = events_in(&events, "table-t1");
    assert_eq!(table_events.len(), 40);
    let mut last = (0u64, 0i32);
    for event in table_events {
        let RoomPayload::SessionUpdate(Some(snapshot)) = &event.payload else {
            panic!("expected a table snapshot");
        };
        let quantity = snapshot.session.cart_items[0].quantity;
        assert!(event.version > last.0);
        assert_eq!(quantity, last.1 + 1);
        last = (event.version, quantity);
    }
    assert_eq!(last.1, 40);
}
