use super::*;
use crate::message::MessageBus;
use crate::waiter::StaticPinVerifier;
use parking_lot::Mutex;
use shared::message::{RoomEvent, RoomPayload};
use shared::session::CartItemInput;
use tokio::sync::broadcast;

const WAITER_PIN: &str = "1234";

/// Order sink that keeps everything it receives
#[derive(Default)]
struct RecordingSink {
    orders: Mutex<Vec<(String, PlacedOrder)>>,
}

impl OrderSink for RecordingSink {
    fn dispatch(&self, table_id: &str, order: &PlacedOrder) {
        self.orders.lock().push((table_id.to_string(), order.clone()));
    }
}

fn create_test_manager() -> (SessionManager, MessageBus) {
    let storage = SessionStorage::open_in_memory().unwrap();
    let bus = MessageBus::new();
    let pins = StaticPinVerifier::from_list(&format!("{}:Ana", WAITER_PIN));
    let manager = SessionManager::new(storage, Arc::new(bus.clone()), Arc::new(pins));
    (manager, bus)
}

fn add_table(manager: &SessionManager, table_id: &str, capacity: u32) -> Table {
    manager
        .upsert_table(table_id, TableUpsert { number: 1, capacity })
        .unwrap()
}

fn create_cmd(table_id: &str, device_id: &str, adults: u32, group_type: GroupType) -> CreateSession {
    CreateSession {
        table_id: table_id.to_string(),
        device_id: device_id.to_string(),
        guest_counts: GuestCounts::adults(adults),
        group_type,
        join_existing: false,
        waiter_pin: None,
    }
}

fn join_cmd(
    table_id: &str,
    device_id: &str,
    adults: u32,
    group_type: GroupType,
    pin: Option<&str>,
) -> JoinSession {
    JoinSession {
        table_id: table_id.to_string(),
        device_id: device_id.to_string(),
        guest_counts: GuestCounts::adults(adults),
        group_type,
        waiter_pin: pin.map(str::to_string),
    }
}

fn create(manager: &SessionManager, table_id: &str, device_id: &str, adults: u32, group_type: GroupType) -> SessionUpdate {
    manager
        .create_session(create_cmd(table_id, device_id, adults, group_type))
        .unwrap()
}

fn join_same(manager: &SessionManager, table_id: &str, device_id: &str, adults: u32) -> SessionResult<SessionUpdate> {
    manager.join_session(join_cmd(table_id, device_id, adults, GroupType::Same, Some(WAITER_PIN)))
}

fn add_item(
    manager: &SessionManager,
    table_id: &str,
    device_id: Option<&str>,
    item: CartItemInput,
    quantity: i32,
) -> SessionResult<SessionUpdate> {
    manager.mutate_cart(MutateCart {
        table_id: table_id.to_string(),
        device_id: device_id.map(str::to_string),
        mutation: shared::session::CartMutation::Add { item, quantity },
    })
}

fn gyoza() -> CartItemInput {
    CartItemInput::full("gyoza", "Gyoza", 4.5, "starters")
}

fn ramen() -> CartItemInput {
    CartItemInput::full("ramen", "Ramen", 12.0, "noodles")
}

/// Everything published so far
fn drain(rx: &mut broadcast::Receiver<RoomEvent>) -> Vec<RoomEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn events_in<'a>(events: &'a [RoomEvent], room: &str) -> Vec<&'a RoomEvent> {
    events.iter().filter(|e| e.room == room).collect()
}

fn assert_capacity_invariant(manager: &SessionManager, table_id: &str) {
    let table = manager.get_table(table_id).unwrap();
    assert!(table.current_guests <= table.capacity);
    if let Ok(snapshot) = manager.get_session(table_id) {
        let seated: u32 = snapshot.devices.iter().map(|d| d.guest_counts.adults).sum();
        assert_eq!(table.current_guests, seated);
        assert_eq!(snapshot.session.guest_counts.adults, seated);
    } else {
        assert_eq!(table.current_guests, 0);
    }
}

mod test_carts;
mod test_groups;
