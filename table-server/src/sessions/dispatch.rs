//! Downstream order hand-off
//!
//! Submitted orders leave this service through an [`OrderSink`] (kitchen
//! display, printer bridge, POS). The sink is called after the order has
//! been committed to the session.

use shared::session::PlacedOrder;

pub trait OrderSink: Send + Sync {
    fn dispatch(&self, table_id: &str, order: &PlacedOrder);
}

/// Default sink: records the order in the log
#[derive(Debug, Default, Clone)]
pub struct TracingOrderSink;

impl OrderSink for TracingOrderSink {
    fn dispatch(&self, table_id: &str, order: &PlacedOrder) {
        tracing::info!(
            table_id = %table_id,
            order_id = %order.order_id,
            device_id = %order.device_id,
            items = order.items.len(),
            total = order.total(),
            "Order submitted"
        );
    }
}
