//! Tagged session requests
//!
//! Every state change a device can ask for is one variant of
//! [`SessionRequest`]. Each payload is validated into a strict shape before
//! the server touches any state.
//!
//! `table_id` defaults to empty on the wire so HTTP bodies can omit it; the
//! route fills it from the path before validation.

use super::cart::{CartItem, CartMutation};
use super::device::GroupType;
use super::group::SessionTimer;
use super::guests::GuestCounts;
use super::session::EndReason;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    #[serde(default)]
    #[validate(length(min = 1, message = "tableId is required"))]
    pub table_id: String,
    #[validate(length(min = 1, message = "deviceId is required"))]
    pub device_id: String,
    #[validate(nested)]
    pub guest_counts: GuestCounts,
    /// Omitted means `different`
    #[serde(default)]
    pub group_type: GroupType,
    /// Join instead of failing when the table already has an active session
    #[serde(default)]
    pub join_existing: bool,
    /// Only used when `join_existing` turns this into a same-group join
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiter_pin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinSession {
    #[serde(default)]
    #[validate(length(min = 1, message = "tableId is required"))]
    pub table_id: String,
    #[validate(length(min = 1, message = "deviceId is required"))]
    pub device_id: String,
    #[validate(nested)]
    pub guest_counts: GuestCounts,
    /// Omitted means `different`
    #[serde(default)]
    pub group_type: GroupType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiter_pin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeaveSession {
    #[serde(default)]
    #[validate(length(min = 1, message = "tableId is required"))]
    pub table_id: String,
    #[validate(length(min = 1, message = "deviceId is required"))]
    pub device_id: String,
}

/// Full cart replace
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCart {
    #[serde(default)]
    #[validate(length(min = 1, message = "tableId is required"))]
    pub table_id: String,
    /// Target the device's own (or its group's) cart instead of the table cart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[validate(nested)]
    pub cart_items: Vec<CartItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MutateCart {
    #[serde(default)]
    #[validate(length(min = 1, message = "tableId is required"))]
    pub table_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[validate(custom(function = "validate_mutation"))]
    pub mutation: CartMutation,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_patch_not_empty"))]
pub struct PatchSession {
    #[serde(default)]
    #[validate(length(min = 1, message = "tableId is required"))]
    pub table_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_order_available_until: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_ended: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimer {
    #[serde(default)]
    #[validate(length(min = 1, message = "tableId is required"))]
    pub table_id: String,
    #[validate(custom(function = "validate_timer"))]
    pub timer: SessionTimer,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrder {
    #[serde(default)]
    #[validate(length(min = 1, message = "tableId is required"))]
    pub table_id: String,
    #[validate(length(min = 1, message = "deviceId is required"))]
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EndSession {
    #[serde(default)]
    #[validate(length(min = 1, message = "tableId is required"))]
    pub table_id: String,
    #[serde(default)]
    pub reason: EndReason,
}

/// Every state change a device may request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionRequest {
    CreateSession(CreateSession),
    JoinSession(JoinSession),
    LeaveSession(LeaveSession),
    UpdateCart(UpdateCart),
    MutateCart(MutateCart),
    PatchSession(PatchSession),
    UpdateTimer(UpdateTimer),
    SubmitOrder(SubmitOrder),
    EndSession(EndSession),
}

impl SessionRequest {
    pub fn table_id(&self) -> &str {
        match self {
            SessionRequest::CreateSession(r) => &r.table_id,
            SessionRequest::JoinSession(r) => &r.table_id,
            SessionRequest::LeaveSession(r) => &r.table_id,
            SessionRequest::UpdateCart(r) => &r.table_id,
            SessionRequest::MutateCart(r) => &r.table_id,
            SessionRequest::PatchSession(r) => &r.table_id,
            SessionRequest::UpdateTimer(r) => &r.table_id,
            SessionRequest::SubmitOrder(r) => &r.table_id,
            SessionRequest::EndSession(r) => &r.table_id,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            SessionRequest::CreateSession(_) => "create_session",
            SessionRequest::JoinSession(_) => "join_session",
            SessionRequest::LeaveSession(_) => "leave_session",
            SessionRequest::UpdateCart(_) => "update_cart",
            SessionRequest::MutateCart(_) => "mutate_cart",
            SessionRequest::PatchSession(_) => "patch_session",
            SessionRequest::UpdateTimer(_) => "update_timer",
            SessionRequest::SubmitOrder(_) => "submit_order",
            SessionRequest::EndSession(_) => "end_session",
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            SessionRequest::CreateSession(r) => r.validate(),
            SessionRequest::JoinSession(r) => r.validate(),
            SessionRequest::LeaveSession(r) => r.validate(),
            SessionRequest::UpdateCart(r) => r.validate(),
            SessionRequest::MutateCart(r) => r.validate(),
            SessionRequest::PatchSession(r) => r.validate(),
            SessionRequest::UpdateTimer(r) => r.validate(),
            SessionRequest::SubmitOrder(r) => r.validate(),
            SessionRequest::EndSession(r) => r.validate(),
        }
    }
}

fn validate_patch_not_empty(patch: &PatchSession) -> Result<(), ValidationError> {
    if patch.next_order_available_until.is_none() && patch.session_ended.is_none() {
        return Err(ValidationError::new("empty_patch")
            .with_message("nextOrderAvailableUntil or sessionEnded is required".into()));
    }
    Ok(())
}

fn validate_mutation(mutation: &CartMutation) -> Result<(), ValidationError> {
    if let Some(id) = mutation.menu_item_id()
        && id.trim().is_empty()
    {
        return Err(ValidationError::new("menu_item_id").with_message("menuItemId is required".into()));
    }
    match mutation {
        CartMutation::Add { quantity, .. } | CartMutation::Subtract { quantity, .. }
            if *quantity <= 0 =>
        {
            Err(ValidationError::new("quantity").with_message("quantity must be positive".into()))
        }
        _ => Ok(()),
    }
}

fn validate_timer(timer: &SessionTimer) -> Result<(), ValidationError> {
    if timer.remaining_time < 0 {
        return Err(ValidationError::new("remaining_time")
            .with_message("remainingTime must not be negative".into()));
    }
    if let Some(end) = timer.end_time
        && end < timer.start_time
    {
        return Err(
            ValidationError::new("end_time").with_message("endTime precedes startTime".into())
        );
    }
    Ok(())
}

/// Flatten validator errors into one readable line
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut parts = Vec::new();
    collect_messages(errors, "", &mut parts);
    if parts.is_empty() {
        "invalid request".to_string()
    } else {
        parts.join("; ")
    }
}

fn collect_messages(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for e in list {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    out.push(format!("{}: {}", path, msg));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_messages(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_messages(inner, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}
