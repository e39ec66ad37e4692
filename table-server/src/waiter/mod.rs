//! Waiter PIN verification
//!
//! Joining a same-group session requires a waiter to confirm at the table by
//! entering a PIN on the joining device. The verifier is a trait so the PIN
//! store can live elsewhere (staff service, POS); the default keeps a static
//! list loaded from configuration.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Result of a PIN check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinVerification {
    pub accepted: bool,
    /// Name of the waiter the PIN belongs to
    pub waiter: Option<String>,
}

impl PinVerification {
    pub fn accepted(waiter: impl Into<String>) -> Self {
        Self {
            accepted: true,
            waiter: Some(waiter.into()),
        }
    }

    pub fn rejected() -> Self {
        Self {
            accepted: false,
            waiter: None,
        }
    }
}

pub trait WaiterPinVerifier: Send + Sync {
    fn verify(&self, pin: &str, table_id: &str) -> PinVerification;
}

/// PIN list held in memory
///
/// Parsed from `"1234:Ana,5678:Luis"`. Entries without a name use the PIN's
/// position ("waiter-1"). Any PIN is valid for any table.
#[derive(Debug, Default)]
pub struct StaticPinVerifier {
    pins: RwLock<HashMap<String, String>>,
}

impl StaticPinVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_list(list: &str) -> Self {
        let verifier = Self::new();
        verifier.reload(list);
        verifier
    }

    /// Replace the PIN list
    pub fn reload(&self, list: &str) {
        let mut pins = HashMap::new();
        for (index, entry) in list
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .enumerate()
        {
            let (pin, name) = match entry.split_once(':') {
                Some((pin, name)) if !name.trim().is_empty() => {
                    (pin.trim(), name.trim().to_string())
                }
                Some((pin, _)) => (pin.trim(), format!("waiter-{}", index + 1)),
                None => (entry, format!("waiter-{}", index + 1)),
            };
            if pin.is_empty() {
                continue;
            }
            pins.insert(pin.to_string(), name);
        }
        tracing::info!(count = pins.len(), "Waiter PINs loaded");
        *self.pins.write() = pins;
    }

    pub fn insert(&self, pin: impl Into<String>, waiter: impl Into<String>) {
        self.pins.write().insert(pin.into(), waiter.into());
    }

    pub fn len(&self) -> usize {
        self.pins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.read().is_empty()
    }
}

impl WaiterPinVerifier for StaticPinVerifier {
    fn verify(&self, pin: &str, table_id: &str) -> PinVerification {
        match self.pins.read().get(pin.trim()) {
            Some(waiter) => {
                tracing::debug!(table_id = %table_id, waiter = %waiter, "Waiter PIN accepted");
                PinVerification::accepted(waiter.clone())
            }
            None => {
                tracing::warn!(table_id = %table_id, "Waiter PIN rejected");
                PinVerification::rejected()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pin_list() {
        let verifier = StaticPinVerifier::from_list(" 1234:Ana, 5678:Luis ,,9999");
        assert_eq!(verifier.len(), 3);
        assert_eq!(verifier.verify("1234", "t1"), PinVerification::accepted("Ana"));
        assert_eq!(verifier.verify("5678", "t1").waiter.as_deref(), Some("Luis"));
        assert_eq!(verifier.verify("9999", "t1").waiter.as_deref(), Some("waiter-3"));
        assert!(!verifier.verify("0000", "t1").accepted);
    }

    #[test]
    fn test_empty_list_rejects_everything() {
        let verifier = StaticPinVerifier::from_list("");
        assert!(verifier.is_empty());
        assert_eq!(verifier.verify("", "t1"), PinVerification::rejected());
    }

    #[test]
    fn test_reload_replaces() {
        let verifier = StaticPinVerifier::from_list("1111:Ana");
        verifier.reload("2222:Luis");
        assert!(!verifier.verify("1111", "t1").accepted);
        assert!(verifier.verify("2222", "t1").accepted);
        verifier.insert("3333", "Eva");
        assert_eq!(verifier.len(), 2);
    }
}
