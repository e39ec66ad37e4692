//! Guest counts and their aggregation rules

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Guests a device (or a whole group/session) accounts for.
///
/// Only `adults` count toward table capacity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuestCounts {
    #[validate(range(min = 1, max = 99, message = "at least one adult is required"))]
    pub adults: u32,
    #[serde(default)]
    #[validate(range(max = 99))]
    pub children: u32,
    #[serde(default)]
    #[validate(range(max = 99))]
    pub infants: u32,
    #[serde(default)]
    pub include_drinks: bool,
}

impl GuestCounts {
    pub fn new(adults: u32, children: u32, infants: u32, include_drinks: bool) -> Self {
        Self {
            adults,
            children,
            infants,
            include_drinks,
        }
    }

    pub fn adults(adults: u32) -> Self {
        Self {
            adults,
            ..Default::default()
        }
    }

    /// Elementwise sum; drinks are included if either side includes them
    pub fn merged(&self, other: &GuestCounts) -> GuestCounts {
        GuestCounts {
            adults: self.adults + other.adults,
            children: self.children + other.children,
            infants: self.infants + other.infants,
            include_drinks: self.include_drinks || other.include_drinks,
        }
    }

    /// Aggregate over any number of contributions
    pub fn sum<'a>(counts: impl IntoIterator<Item = &'a GuestCounts>) -> GuestCounts {
        counts
            .into_iter()
            .fold(GuestCounts::default(), |acc, c| acc.merged(c))
    }
}
