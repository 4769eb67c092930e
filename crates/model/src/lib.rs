use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use serde_with;

pub mod favorite;
pub mod geofence;
pub mod location;
pub mod notification;
pub mod payment;
pub mod preferences;
pub mod ride;
pub mod scooter;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithDistance<T> {
    pub distance_km: f64,
    #[serde(flatten)]
    pub content: T,
}

impl<T> WithDistance<T> {
    pub fn new(distance_km: f64, content: T) -> Self {
        Self {
            distance_km,
            content,
        }
    }

    /// Sorts nearest first. NaN distances end up last.
    pub fn sort_nearest_first(values: &mut [Self]) {
        values.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Greater)
        });
    }
}

pub trait Mergable {
    /// Merges an other value to this. The other value has a higher priority.
    fn merge(self, other: Self) -> Self;
}

impl<T> Mergable for Option<T>
where
    T: Mergable,
{
    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Some(old), Some(new)) => Some(old.merge(new)),
            (old @ Some(_), _) => old,
            (_, new @ Some(_)) => new,
            _ => None,
        }
    }
}

/// Rounds an amount of money to whole cents.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
