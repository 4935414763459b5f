use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seat category, drives the price multiplier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatCategory {
    Normal,
    Reduced,
    Vip,
}

impl SeatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatCategory::Normal => "NORMAL",
            SeatCategory::Reduced => "REDUCED",
            SeatCategory::Vip => "VIP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NORMAL" => Some(SeatCategory::Normal),
            "REDUCED" => Some(SeatCategory::Reduced),
            "VIP" => Some(SeatCategory::Vip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hall {
    pub id: Uuid,
    pub name: String,
}

/// A physical seat. Immutable once referenced by a booking; the seat
/// entity itself is never destroyed by the booking lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub hall_id: Uuid,
    /// Label unique within the hall, e.g. "A12".
    pub seat_number: String,
    pub category: SeatCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
}

/// A screening of a movie in a hall. Non-overlap of sessions per hall is
/// enforced by the scheduling logic upstream of this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub hall_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub base_price_cents: i64,
}
