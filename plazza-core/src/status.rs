//! Kitchen Status Record
//!
//! Pull-based snapshot a kitchen reports over the pipe, with its flat text
//! encoding `id|active|total|queued|capacity|i0,...,i8`.

use crate::{Ingredient, PlazzaError};

pub const INGREDIENT_KINDS: usize = Ingredient::ALL.len();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KitchenStatus {
    pub kitchen_id: u32,
    pub active_cooks: u32,
    pub total_cooks: u32,
    pub queued_jobs: u32,
    pub max_capacity: u32,
    /// Stock counts in [`Ingredient::ALL`] order.
    pub ingredients: [u32; INGREDIENT_KINDS],
}

impl KitchenStatus {
    /// Synthetic stand-in used when a kitchen does not answer a status
    /// request in time: no cooks busy, nothing queued, pristine stock.
    pub fn placeholder(kitchen_id: u32, total_cooks: u32) -> Self {
        Self {
            kitchen_id,
            active_cooks: 0,
            total_cooks,
            queued_jobs: 0,
            max_capacity: 2 * total_cooks,
            ingredients: [crate::INITIAL_STOCK; INGREDIENT_KINDS],
        }
    }

    pub fn encode(&self) -> String {
        let counts: Vec<String> = self.ingredients.iter().map(u32::to_string).collect();
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.kitchen_id,
            self.active_cooks,
            self.total_cooks,
            self.queued_jobs,
            self.max_capacity,
            counts.join(",")
        )
    }

    pub fn decode(payload: &str) -> Result<Self, PlazzaError> {
        let parts: Vec<&str> = payload.split('|').collect();
        if parts.len() != 6 {
            return Err(PlazzaError::Parse(format!(
                "status payload has {} fields, expected 6",
                parts.len()
            )));
        }

        let mut status = Self {
            kitchen_id: parse_count(parts[0], "kitchen id")?,
            active_cooks: parse_count(parts[1], "active cooks")?,
            total_cooks: parse_count(parts[2], "total cooks")?,
            queued_jobs: parse_count(parts[3], "queued jobs")?,
            max_capacity: parse_count(parts[4], "max capacity")?,
            ingredients: [0; INGREDIENT_KINDS],
        };

        let counts: Vec<&str> = parts[5].split(',').collect();
        if counts.len() != INGREDIENT_KINDS {
            return Err(PlazzaError::Parse(format!(
                "status lists {} ingredients, expected {INGREDIENT_KINDS}",
                counts.len()
            )));
        }
        for (slot, raw) in status.ingredients.iter_mut().zip(counts) {
            *slot = parse_count(raw, "ingredient count")?;
        }

        Ok(status)
    }
}

fn parse_count(raw: &str, what: &str) -> Result<u32, PlazzaError> {
    raw.parse()
        .map_err(|_| PlazzaError::Parse(format!("bad {what}: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KitchenStatus {
        KitchenStatus {
            kitchen_id: 3,
            active_cooks: 1,
            total_cooks: 2,
            queued_jobs: 2,
            max_capacity: 4,
            ingredients: [5, 4, 3, 2, 1, 0, 10, 9, 8],
        }
    }

    #[test]
    fn encodes_the_frozen_field_order() {
        assert_eq!(sample().encode(), "3|1|2|2|4|5,4,3,2,1,0,10,9,8");
    }

    #[test]
    fn decode_round_trips() {
        let status = sample();
        assert_eq!(KitchenStatus::decode(&status.encode()).unwrap(), status);
    }

    #[test]
    fn decode_requires_exactly_nine_ingredients() {
        assert!(KitchenStatus::decode("3|1|2|2|4|5,4,3,2,1,0,10,9").is_err());
        assert!(KitchenStatus::decode("3|1|2|2|4|5,4,3,2,1,0,10,9,8,7").is_err());
    }

    #[test]
    fn decode_rejects_malformed_payloads() {
        assert!(KitchenStatus::decode("").is_err());
        assert!(KitchenStatus::decode("3|1|2|2|4").is_err());
        assert!(KitchenStatus::decode("3|1|2|2|4|5,4,3,2,1,0,10,9,8|tail").is_err());
        assert!(KitchenStatus::decode("3|one|2|2|4|5,4,3,2,1,0,10,9,8").is_err());
        assert!(KitchenStatus::decode("3|1|2|2|4|5,4,3,2,1,0,10,9,-8").is_err());
    }

    #[test]
    fn placeholder_reports_an_idle_kitchen() {
        let status = KitchenStatus::placeholder(7, 2);
        assert_eq!(status.kitchen_id, 7);
        assert_eq!(status.active_cooks, 0);
        assert_eq!(status.queued_jobs, 0);
        assert_eq!(status.max_capacity, 4);
        assert!(status.ingredients.iter().all(|&c| c == crate::INITIAL_STOCK));
    }
}
