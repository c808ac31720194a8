//! Pizza Job Record
//!
//! The unit of work exchanged between reception and kitchens, with its flat
//! text encoding `type|size|cook_ms|cooked`.

use crate::{PizzaSize, PizzaType, PlazzaError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PizzaJob {
    pub pizza_type: PizzaType,
    pub size: PizzaSize,
    pub cook_time_ms: u64,
    pub cooked: bool,
}

impl PizzaJob {
    /// Build an uncooked job. The cook time is fixed here, at dispatch time,
    /// so every kitchen sees the same rounded value.
    pub fn new(pizza_type: PizzaType, size: PizzaSize, multiplier: f64) -> Self {
        let cook_time_ms =
            (pizza_type.base_cook_secs() as f64 * multiplier * 1000.0).round() as u64;
        Self {
            pizza_type,
            size,
            cook_time_ms,
            cooked: false,
        }
    }

    pub fn cook_time(&self) -> Duration {
        Duration::from_millis(self.cook_time_ms)
    }

    /// Human-facing name, e.g. `Margarita S`.
    pub fn name(&self) -> String {
        format!("{} {}", self.pizza_type, self.size)
    }

    pub fn encode(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.pizza_type.wire_code(),
            self.size.wire_code(),
            self.cook_time_ms,
            u8::from(self.cooked)
        )
    }

    pub fn decode(payload: &str) -> Result<Self, PlazzaError> {
        let parts: Vec<&str> = payload.split('|').collect();
        if parts.len() != 4 {
            return Err(PlazzaError::Parse(format!(
                "pizza payload has {} fields, expected 4",
                parts.len()
            )));
        }

        let type_code: u32 = parse_field(parts[0], "pizza type")?;
        let size_code: u32 = parse_field(parts[1], "pizza size")?;
        let cook_time_ms: u64 = parse_field(parts[2], "cook time")?;

        let pizza_type = PizzaType::from_wire_code(type_code)
            .ok_or_else(|| PlazzaError::Parse(format!("unknown pizza type code: {type_code}")))?;
        let size = PizzaSize::from_wire_code(size_code)
            .ok_or_else(|| PlazzaError::Parse(format!("unknown pizza size code: {size_code}")))?;
        let cooked = match parts[3] {
            "0" => false,
            "1" => true,
            other => {
                return Err(PlazzaError::Parse(format!("bad cooked flag: {other}")));
            }
        };

        Ok(Self {
            pizza_type,
            size,
            cook_time_ms,
            cooked,
        })
    }
}

fn parse_field<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, PlazzaError> {
    raw.parse()
        .map_err(|_| PlazzaError::Parse(format!("bad {what}: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_the_frozen_field_order() {
        let job = PizzaJob::new(PizzaType::Margarita, PizzaSize::S, 1.0);
        assert_eq!(job.encode(), "2|1|1000|0");

        let mut done = PizzaJob::new(PizzaType::Fantasia, PizzaSize::XXL, 1.0);
        done.cooked = true;
        assert_eq!(done.encode(), "8|16|4000|1");
    }

    #[test]
    fn decode_round_trips() {
        for t in PizzaType::ALL {
            for s in PizzaSize::ALL {
                let job = PizzaJob::new(t, s, 2.5);
                assert_eq!(PizzaJob::decode(&job.encode()).unwrap(), job);
            }
        }
    }

    #[test]
    fn cook_time_rounds_instead_of_truncating() {
        // 1s * 0.3333 = 333.3ms -> 333, 2s * 0.10005 = 200.1ms -> 200,
        // 1s * 0.0006 = 0.6ms -> 1 (truncation would give 0).
        assert_eq!(PizzaJob::new(PizzaType::Margarita, PizzaSize::S, 0.3333).cook_time_ms, 333);
        assert_eq!(PizzaJob::new(PizzaType::Regina, PizzaSize::M, 0.10005).cook_time_ms, 200);
        assert_eq!(PizzaJob::new(PizzaType::Margarita, PizzaSize::S, 0.0006).cook_time_ms, 1);
    }

    #[test]
    fn decode_rejects_malformed_payloads() {
        assert!(PizzaJob::decode("").is_err());
        assert!(PizzaJob::decode("2|1|1000").is_err());
        assert!(PizzaJob::decode("2|1|1000|0|extra").is_err());
        assert!(PizzaJob::decode("nine|1|1000|0").is_err());
        assert!(PizzaJob::decode("2|1|soon|0").is_err());
        // Ordinals outside the frozen flag sets.
        assert!(PizzaJob::decode("3|1|1000|0").is_err());
        assert!(PizzaJob::decode("2|32|1000|0").is_err());
        // Cooked flag must be exactly 0 or 1.
        assert!(PizzaJob::decode("2|1|1000|2").is_err());
        assert!(PizzaJob::decode("2|1|1000|true").is_err());
    }

    #[test]
    fn name_reads_like_the_menu() {
        assert_eq!(
            PizzaJob::new(PizzaType::Americana, PizzaSize::XL, 1.0).name(),
            "Americana XL"
        );
    }
}
