//! Menu Types
//!
//! Closed enumerations for pizza kind, size, and the nine ingredients. The
//! wire ordinals are bit flags frozen by the pipe protocol; they are kept in
//! explicit tables here rather than leaking enum discriminants into the
//! encoding.

use crate::PlazzaError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PizzaType {
    Regina,
    Margarita,
    Americana,
    Fantasia,
}

impl PizzaType {
    pub const ALL: [PizzaType; 4] = [
        PizzaType::Regina,
        PizzaType::Margarita,
        PizzaType::Americana,
        PizzaType::Fantasia,
    ];

    /// Protocol ordinal carried in job payloads.
    pub fn wire_code(self) -> u32 {
        match self {
            PizzaType::Regina => 1,
            PizzaType::Margarita => 2,
            PizzaType::Americana => 4,
            PizzaType::Fantasia => 8,
        }
    }

    pub fn from_wire_code(code: u32) -> Option<PizzaType> {
        Self::ALL.into_iter().find(|t| t.wire_code() == code)
    }

    /// Ingredients one unit of this pizza consumes.
    pub fn ingredients(self) -> &'static [Ingredient] {
        use Ingredient::*;
        match self {
            PizzaType::Margarita => &[Dough, Tomato, Gruyere],
            PizzaType::Regina => &[Dough, Tomato, Gruyere, Ham, Mushrooms],
            PizzaType::Americana => &[Dough, Tomato, Steak],
            PizzaType::Fantasia => &[Dough, Tomato, Eggplant, GoatCheese, ChiefLove],
        }
    }

    /// Base cook time in seconds, before the multiplier.
    pub fn base_cook_secs(self) -> u32 {
        match self {
            PizzaType::Margarita => 1,
            PizzaType::Regina => 2,
            PizzaType::Americana => 2,
            PizzaType::Fantasia => 4,
        }
    }
}

impl fmt::Display for PizzaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PizzaType::Regina => "Regina",
            PizzaType::Margarita => "Margarita",
            PizzaType::Americana => "Americana",
            PizzaType::Fantasia => "Fantasia",
        };
        f.write_str(name)
    }
}

impl FromStr for PizzaType {
    type Err = PlazzaError;

    /// Type names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regina" => Ok(PizzaType::Regina),
            "margarita" => Ok(PizzaType::Margarita),
            "americana" => Ok(PizzaType::Americana),
            "fantasia" => Ok(PizzaType::Fantasia),
            _ => Err(PlazzaError::Parse(format!("unknown pizza type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PizzaSize {
    S,
    M,
    L,
    XL,
    XXL,
}

impl PizzaSize {
    pub const ALL: [PizzaSize; 5] = [
        PizzaSize::S,
        PizzaSize::M,
        PizzaSize::L,
        PizzaSize::XL,
        PizzaSize::XXL,
    ];

    /// Protocol ordinal carried in job payloads.
    pub fn wire_code(self) -> u32 {
        match self {
            PizzaSize::S => 1,
            PizzaSize::M => 2,
            PizzaSize::L => 4,
            PizzaSize::XL => 8,
            PizzaSize::XXL => 16,
        }
    }

    pub fn from_wire_code(code: u32) -> Option<PizzaSize> {
        Self::ALL.into_iter().find(|s| s.wire_code() == code)
    }
}

impl fmt::Display for PizzaSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PizzaSize::S => "S",
            PizzaSize::M => "M",
            PizzaSize::L => "L",
            PizzaSize::XL => "XL",
            PizzaSize::XXL => "XXL",
        };
        f.write_str(name)
    }
}

impl FromStr for PizzaSize {
    type Err = PlazzaError;

    /// Size names are matched case-sensitively: `xl` is not a size.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S" => Ok(PizzaSize::S),
            "M" => Ok(PizzaSize::M),
            "L" => Ok(PizzaSize::L),
            "XL" => Ok(PizzaSize::XL),
            "XXL" => Ok(PizzaSize::XXL),
            _ => Err(PlazzaError::Parse(format!("unknown pizza size: {s}"))),
        }
    }
}

/// The nine stockable ingredients. Declaration order is the order of the
/// count vector in status payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ingredient {
    Dough,
    Tomato,
    Gruyere,
    Ham,
    Mushrooms,
    Steak,
    Eggplant,
    GoatCheese,
    ChiefLove,
}

impl Ingredient {
    pub const ALL: [Ingredient; 9] = [
        Ingredient::Dough,
        Ingredient::Tomato,
        Ingredient::Gruyere,
        Ingredient::Ham,
        Ingredient::Mushrooms,
        Ingredient::Steak,
        Ingredient::Eggplant,
        Ingredient::GoatCheese,
        Ingredient::ChiefLove,
    ];

    /// Position in status count vectors.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Ingredient::Dough => "Dough",
            Ingredient::Tomato => "Tomato",
            Ingredient::Gruyere => "Gruyere",
            Ingredient::Ham => "Ham",
            Ingredient::Mushrooms => "Mushrooms",
            Ingredient::Steak => "Steak",
            Ingredient::Eggplant => "Eggplant",
            Ingredient::GoatCheese => "GoatCheese",
            Ingredient::ChiefLove => "ChiefLove",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_the_frozen_bit_flags() {
        let type_codes: Vec<u32> = PizzaType::ALL.iter().map(|t| t.wire_code()).collect();
        assert_eq!(type_codes, vec![1, 2, 4, 8]);

        let size_codes: Vec<u32> = PizzaSize::ALL.iter().map(|s| s.wire_code()).collect();
        assert_eq!(size_codes, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn wire_codes_round_trip() {
        for t in PizzaType::ALL {
            assert_eq!(PizzaType::from_wire_code(t.wire_code()), Some(t));
        }
        for s in PizzaSize::ALL {
            assert_eq!(PizzaSize::from_wire_code(s.wire_code()), Some(s));
        }
        assert_eq!(PizzaType::from_wire_code(3), None);
        assert_eq!(PizzaSize::from_wire_code(32), None);
    }

    #[test]
    fn recipes_match_the_menu() {
        use Ingredient::*;
        assert_eq!(
            PizzaType::Margarita.ingredients(),
            &[Dough, Tomato, Gruyere]
        );
        assert_eq!(
            PizzaType::Regina.ingredients(),
            &[Dough, Tomato, Gruyere, Ham, Mushrooms]
        );
        assert_eq!(PizzaType::Americana.ingredients(), &[Dough, Tomato, Steak]);
        assert_eq!(
            PizzaType::Fantasia.ingredients(),
            &[Dough, Tomato, Eggplant, GoatCheese, ChiefLove]
        );
    }

    #[test]
    fn base_cook_times() {
        assert_eq!(PizzaType::Margarita.base_cook_secs(), 1);
        assert_eq!(PizzaType::Regina.base_cook_secs(), 2);
        assert_eq!(PizzaType::Americana.base_cook_secs(), 2);
        assert_eq!(PizzaType::Fantasia.base_cook_secs(), 4);
    }

    #[test]
    fn type_names_parse_case_insensitively() {
        assert_eq!("margarita".parse::<PizzaType>().unwrap(), PizzaType::Margarita);
        assert_eq!("REGINA".parse::<PizzaType>().unwrap(), PizzaType::Regina);
        assert_eq!("FanTasia".parse::<PizzaType>().unwrap(), PizzaType::Fantasia);
        assert!("hawaii".parse::<PizzaType>().is_err());
    }

    #[test]
    fn size_names_parse_case_sensitively() {
        assert_eq!("XXL".parse::<PizzaSize>().unwrap(), PizzaSize::XXL);
        assert!("xl".parse::<PizzaSize>().is_err());
        assert!("XXXL".parse::<PizzaSize>().is_err());
    }

    #[test]
    fn ingredient_indices_follow_declaration_order() {
        for (i, ingredient) in Ingredient::ALL.iter().enumerate() {
            assert_eq!(ingredient.index(), i);
        }
    }
}
