//! Order Grammar
//!
//! Parses one console line into pizza orders. A line is semicolon-separated
//! triples `<type> <SIZE> x<quantity>`; anything after a `#` is a comment.

use crate::{PizzaSize, PizzaType, PlazzaError};
use regex::Regex;
use std::sync::OnceLock;

/// One parsed `<type> <SIZE> x<quantity>` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub pizza_type: PizzaType,
    pub size: PizzaSize,
    pub quantity: u32,
}

const MAX_QUANTITY: u32 = 99;

fn order_grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z]+\s+(S|M|L|XL|XXL)\s+x[1-9][0-9]*(\s*;\s*[a-zA-Z]+\s+(S|M|L|XL|XXL)\s+x[1-9][0-9]*)*$",
        )
        .expect("order grammar is a valid regex")
    })
}

/// Parse a full order line into its triples.
///
/// The whole line is validated against the grammar first, so a single bad
/// triple rejects the entire line and no partial order is placed.
pub fn parse_order_line(line: &str) -> Result<Vec<Order>, PlazzaError> {
    let line = line.split('#').next().unwrap_or("").trim();

    if line.is_empty() || !order_grammar().is_match(line) {
        return Err(PlazzaError::Parse("invalid order format".to_string()));
    }

    line.split(';').map(parse_triple).collect()
}

fn parse_triple(chunk: &str) -> Result<Order, PlazzaError> {
    let mut words = chunk.split_whitespace();
    let (Some(type_word), Some(size_word), Some(quantity_word)) =
        (words.next(), words.next(), words.next())
    else {
        return Err(PlazzaError::Parse(format!("incomplete order: {chunk}")));
    };

    let pizza_type: PizzaType = type_word.parse()?;
    let size: PizzaSize = size_word.parse()?;
    let quantity = parse_quantity(quantity_word)?;

    Ok(Order {
        pizza_type,
        size,
        quantity,
    })
}

fn parse_quantity(word: &str) -> Result<u32, PlazzaError> {
    let digits = word
        .strip_prefix('x')
        .ok_or_else(|| PlazzaError::Parse(format!("bad quantity: {word}")))?;
    let quantity: u32 = digits
        .parse()
        .map_err(|_| PlazzaError::Parse(format!("bad quantity: {word}")))?;

    if quantity == 0 || quantity > MAX_QUANTITY {
        return Err(PlazzaError::Parse(format!(
            "quantity out of range (1-{MAX_QUANTITY}): {word}"
        )));
    }
    Ok(quantity)
}
