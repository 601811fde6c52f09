//! Prize catalog helpers.
//!
//! Colors are always resolved through an explicit id → color lookup built
//! from the catalog, never inferred from the shape of a prize id.

use std::collections::HashMap;

use crate::types::{Prize, PrizeColor};

/// Prize id → color, built once per catalog.
#[derive(Debug, Clone)]
pub struct ColorLookup<'a> {
    by_id: HashMap<&'a str, PrizeColor>,
}

impl<'a> ColorLookup<'a> {
    pub fn new(catalog: &'a [Prize]) -> Self {
        Self {
            by_id: catalog.iter().map(|p| (p.id.as_str(), p.color)).collect(),
        }
    }

    pub fn color_of(&self, prize_id: &str) -> Option<PrizeColor> {
        self.by_id.get(prize_id).copied()
    }
}

/// Prizes of one color, in catalog order.
pub fn prizes_of(catalog: &[Prize], color: PrizeColor) -> impl Iterator<Item = &Prize> {
    catalog.iter().filter(move |p| p.color == color)
}

/// Index of a prize within the catalog.
pub fn position_of(catalog: &[Prize], prize_id: &str) -> Option<usize> {
    catalog.iter().position(|p| p.id == prize_id)
}

/// Built-in catalog: two prizes per color.
pub fn default_catalog() -> Vec<Prize> {
    let entry = |id: &str, color, name: &str, description: &str| Prize {
        id: id.to_string(),
        color,
        name: name.to_string(),
        description: Some(description.to_string()),
        icon: None,
    };

    vec![
        entry("prize_red_1", PrizeColor::Red, "Red Grand Prize", "A generous red prize"),
        entry("prize_red_2", PrizeColor::Red, "Red Gift", "A fine red keepsake"),
        entry("prize_yellow_1", PrizeColor::Yellow, "Yellow Grand Prize", "A generous yellow prize"),
        entry("prize_yellow_2", PrizeColor::Yellow, "Yellow Gift", "A fine yellow keepsake"),
        entry("prize_green_1", PrizeColor::Green, "Green Grand Prize", "A generous green prize"),
        entry("prize_green_2", PrizeColor::Green, "Green Gift", "A fine green keepsake"),
    ]
}
