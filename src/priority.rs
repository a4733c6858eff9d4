// src/priority.rs
use crate::model::{Entity, Priority};

/// Stable 3-way partition: High, then Medium, then Low.
/// Relative input order is preserved inside each tier; nothing is dropped.
pub fn order(entities: &[Entity]) -> Vec<Entity> {
    let mut out = Vec::with_capacity(entities.len());
    for tier in [Priority::High, Priority::Medium, Priority::Low] {
        out.extend(entities.iter().filter(|e| e.priority == tier).cloned());
    }
    out
}
