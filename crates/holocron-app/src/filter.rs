// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::Entity;

/// Case-insensitive substring filter over `field`. Order is preserved. An
/// empty term keeps everything, including entities without `field`.
pub fn filter_entities(items: &[Entity], term: &str, field: &str) -> Vec<Entity> {
    if term.is_empty() {
        return items.to_vec();
    }
    let needle = term.to_lowercase();
    items
        .iter()
        .filter(|entity| {
            entity
                .field_text(field)
                .is_some_and(|value| value.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}
