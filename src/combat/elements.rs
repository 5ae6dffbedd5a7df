//! Таблица элементов боевой карты

use crate::error::{MapGenError, Result};
use crate::rules::{CombatElement, GenerationRules};

use super::{CombatContext, CombatGrid};

/// Выполняются ли все заданные условия элемента для клетки мира
#[must_use]
pub fn element_matches(element: &CombatElement, context: &CombatContext) -> bool {
    if let Some(tile_type) = &element.tile_type_id {
        if *tile_type != context.tile_type {
            return false;
        }
    }
    if let Some(feature) = &element.map_feature_id {
        if context.map_feature.as_ref() != Some(feature) {
            return false;
        }
    }
    if element.min_population.is_some_and(|min| context.population < min) {
        return false;
    }
    if element.max_population.is_some_and(|max| context.population > max) {
        return false;
    }
    if let Some(building) = &element.building_id {
        if !context.buildings.contains(building) {
            return false;
        }
    }
    if let Some(spell) = &element.spell_id {
        if !context.spells.contains(spell) {
            return false;
        }
    }
    true
}

/// Ставит подходящие элементы на сетку. При `borders_only` ставятся только рамки.
/// Возвращает число сработавших элементов.
pub fn apply_elements(
    grid: &mut CombatGrid,
    context: &CombatContext,
    rules: &GenerationRules,
    borders_only: bool,
) -> Result<usize> {
    let sys = *grid.coordinate_system();
    let mut applied = 0;

    for element in &rules.combat.elements {
        if !element_matches(element, context) {
            continue;
        }
        if element.x >= sys.width || element.y >= sys.height {
            return Err(MapGenError::Configuration(format!(
                "combat element at ({}, {}) lies outside the {}x{} combat map",
                element.x, element.y, sys.width, sys.height
            )));
        }

        let tile = grid.get_mut(element.x, element.y);
        let mut stamped = false;
        if !borders_only {
            if let (Some(layer), Some(tile_type)) = (element.layer, &element.combat_tile_type_id) {
                tile.set_layer(layer, tile_type);
                stamped = true;
            }
        }
        if let Some(border) = &element.border_id {
            if !tile.border_ids.contains(border) {
                tile.border_ids.push(border.clone());
            }
            tile.border_directions |= element.border_directions;
            stamped = true;
        }
        if stamped {
            applied += 1;
        }
    }

    Ok(applied)
}
