//! Гарнизоны башен, узлов и логов
//!
//! Сила гарнизона интерполируется между минимумом и максимумом по доле силы клетки.
//! Сначала покупается «основной» монстр (самый дорогой из доступных на часть бюджета),
//! затем на остаток — «второстепенный», пока не заполнен предел юнитов на клетку.

use crate::config::{GenerationParams, PlayerId, StrengthRange};
use crate::coords::MapCoords;
use crate::error::{MapGenError, Result};
use crate::rules::{FeatureKind, GenerationRules, MapFeature, RealmChance, TileRole, UnitDef};
use crate::terrain::TerrainGrid;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::Serialize;

/// Юнит, который генератор передаёт внешнему движку
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedUnit {
    pub location: MapCoords,
    pub unit_id: String,
    pub owner: PlayerId,
}

/// Самый дорогой юнит сферы `realm` стоимостью не больше `budget`.
/// При равной стоимости побеждает тот, что раньше в каталоге.
#[must_use]
pub fn pick_most_expensive<'r>(
    rules: &'r GenerationRules,
    realm: &str,
    budget: u32,
) -> Option<&'r UnitDef> {
    let mut best: Option<&UnitDef> = None;
    for unit in &rules.units {
        if unit.realm.as_deref() != Some(realm) || unit.cost == 0 || unit.cost > budget {
            continue;
        }
        if best.is_none_or(|b| unit.cost > b.cost) {
            best = Some(unit);
        }
    }
    best
}

/// Запрос на заполнение одной клетки
#[derive(Debug, Clone, Copy)]
pub struct StockRequest<'a> {
    pub location: MapCoords,
    pub realm: &'a str,
    pub strength: StrengthRange,
    pub proportion: f64,
    pub units_per_cell: usize,
    pub owner: PlayerId,
}

fn push_units(units: &mut Vec<PlacedUnit>, request: &StockRequest<'_>, unit: &UnitDef, count: usize) {
    units.extend((0..count).map(|_| PlacedUnit {
        location: request.location,
        unit_id: unit.id.clone(),
        owner: request.owner,
    }));
}

/// Заполняет клетку монстрами. Потраченная сила никогда не превышает интерполированную,
/// а число юнитов не превышает `units_per_cell`.
pub fn stock_location<R: Rng + ?Sized>(
    rules: &GenerationRules,
    request: &StockRequest<'_>,
    rng: &mut R,
) -> Vec<PlacedUnit> {
    let cap = request.units_per_cell;
    let mut remaining = request.strength.interpolate(request.proportion);
    let mut units = Vec::new();
    if cap == 0 {
        return units;
    }

    let main_budget = remaining / rng.gen_range(1..=4);
    if let Some(main) = pick_most_expensive(rules, request.realm, main_budget) {
        let mut count = ((remaining / main.cost) as usize).min(cap - 1);
        if count > 1 && rng.gen_bool(0.5) {
            count -= 1;
        }
        push_units(&mut units, request, main, count);
        remaining -= main.cost * count as u32;
    }

    let slots = cap - units.len();
    if slots > 0 {
        let secondary_budget = remaining / rng.gen_range(1..=slots) as u32;
        if let Some(secondary) = pick_most_expensive(rules, request.realm, secondary_budget) {
            let count = ((remaining / secondary.cost) as usize).min(slots);
            push_units(&mut units, request, secondary, count);
        }
    }

    units
}

/// Сфера магии гарнизона логова или башни по весам объекта карты
pub fn pick_realm<'r, R: Rng + ?Sized>(chances: &'r [RealmChance], rng: &mut R) -> Result<&'r str> {
    let weights = WeightedIndex::new(chances.iter().map(|c| c.chance))
        .map_err(|e| MapGenError::Configuration(format!("invalid realm chances: {e}")))?;
    Ok(&chances[weights.sample(rng)].realm_id)
}

/// Что стоит на клетке с гарнизоном
enum Site<'a> {
    Tower,
    Node { realm: &'a str },
    Lair { weak: bool },
}

/// Заполняет гарнизоны всех башен, узлов и логов и назначает сокровища.
/// Обход: плоскость, строка, столбец. Башня заполняется один раз, на плоскости,
/// где у неё есть доля силы.
pub fn stock_all<R: Rng + ?Sized>(
    grid: &mut TerrainGrid,
    rules: &GenerationRules,
    params: &GenerationParams,
    rng: &mut R,
) -> Result<Vec<PlacedUnit>> {
    let sys = *grid.coordinate_system();
    let garrison = &params.garrison;
    let mut units = Vec::new();

    for (plane, plane_settings) in params.planes.iter().enumerate().take(sys.depth) {
        for (x, y) in sys.cells() {
            let cell = grid.get(plane, x, y);
            let Some(proportion) = cell.power_proportion else {
                continue;
            };

            let tile = rules.tile_type(&cell.tile_type)?;
            let feature = match &cell.map_feature {
                Some(id) => Some(rules.map_feature(id)?),
                None => None,
            };
            let site = match (tile.role, feature) {
                (_, Some(f)) if f.kind == FeatureKind::Tower => Site::Tower,
                (_, Some(f)) if f.kind == FeatureKind::Lair => Site::Lair {
                    weak: cell.weak_lair.unwrap_or(false),
                },
                (TileRole::Node, _) => Site::Node {
                    realm: tile.magic_realm.as_deref().ok_or_else(|| {
                        MapGenError::Configuration(format!("node tile {} has no magic realm", tile.id))
                    })?,
                },
                _ => continue,
            };

            let (realm, strength, treasure) = match site {
                Site::Tower => (
                    pick_realm(feature_chances(feature), rng)?,
                    garrison.tower_monsters,
                    garrison.tower_treasure,
                ),
                Site::Lair { weak: true } => (
                    pick_realm(feature_chances(feature), rng)?,
                    garrison.weak_lair_monsters,
                    garrison.weak_lair_treasure,
                ),
                Site::Lair { weak: false } => (
                    pick_realm(feature_chances(feature), rng)?,
                    garrison.normal_lair_monsters,
                    garrison.normal_lair_treasure,
                ),
                Site::Node { realm } => (
                    realm,
                    plane_settings.node_monsters,
                    plane_settings.node_treasure,
                ),
            };

            let request = StockRequest {
                location: MapCoords::new(x, y, plane),
                realm,
                strength,
                proportion,
                units_per_cell: garrison.units_per_cell,
                owner: params.players.monsters,
            };
            let stocked = stock_location(rules, &request, rng);
            tracing::debug!(
                target: "mapgen::garrison",
                plane,
                x,
                y,
                realm,
                units = stocked.len(),
                "location stocked"
            );
            units.extend(stocked);
            grid.get_mut(plane, x, y).treasure_value = Some(treasure.interpolate(proportion));
        }
    }

    Ok(units)
}

fn feature_chances(feature: Option<&MapFeature>) -> &[RealmChance] {
    match feature {
        Some(f) => &f.realm_chances,
        None => &[],
    }
}
