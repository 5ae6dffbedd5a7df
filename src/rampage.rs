//! «Буйствующие» монстры
//!
//! После заданного хода из неочищенного логова, узла или башни может выйти отряд монстров.
//! Источник должен стоять на материке, где есть город не-рейдеров, а его гарнизон должен
//! целиком принадлежать одной сфере магии, которая порождает буйствующих монстров.
//! Отряд появляется на соседней свободной клетке суши и покупается на бюджет, растущий
//! с номером хода.

use crate::config::{GenerationParams, PlayerId};
use crate::coords::{Direction, MapCoords};
use crate::error::Result;
use crate::garrison::PlacedUnit;
use crate::rules::{FeatureKind, GenerationRules};
use crate::terrain::TerrainGrid;
use petgraph::unionfind::UnionFind;
use rand::Rng;
use rand::seq::SliceRandom;

/// Город во внешнем движке
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct City {
    pub location: MapCoords,
    pub owner: PlayerId,
}

/// Состояние мира на текущем ходу
#[derive(Debug, Clone, Copy)]
pub struct RampageContext<'a> {
    pub turn: u32,
    pub cities: &'a [City],
    /// Все юниты на карте, включая гарнизоны
    pub units: &'a [PlacedUnit],
}

/// Метки материков одной плоскости: клетки суши, связанные по 8 соседям (с учётом замыкания),
/// получают одинаковую метку. У клеток воды метка своя у каждой.
pub fn label_landmasses(grid: &TerrainGrid, rules: &GenerationRules, plane: usize) -> Result<Vec<usize>> {
    let sys = *grid.coordinate_system();
    let mut land = vec![false; sys.area()];
    for (x, y) in sys.cells() {
        land[sys.index(x, y)] = grid.is_land(rules, plane, x, y)?;
    }

    let mut sets = UnionFind::<usize>::new(sys.area());
    for (x, y) in sys.cells() {
        let idx = sys.index(x, y);
        if !land[idx] {
            continue;
        }
        for dir in Direction::ALL {
            if let Some((nx, ny)) = sys.step(x, y, dir) {
                let other = sys.index(nx, ny);
                if land[other] {
                    sets.union(idx, other);
                }
            }
        }
    }
    Ok(sets.into_labeling())
}

fn is_source(grid: &TerrainGrid, rules: &GenerationRules, coords: MapCoords) -> Result<bool> {
    if grid.is_node(rules, coords)? {
        return Ok(true);
    }
    match &grid.at(coords).map_feature {
        Some(id) => Ok(rules.map_feature(id)?.kind != FeatureKind::Resource),
        None => Ok(false),
    }
}

/// Сфера магии гарнизона, если он не пуст и весь из одной сферы
fn single_realm<'r>(
    rules: &'r GenerationRules,
    garrison: &[&PlacedUnit],
) -> Result<Option<&'r str>> {
    let mut realm: Option<&str> = None;
    for unit in garrison {
        let Some(unit_realm) = rules.unit(&unit.unit_id)?.realm.as_deref() else {
            return Ok(None);
        };
        match realm {
            Some(r) if r != unit_realm => return Ok(None),
            _ => realm = Some(unit_realm),
        }
    }
    Ok(realm)
}

/// Пытается выпустить отряд буйствующих монстров.
///
/// Возвращает `Ok(None)`, если ход ещё не наступил, подходящего источника нет
/// или рядом с ним нет свободной клетки.
pub fn spawn_rampaging_monsters<R: Rng + ?Sized>(
    grid: &TerrainGrid,
    rules: &GenerationRules,
    params: &GenerationParams,
    context: &RampageContext<'_>,
    rng: &mut R,
) -> Result<Option<Vec<PlacedUnit>>> {
    let settings = &params.rampaging;
    let players = params.players;
    if context.turn < settings.start_turn {
        return Ok(None);
    }
    let sys = *grid.coordinate_system();

    // === 1. Материки с городами не-рейдеров ===
    let mut labels = Vec::with_capacity(sys.depth);
    let mut marked = Vec::with_capacity(sys.depth);
    for plane in 0..sys.depth {
        let plane_labels = label_landmasses(grid, rules, plane)?;
        let mut plane_marked = vec![false; sys.area()];
        for city in context.cities {
            if city.owner != players.raiders && city.location.plane == plane {
                plane_marked[plane_labels[sys.index(city.location.x, city.location.y)]] = true;
            }
        }
        labels.push(plane_labels);
        marked.push(plane_marked);
    }

    // === 2. Источники ===
    let mut sources: Vec<(MapCoords, &str)> = Vec::new();
    for plane in 0..sys.depth {
        for (x, y) in sys.cells() {
            let coords = MapCoords::new(x, y, plane);
            if !marked[plane][labels[plane][sys.index(x, y)]] || !is_source(grid, rules, coords)? {
                continue;
            }
            let garrison: Vec<&PlacedUnit> = context
                .units
                .iter()
                .filter(|u| u.location == coords && u.owner == players.monsters)
                .collect();
            let Some(realm) = single_realm(rules, &garrison)? else {
                continue;
            };
            if rules.pick(realm)?.generates_rampaging_monsters {
                sources.push((coords, realm));
            }
        }
    }
    let Some(&(source, realm)) = sources.choose(rng) else {
        tracing::debug!(target: "mapgen::rampage", turn = context.turn, "no rampage source");
        return Ok(None);
    };

    // === 3. Бюджет ===
    let dice = rng.gen_range(1..=settings.dice_sides) + rng.gen_range(1..=settings.dice_sides);
    let mut budget = dice
        .saturating_mul(context.turn)
        .saturating_mul(settings.budget_per_turn)
        .min(settings.budget_max);

    // === 4. Свободная соседняя клетка суши ===
    let mut targets = Vec::new();
    for dir in Direction::ALL {
        let Some((nx, ny)) = sys.step(source.x, source.y, dir) else {
            continue;
        };
        let coords = MapCoords::new(nx, ny, source.plane);
        if grid.at(coords).map_feature.is_some()
            || !grid.is_land(rules, source.plane, nx, ny)?
            || context.units.iter().any(|u| u.location == coords)
            || context.cities.iter().any(|c| c.location == coords)
        {
            continue;
        }
        targets.push(coords);
    }
    let Some(&target) = targets.choose(rng) else {
        tracing::warn!(
            target: "mapgen::rampage",
            x = source.x,
            y = source.y,
            plane = source.plane,
            "rampage source has no free neighbour"
        );
        return Ok(None);
    };

    // === 5. Покупка отряда ===
    let mut band = Vec::new();
    while band.len() < params.garrison.units_per_cell {
        let affordable: Vec<_> = rules
            .units
            .iter()
            .filter(|u| u.realm.as_deref() == Some(realm) && u.cost > 0 && u.cost <= budget)
            .collect();
        let Some(unit) = affordable.choose(rng) else {
            break;
        };
        budget -= unit.cost;
        band.push(PlacedUnit {
            location: target,
            unit_id: unit.id.clone(),
            owner: players.monsters,
        });
    }

    if band.is_empty() {
        return Ok(None);
    }
    tracing::info!(
        target: "mapgen::rampage",
        turn = context.turn,
        realm,
        units = band.len(),
        x = target.x,
        y = target.y,
        plane = target.plane,
        "rampaging monsters spawned"
    );
    Ok(Some(band))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CoordinateSystem;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Scenario {
        grid: TerrainGrid,
        rules: GenerationRules,
        params: GenerationParams,
        cities: Vec<City>,
        units: Vec<PlacedUnit>,
    }

    /// Два острова: на левом город игрока и логово с гарнизоном, правый пустой
    fn scenario(realm_unit: &str) -> Scenario {
        let rules = GenerationRules::standard().unwrap();
        let params = GenerationParams::default();
        let mut grid = TerrainGrid::new(CoordinateSystem::new(12, 6, 1, false, false), "ocean");
        for y in 1..5 {
            for x in 1..5 {
                grid.set_tile_type(0, x, y, "grassland");
            }
            for x in 8..11 {
                grid.set_tile_type(0, x, y, "grassland");
            }
        }
        grid.get_mut(0, 2, 2).map_feature = Some("cave".to_string());

        let cities = vec![City {
            location: MapCoords::new(4, 4, 0),
            owner: 5,
        }];
        let units = vec![
            PlacedUnit {
                location: MapCoords::new(2, 2, 0),
                unit_id: realm_unit.to_string(),
                owner: params.players.monsters,
            };
            3
        ];
        Scenario {
            grid,
            rules,
            params,
            cities,
            units,
        }
    }

    fn spawn(s: &Scenario, turn: u32, seed: u64) -> Option<Vec<PlacedUnit>> {
        let context = RampageContext {
            turn,
            cities: &s.cities,
            units: &s.units,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        spawn_rampaging_monsters(&s.grid, &s.rules, &s.params, &context, &mut rng).unwrap()
    }

    #[test]
    fn test_landmasses_split_by_water() {
        let s = scenario("war_bears");
        let labels = label_landmasses(&s.grid, &s.rules, 0).unwrap();
        let sys = *s.grid.coordinate_system();

        assert_eq!(labels[sys.index(1, 1)], labels[sys.index(4, 4)]);
        assert_ne!(labels[sys.index(1, 1)], labels[sys.index(8, 1)]);
    }

    #[test]
    fn test_diagonal_land_is_connected() {
        let rules = GenerationRules::standard().unwrap();
        let mut grid = TerrainGrid::new(CoordinateSystem::new(4, 4, 1, true, false), "ocean");
        grid.set_tile_type(0, 0, 0, "grassland");
        grid.set_tile_type(0, 1, 1, "forest");
        grid.set_tile_type(0, 3, 1, "hills");

        let labels = label_landmasses(&grid, &rules, 0).unwrap();
        let sys = *grid.coordinate_system();
        assert_eq!(labels[sys.index(0, 0)], labels[sys.index(1, 1)]);
        // Через замкнутый край (3,1) соседствует с (0,0)
        assert_eq!(labels[sys.index(0, 0)], labels[sys.index(3, 1)]);
    }

    #[test]
    fn test_band_spawns_next_to_lair() {
        let s = scenario("war_bears");
        let band = spawn(&s, 80, 3).unwrap();

        let max = s.params.rampaging.budget_max;
        let spent: u32 = band.iter().map(|u| s.rules.unit(&u.unit_id).unwrap().cost).sum();
        assert!(spent <= max);
        assert!(band.len() <= s.params.garrison.units_per_cell);

        let target = band[0].location;
        assert!(band.iter().all(|u| u.location == target));
        let sys = *s.grid.coordinate_system();
        assert_eq!(sys.distance((target.x, target.y), (2, 2)), 1);
        for unit in &band {
            assert_eq!(s.rules.unit(&unit.unit_id).unwrap().realm.as_deref(), Some("nature"));
        }
    }

    #[test]
    fn test_nothing_before_start_turn() {
        let s = scenario("war_bears");
        assert!(spawn(&s, 10, 3).is_none());
    }

    #[test]
    fn test_life_garrison_never_rampages() {
        let s = scenario("guardian_spirit");
        assert!(spawn(&s, 80, 3).is_none());
    }

    #[test]
    fn test_raider_city_does_not_mark_landmass() {
        let mut s = scenario("war_bears");
        s.cities[0].owner = s.params.players.raiders;
        assert!(spawn(&s, 80, 3).is_none());
    }

    #[test]
    fn test_mixed_realm_garrison_is_ignored() {
        let mut s = scenario("war_bears");
        s.units[1].unit_id = "skeletons".to_string();
        assert!(spawn(&s, 80, 3).is_none());
    }
}
