//! Логова монстров
//!
//! Каждое логово ставится на случайную плоскость, на клетку, тип которой допускает логова
//! и на которой нет объекта, реки и ауры узла.

use crate::error::{MapGenError, Result};
use crate::rules::{FeatureKind, GenerationRules};
use crate::terrain::TerrainGrid;
use rand::Rng;
use rand::seq::SliceRandom;

/// Размещает `count` логов. `weak` помечает их как слабые (другие диапазоны силы и сокровищ).
/// Возвращает число размещённых логов.
pub fn place_lairs<R: Rng + ?Sized>(
    grid: &mut TerrainGrid,
    rules: &GenerationRules,
    count: usize,
    weak: bool,
    rng: &mut R,
) -> Result<usize> {
    if count == 0 {
        return Ok(0);
    }
    let lair_features = rules.features_of_kind(FeatureKind::Lair);
    if lair_features.is_empty() {
        return Err(MapGenError::lookup("map feature kind", "lair"));
    }

    let depth = grid.coordinate_system().depth;
    let mut placed = 0;

    for _ in 0..count {
        let plane = rng.gen_range(0..depth);

        let mut candidates = Vec::new();
        for (x, y, cell) in grid.cells(plane) {
            if cell.map_feature.is_some() || cell.river_directions.is_some() || cell.aura_owner.is_some() {
                continue;
            }
            if rules.tile_type(&cell.tile_type)?.supports_lairs {
                candidates.push((x, y));
            }
        }

        let Some(&(x, y)) = candidates.choose(rng) else {
            tracing::warn!(target: "mapgen::lairs", plane, weak, "no room for lair, skipping");
            continue;
        };
        let Some(feature) = lair_features.choose(rng) else {
            continue;
        };

        let cell = grid.get_mut(plane, x, y);
        cell.map_feature = Some(feature.id.clone());
        cell.power_proportion = Some(rng.gen_range(0.0..1.0));
        cell.weak_lair = Some(weak);
        placed += 1;
    }

    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CoordinateSystem;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_lairs_only_on_supporting_tiles() {
        let rules = GenerationRules::standard().unwrap();
        let mut grid = TerrainGrid::new(CoordinateSystem::new(10, 8, 2, true, false), "tundra");
        for x in 0..10 {
            grid.set_tile_type(0, x, 4, "forest");
            grid.set_tile_type(1, x, 4, "hills");
        }
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let placed = place_lairs(&mut grid, &rules, 6, true, &mut rng).unwrap();
        assert_eq!(placed, 6);

        let mut found = 0;
        for plane in 0..2 {
            for (_, y, cell) in grid.cells(plane) {
                let Some(feature) = &cell.map_feature else {
                    continue;
                };
                found += 1;
                assert_eq!(y, 4);
                assert_eq!(rules.map_feature(feature).unwrap().kind, FeatureKind::Lair);
                assert_eq!(cell.weak_lair, Some(true));
                let p = cell.power_proportion.unwrap();
                assert!((0.0..1.0).contains(&p));
            }
        }
        assert_eq!(found, 6);
    }

    #[test]
    fn test_lair_skipped_without_room() {
        let rules = GenerationRules::standard().unwrap();
        let mut grid = TerrainGrid::new(CoordinateSystem::new(4, 4, 1, false, false), "ocean");
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        assert_eq!(place_lairs(&mut grid, &rules, 3, false, &mut rng).unwrap(), 0);
    }
}
