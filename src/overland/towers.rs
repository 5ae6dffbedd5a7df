//! Башни волшебства
//!
//! Башня стоит в одной и той же точке на всех плоскостях, поэтому клетка должна подходить
//! на каждой из них: суша, не тундра, не узел, без объекта, реки и ауры. Между башнями
//! выдерживается минимальное расстояние; если места нет, расстояние уменьшается на 1.

use crate::coords::MapCoords;
use crate::error::{MapGenError, Result};
use crate::rules::{GenerationRules, TileRole};
use crate::terrain::TerrainGrid;
use rand::Rng;
use rand::seq::SliceRandom;

/// Подходит ли точка под башню на всех плоскостях (без учёта расстояния)
fn is_tower_site(grid: &TerrainGrid, rules: &GenerationRules, x: usize, y: usize) -> Result<bool> {
    for plane in 0..grid.coordinate_system().depth {
        let cell = grid.get(plane, x, y);
        if cell.map_feature.is_some() || cell.river_directions.is_some() || cell.aura_owner.is_some() {
            return Ok(false);
        }
        let tile = rules.tile_type(&cell.tile_type)?;
        if !tile.is_land || matches!(tile.role, TileRole::Tundra | TileRole::Node) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Размещает `count` башен. Возвращает их координаты (x, y).
///
/// Если при нулевом расстоянии места всё равно нет, генерация прерывается
/// с [`MapGenError::PlacementExhausted`].
pub fn place_towers<R: Rng + ?Sized>(
    grid: &mut TerrainGrid,
    rules: &GenerationRules,
    count: usize,
    separation: usize,
    rng: &mut R,
) -> Result<Vec<(usize, usize)>> {
    let sys = *grid.coordinate_system();
    let tower = rules.tower_feature()?.id.clone();
    let mut separation = separation;
    let mut towers: Vec<(usize, usize)> = Vec::with_capacity(count);

    while towers.len() < count {
        let mut candidates = Vec::new();
        for (x, y) in sys.cells() {
            if towers.iter().any(|&t| sys.distance(t, (x, y)) < separation) {
                continue;
            }
            if is_tower_site(grid, rules, x, y)? {
                candidates.push((x, y));
            }
        }

        let Some(&(x, y)) = candidates.choose(rng) else {
            if separation == 0 {
                return Err(MapGenError::PlacementExhausted(format!(
                    "no room for tower {} of {count} even without separation",
                    towers.len() + 1
                )));
            }
            separation -= 1;
            tracing::debug!(target: "mapgen::towers", separation, "reducing tower separation");
            continue;
        };

        for plane in 0..sys.depth {
            grid.at_mut(MapCoords::new(x, y, plane)).map_feature = Some(tower.clone());
        }
        grid.get_mut(0, x, y).power_proportion = Some(rng.gen_range(0.0..1.0));
        towers.push((x, y));

        tracing::debug!(target: "mapgen::towers", x, y, separation, "tower placed");
    }

    Ok(towers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CoordinateSystem;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn two_planes(width: usize, height: usize) -> TerrainGrid {
        TerrainGrid::new(CoordinateSystem::new(width, height, 2, true, false), "grassland")
    }

    #[test]
    fn test_towers_linked_across_planes() {
        let rules = GenerationRules::standard().unwrap();
        let mut grid = two_planes(20, 12);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let towers = place_towers(&mut grid, &rules, 3, 5, &mut rng).unwrap();

        assert_eq!(towers.len(), 3);
        for &(x, y) in &towers {
            assert_eq!(grid.get(0, x, y).map_feature.as_deref(), Some("tower_of_wizardry"));
            assert_eq!(grid.get(1, x, y).map_feature.as_deref(), Some("tower_of_wizardry"));
            assert!(grid.get(0, x, y).power_proportion.is_some());
            assert!(grid.get(1, x, y).power_proportion.is_none());
        }
        let sys = *grid.coordinate_system();
        for (i, &a) in towers.iter().enumerate() {
            for &b in &towers[i + 1..] {
                assert!(sys.distance(a, b) >= 5);
            }
        }
    }

    #[test]
    fn test_tundra_on_either_plane_excluded() {
        let rules = GenerationRules::standard().unwrap();
        let mut grid = two_planes(6, 4);
        for (x, y) in grid.coordinate_system().cells() {
            if (x, y) != (2, 1) {
                grid.set_tile_type(1, x, y, "tundra");
            }
        }
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let towers = place_towers(&mut grid, &rules, 1, 3, &mut rng).unwrap();
        assert_eq!(towers, vec![(2, 1)]);
    }

    #[test]
    fn test_separation_shrinks_until_towers_fit() {
        let rules = GenerationRules::standard().unwrap();
        let mut grid = two_planes(4, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let towers = place_towers(&mut grid, &rules, 5, 10, &mut rng).unwrap();
        assert_eq!(towers.len(), 5);
    }

    #[test]
    fn test_exhaustion_is_fatal() {
        let rules = GenerationRules::standard().unwrap();
        let mut grid = TerrainGrid::new(CoordinateSystem::new(3, 3, 2, false, false), "ocean");
        grid.set_tile_type(0, 1, 1, "grassland");
        grid.set_tile_type(1, 1, 1, "grassland");
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let err = place_towers(&mut grid, &rules, 2, 2, &mut rng).unwrap_err();
        assert!(matches!(err, MapGenError::PlacementExhausted(_)));
    }
}
