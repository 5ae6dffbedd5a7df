//! Сглаживание береговой линии
//!
//! Каждая клетка океана, у которой среди 8 соседей есть суша, становится побережьем.
//! Номер тайла побережья берётся из таблицы правил по 8-битной маске соседей-суши
//! после достройки углов. Клетки за незамкнутым краем считаются океаном.

use crate::coords::Direction;
use crate::error::{MapGenError, Result};
use crate::rules::{GenerationRules, complete_corners};
use crate::terrain::TerrainGrid;
use rand::Rng;

use super::TileIds;

/// Маска соседей-суши клетки (бит 0 — север, далее по часовой стрелке), уже с достроенными углами
#[must_use]
pub fn land_mask(grid: &TerrainGrid, land: &[bool], x: usize, y: usize) -> u8 {
    let sys = grid.coordinate_system();
    let mut mask = 0u8;
    for dir in Direction::ALL {
        if let Some((nx, ny)) = sys.step(x, y, dir) {
            if land[sys.index(nx, ny)] {
                mask |= dir.neighbour_bit();
            }
        }
    }
    complete_corners(mask)
}

/// Превращает прибрежный океан в побережье. Возвращает число клеток побережья.
pub fn smooth_shore<R: Rng + ?Sized>(
    grid: &mut TerrainGrid,
    rules: &GenerationRules,
    ids: &TileIds,
    plane: usize,
    rng: &mut R,
) -> Result<usize> {
    let sys = *grid.coordinate_system();

    // Маски считаются по состоянию суши до прохода
    let mut land = vec![false; sys.area()];
    for (x, y) in sys.cells() {
        land[sys.index(x, y)] = grid.is_land(rules, plane, x, y)?;
    }

    let mut shore_count = 0;
    for (x, y) in sys.cells() {
        if grid.get(plane, x, y).tile_type != ids.ocean {
            continue;
        }
        let mask = land_mask(grid, &land, x, y);
        if mask == 0 {
            continue;
        }

        let numbers = rules.shore_tile_numbers(mask);
        let tile_number = match numbers.len() {
            0 => return Err(MapGenError::lookup("shore tile mask", format!("{mask:#010b}"))),
            1 => numbers[0],
            n => numbers[rng.gen_range(0..n)],
        };

        grid.set_tile_type(plane, x, y, &ids.shore);
        grid.get_mut(plane, x, y).shore_tile = Some(tile_number);
        shore_count += 1;
    }

    tracing::debug!(target: "mapgen::shore", plane, shore_count, "shore smoothed");
    Ok(shore_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CoordinateSystem;
    use crate::rules::ShoreTile;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup(wrap: bool) -> (TerrainGrid, GenerationRules, TileIds) {
        let rules = GenerationRules::standard().unwrap();
        let ids = TileIds::resolve(&rules).unwrap();
        let grid = TerrainGrid::new(CoordinateSystem::new(8, 6, 1, wrap, false), &ids.ocean);
        (grid, rules, ids)
    }

    #[test]
    fn test_shore_surrounds_single_land_tile() {
        let (mut grid, rules, ids) = setup(false);
        grid.set_tile_type(0, 3, 3, &ids.grass);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let count = smooth_shore(&mut grid, &rules, &ids, 0, &mut rng).unwrap();

        assert_eq!(count, 8);
        assert_eq!(grid.get(0, 2, 2).tile_type, ids.shore);
        assert!(grid.get(0, 2, 2).shore_tile.is_some());
        // Дальний океан не тронут
        assert_eq!(grid.get(0, 0, 0).tile_type, ids.ocean);
        assert!(grid.get(0, 0, 0).shore_tile.is_none());
        assert_eq!(grid.get(0, 3, 3).tile_type, ids.grass);
    }

    #[test]
    fn test_shore_wraps_across_left_right_edge() {
        let (mut grid, rules, ids) = setup(true);
        grid.set_tile_type(0, 0, 3, &ids.grass);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        smooth_shore(&mut grid, &rules, &ids, 0, &mut rng).unwrap();

        assert_eq!(grid.get(0, 7, 3).tile_type, ids.shore);
        let (_, _, cell) = grid.cells(0).find(|(x, y, _)| (*x, *y) == (7, 3)).unwrap();
        let expected = rules.shore_tile_numbers(Direction::East.neighbour_bit());
        assert!(expected.contains(&cell.shore_tile.unwrap()));
    }

    #[test]
    fn test_no_wrap_edge_counts_as_ocean() {
        let (mut grid, rules, ids) = setup(false);
        grid.set_tile_type(0, 0, 3, &ids.grass);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        smooth_shore(&mut grid, &rules, &ids, 0, &mut rng).unwrap();

        assert_eq!(grid.get(0, 7, 3).tile_type, ids.ocean);
        assert_eq!(grid.get(0, 1, 3).tile_type, ids.shore);
    }

    #[test]
    fn test_every_shore_tile_has_land_neighbour() {
        let (mut grid, rules, ids) = setup(true);
        for (x, y) in [(2, 2), (3, 2), (5, 4), (0, 1)] {
            grid.set_tile_type(0, x, y, &ids.grass);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        smooth_shore(&mut grid, &rules, &ids, 0, &mut rng).unwrap();

        let sys = *grid.coordinate_system();
        let land: Vec<bool> = grid
            .cells(0)
            .map(|(_, _, c)| c.tile_type == ids.grass)
            .collect();
        for (x, y, cell) in grid.cells(0) {
            if cell.tile_type == ids.shore {
                assert_ne!(land_mask(&grid, &land, x, y), 0, "shore at ({x}, {y})");
            }
        }
        assert_eq!(sys.area(), land.len());
    }

    #[test]
    fn test_unmapped_mask_is_lookup_error() {
        let (mut grid, mut rules, ids) = setup(false);
        rules.shore_tiles = vec![ShoreTile {
            tile_number: 1,
            mask: 0xFF,
        }];
        grid.set_tile_type(0, 3, 3, &ids.grass);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let err = smooth_shore(&mut grid, &rules, &ids, 0, &mut rng).unwrap_err();
        assert!(matches!(err, MapGenError::Lookup { .. }));
    }
}
