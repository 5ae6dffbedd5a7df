//! Размещение областей: «самые высокие N клеток» и растущие «пятна»
//!
//! Высоты задают сушу, горы и холмы; полярные строки превращаются в тундру;
//! леса, пустыни и болота растут случайными пятнами из травы.

use crate::coords::Direction;
use crate::heightmap::Heightmap;
use crate::terrain::TerrainGrid;
use rand::Rng;
use rand::seq::SliceRandom;

/// Превращает клетки типа `from` среди `desired` самых высоких в `to`.
/// Возвращает число изменённых клеток.
pub fn set_highest_tiles_of(
    grid: &mut TerrainGrid,
    heightmap: &Heightmap,
    plane: usize,
    desired: u64,
    from: &str,
    to: &str,
) -> u64 {
    let mut changed = 0;
    heightmap.set_highest_tiles(desired, |x, y| {
        if grid.get(plane, x, y).tile_type == from {
            grid.set_tile_type(plane, x, y, to);
            changed += 1;
        }
    });
    changed
}

/// Полярная тундра: клетка на расстоянии `d` строк от верхнего или нижнего края
/// превращается в тундру с вероятностью `(rows - d) / rows`.
/// Меняются только клетки типов из `from`.
pub fn make_tundra<R: Rng + ?Sized>(
    grid: &mut TerrainGrid,
    plane: usize,
    rows: usize,
    from: &[&str],
    tundra: &str,
    rng: &mut R,
) -> usize {
    if rows == 0 {
        return 0;
    }
    let sys = *grid.coordinate_system();
    let mut changed = 0;

    for (x, y) in sys.cells() {
        let distance = y.min(sys.height - 1 - y);
        if distance >= rows || !from.contains(&grid.get(plane, x, y).tile_type.as_str()) {
            continue;
        }
        if rng.gen_range(0..rows) >= distance {
            grid.set_tile_type(plane, x, y, tundra);
            changed += 1;
        }
    }
    changed
}

/// Выращивает одно пятно типа `to` на месте клеток типа `from`.
///
/// Стартовая клетка выбирается равномерно среди подходящих, размер равен
/// `average_size` ±50%. На каждом шаге пятно расширяется в случайную клетку
/// своей 4-связной границы. Возвращает число изменённых клеток.
pub fn grow_blob<R: Rng + ?Sized>(
    grid: &mut TerrainGrid,
    plane: usize,
    from: &str,
    to: &str,
    average_size: usize,
    rng: &mut R,
) -> usize {
    let sys = *grid.coordinate_system();
    let starts: Vec<(usize, usize)> = grid
        .cells(plane)
        .filter(|(_, _, c)| c.tile_type == from)
        .map(|(x, y, _)| (x, y))
        .collect();
    let Some(&start) = starts.choose(rng) else {
        return 0;
    };

    let average = average_size.max(1);
    let target = rng.gen_range(average / 2..=average * 3 / 2).max(1);

    let mut in_ring = vec![false; sys.area()];
    let mut ring: Vec<(usize, usize)> = Vec::new();
    let mut current = start;
    let mut changed = 0;

    loop {
        grid.set_tile_type(plane, current.0, current.1, to);
        changed += 1;
        if changed >= target {
            break;
        }

        for &dir in &Direction::CARDINAL {
            if let Some((nx, ny)) = sys.step(current.0, current.1, dir) {
                let idx = sys.index(nx, ny);
                if !in_ring[idx] && grid.get(plane, nx, ny).tile_type == from {
                    in_ring[idx] = true;
                    ring.push((nx, ny));
                }
            }
        }

        if ring.is_empty() {
            break;
        }
        let pick = rng.gen_range(0..ring.len());
        current = ring.swap_remove(pick);
    }

    changed
}

/// Растит пятна, пока суммарно не будет изменено `desired` клеток
/// или пока подходящие клетки не закончатся
pub fn place_blobs<R: Rng + ?Sized>(
    grid: &mut TerrainGrid,
    plane: usize,
    from: &str,
    to: &str,
    desired: usize,
    average_size: usize,
    rng: &mut R,
) -> usize {
    let mut total = 0;
    while total < desired {
        let grown = grow_blob(grid, plane, from, to, average_size, rng);
        if grown == 0 {
            break;
        }
        total += grown;
    }
    total
}
