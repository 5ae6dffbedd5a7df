//! Узлы магии и их ауры
//!
//! Аура занимает клетки концентрическими кольцами вокруг узла: кольцо 0 — сам узел,
//! кольцо `r` — `8r` клеток периметра квадрата со стороной `2r + 1`. С каждого кольца
//! берётся столько клеток, сколько нужно, но не больше его длины. Если на кольце не хватает
//! свободных клеток (без чужой ауры), аура не помещается.

use crate::config::PlaneSettings;
use crate::coords::{CoordinateSystem, MapCoords};
use crate::error::{MapGenError, Result};
use crate::rules::GenerationRules;
use crate::terrain::TerrainGrid;
use rand::Rng;
use rand::seq::SliceRandom;
use rand::seq::index;

use super::TileIds;

/// Клетки кольца `radius` вокруг `(x, y)`: от левого верхнего угла по часовой стрелке.
/// Клетки за незамкнутым краем пропускаются.
#[must_use]
pub fn ring_cells(sys: &CoordinateSystem, x: usize, y: usize, radius: usize) -> Vec<(usize, usize)> {
    if radius == 0 {
        return vec![(x, y)];
    }

    let r = radius as i64;
    let mut cells = Vec::with_capacity(8 * radius);
    let (mut dx, mut dy) = (-r, -r);
    for (sx, sy) in [(1, 0), (0, 1), (-1, 0), (0, -1)] {
        for _ in 0..2 * radius {
            if let Some(cell) = sys.offset(x, y, dx, dy) {
                // На узкой замкнутой карте кольцо может налезть само на себя
                if !cells.contains(&cell) {
                    cells.push(cell);
                }
            }
            dx += sx;
            dy += sy;
        }
    }
    cells
}

fn ring_capacity(radius: usize) -> usize {
    if radius == 0 { 1 } else { 8 * radius }
}

/// Поместится ли аура размера `size` с центром в `(x, y)`
#[must_use]
pub fn aura_fits(grid: &TerrainGrid, plane: usize, x: usize, y: usize, size: usize) -> bool {
    let sys = grid.coordinate_system();
    let mut remaining = size;
    let mut radius = 0;

    while remaining > 0 {
        let needed = remaining.min(ring_capacity(radius));
        let free = ring_cells(sys, x, y, radius)
            .into_iter()
            .filter(|&(cx, cy)| grid.get(plane, cx, cy).aura_owner.is_none())
            .count();
        if free < needed {
            return false;
        }
        remaining -= needed;
        radius += 1;
    }
    true
}

/// Занимает ауру: на каждом кольце случайно выбирает нужное число свободных клеток
/// и ставит на них ссылку на узел. Возвращает число занятых клеток.
pub fn apply_aura<R: Rng + ?Sized>(
    grid: &mut TerrainGrid,
    plane: usize,
    x: usize,
    y: usize,
    size: usize,
    rng: &mut R,
) -> usize {
    let sys = *grid.coordinate_system();
    let owner = MapCoords::new(x, y, plane);
    let mut remaining = size;
    let mut radius = 0;
    let mut claimed = 0;

    while remaining > 0 {
        let free: Vec<(usize, usize)> = ring_cells(&sys, x, y, radius)
            .into_iter()
            .filter(|&(cx, cy)| grid.get(plane, cx, cy).aura_owner.is_none())
            .collect();
        let needed = remaining.min(ring_capacity(radius)).min(free.len());
        if needed == 0 {
            break;
        }

        for i in index::sample(rng, free.len(), needed) {
            let (cx, cy) = free[i];
            grid.get_mut(plane, cx, cy).aura_owner = Some(owner);
        }
        claimed += needed;
        remaining -= needed;
        radius += 1;
    }
    claimed
}

/// Размер ауры по доле `proportion` (0..1) между минимумом и максимумом плоскости
#[must_use]
pub fn aura_size(settings: &PlaneSettings, proportion: f64) -> usize {
    let span = settings.aura_max.saturating_sub(settings.aura_min) + 1;
    (settings.aura_min + (proportion * span as f64) as usize).min(settings.aura_max)
}

/// Размещает узлы на плоскости. Узел, для которого не нашлось места, пропускается.
/// Возвращает число размещённых узлов.
pub fn place_nodes<R: Rng + ?Sized>(
    grid: &mut TerrainGrid,
    rules: &GenerationRules,
    ids: &TileIds,
    plane: usize,
    settings: &PlaneSettings,
    rng: &mut R,
) -> Result<usize> {
    let node_types = rules.node_tile_types();
    let mut placed = 0;

    for attempt in 0..settings.node_count {
        let proportion = rng.gen_range(0.0..1.0);
        let size = aura_size(settings, proportion);

        let view: &TerrainGrid = grid;
        let candidates: Vec<(usize, usize)> = view
            .cells(plane)
            .filter(|(_, _, c)| {
                c.tile_type == ids.grass
                    && c.aura_owner.is_none()
                    && c.river_directions.is_none()
                    && c.map_feature.is_none()
            })
            .map(|(x, y, _)| (x, y))
            .filter(|&(x, y)| aura_fits(view, plane, x, y, size))
            .collect();

        let Some(&(x, y)) = candidates.choose(rng) else {
            tracing::warn!(
                target: "mapgen::nodes",
                plane,
                attempt,
                size,
                "no room for node aura, skipping node"
            );
            continue;
        };
        let tile = node_types
            .choose(rng)
            .ok_or_else(|| MapGenError::lookup("tile role", "Node"))?;

        grid.set_tile_type(plane, x, y, &tile.id);
        grid.get_mut(plane, x, y).power_proportion = Some(proportion);
        let claimed = apply_aura(grid, plane, x, y, size, rng);
        placed += 1;

        tracing::debug!(
            target: "mapgen::nodes",
            plane,
            x,
            y,
            node = %tile.id,
            aura = claimed,
            "node placed"
        );
    }

    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrengthRange;
    use crate::rules::TileRole;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn plane_settings(node_count: usize, aura_min: usize, aura_max: usize) -> PlaneSettings {
        PlaneSettings {
            name: "Arcanus".to_string(),
            node_count,
            aura_min,
            aura_max,
            feature_chance: 10,
            node_monsters: StrengthRange::new(100, 200),
            node_treasure: StrengthRange::new(50, 60),
        }
    }

    #[test]
    fn test_ring_sizes() {
        let sys = CoordinateSystem::new(20, 20, 1, false, false);
        assert_eq!(ring_cells(&sys, 10, 10, 0), vec![(10, 10)]);
        assert_eq!(ring_cells(&sys, 10, 10, 1).len(), 8);
        assert_eq!(ring_cells(&sys, 10, 10, 3).len(), 24);
        // Угол незамкнутой карты: от кольца 1 остаются 3 клетки
        assert_eq!(ring_cells(&sys, 0, 0, 1).len(), 3);
    }

    #[test]
    fn test_ring_wraps_horizontally() {
        let sys = CoordinateSystem::new(20, 20, 1, true, false);
        let ring = ring_cells(&sys, 0, 5, 1);
        assert_eq!(ring.len(), 8);
        assert!(ring.contains(&(19, 4)));
        assert_eq!(ring[0], (19, 4));
    }

    #[test]
    fn test_fits_respects_claimed_cells() {
        let sys = CoordinateSystem::new(10, 10, 1, false, false);
        let mut grid = TerrainGrid::new(sys, "grassland");
        let other = MapCoords::new(9, 9, 0);
        for (x, y) in ring_cells(&sys, 5, 5, 1).into_iter().take(6) {
            grid.get_mut(0, x, y).aura_owner = Some(other);
        }

        assert!(aura_fits(&grid, 0, 5, 5, 3));
        assert!(!aura_fits(&grid, 0, 5, 5, 4));
        // Кольцо 1 заполнено не полностью, поэтому большая аура тоже не помещается
        assert!(!aura_fits(&grid, 0, 5, 5, 12));
        assert!(aura_fits(&grid, 0, 2, 2, 12));
    }

    #[test]
    fn test_apply_claims_exact_size() {
        let sys = CoordinateSystem::new(12, 12, 1, false, false);
        let mut grid = TerrainGrid::new(sys, "grassland");
        let mut rng = ChaCha8Rng::seed_from_u64(6);

        let claimed = apply_aura(&mut grid, 0, 6, 6, 13, &mut rng);

        let owner = MapCoords::new(6, 6, 0);
        let owned = grid.cells(0).filter(|(_, _, c)| c.aura_owner == Some(owner)).count();
        assert_eq!(claimed, 13);
        assert_eq!(owned, 13);
        assert_eq!(grid.get(0, 6, 6).aura_owner, Some(owner));
        // Кольцо 1 занято целиком, из кольца 2 взято 4 клетки
        assert!(ring_cells(&sys, 6, 6, 1).iter().all(|&(x, y)| grid.get(0, x, y).aura_owner.is_some()));
        assert!(grid.get(0, 6, 9).aura_owner.is_none());
    }

    #[test]
    fn test_aura_size_bounds() {
        let settings = plane_settings(1, 5, 10);
        assert_eq!(aura_size(&settings, 0.0), 5);
        assert_eq!(aura_size(&settings, 0.5), 8);
        assert_eq!(aura_size(&settings, 0.999), 10);
    }

    #[test]
    fn test_nodes_placed_with_auras_pointing_back() {
        let rules = GenerationRules::standard().unwrap();
        let ids = TileIds::resolve(&rules).unwrap();
        let mut grid = TerrainGrid::new(CoordinateSystem::new(24, 16, 1, true, false), &ids.grass);
        let mut rng = ChaCha8Rng::seed_from_u64(12);

        let placed = place_nodes(&mut grid, &rules, &ids, 0, &plane_settings(4, 5, 10), &mut rng).unwrap();
        assert_eq!(placed, 4);

        let mut aura_cells = 0;
        for (_, _, cell) in grid.cells(0) {
            if let Some(owner) = cell.aura_owner {
                aura_cells += 1;
                let node = rules.tile_type(&grid.at(owner).tile_type).unwrap();
                assert_eq!(node.role, TileRole::Node);
            }
        }
        for (x, y, cell) in grid.cells(0) {
            if rules.tile_type(&cell.tile_type).unwrap().role != TileRole::Node {
                continue;
            }
            let p = cell.power_proportion.unwrap();
            let expected = aura_size(&plane_settings(4, 5, 10), p);
            let owner = MapCoords::new(x, y, 0);
            let owned = grid.cells(0).filter(|(_, _, c)| c.aura_owner == Some(owner)).count();
            assert_eq!(owned, expected);
        }
        assert!(aura_cells >= 4 * 5);
    }

    #[test]
    fn test_node_skipped_when_nothing_fits() {
        let rules = GenerationRules::standard().unwrap();
        let ids = TileIds::resolve(&rules).unwrap();
        let mut grid = TerrainGrid::new(CoordinateSystem::new(3, 3, 1, false, false), &ids.grass);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let placed = place_nodes(&mut grid, &rules, &ids, 0, &plane_settings(2, 20, 20), &mut rng).unwrap();

        assert_eq!(placed, 0);
        assert_eq!(grid.count_tile_type(0, &ids.grass), 9);
    }
}
