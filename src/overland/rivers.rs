//! Реки: от устья на побережье вглубь суши
//!
//! Устье выбирается среди клеток побережья, для которых таблица устьев даёт хотя бы один
//! вариант направлений, ведущих только на свободную траву. Дальше река растёт вглубь:
//! на каждой клетке случайно выбирается число ветвей (включая обязательное направление
//! назад, к устью) и одна из масок с таким числом бит. Все клетки, куда пойдёт река,
//! сразу помечаются как «занятые», чтобы соседние ветви их не переиспользовали.

use crate::coords::Direction;
use crate::error::{MapGenError, Result};
use crate::rules::GenerationRules;
use crate::terrain::TerrainGrid;
use rand::Rng;
use rand::seq::SliceRandom;

use super::TileIds;

/// Состояние одного прохода рек по плоскости
struct RiverCarver<'a> {
    grid: &'a mut TerrainGrid,
    ids: &'a TileIds,
    plane: usize,
    pending: Vec<bool>,
    max_tiles: usize,
}

impl RiverCarver<'_> {
    /// Ведёт ли направление на свободную траву
    fn leads_to_grass(&self, x: usize, y: usize, dir: Direction) -> bool {
        let sys = self.grid.coordinate_system();
        let Some((nx, ny)) = sys.step(x, y, dir) else {
            return false;
        };
        let cell = self.grid.get(self.plane, nx, ny);
        !self.pending[sys.index(nx, ny)]
            && cell.tile_type == self.ids.grass
            && cell.map_feature.is_none()
            && cell.river_directions.is_none()
    }

    fn set_is_valid(&self, x: usize, y: usize, set: u8) -> bool {
        set != 0 && Direction::from_river_mask(set).all(|d| self.leads_to_grass(x, y, d))
    }

    /// Помечает цели ветвей и возвращает их в порядке обхода
    fn claim(&mut self, x: usize, y: usize, mask: u8, skip: Option<Direction>) -> Vec<(usize, usize, Direction)> {
        let sys = *self.grid.coordinate_system();
        let mut targets = Vec::new();
        for dir in Direction::from_river_mask(mask) {
            if Some(dir) == skip {
                continue;
            }
            if let Some((nx, ny)) = sys.step(x, y, dir) {
                self.pending[sys.index(nx, ny)] = true;
                targets.push((nx, ny, dir.opposite()));
            }
        }
        targets
    }

    /// Прокладывает одну реку от устья. Возвращает число речных клеток (без устья).
    fn carve<R: Rng + ?Sized>(&mut self, mouth: (usize, usize), set: u8, rng: &mut R) -> Result<usize> {
        let (mx, my) = mouth;
        let cell = self.grid.get_mut(self.plane, mx, my);
        cell.tile_type.clone_from(&self.ids.river_mouth);
        cell.river_directions = Some(set);

        let mut stack = self.claim(mx, my, set, None);
        stack.reverse();
        let mut tiles = 0;

        while let Some((x, y, arrival)) = stack.pop() {
            tiles += 1;

            let valid: Vec<Direction> = Direction::CARDINAL
                .into_iter()
                .filter(|&d| d != arrival && self.leads_to_grass(x, y, d))
                .collect();
            let valid_bits: u8 = valid.iter().filter_map(|d| d.river_bit()).sum();
            let arrival_bit = arrival.river_bit().unwrap_or(0);

            let branches = if tiles >= self.max_tiles {
                1
            } else {
                rng.gen_range(1..=valid.len() + 1)
            };

            let candidates: Vec<u8> = (1..16u8)
                .filter(|&mask| {
                    mask.count_ones() as usize == branches
                        && mask & arrival_bit != 0
                        && mask & !arrival_bit & !valid_bits == 0
                })
                .collect();
            let Some(&chosen) = candidates.choose(rng) else {
                return Err(MapGenError::PlacementExhausted(format!(
                    "river at ({x}, {y}) on plane {} has no branch mask with {branches} directions",
                    self.plane
                )));
            };

            let cell = self.grid.get_mut(self.plane, x, y);
            cell.tile_type.clone_from(&self.ids.river);
            cell.river_directions = Some(chosen);

            let mut next = self.claim(x, y, chosen, Some(arrival));
            next.reverse();
            stack.extend(next);
        }

        Ok(tiles)
    }
}

/// Прокладывает до `river_count` рек на плоскости. Возвращает число проложенных рек.
pub fn make_rivers<R: Rng + ?Sized>(
    grid: &mut TerrainGrid,
    rules: &GenerationRules,
    ids: &TileIds,
    plane: usize,
    river_count: usize,
    max_tiles: usize,
    rng: &mut R,
) -> Result<usize> {
    let area = grid.coordinate_system().area();
    let mut carver = RiverCarver {
        grid,
        ids,
        plane,
        pending: vec![false; area],
        max_tiles: max_tiles.max(1),
    };

    for placed in 0..river_count {
        let mut starts: Vec<((usize, usize), Vec<u8>)> = Vec::new();
        for (x, y, cell) in carver.grid.cells(plane) {
            if cell.tile_type != ids.shore || cell.river_directions.is_some() {
                continue;
            }
            let Some(tile_number) = cell.shore_tile else {
                continue;
            };
            let sets: Vec<u8> = rules
                .river_mouth_sets(tile_number)
                .into_iter()
                .filter(|&set| carver.set_is_valid(x, y, set))
                .collect();
            if !sets.is_empty() {
                starts.push(((x, y), sets));
            }
        }

        let Some((mouth, sets)) = starts.choose(rng).cloned() else {
            tracing::warn!(
                target: "mapgen::rivers",
                plane,
                placed,
                requested = river_count,
                "no shore tile can start another river"
            );
            return Ok(placed);
        };
        let set = sets[rng.gen_range(0..sets.len())];
        let length = carver.carve(mouth, set, rng)?;

        tracing::debug!(
            target: "mapgen::rivers",
            plane,
            x = mouth.0,
            y = mouth.1,
            length,
            "river carved"
        );
    }

    Ok(river_count)
}
