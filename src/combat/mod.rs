//! Боевая карта одной клетки мира
//!
//! Рельеф строится тем же плазменным фракталом, что и мировая карта: самые высокие клетки
//! становятся грядами, самые низкие — тёмной землёй, в количествах из профиля типа тайла.
//! Затем случайно расставляются деревья и камни, и наконец таблица элементов
//! ставит дома, дороги, крепость и рамки стен в фиксированные клетки.

pub mod elements;

use crate::config::CombatSettings;
use crate::coords::CoordinateSystem;
use crate::error::Result;
use crate::heightmap::generate_heightmap;
use crate::rules::{CombatLayer, GenerationRules};
use rand::Rng;
use rand::seq::SliceRandom;
use rand::seq::index;
use serde::Serialize;

pub use elements::{apply_elements, element_matches};

/// Клетка боевой карты
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombatTile {
    pub terrain: Option<String>,
    /// Постройки и объекты рельефа (деревья, камни)
    pub building: Option<String>,
    pub road: Option<String>,

    /// Клетка за пределами области, по которой можно ходить
    pub off_map_edge: bool,

    pub border_ids: Vec<String>,
    pub border_directions: u8,
}

impl CombatTile {
    #[must_use]
    pub fn layer(&self, layer: CombatLayer) -> Option<&str> {
        match layer {
            CombatLayer::Terrain => self.terrain.as_deref(),
            CombatLayer::Building => self.building.as_deref(),
            CombatLayer::Road => self.road.as_deref(),
        }
    }

    pub fn set_layer(&mut self, layer: CombatLayer, tile_type: &str) {
        let slot = match layer {
            CombatLayer::Terrain => &mut self.terrain,
            CombatLayer::Building => &mut self.building,
            CombatLayer::Road => &mut self.road,
        };
        *slot = Some(tile_type.to_string());
    }
}

/// Сетка боевой карты
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatGrid {
    sys: CoordinateSystem,
    tiles: Vec<CombatTile>,
}

impl CombatGrid {
    /// Пустая сетка с флагами края и тайлом местности `default_tile`
    #[must_use]
    pub fn new(sys: CoordinateSystem, default_tile: &str) -> Self {
        let tiles = sys
            .cells()
            .map(|(x, y)| CombatTile {
                terrain: Some(default_tile.to_string()),
                off_map_edge: is_off_map(&sys, x, y),
                ..CombatTile::default()
            })
            .collect();
        Self { sys, tiles }
    }

    #[must_use]
    pub fn coordinate_system(&self) -> &CoordinateSystem {
        &self.sys
    }

    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> &CombatTile {
        &self.tiles[self.sys.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut CombatTile {
        let idx = self.sys.index(x, y);
        &mut self.tiles[idx]
    }

    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize, &CombatTile)> {
        let width = self.sys.width;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, t)| (i % width, i / width, t))
    }
}

/// Клетка лежит за краем области боя: две верхние и две нижние строки
/// и последний столбец нечётных строк (строки сдвинуты, как на изометрической сетке)
#[must_use]
pub fn is_off_map(sys: &CoordinateSystem, x: usize, y: usize) -> bool {
    y <= 1 || y + 2 >= sys.height || (y % 2 == 1 && x + 1 == sys.width)
}

/// Что находится на клетке мира, для которой строится бой
#[derive(Debug, Clone, Default)]
pub struct CombatContext {
    pub tile_type: String,
    pub map_feature: Option<String>,
    pub buildings: Vec<String>,
    pub spells: Vec<String>,
    pub population: u32,
}

/// Строит боевую карту для клетки мира
pub fn generate_combat_map<R: Rng + ?Sized>(
    context: &CombatContext,
    rules: &GenerationRules,
    settings: &CombatSettings,
    rng: &mut R,
) -> Result<CombatGrid> {
    rules.validate_combat()?;
    rules.tile_type(&context.tile_type)?;
    if let Some(feature) = &context.map_feature {
        rules.map_feature(feature)?;
    }

    let terrain = &rules.combat.terrain;
    let sys = settings.coordinate_system();
    let mut grid = CombatGrid::new(sys, &terrain.default_tile);

    if let Some(profile) = rules.combat_profile(&context.tile_type) {
        let heightmap = generate_heightmap(&sys, settings.fractal(), rng);
        heightmap.set_highest_tiles(profile.ridge_count, |x, y| {
            grid.get_mut(x, y).set_layer(CombatLayer::Terrain, &terrain.ridge_tile);
        });
        heightmap.set_lowest_tiles(profile.dark_count, |x, y| {
            let tile = grid.get_mut(x, y);
            if tile.terrain.as_deref() == Some(terrain.default_tile.as_str()) {
                tile.set_layer(CombatLayer::Terrain, &terrain.dark_tile);
            }
        });

        let free: Vec<(usize, usize)> = grid
            .tiles()
            .filter(|(_, _, t)| !t.off_map_edge && t.building.is_none())
            .map(|(x, y, _)| (x, y))
            .collect();
        let amount = profile.feature_count.min(free.len());
        if !profile.features.is_empty() {
            for i in index::sample(rng, free.len(), amount) {
                let (x, y) = free[i];
                if let Some(feature) = profile.features.choose(rng) {
                    grid.get_mut(x, y).set_layer(CombatLayer::Building, feature);
                }
            }
        }
    }

    let stamped = apply_elements(&mut grid, context, rules, false)?;
    tracing::debug!(
        target: "mapgen::combat",
        tile_type = %context.tile_type,
        stamped,
        "combat map generated"
    );
    Ok(grid)
}

/// Снимает все рамки и заново ставит только рамки из таблицы элементов.
/// Остальная карта не меняется.
pub fn regenerate_borders(
    grid: &mut CombatGrid,
    context: &CombatContext,
    rules: &GenerationRules,
) -> Result<usize> {
    rules.validate_combat()?;
    for tile in &mut grid.tiles {
        tile.border_ids.clear();
        tile.border_directions = 0;
    }
    apply_elements(grid, context, rules, true)
}
