//! Сетка клеток мировой карты
//!
//! Узлы, логова и башни не являются отдельными сущностями: это пометки на клетках.
//! Узел — клетка с «магическим» типом тайла, логово или башня — клетка с объектом карты,
//! у которого есть шансы сфер магии. Всё состояние клеток принадлежит [`TerrainGrid`].

use crate::coords::{CoordinateSystem, MapCoords};
use crate::error::Result;
use crate::rules::{GenerationRules, TileRole};
use serde::{Deserialize, Serialize};

/// Одна клетка одной плоскости
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainCell {
    pub tile_type: String,

    /// Ресурс, логово или башня
    pub map_feature: Option<String>,

    /// Направления реки, 4-битная маска (N=1, E=2, S=4, W=8)
    pub river_directions: Option<u8>,

    /// Номер тайла побережья после сглаживания
    pub shore_tile: Option<u16>,

    /// Узел, которому принадлежит аура на этой клетке
    pub aura_owner: Option<MapCoords>,

    /// Доля силы узла, логова или башни между минимумом и максимумом (0..1)
    pub power_proportion: Option<f64>,

    pub treasure_value: Option<u32>,

    pub weak_lair: Option<bool>,
}

impl TerrainCell {
    #[must_use]
    pub fn new(tile_type: &str) -> Self {
        Self {
            tile_type: tile_type.to_string(),
            map_feature: None,
            river_directions: None,
            shore_tile: None,
            aura_owner: None,
            power_proportion: None,
            treasure_value: None,
            weak_lair: None,
        }
    }
}

/// Все плоскости мировой карты
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    sys: CoordinateSystem,
    planes: Vec<Vec<TerrainCell>>,
}

impl TerrainGrid {
    /// Новая карта, целиком заполненная тайлом `fill` (обычно океаном)
    #[must_use]
    pub fn new(sys: CoordinateSystem, fill: &str) -> Self {
        let planes = (0..sys.depth)
            .map(|_| vec![TerrainCell::new(fill); sys.area()])
            .collect();
        Self { sys, planes }
    }

    #[must_use]
    pub fn coordinate_system(&self) -> &CoordinateSystem {
        &self.sys
    }

    #[must_use]
    pub fn get(&self, plane: usize, x: usize, y: usize) -> &TerrainCell {
        &self.planes[plane][self.sys.index(x, y)]
    }

    pub fn get_mut(&mut self, plane: usize, x: usize, y: usize) -> &mut TerrainCell {
        let idx = self.sys.index(x, y);
        &mut self.planes[plane][idx]
    }

    #[must_use]
    pub fn at(&self, coords: MapCoords) -> &TerrainCell {
        self.get(coords.plane, coords.x, coords.y)
    }

    pub fn at_mut(&mut self, coords: MapCoords) -> &mut TerrainCell {
        self.get_mut(coords.plane, coords.x, coords.y)
    }

    pub fn set_tile_type(&mut self, plane: usize, x: usize, y: usize, tile_type: &str) {
        let cell = self.get_mut(plane, x, y);
        if cell.tile_type != tile_type {
            cell.tile_type = tile_type.to_string();
        }
    }

    /// Клетки плоскости в порядке строк вместе с координатами
    pub fn cells(&self, plane: usize) -> impl Iterator<Item = (usize, usize, &TerrainCell)> {
        let width = self.sys.width;
        self.planes[plane]
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i % width, i / width, cell))
    }

    /// Число клеток плоскости с данным типом тайла
    #[must_use]
    pub fn count_tile_type(&self, plane: usize, tile_type: &str) -> usize {
        self.planes[plane]
            .iter()
            .filter(|c| c.tile_type == tile_type)
            .count()
    }

    /// Является ли клетка сушей по каталогу правил
    pub fn is_land(&self, rules: &GenerationRules, plane: usize, x: usize, y: usize) -> Result<bool> {
        Ok(rules.tile_type(&self.get(plane, x, y).tile_type)?.is_land)
    }

    /// Является ли клетка узлом
    pub fn is_node(&self, rules: &GenerationRules, coords: MapCoords) -> Result<bool> {
        Ok(rules.tile_type(&self.at(coords).tile_type)?.role == TileRole::Node)
    }
}
