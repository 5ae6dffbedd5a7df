// src/config.rs
//! Параметры генерации мира
//!
//! Этот модуль определяет все параметры сессии, управляющие генерацией:
//! - Размер карты, число плоскостей и замыкание краёв
//! - Доли суши, гор, холмов, тундры, лесов, пустынь и болот
//! - Количество рек, башен волшебства, логов и узлов на каждой плоскости
//! - Силу гарнизонов и размер сокровищ (зависят от уровня сложности)
//! - Настройки «буйствующих» монстров и боевой карты
//!
//! Все структуры поддерживают сериализацию в TOML/JSON для удобной настройки через конфигурационные файлы.

use crate::coords::CoordinateSystem;
use crate::error::{MapGenError, Result};
use crate::heightmap::FractalSettings;
use serde::{Deserialize, Serialize};
use std::fs;

/// Идентификатор игрока во внешнем движке ходов
pub type PlayerId = u32;

/// Диапазон «минимум..максимум», по которому интерполируется сила или сокровище
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrengthRange {
    pub min: u32,
    pub max: u32,
}

impl StrengthRange {
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Линейная интерполяция: `proportion = 0.0` даёт `min`, `1.0` даёт `max`
    #[must_use]
    pub fn interpolate(&self, proportion: f64) -> u32 {
        let span = f64::from(self.max.saturating_sub(self.min));
        self.min + (span * proportion.clamp(0.0, 1.0)) as u32
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.min > self.max {
            return Err(MapGenError::Configuration(format!(
                "{what}: min {} is greater than max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Размер и топология карты
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSettings {
    #[serde(default = "default_width")]
    pub width: usize,

    #[serde(default = "default_height")]
    pub height: usize,

    /// Количество плоскостей (Арканус и Миррор)
    #[serde(default = "default_depth")]
    pub depth: usize,

    #[serde(default = "default_true")]
    pub wraps_left_to_right: bool,

    #[serde(default)]
    pub wraps_top_to_bottom: bool,

    /// Ширина зоны грубой решётки фрактала
    #[serde(default = "default_zone_size")]
    pub zone_width: usize,

    /// Высота зоны грубой решётки фрактала
    #[serde(default = "default_zone_size")]
    pub zone_height: usize,

    /// Сколько строк у верхнего и нижнего края дополнительно опускаются при генерации высот
    #[serde(default = "default_edge_avoidance")]
    pub edge_avoidance: usize,
}

fn default_width() -> usize {
    60
}
fn default_height() -> usize {
    40
}
fn default_depth() -> usize {
    2
}
fn default_true() -> bool {
    true
}
fn default_zone_size() -> usize {
    10
}
fn default_edge_avoidance() -> usize {
    3
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            width: 60,
            height: 40,
            depth: 2,
            wraps_left_to_right: true,
            wraps_top_to_bottom: false,
            zone_width: 10,
            zone_height: 10,
            edge_avoidance: 3,
        }
    }
}

/// Настройки одного типа «пятен» (лес, пустыня, болото)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BlobSettings {
    /// Доля суши в процентах, которую должны занять пятна
    pub percent: u32,
    /// Средний размер одного пятна в клетках (фактический размер ±50%)
    pub average_size: usize,
}

/// Настройки одной плоскости
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaneSettings {
    pub name: String,

    /// Сколько узлов пытаться разместить
    pub node_count: usize,

    /// Минимальный размер ауры узла (включая клетку самого узла)
    pub aura_min: usize,

    /// Максимальный размер ауры узла
    pub aura_max: usize,

    /// Объект на клетке появляется с шансом 1 из N
    #[serde(default = "default_feature_chance")]
    pub feature_chance: u32,

    /// Сила гарнизона узла
    pub node_monsters: StrengthRange,

    /// Сокровище узла
    pub node_treasure: StrengthRange,
}

fn default_feature_chance() -> u32 {
    15
}

impl PlaneSettings {
    fn arcanus() -> Self {
        Self {
            name: "Arcanus".to_string(),
            node_count: 14,
            aura_min: 5,
            aura_max: 10,
            feature_chance: 15,
            node_monsters: StrengthRange::new(300, 1500),
            node_treasure: StrengthRange::new(100, 600),
        }
    }

    fn myrror() -> Self {
        Self {
            name: "Myrror".to_string(),
            node_count: 18,
            aura_min: 10,
            aura_max: 20,
            feature_chance: 10,
            node_monsters: StrengthRange::new(600, 2500),
            node_treasure: StrengthRange::new(200, 1000),
        }
    }
}

/// Гарнизоны башен и логов
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarrisonSettings {
    /// Максимальное число юнитов в одной клетке
    #[serde(default = "default_units_per_cell")]
    pub units_per_cell: usize,

    pub tower_monsters: StrengthRange,
    pub tower_treasure: StrengthRange,
    pub normal_lair_monsters: StrengthRange,
    pub normal_lair_treasure: StrengthRange,
    pub weak_lair_monsters: StrengthRange,
    pub weak_lair_treasure: StrengthRange,
}

fn default_units_per_cell() -> usize {
    9
}

impl Default for GarrisonSettings {
    fn default() -> Self {
        Self {
            units_per_cell: 9,
            tower_monsters: StrengthRange::new(500, 2500),
            tower_treasure: StrengthRange::new(300, 1500),
            normal_lair_monsters: StrengthRange::new(200, 1200),
            normal_lair_treasure: StrengthRange::new(100, 800),
            weak_lair_monsters: StrengthRange::new(50, 300),
            weak_lair_treasure: StrengthRange::new(20, 200),
        }
    }
}

/// «Буйствующие» монстры, выходящие из неочищенных логов и узлов
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RampagingSettings {
    /// Начиная с этого хода монстры могут выходить из логов
    #[serde(default = "default_rampaging_start_turn")]
    pub start_turn: u32,

    /// Число граней каждого из двух кубиков бюджета
    #[serde(default = "default_rampaging_dice_sides")]
    pub dice_sides: u32,

    /// Множитель бюджета на один ход
    #[serde(default = "default_rampaging_budget_per_turn")]
    pub budget_per_turn: u32,

    /// Потолок бюджета одной вылазки
    #[serde(default = "default_rampaging_budget_max")]
    pub budget_max: u32,
}

fn default_rampaging_start_turn() -> u32 {
    50
}
fn default_rampaging_dice_sides() -> u32 {
    10
}
fn default_rampaging_budget_per_turn() -> u32 {
    1
}
fn default_rampaging_budget_max() -> u32 {
    2000
}

impl Default for RampagingSettings {
    fn default() -> Self {
        Self {
            start_turn: 50,
            dice_sides: 10,
            budget_per_turn: 1,
            budget_max: 2000,
        }
    }
}

/// Служебные игроки внешнего движка
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlayerSettings {
    /// Нейтральные монстры: владеют гарнизонами логов, узлов и башен
    pub monsters: PlayerId,
    /// Рейдеры: владеют нейтральными городами
    pub raiders: PlayerId,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            monsters: 1,
            raiders: 2,
        }
    }
}

/// Размер боевой карты и её фрактала
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CombatSettings {
    pub width: usize,
    pub height: usize,
    pub zone_width: usize,
    pub zone_height: usize,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            width: 12,
            height: 25,
            zone_width: 4,
            zone_height: 5,
        }
    }
}

impl CombatSettings {
    #[must_use]
    pub fn coordinate_system(&self) -> CoordinateSystem {
        CoordinateSystem::new(self.width, self.height, 1, false, false)
    }

    #[must_use]
    pub fn fractal(&self) -> FractalSettings {
        FractalSettings {
            zone_width: self.zone_width,
            zone_height: self.zone_height,
            edge_avoidance: 0,
        }
    }
}

/// Основные параметры генерации мира
///
/// Полная конфигурация одной сессии. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Сид генератора случайных чисел (детерминированная генерация)
    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub map: MapSettings,

    /// Доля суши от площади плоскости
    #[serde(default = "default_land_proportion")]
    pub land_proportion: f64,

    /// Горы, в процентах от суши
    #[serde(default = "default_mountain_percent")]
    pub mountain_percent: u32,

    /// Холмы, в процентах от суши
    #[serde(default = "default_hill_percent")]
    pub hill_percent: u32,

    /// Глубина полярной тундры в строках
    #[serde(default = "default_tundra_row_count")]
    pub tundra_row_count: usize,

    #[serde(default = "default_forest")]
    pub forest: BlobSettings,

    #[serde(default = "default_desert")]
    pub desert: BlobSettings,

    #[serde(default = "default_swamp")]
    pub swamp: BlobSettings,

    /// Рек на каждой плоскости
    #[serde(default = "default_river_count")]
    pub river_count: usize,

    /// Предел длины одной реки в клетках
    #[serde(default = "default_river_max_tiles")]
    pub river_max_tiles: usize,

    #[serde(default = "default_tower_count")]
    pub tower_count: usize,

    /// Минимальное расстояние между башнями (уменьшается, если места не хватает)
    #[serde(default = "default_tower_separation")]
    pub tower_separation: usize,

    #[serde(default = "default_normal_lair_count")]
    pub normal_lair_count: usize,

    #[serde(default = "default_weak_lair_count")]
    pub weak_lair_count: usize,

    /// По одной записи на каждую плоскость
    #[serde(default = "default_planes")]
    pub planes: Vec<PlaneSettings>,

    #[serde(default)]
    pub garrison: GarrisonSettings,

    #[serde(default)]
    pub rampaging: RampagingSettings,

    #[serde(default)]
    pub players: PlayerSettings,

    #[serde(default)]
    pub combat: CombatSettings,
}

fn default_land_proportion() -> f64 {
    0.33
}
fn default_mountain_percent() -> u32 {
    10
}
fn default_hill_percent() -> u32 {
    10
}
fn default_tundra_row_count() -> usize {
    2
}
fn default_forest() -> BlobSettings {
    BlobSettings {
        percent: 14,
        average_size: 12,
    }
}
fn default_desert() -> BlobSettings {
    BlobSettings {
        percent: 7,
        average_size: 10,
    }
}
fn default_swamp() -> BlobSettings {
    BlobSettings {
        percent: 5,
        average_size: 8,
    }
}
fn default_river_count() -> usize {
    8
}
fn default_river_max_tiles() -> usize {
    40
}
fn default_tower_count() -> usize {
    6
}
fn default_tower_separation() -> usize {
    10
}
fn default_normal_lair_count() -> usize {
    30
}
fn default_weak_lair_count() -> usize {
    10
}
fn default_planes() -> Vec<PlaneSettings> {
    vec![PlaneSettings::arcanus(), PlaneSettings::myrror()]
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            seed: 0,
            map: MapSettings::default(),
            land_proportion: default_land_proportion(),
            mountain_percent: default_mountain_percent(),
            hill_percent: default_hill_percent(),
            tundra_row_count: default_tundra_row_count(),
            forest: default_forest(),
            desert: default_desert(),
            swamp: default_swamp(),
            river_count: default_river_count(),
            river_max_tiles: default_river_max_tiles(),
            tower_count: default_tower_count(),
            tower_separation: default_tower_separation(),
            normal_lair_count: default_normal_lair_count(),
            weak_lair_count: default_weak_lair_count(),
            planes: default_planes(),
            garrison: GarrisonSettings::default(),
            rampaging: RampagingSettings::default(),
            players: PlayerSettings::default(),
            combat: CombatSettings::default(),
        }
    }
}

impl GenerationParams {
    /// Загружает параметры из TOML-файла
    ///
    /// # Пример
    /// ```toml
    /// # world.toml
    /// seed = 42
    /// land_proportion = 0.4
    ///
    /// [map]
    /// width = 60
    /// height = 40
    /// ```
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let params: Self = toml::from_str(&contents)?;
        Ok(params)
    }

    #[must_use]
    pub fn coordinate_system(&self) -> CoordinateSystem {
        CoordinateSystem::new(
            self.map.width,
            self.map.height,
            self.map.depth,
            self.map.wraps_left_to_right,
            self.map.wraps_top_to_bottom,
        )
    }

    #[must_use]
    pub fn fractal(&self) -> FractalSettings {
        FractalSettings {
            zone_width: self.map.zone_width,
            zone_height: self.map.zone_height,
            edge_avoidance: self.map.edge_avoidance,
        }
    }

    /// Проверяет согласованность параметров до начала генерации
    pub fn validate(&self) -> Result<()> {
        let config = |msg: String| Err(MapGenError::Configuration(msg));

        if self.map.width < 2 || self.map.height < 2 || self.map.depth == 0 {
            return config(format!(
                "map must be at least 2x2 with one plane, got {}x{}x{}",
                self.map.width, self.map.height, self.map.depth
            ));
        }
        if self.map.zone_width == 0 || self.map.zone_height == 0 {
            return config("zone sizes must be positive".to_string());
        }
        if self.planes.len() != self.map.depth {
            return config(format!(
                "{} plane settings given for a map with {} planes",
                self.planes.len(),
                self.map.depth
            ));
        }
        if !(0.0..=1.0).contains(&self.land_proportion) {
            return config(format!(
                "land proportion {} outside 0..1",
                self.land_proportion
            ));
        }
        if self.mountain_percent + self.hill_percent > 100 {
            return config("mountain and hill percentages exceed 100".to_string());
        }
        if self.forest.percent + self.desert.percent + self.swamp.percent > 100 {
            return config("forest, desert and swamp percentages exceed 100".to_string());
        }
        if self.garrison.units_per_cell < 2 {
            return config("at least 2 units per cell are required".to_string());
        }
        if self.rampaging.dice_sides == 0 {
            return config("rampaging dice need at least one side".to_string());
        }
        if self.combat.width == 0 || self.combat.height == 0 {
            return config("combat map must not be empty".to_string());
        }

        for plane in &self.planes {
            if plane.aura_min == 0 || plane.aura_min > plane.aura_max {
                return config(format!(
                    "plane {}: invalid aura size range {}..{}",
                    plane.name, plane.aura_min, plane.aura_max
                ));
            }
            if plane.feature_chance == 0 {
                return config(format!("plane {}: feature chance must be positive", plane.name));
            }
            plane.node_monsters.check(&plane.name)?;
            plane.node_treasure.check(&plane.name)?;
        }

        let g = &self.garrison;
        for (range, what) in [
            (g.tower_monsters, "tower monsters"),
            (g.tower_treasure, "tower treasure"),
            (g.normal_lair_monsters, "normal lair monsters"),
            (g.normal_lair_treasure, "normal lair treasure"),
            (g.weak_lair_monsters, "weak lair monsters"),
            (g.weak_lair_treasure, "weak lair treasure"),
        ] {
            range.check(what)?;
        }

        Ok(())
    }
}
