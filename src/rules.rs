// src/rules.rs
//! Правила генерации (только чтение)
//!
//! Каталог, который генератор получает от внешней базы правил:
//! - типы тайлов (суша ли это, можно ли ставить лог, сфера магии узла, таблица шансов объектов);
//! - объекты карты (ресурсы, логова, башни) и шансы сфер магии их гарнизонов;
//! - юниты со стоимостью и сферой магии, сферы магии с флагом «буйствующих» монстров;
//! - таблица тайлов побережья, таблица устьев рек и правила боевой карты.
//!
//! Идентификаторы хранятся строками, как в исходной базе правил. Любая ссылка на
//! отсутствующий идентификатор даёт [`MapGenError::Lookup`].

use crate::coords::Direction;
use crate::error::{MapGenError, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Роль типа тайла в алгоритмах генерации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileRole {
    Ocean,
    Shore,
    Grass,
    Forest,
    Desert,
    Swamp,
    Hills,
    Mountains,
    Tundra,
    River,
    RiverMouth,
    Node,
}

/// Шанс появления объекта на тайле, по одному значению на плоскость
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureChance {
    pub feature_id: String,
    pub chances: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileType {
    pub id: String,
    pub role: TileRole,

    #[serde(default)]
    pub is_land: bool,

    /// Можно ли разместить здесь логово
    #[serde(default)]
    pub supports_lairs: bool,

    /// Сфера магии узла; задана только у тайлов узлов
    #[serde(default)]
    pub magic_realm: Option<String>,

    #[serde(default)]
    pub features: Vec<FeatureChance>,

    /// Эффект области, который тайл накладывает на свою клетку
    #[serde(default)]
    pub area_effect: Option<String>,

    /// Цвет для предпросмотра, "#rrggbb"
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#000000".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Resource,
    Lair,
    Tower,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealmChance {
    pub realm_id: String,
    pub chance: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapFeature {
    pub id: String,
    pub kind: FeatureKind,

    /// Шансы сфер магии для гарнизона (только у логов и башен)
    #[serde(default)]
    pub realm_chances: Vec<RealmChance>,

    #[serde(default)]
    pub area_effect: Option<String>,

    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDef {
    pub id: String,
    pub cost: u32,
    #[serde(default)]
    pub realm: Option<String>,
}

/// Сфера магии
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub generates_rampaging_monsters: bool,
}

/// Запись таблицы побережья: номер тайла клиента и маска соседей-суши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoreTile {
    pub tile_number: u16,
    pub mask: u8,
}

/// Запись таблицы устьев: до четырёх вариантов направлений реки для тайла побережья
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiverMouth {
    pub tile_number: u16,
    /// 4-битные маски направлений (N=1, E=2, S=4, W=8)
    pub direction_sets: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatLayer {
    Terrain,
    Building,
    Road,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatTerrainIds {
    pub default_tile: String,
    pub ridge_tile: String,
    pub dark_tile: String,
}

/// Как выглядит боевая карта для конкретного типа тайла мировой карты
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatProfile {
    pub tile_type_id: String,
    #[serde(default)]
    pub ridge_count: u64,
    #[serde(default)]
    pub dark_count: u64,
    #[serde(default)]
    pub feature_count: usize,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Правило таблицы элементов боевой карты.
///
/// Все заданные условия должны выполняться одновременно; незаданные не проверяются.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatElement {
    #[serde(default)]
    pub tile_type_id: Option<String>,
    #[serde(default)]
    pub map_feature_id: Option<String>,
    #[serde(default)]
    pub min_population: Option<u32>,
    #[serde(default)]
    pub max_population: Option<u32>,
    #[serde(default)]
    pub building_id: Option<String>,
    #[serde(default)]
    pub spell_id: Option<String>,

    pub x: usize,
    pub y: usize,

    #[serde(default)]
    pub layer: Option<CombatLayer>,
    #[serde(default)]
    pub combat_tile_type_id: Option<String>,
    #[serde(default)]
    pub border_id: Option<String>,
    /// Маска сторон рамки, биты как в [`Direction::neighbour_bit`]
    #[serde(default)]
    pub border_directions: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatRules {
    pub terrain: CombatTerrainIds,
    #[serde(default)]
    pub profiles: Vec<CombatProfile>,
    #[serde(default)]
    pub elements: Vec<CombatElement>,
}

/// Полный каталог правил
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRules {
    pub tile_types: Vec<TileType>,
    pub map_features: Vec<MapFeature>,
    pub units: Vec<UnitDef>,
    pub picks: Vec<Pick>,

    #[serde(default)]
    pub buildings: Vec<String>,

    #[serde(default)]
    pub spells: Vec<String>,

    #[serde(default = "standard_shore_tiles")]
    pub shore_tiles: Vec<ShoreTile>,

    /// Если пусто, варианты устьев выводятся из масок побережья
    #[serde(default)]
    pub river_mouths: Vec<RiverMouth>,

    pub combat: CombatRules,
}

const STANDARD_RULES: &str = include_str!("../data/standard_rules.toml");

impl GenerationRules {
    /// Встроенный стандартный набор правил
    pub fn standard() -> Result<Self> {
        Self::from_toml_str(STANDARD_RULES)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_toml_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn tile_type(&self, id: &str) -> Result<&TileType> {
        self.tile_types
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| MapGenError::lookup("tile type", id))
    }

    /// Первый тип тайла с данной ролью
    pub fn tile_for_role(&self, role: TileRole) -> Result<&TileType> {
        self.tile_types
            .iter()
            .find(|t| t.role == role)
            .ok_or_else(|| MapGenError::lookup("tile role", format!("{role:?}")))
    }

    /// Все типы тайлов узлов в порядке каталога
    #[must_use]
    pub fn node_tile_types(&self) -> Vec<&TileType> {
        self.tile_types
            .iter()
            .filter(|t| t.role == TileRole::Node)
            .collect()
    }

    pub fn map_feature(&self, id: &str) -> Result<&MapFeature> {
        self.map_features
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| MapGenError::lookup("map feature", id))
    }

    #[must_use]
    pub fn features_of_kind(&self, kind: FeatureKind) -> Vec<&MapFeature> {
        self.map_features.iter().filter(|f| f.kind == kind).collect()
    }

    pub fn tower_feature(&self) -> Result<&MapFeature> {
        self.map_features
            .iter()
            .find(|f| f.kind == FeatureKind::Tower)
            .ok_or_else(|| MapGenError::lookup("map feature kind", "tower"))
    }

    pub fn unit(&self, id: &str) -> Result<&UnitDef> {
        self.units
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| MapGenError::lookup("unit", id))
    }

    pub fn pick(&self, id: &str) -> Result<&Pick> {
        self.picks
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| MapGenError::lookup("pick", id))
    }

    /// Номера тайлов побережья для маски соседей (может быть несколько вариантов)
    #[must_use]
    pub fn shore_tile_numbers(&self, mask: u8) -> Vec<u16> {
        self.shore_tiles
            .iter()
            .filter(|t| t.mask == mask)
            .map(|t| t.tile_number)
            .collect()
    }

    /// Варианты направлений устья для тайла побережья
    #[must_use]
    pub fn river_mouth_sets(&self, tile_number: u16) -> Vec<u8> {
        if let Some(mouth) = self.river_mouths.iter().find(|m| m.tile_number == tile_number) {
            return mouth.direction_sets.clone();
        }
        if !self.river_mouths.is_empty() {
            return Vec::new();
        }

        // Таблица не задана: река может уходить в любую сторону, где по маске есть суша
        let Some(shore) = self.shore_tiles.iter().find(|t| t.tile_number == tile_number) else {
            return Vec::new();
        };
        Direction::CARDINAL
            .into_iter()
            .filter(|d| shore.mask & d.neighbour_bit() != 0)
            .filter_map(Direction::river_bit)
            .collect()
    }

    #[must_use]
    pub fn combat_profile(&self, tile_type_id: &str) -> Option<&CombatProfile> {
        self.combat
            .profiles
            .iter()
            .find(|p| p.tile_type_id == tile_type_id)
    }

    /// Проверяет ссылки внутри каталога и согласованность таблиц с числом плоскостей
    pub fn validate(&self, depth: usize) -> Result<()> {
        for role in [
            TileRole::Ocean,
            TileRole::Shore,
            TileRole::Grass,
            TileRole::Forest,
            TileRole::Desert,
            TileRole::Swamp,
            TileRole::Hills,
            TileRole::Mountains,
            TileRole::Tundra,
            TileRole::River,
            TileRole::RiverMouth,
        ] {
            self.tile_for_role(role)?;
        }
        if self.node_tile_types().is_empty() {
            return Err(MapGenError::lookup("tile role", "Node"));
        }
        self.tower_feature()?;

        for tile in &self.tile_types {
            for chance in &tile.features {
                self.map_feature(&chance.feature_id)?;
                if chance.chances.len() != depth {
                    return Err(MapGenError::Configuration(format!(
                        "tile type {}: feature {} lists {} plane chances for {} planes",
                        tile.id,
                        chance.feature_id,
                        chance.chances.len(),
                        depth
                    )));
                }
            }
            if tile.role == TileRole::Node {
                let realm = tile.magic_realm.as_deref().ok_or_else(|| {
                    MapGenError::Configuration(format!("node tile {} has no magic realm", tile.id))
                })?;
                self.pick(realm)?;
            }
        }

        for feature in &self.map_features {
            for realm in &feature.realm_chances {
                self.pick(&realm.realm_id)?;
            }
            if feature.kind != FeatureKind::Resource && feature.realm_chances.is_empty() {
                return Err(MapGenError::Configuration(format!(
                    "feature {} hosts monsters but lists no realm chances",
                    feature.id
                )));
            }
        }

        for unit in &self.units {
            if let Some(realm) = &unit.realm {
                self.pick(realm)?;
            }
        }

        self.validate_combat()
    }

    /// Проверяет ссылки профилей и таблицы элементов боевой карты
    pub fn validate_combat(&self) -> Result<()> {
        for profile in &self.combat.profiles {
            self.tile_type(&profile.tile_type_id)?;
        }
        for element in &self.combat.elements {
            if let Some(id) = &element.tile_type_id {
                self.tile_type(id)?;
            }
            if let Some(id) = &element.map_feature_id {
                self.map_feature(id)?;
            }
            if let Some(id) = &element.building_id {
                if !self.buildings.contains(id) {
                    return Err(MapGenError::lookup("building", id.as_str()));
                }
            }
            if let Some(id) = &element.spell_id {
                if !self.spells.contains(id) {
                    return Err(MapGenError::lookup("spell", id.as_str()));
                }
            }
        }

        Ok(())
    }
}

/// Применяет правило «достройки углов»: если два ортогональных соседа — суша,
/// диагональ между ними тоже считается сушей
#[must_use]
pub fn complete_corners(mask: u8) -> u8 {
    let bit = Direction::neighbour_bit;
    let mut result = mask;
    for (a, corner, b) in [
        (Direction::North, Direction::NorthEast, Direction::East),
        (Direction::East, Direction::SouthEast, Direction::South),
        (Direction::South, Direction::SouthWest, Direction::West),
        (Direction::West, Direction::NorthWest, Direction::North),
    ] {
        if mask & bit(a) != 0 && mask & bit(b) != 0 {
            result |= bit(corner);
        }
    }
    result
}

/// Стандартная таблица побережья.
///
/// Номера 1..=160 соответствуют всем маскам, устойчивым к достройке углов, в порядке
/// возрастания маски; номера 161..=164 — второй вариант рисунка для берега с единственным
/// ортогональным соседом-сушей (N, E, S, W).
#[must_use]
pub fn standard_shore_tiles() -> Vec<ShoreTile> {
    let mut tiles: Vec<ShoreTile> = (1..=255u8)
        .filter(|&mask| complete_corners(mask) == mask)
        .zip(1u16..)
        .map(|(mask, tile_number)| ShoreTile { tile_number, mask })
        .collect();

    let next = tiles.len() as u16 + 1;
    for (offset, dir) in Direction::CARDINAL.into_iter().enumerate() {
        tiles.push(ShoreTile {
            tile_number: next + offset as u16,
            mask: dir.neighbour_bit(),
        });
    }
    tiles
}
