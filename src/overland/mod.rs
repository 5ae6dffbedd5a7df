//! Генерация мировой карты
//!
//! [`OverlandMapGenerator`] прогоняет все этапы в фиксированном порядке. Порядок вызовов
//! генератора случайных чисел является частью контракта: один и тот же сид обязан давать
//! одну и ту же карту.
//!
//! 1. Для каждой плоскости: высоты → суша → горы → холмы → тундра → леса, пустыни, болота →
//!    побережье → реки.
//! 2. Башни волшебства (сразу на всех плоскостях).
//! 3. Для каждой плоскости: узлы и их ауры.
//! 4. Логова: сначала обычные, потом слабые.
//! 5. Для каждой плоскости: ресурсы.
//! 6. Гарнизоны башен, узлов и логов.
//! 7. Сбор эффектов областей.

pub mod features;
pub mod lairs;
pub mod nodes;
pub mod region;
pub mod rivers;
pub mod shore;
pub mod towers;

use crate::config::GenerationParams;
use crate::coords::{CoordinateSystem, MapCoords};
use crate::error::Result;
use crate::garrison::{self, PlacedUnit};
use crate::heightmap::{Heightmap, generate_heightmap};
use crate::rules::{GenerationRules, TileRole};
use crate::terrain::TerrainGrid;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Идентификаторы типов тайлов, которые нужны алгоритмам генерации
#[derive(Debug, Clone)]
pub struct TileIds {
    pub ocean: String,
    pub shore: String,
    pub grass: String,
    pub forest: String,
    pub desert: String,
    pub swamp: String,
    pub hills: String,
    pub mountains: String,
    pub tundra: String,
    pub river: String,
    pub river_mouth: String,
}

impl TileIds {
    pub fn resolve(rules: &GenerationRules) -> Result<Self> {
        let id = |role| rules.tile_for_role(role).map(|t| t.id.clone());
        Ok(Self {
            ocean: id(TileRole::Ocean)?,
            shore: id(TileRole::Shore)?,
            grass: id(TileRole::Grass)?,
            forest: id(TileRole::Forest)?,
            desert: id(TileRole::Desert)?,
            swamp: id(TileRole::Swamp)?,
            hills: id(TileRole::Hills)?,
            mountains: id(TileRole::Mountains)?,
            tundra: id(TileRole::Tundra)?,
            river: id(TileRole::River)?,
            river_mouth: id(TileRole::RiverMouth)?,
        })
    }
}

/// Эффект области, который внешний движок должен добавить на клетку
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedAreaEffect {
    pub location: MapCoords,
    pub effect_id: String,
}

/// Принимает юниты, созданные генератором
pub trait UnitSpawner {
    fn spawn_unit(&mut self, unit: &PlacedUnit) -> Result<()>;
}

/// Принимает эффекты областей, созданные генератором
pub trait AreaEffectSink {
    fn add_area_effect(&mut self, effect: &PlacedAreaEffect) -> Result<()>;
}

/// Результат генерации мира
#[derive(Debug, Clone)]
pub struct GeneratedWorld {
    pub terrain: TerrainGrid,
    /// Карта высот каждой плоскости
    pub height_maps: Vec<Heightmap>,
    /// Порог высоты, выше которого плоскость стала сушей
    pub land_thresholds: Vec<usize>,
    pub units: Vec<PlacedUnit>,
    pub area_effects: Vec<PlacedAreaEffect>,
}

impl GeneratedWorld {
    /// Передаёт юниты и эффекты областей внешнему движку
    pub fn publish(
        &self,
        spawner: &mut impl UnitSpawner,
        effects: &mut impl AreaEffectSink,
    ) -> Result<()> {
        for unit in &self.units {
            spawner.spawn_unit(unit)?;
        }
        for effect in &self.area_effects {
            effects.add_area_effect(effect)?;
        }
        Ok(())
    }
}

/// Генератор мировой карты одной сессии
pub struct OverlandMapGenerator<'a> {
    params: &'a GenerationParams,
    rules: &'a GenerationRules,
    sys: CoordinateSystem,
    ids: TileIds,
}

impl<'a> OverlandMapGenerator<'a> {
    /// Проверяет параметры и правила. Ошибки конфигурации и ссылок всплывают здесь,
    /// до первого броска кубика.
    pub fn new(params: &'a GenerationParams, rules: &'a GenerationRules) -> Result<Self> {
        params.validate()?;
        let sys = params.coordinate_system();
        rules.validate(sys.depth)?;
        let ids = TileIds::resolve(rules)?;
        Ok(Self {
            params,
            rules,
            sys,
            ids,
        })
    }

    /// Генерация с генератором случайных чисел из сида параметров
    pub fn generate_seeded(&self) -> Result<GeneratedWorld> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        self.generate(&mut rng)
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<GeneratedWorld> {
        let params = self.params;
        let ids = &self.ids;
        let mut grid = TerrainGrid::new(self.sys, &ids.ocean);
        let mut height_maps = Vec::with_capacity(self.sys.depth);
        let mut land_thresholds = Vec::with_capacity(self.sys.depth);

        tracing::info!(
            target: "mapgen::overland",
            width = self.sys.width,
            height = self.sys.height,
            planes = self.sys.depth,
            seed = params.seed,
            "generating overland map"
        );

        for plane in 0..self.sys.depth {
            let heightmap = generate_heightmap(&self.sys, params.fractal(), rng);
            let threshold = self.make_landscape(&mut grid, &heightmap, plane, rng)?;
            height_maps.push(heightmap);
            land_thresholds.push(threshold);
        }

        let towers = towers::place_towers(
            &mut grid,
            self.rules,
            params.tower_count,
            params.tower_separation,
            rng,
        )?;
        tracing::info!(target: "mapgen::overland", towers = towers.len(), "towers placed");

        for (plane, settings) in params.planes.iter().enumerate() {
            let placed = nodes::place_nodes(&mut grid, self.rules, ids, plane, settings, rng)?;
            tracing::info!(
                target: "mapgen::overland",
                plane,
                placed,
                requested = settings.node_count,
                "nodes placed"
            );
        }

        let normal = lairs::place_lairs(&mut grid, self.rules, params.normal_lair_count, false, rng)?;
        let weak = lairs::place_lairs(&mut grid, self.rules, params.weak_lair_count, true, rng)?;
        tracing::info!(target: "mapgen::overland", normal, weak, "lairs placed");

        for (plane, settings) in params.planes.iter().enumerate() {
            let placed =
                features::place_features(&mut grid, self.rules, plane, settings.feature_chance, rng)?;
            tracing::debug!(target: "mapgen::overland", plane, placed, "features placed");
        }

        let units = garrison::stock_all(&mut grid, self.rules, params, rng)?;
        let area_effects = collect_area_effects(&grid, self.rules)?;

        tracing::info!(
            target: "mapgen::overland",
            units = units.len(),
            area_effects = area_effects.len(),
            "overland map generated"
        );

        Ok(GeneratedWorld {
            terrain: grid,
            height_maps,
            land_thresholds,
            units,
            area_effects,
        })
    }

    /// Рельеф одной плоскости: от суши до рек. Возвращает порог высоты суши.
    fn make_landscape<R: Rng + ?Sized>(
        &self,
        grid: &mut TerrainGrid,
        heightmap: &Heightmap,
        plane: usize,
        rng: &mut R,
    ) -> Result<usize> {
        let params = self.params;
        let ids = &self.ids;

        let desired_land = (self.sys.area() as f64 * params.land_proportion).round() as u64;
        let threshold = heightmap.highest_threshold(desired_land);
        let land = region::set_highest_tiles_of(grid, heightmap, plane, desired_land, &ids.ocean, &ids.grass);

        let mountains = land * u64::from(params.mountain_percent) / 100;
        let hills = land * u64::from(params.mountain_percent + params.hill_percent) / 100;
        region::set_highest_tiles_of(grid, heightmap, plane, mountains, &ids.grass, &ids.mountains);
        region::set_highest_tiles_of(grid, heightmap, plane, hills, &ids.grass, &ids.hills);

        region::make_tundra(
            grid,
            plane,
            params.tundra_row_count,
            &[ids.grass.as_str(), ids.hills.as_str()],
            &ids.tundra,
            rng,
        );

        for (blob, to) in [
            (params.forest, &ids.forest),
            (params.desert, &ids.desert),
            (params.swamp, &ids.swamp),
        ] {
            let desired = (land * u64::from(blob.percent) / 100) as usize;
            region::place_blobs(grid, plane, &ids.grass, to, desired, blob.average_size, rng);
        }

        shore::smooth_shore(grid, self.rules, ids, plane, rng)?;
        let river_count = rivers::make_rivers(
            grid,
            self.rules,
            ids,
            plane,
            params.river_count,
            params.river_max_tiles,
            rng,
        )?;

        tracing::debug!(
            target: "mapgen::overland",
            plane,
            land,
            threshold,
            rivers = river_count,
            "landscape ready"
        );
        Ok(threshold)
    }
}

/// Эффекты областей от типов тайлов (узлы) и объектов карты (башни).
/// Порядок обхода: плоскость, строка, столбец.
pub fn collect_area_effects(
    grid: &TerrainGrid,
    rules: &GenerationRules,
) -> Result<Vec<PlacedAreaEffect>> {
    let mut effects = Vec::new();
    for plane in 0..grid.coordinate_system().depth {
        for (x, y, cell) in grid.cells(plane) {
            let location = MapCoords::new(x, y, plane);
            if let Some(effect_id) = &rules.tile_type(&cell.tile_type)?.area_effect {
                effects.push(PlacedAreaEffect {
                    location,
                    effect_id: effect_id.clone(),
                });
            }
            if let Some(feature) = &cell.map_feature {
                if let Some(effect_id) = &rules.map_feature(feature)?.area_effect {
                    effects.push(PlacedAreaEffect {
                        location,
                        effect_id: effect_id.clone(),
                    });
                }
            }
        }
    }
    Ok(effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MapGenError;

    fn small_params(seed: u64) -> GenerationParams {
        let mut params = GenerationParams {
            seed,
            tower_count: 2,
            tower_separation: 4,
            normal_lair_count: 4,
            weak_lair_count: 2,
            river_count: 2,
            ..GenerationParams::default()
        };
        params.map.width = 30;
        params.map.height = 20;
        params.map.zone_width = 5;
        params.map.zone_height = 5;
        for plane in &mut params.planes {
            plane.node_count = 3;
            plane.aura_min = 3;
            plane.aura_max = 6;
        }
        params
    }

    #[derive(Default)]
    struct Recorder {
        units: Vec<PlacedUnit>,
        effects: Vec<PlacedAreaEffect>,
    }

    impl UnitSpawner for Recorder {
        fn spawn_unit(&mut self, unit: &PlacedUnit) -> Result<()> {
            self.units.push(unit.clone());
            Ok(())
        }
    }

    impl AreaEffectSink for Recorder {
        fn add_area_effect(&mut self, effect: &PlacedAreaEffect) -> Result<()> {
            self.effects.push(effect.clone());
            Ok(())
        }
    }

    #[test]
    fn test_tile_ids_follow_roles() {
        let rules = GenerationRules::standard().unwrap();
        let ids = TileIds::resolve(&rules).unwrap();
        assert_eq!(ids.ocean, "ocean");
        assert_eq!(ids.river_mouth, "river_mouth");
    }

    #[test]
    fn test_invalid_params_rejected_before_generation() {
        let rules = GenerationRules::standard().unwrap();
        let mut params = small_params(1);
        params.map.depth = 3;

        let err = OverlandMapGenerator::new(&params, &rules).err().unwrap();
        assert!(matches!(err, MapGenError::Configuration(_)));
    }

    #[test]
    fn test_small_world_generates_and_publishes() {
        let rules = GenerationRules::standard().unwrap();
        let params = small_params(77);
        let world = OverlandMapGenerator::new(&params, &rules)
            .unwrap()
            .generate_seeded()
            .unwrap();

        assert_eq!(world.height_maps.len(), 2);
        assert_eq!(world.land_thresholds.len(), 2);
        // Башня стоит на обеих плоскостях и даёт эффект области на каждой
        let tower_effects = world
            .area_effects
            .iter()
            .filter(|e| e.effect_id == "cae_tower_of_wizardry")
            .count();
        assert_eq!(tower_effects, 4);

        let mut recorder = Recorder::default();
        world.publish(&mut recorder, &mut Recorder::default()).unwrap();
        assert_eq!(recorder.units, world.units);
        assert!(recorder.units.iter().all(|u| u.owner == params.players.monsters));
    }

    #[test]
    fn test_area_effects_from_tiles_and_features() {
        let rules = GenerationRules::standard().unwrap();
        let sys = CoordinateSystem::new(4, 4, 1, false, false);
        let mut grid = TerrainGrid::new(sys, "grassland");
        grid.set_tile_type(0, 1, 1, "chaos_node");
        grid.get_mut(0, 3, 2).map_feature = Some("tower_of_wizardry".to_string());
        grid.get_mut(0, 0, 3).map_feature = Some("coal".to_string());

        let effects = collect_area_effects(&grid, &rules).unwrap();

        assert_eq!(
            effects,
            vec![
                PlacedAreaEffect {
                    location: MapCoords::new(1, 1, 0),
                    effect_id: "cae_chaos_node".to_string(),
                },
                PlacedAreaEffect {
                    location: MapCoords::new(3, 2, 0),
                    effect_id: "cae_tower_of_wizardry".to_string(),
                },
            ]
        );
    }
}
