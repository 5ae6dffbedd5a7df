//! Ресурсы на клетках мировой карты

use crate::error::Result;
use crate::rules::{FeatureChance, GenerationRules};
use crate::terrain::TerrainGrid;
use rand::Rng;

/// Выбор объекта по весам текущей плоскости: линейный проход по «корзинам»
fn pick_weighted<'r, R: Rng + ?Sized>(
    chances: &'r [FeatureChance],
    plane: usize,
    rng: &mut R,
) -> Option<&'r str> {
    let weight = |c: &FeatureChance| c.chances.get(plane).copied().unwrap_or(0);
    let total: u32 = chances.iter().map(weight).sum();
    if total == 0 {
        return None;
    }

    let mut roll = rng.gen_range(0..total);
    for chance in chances {
        let w = weight(chance);
        if roll < w {
            return Some(&chance.feature_id);
        }
        roll -= w;
    }
    None
}

/// Разбрасывает ресурсы по плоскости. На каждой клетке без объекта, чей тип тайла
/// имеет таблицу объектов, объект появляется с шансом 1 из `one_in`.
/// Уже стоящие объекты (башни, логова) не перезаписываются.
pub fn place_features<R: Rng + ?Sized>(
    grid: &mut TerrainGrid,
    rules: &GenerationRules,
    plane: usize,
    one_in: u32,
    rng: &mut R,
) -> Result<usize> {
    let sys = *grid.coordinate_system();
    let mut placed = 0;

    for (x, y) in sys.cells() {
        let cell = grid.get(plane, x, y);
        if cell.map_feature.is_some() {
            continue;
        }
        let tile = rules.tile_type(&cell.tile_type)?;
        if tile.features.is_empty() || rng.gen_range(0..one_in.max(1)) != 0 {
            continue;
        }

        if let Some(feature) = pick_weighted(&tile.features, plane, rng) {
            grid.get_mut(plane, x, y).map_feature = Some(feature.to_string());
            placed += 1;
        }
    }

    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CoordinateSystem;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_every_tile_gets_feature_with_chance_one() {
        let rules = GenerationRules::standard().unwrap();
        let mut grid = TerrainGrid::new(CoordinateSystem::new(6, 5, 2, true, false), "hills");
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let placed = place_features(&mut grid, &rules, 0, 1, &mut rng).unwrap();

        assert_eq!(placed, 30);
        let hills = rules.tile_type("hills").unwrap();
        for (_, _, cell) in grid.cells(0) {
            let id = cell.map_feature.as_deref().unwrap();
            let entry = hills.features.iter().find(|f| f.feature_id == id).unwrap();
            // Адамантий на Арканусе не встречается
            assert_ne!(entry.chances[0], 0);
        }
        // Вторая плоскость не тронута
        assert!(grid.cells(1).all(|(_, _, c)| c.map_feature.is_none()));
    }

    #[test]
    fn test_existing_features_kept() {
        let rules = GenerationRules::standard().unwrap();
        let mut grid = TerrainGrid::new(CoordinateSystem::new(3, 3, 1, false, false), "mountains");
        grid.get_mut(0, 1, 1).map_feature = Some("tower_of_wizardry".to_string());
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        place_features(&mut grid, &rules, 0, 1, &mut rng).unwrap();

        assert_eq!(
            grid.get(0, 1, 1).map_feature.as_deref(),
            Some("tower_of_wizardry")
        );
    }

    #[test]
    fn test_tiles_without_table_untouched() {
        let rules = GenerationRules::standard().unwrap();
        let mut grid = TerrainGrid::new(CoordinateSystem::new(4, 4, 1, false, false), "grassland");
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(place_features(&mut grid, &rules, 0, 1, &mut rng).unwrap(), 0);
    }

    #[test]
    fn test_plane_weights_exclude_zero_chance() {
        let chances = vec![
            FeatureChance {
                feature_id: "quork".to_string(),
                chances: vec![0, 5],
            },
            FeatureChance {
                feature_id: "gems".to_string(),
                chances: vec![2, 0],
            },
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..20 {
            assert_eq!(pick_weighted(&chances, 0, &mut rng), Some("gems"));
            assert_eq!(pick_weighted(&chances, 1, &mut rng), Some("quork"));
        }
    }
}
