use clap::Parser;
use overland_mapgen::combat::CombatContext;
use overland_mapgen::preview::save_plane_as_png;
use overland_mapgen::{
    GeneratedWorld, GenerationParams, GenerationRules, MapCoords, OverlandMapGenerator, PlacedAreaEffect,
    PlacedUnit, generate_combat_map,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Генератор мировых и боевых карт
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к файлу параметров в формате TOML (по умолчанию: стандартные параметры)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Путь к файлу правил в формате TOML (по умолчанию: встроенные правила)
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Переопределяет сид из параметров
    #[arg(short, long)]
    seed: Option<u64>,

    /// Каталог для выходных PNG и JSON
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Размер клетки в пикселях на предпросмотре
    #[arg(long, default_value_t = 8)]
    scale: u32,

    /// Сохранить карты высот плоскостей (height_<n>.png)
    #[arg(long)]
    heightmaps: bool,

    /// Построить боевую карту для клетки "x,y,plane"
    #[arg(long, value_parser = parse_coords)]
    combat_tile: Option<MapCoords>,
}

fn parse_coords(s: &str) -> Result<MapCoords, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, plane] = parts.as_slice() else {
        return Err(format!("expected x,y,plane, got \"{s}\""));
    };
    let num = |v: &str| v.parse::<usize>().map_err(|e| format!("{v}: {e}"));
    Ok(MapCoords::new(num(x)?, num(y)?, num(plane)?))
}

/// Сводка мира для внешних инструментов
#[derive(Serialize)]
struct WorldSummary<'a> {
    seed: u64,
    width: usize,
    height: usize,
    planes: usize,
    land_thresholds: &'a [usize],
    units: &'a [PlacedUnit],
    area_effects: &'a [PlacedAreaEffect],
}

fn write_summary(world: &GeneratedWorld, seed: u64, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let sys = world.terrain.coordinate_system();
    let summary = WorldSummary {
        seed,
        width: sys.width,
        height: sys.height,
        planes: sys.depth,
        land_thresholds: &world.land_thresholds,
        units: &world.units,
        area_effects: &world.area_effects,
    };
    let path = cli.output.join("world.json");
    fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
    tracing::info!(path = %path.display(), "world summary saved");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut params = match &cli.config {
        Some(path) => GenerationParams::from_toml_file(&path.to_string_lossy())?,
        None => GenerationParams::default(),
    };
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }
    let rules = match &cli.rules {
        Some(path) => GenerationRules::from_toml_file(&path.to_string_lossy())?,
        None => GenerationRules::standard()?,
    };

    let world = OverlandMapGenerator::new(&params, &rules)?.generate_seeded()?;

    fs::create_dir_all(&cli.output)?;
    for plane in 0..world.terrain.coordinate_system().depth {
        let path = cli.output.join(format!("plane_{plane}.png"));
        save_plane_as_png(&world.terrain, &rules, plane, cli.scale, &path)?;
        tracing::info!(plane, path = %path.display(), "preview saved");
    }
    if cli.heightmaps {
        for (plane, heightmap) in world.height_maps.iter().enumerate() {
            let path = cli.output.join(format!("height_{plane}.png"));
            heightmap.save_as_png(&path.to_string_lossy())?;
            tracing::info!(plane, path = %path.display(), "heightmap saved");
        }
    }
    write_summary(&world, params.seed, &cli)?;

    if let Some(coords) = cli.combat_tile {
        let sys = world.terrain.coordinate_system();
        if coords.x >= sys.width || coords.y >= sys.height || coords.plane >= sys.depth {
            return Err(format!("combat tile {coords:?} is outside the map").into());
        }
        let cell = world.terrain.at(coords);
        let context = CombatContext {
            tile_type: cell.tile_type.clone(),
            map_feature: cell.map_feature.clone(),
            ..CombatContext::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let combat = generate_combat_map(&context, &rules, &params.combat, &mut rng)?;

        let path = cli.output.join("combat.json");
        fs::write(&path, serde_json::to_string_pretty(&combat)?)?;
        tracing::info!(path = %path.display(), tile_type = %context.tile_type, "combat map saved");
    }

    Ok(())
}
