pub mod combat;
pub mod config;
pub mod coords;
pub mod error;
pub mod garrison;
pub mod heightmap;
pub mod overland;
pub mod preview;
pub mod rampage;
pub mod rules;
pub mod terrain;

pub use combat::{CombatContext, CombatGrid, generate_combat_map, regenerate_borders};
pub use config::GenerationParams;
pub use coords::{CoordinateSystem, MapCoords};
pub use error::{MapGenError, Result};
pub use garrison::PlacedUnit;
pub use heightmap::{Heightmap, generate_heightmap};
pub use overland::{GeneratedWorld, OverlandMapGenerator, PlacedAreaEffect};
pub use rules::GenerationRules;
pub use terrain::{TerrainCell, TerrainGrid};
