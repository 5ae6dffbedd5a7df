//! Предпросмотр плоскости в PNG
//!
//! Каждая клетка рисуется квадратом `scale × scale` цветом своего типа тайла. Реки рисуются
//! отрезками от центра клетки к соседям, логова и башни — кружками цвета объекта.

use crate::coords::Direction;
use crate::error::{MapGenError, Result};
use crate::rules::GenerationRules;
use crate::terrain::TerrainGrid;
use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const RIVER_COLOR: Rgb<u8> = Rgb([40, 90, 200]);

/// Разбирает цвет вида "#rrggbb"
pub fn parse_color(hex: &str) -> Result<Rgb<u8>> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    let bad = || MapGenError::Configuration(format!("invalid colour \"{hex}\""));
    if digits.len() != 6 {
        return Err(bad());
    }
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .ok_or_else(bad)
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

/// Рисует плоскость `plane`
pub fn render_plane(
    grid: &TerrainGrid,
    rules: &GenerationRules,
    plane: usize,
    scale: u32,
) -> Result<RgbImage> {
    let sys = *grid.coordinate_system();
    let scale = scale.max(1);
    let cells: Vec<_> = grid.cells(plane).map(|(_, _, c)| c).collect();

    #[cfg(feature = "parallel")]
    let iter = cells.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = cells.iter();

    let colors: Vec<Rgb<u8>> = iter
        .map(|cell| parse_color(&rules.tile_type(&cell.tile_type)?.color))
        .collect::<Result<_>>()?;

    let width = sys.width as u32;
    let mut img: RgbImage = ImageBuffer::from_fn(width * scale, sys.height as u32 * scale, |px, py| {
        colors[((py / scale) * width + px / scale) as usize]
    });

    let half = scale as f32 / 2.0;
    let center = |x: usize, y: usize| (x as f32 * scale as f32 + half, y as f32 * scale as f32 + half);

    for (x, y, cell) in grid.cells(plane) {
        let (cx, cy) = center(x, y);

        if let Some(mask) = cell.river_directions {
            for dir in Direction::from_river_mask(mask) {
                let (dx, dy) = dir.offset();
                let end = (cx + dx as f32 * half, cy + dy as f32 * half);
                draw_line_segment_mut(&mut img, (cx, cy), end, RIVER_COLOR);
            }
        }

        let Some(feature) = &cell.map_feature else {
            continue;
        };
        if let Some(color) = &rules.map_feature(feature)?.color {
            let radius = (scale / 3).max(1) as i32;
            draw_filled_circle_mut(&mut img, (cx as i32, cy as i32), radius, parse_color(color)?);
        }
    }

    Ok(img)
}

/// Рисует плоскость и сохраняет её в PNG
pub fn save_plane_as_png(
    grid: &TerrainGrid,
    rules: &GenerationRules,
    plane: usize,
    scale: u32,
    path: &Path,
) -> Result<()> {
    render_plane(grid, rules, plane, scale)?.save(path)?;
    Ok(())
}
