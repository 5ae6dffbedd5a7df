//! Карта высот на основе плазменного фрактала
//!
//! Используется и для мировой карты (суша/море, холмы, горы), и для боевой карты
//! (гряды и тёмные участки).
//!
//! ## Алгоритм
//!
//! 1. На грубой решётке (шаг = размер «зоны») расставляются случайные высоты. Точки на
//!    незамкнутых краях карты опускаются (штраф сингулярности), а в полосе у верхнего и нижнего
//!    края опускаются ещё раз — там позже появится тундра.
//! 2. Каждая ячейка решётки рекурсивно делится на четыре: середины сторон и центр получают
//!    среднее соседних углов плюс случайное отклонение, масштаб которого уменьшается в 2/3 раза
//!    на каждом уровне. Уже заданные клетки не перезаписываются — общие стороны соседних
//!    ячеек вычисляются ровно один раз.
//! 3. Высоты сдвигаются так, чтобы минимум стал равен 0, и строится гистограмма
//!    «высота → число клеток», по которой без повторного сканирования отвечают на вопрос
//!    «сколько клеток не ниже порога».

use crate::coords::CoordinateSystem;
use image::{ImageBuffer, Luma};
use rand::Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Карта высот одной плоскости
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    pub width: usize,
    pub height: usize,
    /// Высоты после сдвига минимума в 0
    zero_based: Vec<u32>,
    /// `height_counts[h]` — сколько клеток имеют высоту `h`
    height_counts: Vec<u64>,
}

impl Heightmap {
    /// Строит карту из уже готовых высот (произвольного знака)
    #[must_use]
    pub fn from_heights(width: usize, height: usize, heights: &[i32]) -> Self {
        assert_eq!(heights.len(), width * height, "heights must cover the grid");

        let min = heights.iter().copied().min().unwrap_or(0);
        let zero_based: Vec<u32> = heights.iter().map(|&h| (h - min) as u32).collect();

        let max = zero_based.iter().copied().max().unwrap_or(0) as usize;
        let mut height_counts = vec![0u64; max + 1];
        for &h in &zero_based {
            height_counts[h as usize] += 1;
        }

        Self {
            width,
            height,
            zero_based,
            height_counts,
        }
    }

    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.zero_based[y * self.width + x]
    }

    #[must_use]
    pub fn height_counts(&self) -> &[u64] {
        &self.height_counts
    }

    /// Число клеток с высотой `>= threshold`
    #[must_use]
    pub fn count_at_or_above(&self, threshold: usize) -> u64 {
        self.height_counts.iter().skip(threshold).sum()
    }

    /// Число клеток с высотой `<= threshold`
    #[must_use]
    pub fn count_at_or_below(&self, threshold: usize) -> u64 {
        self.height_counts.iter().take(threshold + 1).sum()
    }

    /// Порог `t`, при котором число клеток с высотой `>= t` ближе всего к `desired`.
    ///
    /// Гистограмма просматривается сверху вниз; если последняя добавленная высота увела
    /// счёт дальше от цели, чем без неё, шаг откатывается. При равенстве высота остаётся.
    #[must_use]
    pub fn highest_threshold(&self, desired: u64) -> usize {
        let mut threshold = self.height_counts.len();
        let mut total = 0;
        while total < desired && threshold > 0 {
            threshold -= 1;
            total += self.height_counts[threshold];
        }

        if total > desired {
            let without = total - self.height_counts[threshold];
            if desired - without < total - desired {
                threshold += 1;
            }
        }
        threshold
    }

    /// Граница `b`, при которой число клеток с высотой `< b` ближе всего к `desired`
    #[must_use]
    pub fn lowest_threshold(&self, desired: u64) -> usize {
        let mut bound = 0;
        let mut total = 0;
        while total < desired && bound < self.height_counts.len() {
            total += self.height_counts[bound];
            bound += 1;
        }

        if total > desired {
            let without = total - self.height_counts[bound - 1];
            if desired - without < total - desired {
                bound -= 1;
            }
        }
        bound
    }

    /// Вызывает `callback` для каждой клетки из «верхних» `desired` (с точностью до гистограммы).
    /// Возвращает число обработанных клеток.
    pub fn set_highest_tiles(&self, desired: u64, mut callback: impl FnMut(usize, usize)) -> u64 {
        let threshold = self.highest_threshold(desired) as u32;
        let mut count = 0;
        for (i, &h) in self.zero_based.iter().enumerate() {
            if h >= threshold {
                callback(i % self.width, i / self.width);
                count += 1;
            }
        }
        count
    }

    /// То же для самых низких клеток
    pub fn set_lowest_tiles(&self, desired: u64, mut callback: impl FnMut(usize, usize)) -> u64 {
        let bound = self.lowest_threshold(desired) as u32;
        let mut count = 0;
        for (i, &h) in self.zero_based.iter().enumerate() {
            if h < bound {
                callback(i % self.width, i / self.width);
                count += 1;
            }
        }
        count
    }

    pub fn to_grayscale_image(&self) -> Vec<u8> {
        let max = (self.height_counts.len().max(2) - 1) as f32;

        #[cfg(feature = "parallel")]
        let iter = self.zero_based.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = self.zero_based.iter();

        iter.map(|&v| ((v as f32 / max).clamp(0.0, 1.0) * 255.0) as u8)
            .collect()
    }

    pub fn save_as_png(&self, path: &str) -> crate::Result<()> {
        let img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_raw(
            self.width as u32,
            self.height as u32,
            self.to_grayscale_image(),
        )
        .ok_or_else(|| std::io::Error::other("height buffer does not match image size"))?;
        img.save(path)?;
        Ok(())
    }
}

/// Параметры фрактала
#[derive(Debug, Clone, Copy)]
pub struct FractalSettings {
    /// Ширина зоны грубой решётки в клетках
    pub zone_width: usize,
    /// Высота зоны грубой решётки в клетках
    pub zone_height: usize,
    /// Ширина полосы у верхнего и нижнего края, где высоты дополнительно занижаются
    pub edge_avoidance: usize,
}

/// Генерирует карту высот для одной плоскости системы координат
pub fn generate_heightmap<R: Rng + ?Sized>(
    sys: &CoordinateSystem,
    settings: FractalSettings,
    rng: &mut R,
) -> Heightmap {
    let mut cells: Vec<Option<i32>> = vec![None; sys.area()];

    let nowrap_x = usize::from(!sys.wraps_left_to_right);
    let nowrap_y = usize::from(!sys.wraps_top_to_bottom);
    let xdiv = (sys.width / settings.zone_width.max(1)).max(1);
    let ydiv = (sys.height / settings.zone_height.max(1)).max(1);
    let xmax = sys.width - nowrap_x;
    let ymax = sys.height - nowrap_y;

    let step = (xmax + ymax).max(1) as i32;
    let avoid_edge = step / 3;

    // === 1. Грубая решётка ===
    for i in 0..xdiv + nowrap_x {
        for j in 0..ydiv + nowrap_y {
            let Some((x, y)) = sys.normalize((i * xmax / xdiv) as i64, (j * ymax / ydiv) as i64)
            else {
                continue;
            };

            let mut value = rng.gen_range(0..2 * step) - step;
            if sys.is_singularity(x, y) {
                value -= avoid_edge;
            }
            if y < settings.edge_avoidance || y + settings.edge_avoidance >= sys.height {
                value -= avoid_edge;
            }
            cells[sys.index(x, y)] = Some(value);
        }
    }

    // === 2. Рекурсивное деление каждой зоны ===
    for i in 0..xdiv {
        for j in 0..ydiv {
            subdivide(
                sys,
                &mut cells,
                rng,
                step,
                (i * xmax / xdiv, j * ymax / ydiv),
                ((i + 1) * xmax / xdiv, (j + 1) * ymax / ydiv),
            );
        }
    }

    // === 3. Сдвиг к нулю и гистограмма ===
    let fallback = cells.iter().flatten().copied().min().unwrap_or(0);
    let heights: Vec<i32> = cells.into_iter().map(|h| h.unwrap_or(fallback)).collect();

    Heightmap::from_heights(sys.width, sys.height, &heights)
}

/// Одна ячейка плазменного фрактала: `(xl, yt)` — левый верхний угол, `(xr, yb)` — правый нижний.
/// Правая/нижняя граница может совпадать с шириной/высотой карты, тогда она замыкается на 0.
fn subdivide<R: Rng + ?Sized>(
    sys: &CoordinateSystem,
    cells: &mut [Option<i32>],
    rng: &mut R,
    step: i32,
    (xl, yt): (usize, usize),
    (xr, yb): (usize, usize),
) {
    if yb <= yt || xr <= xl || (yb - yt == 1 && xr - xl == 1) {
        return;
    }

    let xm = (xl + xr) / 2;
    let ym = (yt + yb) / 2;

    let at = |x: usize, y: usize| sys.normalize(x as i64, y as i64).map(|(nx, ny)| sys.index(nx, ny));
    let value = |cells: &[Option<i32>], x: usize, y: usize| {
        at(x, y).and_then(|i| cells[i]).unwrap_or(0)
    };

    let top_left = value(cells, xl, yt);
    let bottom_left = value(cells, xl, yb);
    let top_right = value(cells, xr, yt);
    let bottom_right = value(cells, xr, yb);

    // Середины сторон и центр — только если клетка ещё не задана
    let mut set_if_unset = |cells: &mut [Option<i32>], x: usize, y: usize, base: i32| {
        let Some(i) = at(x, y) else {
            return;
        };
        if cells[i].is_none() {
            let jitter = if step > 0 {
                rng.gen_range(0..step) - step / 2
            } else {
                0
            };
            cells[i] = Some(base + jitter);
        }
    };

    set_if_unset(cells, xm, yt, (top_left + top_right) / 2);
    set_if_unset(cells, xm, yb, (bottom_left + bottom_right) / 2);
    set_if_unset(cells, xl, ym, (top_left + bottom_left) / 2);
    set_if_unset(cells, xr, ym, (top_right + bottom_right) / 2);
    set_if_unset(
        cells,
        xm,
        ym,
        (top_left + bottom_left + top_right + bottom_right) / 4,
    );

    let next = 2 * step / 3;
    subdivide(sys, cells, rng, next, (xl, yt), (xm, ym));
    subdivide(sys, cells, rng, next, (xl, ym), (xm, yb));
    subdivide(sys, cells, rng, next, (xm, yt), (xr, ym));
    subdivide(sys, cells, rng, next, (xm, ym), (xr, yb));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn settings() -> FractalSettings {
        FractalSettings {
            zone_width: 10,
            zone_height: 10,
            edge_avoidance: 3,
        }
    }

    #[test]
    fn test_generated_heightmap_invariants() {
        for (wrap_x, wrap_y) in [(true, false), (false, false), (true, true), (false, true)] {
            let sys = CoordinateSystem::new(60, 40, 1, wrap_x, wrap_y);
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            let map = generate_heightmap(&sys, settings(), &mut rng);

            let total: u64 = map.height_counts().iter().sum();
            assert_eq!(total, 60 * 40);
            assert!(map.height_counts()[0] > 0, "minimum must be exactly 0");
            assert_eq!(map.count_at_or_above(0), 60 * 40);
        }
    }

    #[test]
    fn test_odd_sizes_still_cover_every_cell() {
        let sys = CoordinateSystem::new(13, 25, 1, false, false);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let map = generate_heightmap(
            &sys,
            FractalSettings {
                zone_width: 4,
                zone_height: 5,
                edge_avoidance: 0,
            },
            &mut rng,
        );
        assert_eq!(map.height_counts().iter().sum::<u64>(), 13 * 25);
    }

    #[test]
    fn test_same_seed_same_heights() {
        let sys = CoordinateSystem::new(30, 20, 1, true, false);
        let a = generate_heightmap(&sys, settings(), &mut ChaCha8Rng::seed_from_u64(5));
        let b = generate_heightmap(&sys, settings(), &mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_highest_threshold_picks_nearest_count() {
        // гистограмма: [2, 3, 1]
        let map = Heightmap::from_heights(3, 2, &[0, 0, 1, 1, 1, 2]);

        assert_eq!(map.count_at_or_above(map.highest_threshold(1)), 1);
        // 1 клетка (ошибка 1) против 4 клеток (ошибка 2) — берём 1
        assert_eq!(map.count_at_or_above(map.highest_threshold(2)), 1);
        // 1 клетка (ошибка 2) против 4 (ошибка 1) — берём 4
        assert_eq!(map.count_at_or_above(map.highest_threshold(3)), 4);
        assert_eq!(map.count_at_or_above(map.highest_threshold(6)), 6);
        assert_eq!(map.count_at_or_above(map.highest_threshold(0)), 0);
    }

    #[test]
    fn test_threshold_tie_includes_the_bucket() {
        // гистограмма: [2, 2, 2]; цель 3 одинаково далека от 2 и 4
        let map = Heightmap::from_heights(3, 2, &[-5, -5, -4, -4, -3, -3]);
        assert_eq!(map.count_at_or_above(map.highest_threshold(3)), 4);
        assert_eq!(map.count_at_or_below(map.lowest_threshold(3) - 1), 4);
    }

    #[test]
    fn test_set_lowest_tiles_reports_cells() {
        let map = Heightmap::from_heights(3, 2, &[0, 0, 1, 1, 1, 2]);
        let mut seen = Vec::new();
        let count = map.set_lowest_tiles(2, |x, y| seen.push((x, y)));

        assert_eq!(count, 2);
        assert_eq!(seen, vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn test_grayscale_spans_full_range() {
        let map = Heightmap::from_heights(3, 2, &[0, 0, 1, 1, 1, 2]);
        assert_eq!(map.to_grayscale_image(), vec![0, 0, 127, 127, 127, 255]);
    }

    #[test]
    fn test_zero_based_shift() {
        let map = Heightmap::from_heights(2, 2, &[-10, -7, 0, 5]);
        assert_eq!(map.get(0, 0), 0);
        assert_eq!(map.get(1, 1), 15);
        assert_eq!(map.count_at_or_below(3), 2);
    }
}
