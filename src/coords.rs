//! Система координат карты
//!
//! Все алгоритмы генерации работают через [`CoordinateSystem`]: она знает размеры карты,
//! количество плоскостей и то, замыкается ли карта по горизонтали и/или вертикали.
//! Незамкнутые края карты называются «сингулярностями» — часть алгоритмов избегает их
//! или штрафует клетки рядом с ними.

use serde::{Deserialize, Serialize};

/// Размеры карты и правила замыкания краёв
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub width: usize,
    pub height: usize,
    /// Количество плоскостей (для боевой карты всегда 1)
    pub depth: usize,
    pub wraps_left_to_right: bool,
    pub wraps_top_to_bottom: bool,
}

impl CoordinateSystem {
    #[must_use]
    pub fn new(
        width: usize,
        height: usize,
        depth: usize,
        wraps_left_to_right: bool,
        wraps_top_to_bottom: bool,
    ) -> Self {
        Self {
            width,
            height,
            depth,
            wraps_left_to_right,
            wraps_top_to_bottom,
        }
    }

    /// Количество клеток одной плоскости
    #[must_use]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    #[must_use]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Приводит произвольные координаты к клетке карты с учётом замыкания.
    /// Возвращает `None`, если точка лежит за незамкнутым краем.
    #[must_use]
    pub fn normalize(&self, x: i64, y: i64) -> Option<(usize, usize)> {
        let w = self.width as i64;
        let h = self.height as i64;

        let nx = if self.wraps_left_to_right {
            x.rem_euclid(w)
        } else if (0..w).contains(&x) {
            x
        } else {
            return None;
        };

        let ny = if self.wraps_top_to_bottom {
            y.rem_euclid(h)
        } else if (0..h).contains(&y) {
            y
        } else {
            return None;
        };

        Some((nx as usize, ny as usize))
    }

    /// Соседняя клетка в заданном направлении
    #[must_use]
    pub fn step(&self, x: usize, y: usize, direction: Direction) -> Option<(usize, usize)> {
        let (dx, dy) = direction.offset();
        self.normalize(x as i64 + dx, y as i64 + dy)
    }

    /// Сдвиг на произвольный вектор (используется при обходе колец аур)
    #[must_use]
    pub fn offset(&self, x: usize, y: usize, dx: i64, dy: i64) -> Option<(usize, usize)> {
        self.normalize(x as i64 + dx, y as i64 + dy)
    }

    /// Лежит ли клетка на незамкнутом краю карты
    #[must_use]
    pub fn is_singularity(&self, x: usize, y: usize) -> bool {
        (!self.wraps_left_to_right && (x == 0 || x + 1 >= self.width))
            || (!self.wraps_top_to_bottom && (y == 0 || y + 1 >= self.height))
    }

    /// Расстояние в клетках (метрика Чебышёва) с учётом замыкания
    #[must_use]
    pub fn distance(&self, a: (usize, usize), b: (usize, usize)) -> usize {
        let mut dx = a.0.abs_diff(b.0);
        let mut dy = a.1.abs_diff(b.1);
        if self.wraps_left_to_right {
            dx = dx.min(self.width - dx);
        }
        if self.wraps_top_to_bottom {
            dy = dy.min(self.height - dy);
        }
        dx.max(dy)
    }

    /// Все клетки одной плоскости в порядке строк
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let width = self.width;
        (0..self.area()).map(move |i| (i % width, i / width))
    }
}

/// Координаты клетки на конкретной плоскости
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapCoords {
    pub x: usize,
    pub y: usize,
    pub plane: usize,
}

impl MapCoords {
    #[must_use]
    pub fn new(x: usize, y: usize, plane: usize) -> Self {
        Self { x, y, plane }
    }
}

/// Восемь направлений, по часовой стрелке начиная с севера
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Направления, по которым могут течь реки
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    #[must_use]
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    #[must_use]
    pub fn opposite(self) -> Direction {
        Direction::ALL[(self as usize + 4) % 8]
    }

    /// Бит в 8-битной маске соседей (бит 0 — север, далее по часовой стрелке)
    #[must_use]
    pub fn neighbour_bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Бит в 4-битной маске направлений реки: N=1, E=2, S=4, W=8.
    /// Для диагоналей возвращает `None`.
    #[must_use]
    pub fn river_bit(self) -> Option<u8> {
        match self {
            Direction::North => Some(1),
            Direction::East => Some(2),
            Direction::South => Some(4),
            Direction::West => Some(8),
            _ => None,
        }
    }

    /// Разворачивает 4-битную маску реки в список направлений
    pub fn from_river_mask(mask: u8) -> impl Iterator<Item = Direction> {
        Direction::CARDINAL
            .into_iter()
            .filter(move |d| d.river_bit().is_some_and(|bit| mask & bit != 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_wraps_only_enabled_axes() {
        let sys = CoordinateSystem::new(60, 40, 2, true, false);

        assert_eq!(sys.normalize(-1, 5), Some((59, 5)));
        assert_eq!(sys.normalize(60, 5), Some((0, 5)));
        assert_eq!(sys.normalize(3, -1), None);
        assert_eq!(sys.normalize(3, 40), None);
    }

    #[test]
    fn test_singularity_only_on_unwrapped_edges() {
        let sys = CoordinateSystem::new(10, 8, 1, true, false);

        assert!(!sys.is_singularity(0, 4));
        assert!(!sys.is_singularity(9, 4));
        assert!(sys.is_singularity(4, 0));
        assert!(sys.is_singularity(4, 7));
    }

    #[test]
    fn test_distance_uses_shorter_way_round() {
        let sys = CoordinateSystem::new(60, 40, 2, true, false);

        assert_eq!(sys.distance((1, 10), (58, 10)), 3);
        assert_eq!(sys.distance((1, 1), (1, 38)), 37);
    }

    #[test]
    fn test_river_mask_round_trip_through_directions() {
        let dirs: Vec<Direction> = Direction::from_river_mask(0b1010).collect();
        assert_eq!(dirs, vec![Direction::East, Direction::West]);
        assert_eq!(Direction::South.opposite(), Direction::North);
        assert_eq!(Direction::NorthEast.opposite(), Direction::SouthWest);
    }
}
