//! Ошибки генерации карт
//!
//! Три смысловых вида ошибок генератора:
//! - **Configuration** — параметры сессии противоречат системе координат (число плоскостей,
//!   таблицы силы узлов, размеры зон). Обнаруживается до начала генерации.
//! - **Lookup** — идентификатор тайла, объекта карты, здания или юнита отсутствует в правилах.
//! - **`PlacementExhausted`** — вероятностное размещение не нашло подходящей клетки там, где это
//!   недопустимо (башни при нулевом разносе, ветвление реки).
//!
//! Остальные варианты относятся к загрузке файлов и предпросмотру.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapGenError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{kind} \"{id}\" not found in generation rules")]
    Lookup { kind: &'static str, id: String },

    #[error("placement exhausted: {0}")]
    PlacementExhausted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl MapGenError {
    pub(crate) fn lookup(kind: &'static str, id: impl Into<String>) -> Self {
        MapGenError::Lookup {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MapGenError>;
