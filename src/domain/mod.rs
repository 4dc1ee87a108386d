pub mod category;
pub mod paper;

pub use category::CategoryKey;
pub use paper::{sort_favorites, FavoriteMark, Paper};
