use std::time::Duration;

use crate::domain::CategoryKey;

use super::state::LoadState;

/// Typed settings change pushed into the coordinator by the settings layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    PageSize(usize),
    DefaultCategory(CategoryKey),
    RefreshInterval(Duration),
}

/// Change notifications for whatever binds to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    LoadStateChanged { key: CategoryKey, state: LoadState },
    /// A reload committed a new list for the key.
    CacheReplaced { key: CategoryKey, count: usize },
    /// Papers inside the key's list were rewritten in place.
    CacheUpdated { key: CategoryKey },
    FavoriteToggled { id: String, is_favorite: bool },
    ActiveChanged(CategoryKey),
    SearchCleared,
    SettingChanged(SettingChange),
}
