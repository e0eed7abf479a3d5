use crate::error::Result;
use crate::models::{GameProfile, PluginName};
use crate::services::load_order::LoadOrder;
use crate::services::persistence;

use std::collections::HashSet;

/// One game's load order session: a [`GameProfile`] bundled with the
/// in-memory [`LoadOrder`] it describes.
///
/// This is the type embedding applications are expected to hold. It wires
/// the profile through every operation so callers never pass mismatched
/// profiles, and it owns the load/save round trip against the game's
/// on-disk state.
///
/// # Example
///
/// ```no_run
/// use camino::Utf8Path;
/// use loadorder::{GameId, GameProfile, LoadOrderManager};
///
/// # fn main() -> loadorder::Result<()> {
/// let profile = GameProfile::new(
///     GameId::Skyrim,
///     Utf8Path::new("C:/Games/Skyrim"),
///     Utf8Path::new("C:/Users/me/AppData/Local/Skyrim"),
/// );
/// let mut manager = LoadOrderManager::new(profile);
/// manager.load()?;
/// manager.activate("Blank.esp")?;
/// manager.save()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LoadOrderManager {
    profile: GameProfile,
    load_order: LoadOrder,
}

impl LoadOrderManager {
    /// Creates a manager with an empty in-memory load order. Call
    /// [`load`](Self::load) to pick up the on-disk state.
    pub fn new(profile: GameProfile) -> Self {
        Self {
            profile,
            load_order: LoadOrder::new(),
        }
    }

    pub fn profile(&self) -> &GameProfile {
        &self.profile
    }

    pub fn load_order(&self) -> &LoadOrder {
        &self.load_order
    }

    /// Replaces the in-memory state with what the game's files describe,
    /// discarding any unsaved changes. Loading twice with unchanged files
    /// yields the same state.
    pub fn load(&mut self) -> Result<()> {
        self.load_order = persistence::load(&self.profile)?;
        Ok(())
    }

    /// Writes the in-memory state to the game's files.
    pub fn save(&self) -> Result<()> {
        persistence::save(&self.load_order, &self.profile)
    }

    /// Whether the game's two text manifests agree. Always true for
    /// Timestamp games.
    pub fn is_synchronised(&self) -> Result<bool> {
        persistence::is_synchronised(&self.profile)
    }

    pub fn set_load_order(&mut self, plugin_names: &[&str]) -> Result<()> {
        self.load_order.set_load_order(plugin_names, &self.profile)
    }

    pub fn set_position(&mut self, plugin_name: &str, position: usize) -> Result<()> {
        self.load_order
            .set_position(plugin_name, position, &self.profile)
    }

    pub fn activate(&mut self, plugin_name: &str) -> Result<()> {
        self.load_order.activate(plugin_name, &self.profile)
    }

    pub fn deactivate(&mut self, plugin_name: &str) -> Result<()> {
        self.load_order.deactivate(plugin_name, &self.profile)
    }

    pub fn set_active_plugins(&mut self, plugin_names: &[&str]) -> Result<()> {
        self.load_order
            .set_active_plugins(plugin_names, &self.profile)
    }

    pub fn is_active(&self, plugin_name: &str) -> bool {
        self.load_order.is_active(plugin_name)
    }

    pub fn active_plugins(&self) -> HashSet<PluginName> {
        self.load_order.active_plugins()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.load_order.plugin_names()
    }

    pub fn position(&self, plugin_name: &str) -> usize {
        self.load_order.position(plugin_name)
    }

    pub fn plugin_at(&self, position: usize) -> Result<&str> {
        self.load_order.plugin_at(position)
    }

    pub fn clear(&mut self) {
        self.load_order.clear();
    }
}
