//! The in-memory load order and its mutation rules.
//!
//! A [`LoadOrder`] is an ordered list of [`PluginEntry`] values upholding a
//! set of invariants after every public operation:
//!
//! - no two entries share a name under case-insensitive comparison
//! - every master precedes every non-master
//! - on Textfile games the game's master file sits at position 0
//! - at most [`MAX_ACTIVE_PLUGINS`] entries are active
//! - on Textfile games every implicitly active plugin whose file exists is
//!   present and active
//!
//! Operations that can fail are transactional: they validate up front or
//! build the next state on a copy and commit it with a swap, so a returned
//! error means nothing changed.

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::error::{Error, Result};
use crate::models::{GameProfile, LoadOrderMethod, PluginEntry, PluginName};
use crate::services::probe;

/// No game activates more than 255 plugins.
pub const MAX_ACTIVE_PLUGINS: usize = 255;

/// The ordered collection of plugins known to one game session.
#[derive(Clone, Debug, Default)]
pub struct LoadOrder {
    entries: Vec<PluginEntry>,
}

impl LoadOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Vec<PluginEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PluginEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<PluginEntry> {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plugin names in load order, in their original spelling.
    pub fn plugin_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.name().as_str().to_string())
            .collect()
    }

    /// Case-insensitive lookup of a plugin's position.
    pub fn index_of(&self, plugin_name: &str) -> Option<usize> {
        let target = PluginName::new(plugin_name);
        self.entries.iter().position(|entry| entry.name() == &target)
    }

    /// A plugin's position, or the current length as a not-present sentinel.
    pub fn position(&self, plugin_name: &str) -> usize {
        self.index_of(plugin_name).unwrap_or(self.entries.len())
    }

    /// The plugin name at the given position.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `position` is past the last entry.
    pub fn plugin_at(&self, position: usize) -> Result<&str> {
        self.entries
            .get(position)
            .map(|entry| entry.name().as_str())
            .ok_or(Error::OutOfRange(position))
    }

    pub fn is_active(&self, plugin_name: &str) -> bool {
        let target = PluginName::new(plugin_name);
        self.entries
            .iter()
            .any(|entry| entry.is_active() && entry.name() == &target)
    }

    /// The active set as case-insensitive names.
    pub fn active_plugins(&self) -> HashSet<PluginName> {
        self.entries
            .iter()
            .filter(|entry| entry.is_active())
            .map(|entry| entry.name().clone())
            .collect()
    }

    /// Active plugin names in load order.
    pub fn active_plugin_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.is_active())
            .map(|entry| entry.name().as_str().to_string())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_active()).count()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replaces the whole load order with `plugin_names`.
    ///
    /// Prior active flags are kept for plugins still present and dropped for
    /// plugins removed. On Textfile games the game's master file and every
    /// implicitly active plugin whose file exists end up present and active.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOrder`] for case-insensitive duplicates, a non-master
    /// before a master, a Textfile game's master file not first, or a name
    /// that is not a valid plugin. [`Error::TooManyActive`] if the carried
    /// active flags would exceed the limit. The load order is unchanged on
    /// any error.
    pub fn set_load_order(&mut self, plugin_names: &[&str], profile: &GameProfile) -> Result<()> {
        ensure_unique(plugin_names)?;

        if profile.method() == LoadOrderMethod::Textfile {
            if let Some(first) = plugin_names.first() {
                if !PluginName::new(first).matches(profile.master_file()) {
                    return Err(Error::InvalidOrder(format!(
                        "\"{}\" must load first",
                        profile.master_file()
                    )));
                }
            }
        }

        let mut next = Vec::with_capacity(plugin_names.len());
        for name in plugin_names {
            let entry = match self.find(name) {
                Some(existing) => existing.clone(),
                None => probe_entry(profile, name).map_err(invalid_plugin_to_order)?,
            };
            next.push(entry);
        }

        ensure_masters_first(&next)?;

        let mut next = LoadOrder::from_entries(next);
        if profile.method() == LoadOrderMethod::Textfile {
            next.enforce_implicit_actives(profile)?;
        }
        if next.active_count() > MAX_ACTIVE_PLUGINS {
            return Err(Error::TooManyActive);
        }

        self.entries = next.entries;
        Ok(())
    }

    /// Moves `plugin_name` to `position`, inserting it if absent.
    ///
    /// Positions past the end are clamped. The moved entry keeps its active
    /// flag; a newly inserted entry starts inactive.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOrder`] if the move would break the master partition,
    /// put anything but the game's master file first on a Textfile game (or
    /// move that master file away from the front), or the name is not a
    /// valid plugin. The load order is unchanged on any error.
    pub fn set_position(
        &mut self,
        plugin_name: &str,
        position: usize,
        profile: &GameProfile,
    ) -> Result<()> {
        if profile.method() == LoadOrderMethod::Textfile {
            let is_game_master = PluginName::new(plugin_name).matches(profile.master_file());
            if position == 0 && !is_game_master {
                return Err(Error::InvalidOrder(format!(
                    "only \"{}\" may load first",
                    profile.master_file()
                )));
            }
            if position != 0 && is_game_master {
                return Err(Error::InvalidOrder(format!(
                    "\"{}\" must load first",
                    profile.master_file()
                )));
            }
        }

        if self.index_of(plugin_name) == Some(position) {
            return Ok(());
        }

        let mut next = self.clone();
        let entry = match next.index_of(plugin_name) {
            Some(index) => next.entries.remove(index),
            None => probe_entry(profile, plugin_name).map_err(invalid_plugin_to_order)?,
        };

        let position = position.min(next.entries.len());
        next.entries.insert(position, entry);

        ensure_masters_first(&next.entries)?;

        self.entries = next.entries;
        Ok(())
    }

    /// Activates `plugin_name`, inserting it if absent.
    ///
    /// A new master is inserted at the master/non-master boundary; a new
    /// non-master is appended. On Textfile games the game's master file goes
    /// to position 0.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPlugin`] if the name fails probing,
    /// [`Error::TooManyActive`] if activation would exceed the limit. The
    /// load order is unchanged on any error.
    pub fn activate(&mut self, plugin_name: &str, profile: &GameProfile) -> Result<()> {
        match self.index_of(plugin_name) {
            Some(index) => {
                if !self.entries[index].is_active() {
                    if self.active_count() >= MAX_ACTIVE_PLUGINS {
                        return Err(Error::TooManyActive);
                    }
                    self.entries[index].activate();
                }
                Ok(())
            }
            None => {
                let mut entry = probe_entry(profile, plugin_name)?;
                if self.active_count() >= MAX_ACTIVE_PLUGINS {
                    return Err(Error::TooManyActive);
                }
                entry.activate();
                self.insert_entry(entry, profile);
                Ok(())
            }
        }
    }

    /// Deactivates `plugin_name`. A name not in the load order is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::ImplicitActive`] if the game forces the plugin active and
    /// its file exists.
    pub fn deactivate(&mut self, plugin_name: &str, profile: &GameProfile) -> Result<()> {
        if profile.is_implicitly_active(plugin_name)
            && profile.plugin_path(plugin_name).exists()
        {
            return Err(Error::ImplicitActive(plugin_name.to_string()));
        }

        if let Some(index) = self.index_of(plugin_name) {
            self.entries[index].deactivate();
        }
        Ok(())
    }

    /// Replaces the active set: activates every given name (inserting absent
    /// ones per [`activate`](Self::activate) rules, in the given order) and
    /// deactivates everything else.
    ///
    /// # Errors
    ///
    /// [`Error::TooManyActive`] if the set is larger than the limit,
    /// [`Error::ImplicitActive`] if the game's master file (Textfile) or an
    /// implicitly active plugin whose file exists is missing from the set,
    /// [`Error::InvalidPlugin`] if a name fails probing. The load order is
    /// unchanged on any error.
    pub fn set_active_plugins(
        &mut self,
        plugin_names: &[&str],
        profile: &GameProfile,
    ) -> Result<()> {
        let mut requested: IndexSet<PluginName> = IndexSet::new();
        for name in plugin_names {
            requested.insert(PluginName::new(name));
        }

        if requested.len() > MAX_ACTIVE_PLUGINS {
            return Err(Error::TooManyActive);
        }

        if profile.method() == LoadOrderMethod::Textfile {
            let master = PluginName::new(profile.master_file());
            if !requested.contains(&master) {
                return Err(Error::ImplicitActive(profile.master_file().to_string()));
            }
            for implicit in profile.implicitly_active_plugins() {
                if !requested.contains(implicit)
                    && profile.plugin_path(implicit.as_str()).exists()
                {
                    return Err(Error::ImplicitActive(implicit.as_str().to_string()));
                }
            }
        }

        let mut next = self.clone();
        next.deactivate_all();

        for name in &requested {
            match next.index_of(name.as_str()) {
                Some(index) => next.entries[index].activate(),
                None => {
                    let mut entry = probe_entry(profile, name.as_str())?;
                    entry.activate();
                    next.insert_entry(entry, profile);
                }
            }
        }

        self.entries = next.entries;
        Ok(())
    }

    pub(crate) fn deactivate_all(&mut self) {
        for entry in &mut self.entries {
            entry.deactivate();
        }
    }

    /// Index of the first non-master entry, if any.
    pub(crate) fn first_non_master_position(&self) -> Option<usize> {
        self.entries.iter().position(|entry| !entry.is_master())
    }

    /// Inserts an entry where the ordering rules demand: the game's master
    /// file at the front on Textfile games, other masters at the
    /// master/non-master boundary, non-masters at the end. Returns the
    /// insertion index.
    pub(crate) fn insert_entry(&mut self, entry: PluginEntry, profile: &GameProfile) -> usize {
        let position = if profile.method() == LoadOrderMethod::Textfile
            && entry.name_matches(profile.master_file())
        {
            0
        } else if entry.is_master() {
            self.first_non_master_position()
                .unwrap_or(self.entries.len())
        } else {
            self.entries.len()
        };

        self.entries.insert(position, entry);
        position
    }

    /// Activates every implicitly active plugin whose file exists (the
    /// game's master file included), inserting any that are missing.
    pub(crate) fn enforce_implicit_actives(&mut self, profile: &GameProfile) -> Result<()> {
        for implicit in profile.implicitly_active_plugins() {
            let name = implicit.as_str();
            if !profile.plugin_path(name).exists() {
                continue;
            }

            match self.index_of(name) {
                Some(index) => self.entries[index].activate(),
                None => {
                    let mut entry = probe_entry(profile, name)?;
                    entry.activate();
                    self.insert_entry(entry, profile);
                }
            }
        }
        Ok(())
    }

    fn find(&self, plugin_name: &str) -> Option<&PluginEntry> {
        self.index_of(plugin_name).map(|index| &self.entries[index])
    }
}

/// Probes a plugin file and builds an inactive entry for it.
pub(crate) fn probe_entry(profile: &GameProfile, plugin_name: &str) -> Result<PluginEntry> {
    let header = probe::read_header(profile, plugin_name)
        .map_err(|_| Error::InvalidPlugin(plugin_name.to_string()))?;
    Ok(PluginEntry::new(
        PluginName::new(plugin_name),
        header.is_master,
    ))
}

fn ensure_unique(plugin_names: &[&str]) -> Result<()> {
    let mut seen: HashSet<PluginName> = HashSet::with_capacity(plugin_names.len());
    for name in plugin_names {
        if !seen.insert(PluginName::new(name)) {
            return Err(Error::InvalidOrder(format!(
                "\"{name}\" appears more than once"
            )));
        }
    }
    Ok(())
}

fn ensure_masters_first(entries: &[PluginEntry]) -> Result<()> {
    let mut first_non_master: Option<&PluginEntry> = None;
    for entry in entries {
        if entry.is_master() {
            if let Some(non_master) = first_non_master {
                return Err(Error::InvalidOrder(format!(
                    "master \"{}\" would load after non-master \"{}\"",
                    entry.name(),
                    non_master.name()
                )));
            }
        } else if first_non_master.is_none() {
            first_non_master = Some(entry);
        }
    }
    Ok(())
}

/// `set_load_order` and `set_position` report probe failures as ordering
/// errors; the name is part of a rejected arrangement.
fn invalid_plugin_to_order(error: Error) -> Error {
    match error {
        Error::InvalidPlugin(name) => {
            Error::InvalidOrder(format!("\"{name}\" is not a valid plugin"))
        }
        other => other,
    }
}
