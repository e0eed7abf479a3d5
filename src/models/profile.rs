use camino::{Utf8Path, Utf8PathBuf};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::models::{GameId, LoadOrderMethod, PluginName};

/// Immutable per-game descriptor.
///
/// A profile bundles everything the load order engine needs to know about
/// one installation of one game: where its plugins live, which files encode
/// the persisted state, what text encoding those files use, and which
/// plugins the game forces active.
///
/// Profiles are constructed from the game's install path and its local
/// application data path, mirroring where the engines actually keep their
/// state:
///
/// - plugins folder: `<game>/Data Files` (Morrowind) or `<game>/Data`
/// - active plugins: `<game>/Morrowind.ini` (Morrowind) or
///   `<local>/plugins.txt`
/// - load order file: `<local>/loadorder.txt` (Textfile games only)
#[derive(Clone, Debug)]
pub struct GameProfile {
    id: GameId,
    plugins_dir: Utf8PathBuf,
    active_plugins_file: Utf8PathBuf,
    load_order_file: Option<Utf8PathBuf>,
    implicit_actives: Vec<PluginName>,
}

impl GameProfile {
    pub fn new(id: GameId, game_path: &Utf8Path, local_path: &Utf8Path) -> Self {
        let plugins_dir = match id {
            GameId::Morrowind => game_path.join("Data Files"),
            _ => game_path.join("Data"),
        };

        let active_plugins_file = match id {
            GameId::Morrowind => game_path.join("Morrowind.ini"),
            _ => local_path.join("plugins.txt"),
        };

        let load_order_file = match id.load_order_method() {
            LoadOrderMethod::Textfile => Some(local_path.join("loadorder.txt")),
            LoadOrderMethod::Timestamp => None,
        };

        let implicit_actives = id
            .implicitly_active_plugins()
            .iter()
            .map(|name| PluginName::new(name))
            .collect();

        Self {
            id,
            plugins_dir,
            active_plugins_file,
            load_order_file,
            implicit_actives,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn method(&self) -> LoadOrderMethod {
        self.id.load_order_method()
    }

    pub fn master_file(&self) -> &'static str {
        self.id.master_file()
    }

    /// The folder holding the game's `.esp` and `.esm` files.
    pub fn plugins_dir(&self) -> &Utf8Path {
        &self.plugins_dir
    }

    /// The manifest listing active plugins (`plugins.txt`, or `Morrowind.ini`
    /// for Morrowind).
    pub fn active_plugins_file(&self) -> &Utf8Path {
        &self.active_plugins_file
    }

    /// The explicit load order manifest. `None` for Timestamp games.
    pub fn load_order_file(&self) -> Option<&Utf8Path> {
        self.load_order_file.as_deref()
    }

    /// The encoding used when reading and writing the active plugins file.
    pub fn encoding(&self) -> &'static Encoding {
        match self.id {
            GameId::Morrowind | GameId::Oblivion => WINDOWS_1252,
            GameId::Skyrim | GameId::Fallout3 | GameId::FalloutNV => UTF_8,
        }
    }

    /// Full path of the named plugin inside the plugins folder.
    pub fn plugin_path(&self, plugin_name: &str) -> Utf8PathBuf {
        self.plugins_dir.join(plugin_name)
    }

    /// Plugins the game forces active. Informational on Timestamp games.
    pub fn implicitly_active_plugins(&self) -> &[PluginName] {
        &self.implicit_actives
    }

    /// Whether the game refuses to leave the named plugin inactive.
    ///
    /// Always false for Timestamp games, whose implicit-active list is
    /// informational only.
    pub fn is_implicitly_active(&self, plugin_name: &str) -> bool {
        self.method() == LoadOrderMethod::Textfile
            && self.implicit_actives.iter().any(|p| p.matches(plugin_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_morrowind_paths() {
        let profile = GameProfile::new(
            GameId::Morrowind,
            Utf8Path::new("/games/Morrowind"),
            Utf8Path::new("/local/Morrowind"),
        );

        assert_eq!(profile.plugins_dir(), "/games/Morrowind/Data Files");
        assert_eq!(
            profile.active_plugins_file(),
            "/games/Morrowind/Morrowind.ini"
        );
        assert!(profile.load_order_file().is_none());
    }

    #[test]
    fn test_skyrim_paths() {
        let profile = GameProfile::new(
            GameId::Skyrim,
            Utf8Path::new("/games/Skyrim"),
            Utf8Path::new("/local/Skyrim"),
        );

        assert_eq!(profile.plugins_dir(), "/games/Skyrim/Data");
        assert_eq!(profile.active_plugins_file(), "/local/Skyrim/plugins.txt");
        assert_eq!(
            profile.load_order_file().map(Utf8Path::as_str),
            Some("/local/Skyrim/loadorder.txt")
        );
    }

    #[test]
    fn test_encoding_per_game() {
        let game = Utf8Path::new("/g");
        let local = Utf8Path::new("/l");
        assert_eq!(
            GameProfile::new(GameId::Oblivion, game, local).encoding(),
            WINDOWS_1252
        );
        assert_eq!(
            GameProfile::new(GameId::FalloutNV, game, local).encoding(),
            UTF_8
        );
    }

    #[test]
    fn test_implicit_active_enforcement_is_textfile_only() {
        let game = Utf8Path::new("/g");
        let local = Utf8Path::new("/l");

        let skyrim = GameProfile::new(GameId::Skyrim, game, local);
        assert!(skyrim.is_implicitly_active("Skyrim.esm"));
        assert!(skyrim.is_implicitly_active("update.esm"));
        assert!(!skyrim.is_implicitly_active("Blank.esm"));

        // Oblivion's master is listed but never enforced.
        let oblivion = GameProfile::new(GameId::Oblivion, game, local);
        assert_eq!(oblivion.implicitly_active_plugins().len(), 1);
        assert!(!oblivion.is_implicitly_active("Oblivion.esm"));
    }
}
