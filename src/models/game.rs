use serde::{Deserialize, Serialize};

/// The games whose load orders this crate manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameId {
    Morrowind,
    Oblivion,
    Skyrim,
    Fallout3,
    FalloutNV,
}

/// How a game persists its load order on disk.
///
/// Timestamp games order plugins by file modification time; Textfile games
/// keep an explicit `loadorder.txt` manifest alongside `plugins.txt`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadOrderMethod {
    Timestamp,
    Textfile,
}

impl GameId {
    /// The persistence mechanism the game uses. This mapping is fixed by the
    /// game engines and is not configurable.
    pub fn load_order_method(self) -> LoadOrderMethod {
        match self {
            GameId::Skyrim => LoadOrderMethod::Textfile,
            GameId::Morrowind | GameId::Oblivion | GameId::Fallout3 | GameId::FalloutNV => {
                LoadOrderMethod::Timestamp
            }
        }
    }

    /// The game's own master file, which Textfile games require to load first.
    pub fn master_file(self) -> &'static str {
        match self {
            GameId::Morrowind => "Morrowind.esm",
            GameId::Oblivion => "Oblivion.esm",
            GameId::Skyrim => "Skyrim.esm",
            GameId::Fallout3 => "Fallout3.esm",
            GameId::FalloutNV => "FalloutNV.esm",
        }
    }

    /// Plugins the game activates regardless of user choice. Only enforced
    /// for Textfile games; Timestamp games treat the list as informational.
    pub fn implicitly_active_plugins(self) -> &'static [&'static str] {
        match self {
            GameId::Skyrim => &["Skyrim.esm", "Update.esm"],
            GameId::Morrowind => &["Morrowind.esm"],
            GameId::Oblivion => &["Oblivion.esm"],
            GameId::Fallout3 => &["Fallout3.esm"],
            GameId::FalloutNV => &["FalloutNV.esm"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_skyrim_uses_the_textfile_method() {
        assert_eq!(
            GameId::Skyrim.load_order_method(),
            LoadOrderMethod::Textfile
        );
        for id in [
            GameId::Morrowind,
            GameId::Oblivion,
            GameId::Fallout3,
            GameId::FalloutNV,
        ] {
            assert_eq!(id.load_order_method(), LoadOrderMethod::Timestamp);
        }
    }

    #[test]
    fn test_master_file_names() {
        assert_eq!(GameId::Morrowind.master_file(), "Morrowind.esm");
        assert_eq!(GameId::Oblivion.master_file(), "Oblivion.esm");
        assert_eq!(GameId::Skyrim.master_file(), "Skyrim.esm");
        assert_eq!(GameId::Fallout3.master_file(), "Fallout3.esm");
        assert_eq!(GameId::FalloutNV.master_file(), "FalloutNV.esm");
    }

    #[test]
    fn test_skyrim_forces_update_esm() {
        assert_eq!(
            GameId::Skyrim.implicitly_active_plugins(),
            &["Skyrim.esm", "Update.esm"]
        );
        assert_eq!(
            GameId::Oblivion.implicitly_active_plugins(),
            &["Oblivion.esm"]
        );
    }
}
