//! Plugin file recognition.
//!
//! A plugin is a `.esp` or `.esm` file whose binary header starts with the
//! record magic `TES3` (Morrowind) or `TES4` (every later game). The record
//! flags field at offset 8 carries the master bit for `TES4`-style plugins;
//! Morrowind predates the flag and marks masters by extension instead.

use std::fs::File;
use std::io::Read;

use camino::Utf8Path;

use crate::error::{Error, Result};
use crate::models::{GameId, GameProfile};

/// Fixed header length for Morrowind records: type, size, unknown, flags.
const TES3_HEADER_LEN: usize = 16;

/// Fixed header length for Oblivion-era records: type, size, flags, form id,
/// revision, version, unknown.
const TES4_HEADER_LEN: usize = 24;

/// Bit 0 of the record flags marks a plugin as a master file.
const MASTER_FLAG: u32 = 0x1;

/// The header fields the load order engine cares about.
#[derive(Clone, Copy, Debug)]
pub struct PluginHeader {
    pub is_master: bool,
}

/// Whether the filename carries a plugin extension (`.esp` or `.esm`,
/// case-insensitive).
pub fn has_plugin_extension(plugin_name: &str) -> bool {
    Utf8Path::new(plugin_name)
        .extension()
        .map_or(false, |ext| {
            ext.eq_ignore_ascii_case("esp") || ext.eq_ignore_ascii_case("esm")
        })
}

/// Reads and checks the named plugin's header.
///
/// # Errors
///
/// - [`Error::InvalidPlugin`] if the name has no plugin extension or the
///   file cannot be opened
/// - [`Error::ParseError`] if the file is shorter than a record header or
///   does not start with the expected magic
pub fn read_header(profile: &GameProfile, plugin_name: &str) -> Result<PluginHeader> {
    if !has_plugin_extension(plugin_name) {
        return Err(Error::InvalidPlugin(plugin_name.to_string()));
    }

    let path = profile.plugin_path(plugin_name);
    let mut file =
        File::open(&path).map_err(|_| Error::InvalidPlugin(plugin_name.to_string()))?;

    let (magic, header_len): (&[u8], usize) = match profile.id() {
        GameId::Morrowind => (b"TES3", TES3_HEADER_LEN),
        _ => (b"TES4", TES4_HEADER_LEN),
    };

    let mut header = vec![0u8; header_len];
    file.read_exact(&mut header).map_err(|_| {
        Error::ParseError(format!("\"{plugin_name}\" is too small to hold a record header"))
    })?;

    if &header[..4] != magic {
        return Err(Error::ParseError(format!(
            "\"{plugin_name}\" does not start with a {} record",
            String::from_utf8_lossy(magic)
        )));
    }

    let is_master = match profile.id() {
        // Morrowind has no master flag in its header; the extension decides.
        GameId::Morrowind => Utf8Path::new(plugin_name)
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("esm")),
        _ => {
            let flags = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
            flags & MASTER_FLAG != 0
        }
    };

    Ok(PluginHeader { is_master })
}

/// Whether the named file exists in the plugins folder and parses as a
/// plugin for this game.
pub fn is_valid(profile: &GameProfile, plugin_name: &str) -> bool {
    read_header(profile, plugin_name).is_ok()
}

/// Whether the named plugin's header marks it as a master file.
pub fn is_master(profile: &GameProfile, plugin_name: &str) -> Result<bool> {
    read_header(profile, plugin_name).map(|header| header.is_master)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;

    fn profile_in(dir: &TempDir, id: GameId) -> GameProfile {
        let game_path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let profile = GameProfile::new(id, &game_path, &game_path.join("local"));
        fs::create_dir_all(profile.plugins_dir()).unwrap();
        profile
    }

    fn write_tes4_plugin(profile: &GameProfile, name: &str, master: bool) {
        let mut bytes = Vec::with_capacity(TES4_HEADER_LEN);
        bytes.extend_from_slice(b"TES4");
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&u32::from(master).to_le_bytes());
        bytes.resize(TES4_HEADER_LEN, 0);
        fs::write(profile.plugin_path(name), bytes).unwrap();
    }

    #[test]
    fn test_extension_check() {
        assert!(has_plugin_extension("Blank.esp"));
        assert!(has_plugin_extension("Blank.ESM"));
        assert!(!has_plugin_extension("Blank.bsa"));
        assert!(!has_plugin_extension("Blank"));
    }

    #[test]
    fn test_master_flag_is_read_from_header() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, GameId::Oblivion);
        write_tes4_plugin(&profile, "Blank.esm", true);
        write_tes4_plugin(&profile, "Blank.esp", false);

        assert!(is_master(&profile, "Blank.esm").unwrap());
        assert!(!is_master(&profile, "Blank.esp").unwrap());
    }

    #[test]
    fn test_flag_beats_extension_outside_morrowind() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, GameId::Oblivion);
        // An .esp with the master flag set is still a master.
        write_tes4_plugin(&profile, "Flagged.esp", true);

        assert!(is_master(&profile, "Flagged.esp").unwrap());
    }

    #[test]
    fn test_morrowind_masters_by_extension() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, GameId::Morrowind);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"TES3");
        bytes.resize(TES3_HEADER_LEN, 0);
        fs::write(profile.plugin_path("Blank.esm"), &bytes).unwrap();
        fs::write(profile.plugin_path("Blank.esp"), &bytes).unwrap();

        assert!(is_master(&profile, "Blank.esm").unwrap());
        assert!(!is_master(&profile, "Blank.esp").unwrap());
    }

    #[test]
    fn test_non_plugin_content_is_invalid() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, GameId::Oblivion);
        fs::write(
            profile.plugin_path("NotAPlugin.esm"),
            b"This isn't a valid plugin file.",
        )
        .unwrap();

        assert!(!is_valid(&profile, "NotAPlugin.esm"));
        assert!(matches!(
            read_header(&profile, "NotAPlugin.esm"),
            Err(Error::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, GameId::Oblivion);

        assert!(!is_valid(&profile, "missing.esp"));
        assert!(matches!(
            read_header(&profile, "missing.esp"),
            Err(Error::InvalidPlugin(_))
        ));
    }

    #[test]
    fn test_truncated_header_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let profile = profile_in(&dir, GameId::Oblivion);
        fs::write(profile.plugin_path("Short.esp"), b"TES4").unwrap();

        assert!(matches!(
            read_header(&profile, "Short.esp"),
            Err(Error::ParseError(_))
        ));
    }
}
