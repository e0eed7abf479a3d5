//! Reading and writing the on-disk load order state.
//!
//! Timestamp games encode their load order in plugin file modification
//! times; Skyrim keeps an explicit `loadorder.txt`. Both share a
//! line-delimited active plugins manifest (`plugins.txt`, or the
//! `[Game Files]` section of `Morrowind.ini`).
//!
//! Reads are forgiving: manifest lines that are blank, comments, duplicates,
//! undecodable, or name files that fail the plugin probe are dropped rather
//! than failing the load. Writes are strict and atomic: manifests are
//! written to a sibling temporary file and renamed over the target, so an
//! interrupted save never leaves a half-written file behind.

use std::fs;
use std::io::Write;
use std::time::{Duration, SystemTime};

use camino::Utf8Path;
use filetime::FileTime;
use indexmap::IndexSet;
use regex::bytes::Regex;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::models::{GameId, GameProfile, LoadOrderMethod, PluginEntry, PluginName};
use crate::services::load_order::{LoadOrder, MAX_ACTIVE_PLUGINS};
use crate::services::probe;

const MORROWIND_LINE_PREFIX: &[u8] = b"GameFile0=";
const GAME_FILES_HEADER: &[u8] = b"[Game Files]";

/// Reads the persisted load order and active set into a fresh [`LoadOrder`].
pub fn load(profile: &GameProfile) -> Result<LoadOrder> {
    let mut order = match profile.method() {
        LoadOrderMethod::Timestamp => timestamp_order(profile)?,
        LoadOrderMethod::Textfile => textfile_order(profile)?,
    };

    apply_active_plugins(&mut order, profile)?;

    tracing::info!(
        "loaded {} plugins for {:?}, {} active",
        order.len(),
        profile.id(),
        order.active_count()
    );
    Ok(order)
}

/// Writes the given load order and active set to disk.
///
/// For Timestamp games this rewrites plugin modification times (one minute
/// apart, starting from the current time) and the active plugins manifest;
/// for Textfile games it rewrites `loadorder.txt` and the manifest.
pub fn save(order: &LoadOrder, profile: &GameProfile) -> Result<()> {
    match profile.method() {
        LoadOrderMethod::Timestamp => save_timestamps(order, profile)?,
        LoadOrderMethod::Textfile => save_load_order_file(order, profile)?,
    }

    write_active_plugins(order, profile)?;

    tracing::info!(
        "saved {} plugins for {:?}, {} active",
        order.len(),
        profile.id(),
        order.active_count()
    );
    Ok(())
}

/// Whether the two Textfile manifests agree on the active plugins.
///
/// True whenever either file is missing, and always true for Timestamp
/// games. Otherwise the load order file's sequence, filtered to names in
/// the active set, must cover that set exactly once each.
pub fn is_synchronised(profile: &GameProfile) -> Result<bool> {
    if profile.method() == LoadOrderMethod::Timestamp {
        return Ok(true);
    }
    let Some(load_order_file) = profile.load_order_file() else {
        return Ok(true);
    };
    if !load_order_file.exists() || !profile.active_plugins_file().exists() {
        return Ok(true);
    }

    let active = read_active_plugins(profile)?;
    let mut filtered: Vec<PluginName> = Vec::new();
    for line in read_manifest_lines(load_order_file)? {
        let name = PluginName::new(&line);
        if active.contains(&name) {
            filtered.push(name);
        }
    }

    let unique: IndexSet<&PluginName> = filtered.iter().collect();
    Ok(unique.len() == filtered.len() && unique.len() == active.len())
}

struct InstalledPlugin {
    name: PluginName,
    is_master: bool,
    mtime: SystemTime,
}

/// Scans the plugins folder for files that parse as plugins. A missing
/// folder yields an empty list.
fn installed_plugins(profile: &GameProfile) -> Result<Vec<InstalledPlugin>> {
    let dir = profile.plugins_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut plugins = Vec::new();
    for dir_entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let dir_entry = dir_entry.map_err(std::io::Error::from)?;
        if !dir_entry.file_type().is_file() {
            continue;
        }
        let Some(name) = dir_entry.file_name().to_str() else {
            continue;
        };
        if !probe::has_plugin_extension(name) {
            continue;
        }
        let Ok(header) = probe::read_header(profile, name) else {
            tracing::debug!("skipping \"{}\": not a readable plugin", name);
            continue;
        };
        let mtime = dir_entry.metadata().map_err(std::io::Error::from)?.modified()?;

        plugins.push(InstalledPlugin {
            name: PluginName::new(name),
            is_master: header.is_master,
            mtime,
        });
    }
    Ok(plugins)
}

/// Builds the order for a Timestamp game: modification time ascending, ties
/// broken alphabetically on the folded name, masters partitioned first.
fn timestamp_order(profile: &GameProfile) -> Result<LoadOrder> {
    let mut plugins = installed_plugins(profile)?;
    plugins.sort_by(|a, b| {
        a.mtime
            .cmp(&b.mtime)
            .then_with(|| a.name.folded().cmp(b.name.folded()))
    });

    let (masters, non_masters): (Vec<_>, Vec<_>) =
        plugins.into_iter().partition(|plugin| plugin.is_master);

    let entries = masters
        .into_iter()
        .chain(non_masters)
        .map(|plugin| PluginEntry::new(plugin.name, plugin.is_master))
        .collect();
    Ok(LoadOrder::from_entries(entries))
}

/// Builds the order for a Textfile game from `loadorder.txt`, falling back
/// to the active plugins manifest as the ordering hint when it is missing.
/// Plugins on disk that the manifest missed are appended, masters at the
/// master/non-master boundary.
fn textfile_order(profile: &GameProfile) -> Result<LoadOrder> {
    let load_order_file = profile
        .load_order_file()
        .expect("textfile games always have a load order file");

    let hinted: Vec<String> = if load_order_file.exists() {
        read_manifest_lines(load_order_file)?
    } else {
        tracing::debug!(
            "\"{}\" is missing; seeding the order from the active plugins manifest",
            load_order_file
        );
        read_active_plugins(profile)?
            .into_iter()
            .map(|name| name.as_str().to_string())
            .collect()
    };

    let mut seen: IndexSet<PluginName> = IndexSet::new();
    let mut entries: Vec<PluginEntry> = Vec::new();
    for name in &hinted {
        let key = PluginName::new(name);
        if seen.contains(&key) {
            tracing::debug!("discarding duplicate \"{}\" from the load order file", name);
            continue;
        }
        match probe::read_header(profile, name) {
            Ok(header) => {
                seen.insert(key.clone());
                entries.push(PluginEntry::new(key, header.is_master));
            }
            Err(_) => {
                tracing::debug!("discarding \"{}\": not a valid plugin", name);
            }
        }
    }

    // The game master loads first: move it up, or prepend it if the
    // manifest missed it.
    let master = profile.master_file();
    let master_key = PluginName::new(master);
    match entries.iter().position(|entry| entry.name() == &master_key) {
        Some(0) => {}
        Some(index) => {
            let entry = entries.remove(index);
            entries.insert(0, entry);
        }
        None => {
            if let Ok(header) = probe::read_header(profile, master) {
                entries.insert(0, PluginEntry::new(master_key.clone(), header.is_master));
                seen.insert(master_key);
            }
        }
    }

    let mut order = LoadOrder::from_entries(entries);
    for plugin in installed_plugins(profile)? {
        if seen.contains(&plugin.name) {
            continue;
        }
        seen.insert(plugin.name.clone());
        order.insert_entry(PluginEntry::new(plugin.name, plugin.is_master), profile);
    }

    // Partition fixup: a manifest may interleave masters and non-masters.
    let (masters, non_masters): (Vec<_>, Vec<_>) = order
        .entries()
        .iter()
        .cloned()
        .partition(PluginEntry::is_master);
    Ok(LoadOrder::from_entries(
        masters.into_iter().chain(non_masters).collect(),
    ))
}

/// Applies the active plugins manifest to `order`: everything inactive,
/// then implicit actives (Textfile), then the manifest's names up to the
/// 255 plugin limit.
fn apply_active_plugins(order: &mut LoadOrder, profile: &GameProfile) -> Result<()> {
    let requested = read_active_plugins(profile)?;

    order.deactivate_all();
    let mut active = 0usize;

    if profile.method() == LoadOrderMethod::Textfile {
        order.enforce_implicit_actives(profile)?;
        active = order.active_count();
    }

    for name in &requested {
        if active >= MAX_ACTIVE_PLUGINS {
            tracing::warn!(
                "the active plugins manifest lists more than {} plugins; ignoring the rest",
                MAX_ACTIVE_PLUGINS
            );
            break;
        }
        if let Some(index) = order.index_of(name.as_str()) {
            if !order.entries()[index].is_active() {
                order.entries_mut()[index].activate();
                active += 1;
            }
        }
    }
    Ok(())
}

/// Parses the active plugins manifest into a first-occurrence-wins,
/// case-insensitive set. Blank lines, `#` comments, undecodable lines and
/// names that fail the plugin probe are dropped. On Morrowind only lines
/// with a `GameFile<N>=` prefix count; everything else in the ini is
/// ignored.
fn read_active_plugins(profile: &GameProfile) -> Result<IndexSet<PluginName>> {
    let path = profile.active_plugins_file();
    let mut actives = IndexSet::new();
    if !path.exists() {
        return Ok(actives);
    }

    let bytes = fs::read(path)?;
    let morrowind_line = (profile.id() == GameId::Morrowind).then(|| {
        Regex::new(r"(?i-u)^GameFile[0-9]{1,3}=(.+\.es[mp])$")
            .expect("hardcoded manifest regex is valid")
    });

    for raw in bytes.split(|&b| b == b'\n') {
        let line = trim_line(raw);
        if line.is_empty() || line[0] == b'#' {
            continue;
        }

        let name_bytes = match &morrowind_line {
            Some(regex) => match regex.captures(line).and_then(|captures| captures.get(1)) {
                Some(matched) => matched.as_bytes(),
                None => continue,
            },
            None => line,
        };

        let (decoded, _, had_errors) = profile.encoding().decode(name_bytes);
        if had_errors {
            tracing::debug!("discarding undecodable manifest line");
            continue;
        }

        let name = decoded.into_owned();
        if !probe::is_valid(profile, &name) {
            tracing::debug!("discarding \"{}\": not a valid plugin", name);
            continue;
        }

        actives.insert(PluginName::new(&name));
    }
    Ok(actives)
}

/// Reads a UTF-8 line-per-name manifest, skipping blanks, comments and
/// undecodable lines.
fn read_manifest_lines(path: &Utf8Path) -> Result<Vec<String>> {
    let bytes = fs::read(path)?;
    let mut lines = Vec::new();
    for raw in bytes.split(|&b| b == b'\n') {
        let line = trim_line(raw);
        if line.is_empty() || line[0] == b'#' {
            continue;
        }
        match std::str::from_utf8(line) {
            Ok(name) => lines.push(name.to_string()),
            Err(_) => tracing::debug!("discarding non-UTF-8 load order line"),
        }
    }
    Ok(lines)
}

fn save_timestamps(order: &LoadOrder, profile: &GameProfile) -> Result<()> {
    let base = SystemTime::now();
    for (index, entry) in order.entries().iter().enumerate() {
        let stamp = base + Duration::from_secs(60 * index as u64);
        filetime::set_file_mtime(
            profile.plugin_path(entry.name().as_str()).as_std_path(),
            FileTime::from_system_time(stamp),
        )?;
    }
    Ok(())
}

fn save_load_order_file(order: &LoadOrder, profile: &GameProfile) -> Result<()> {
    let path = profile
        .load_order_file()
        .expect("textfile games always have a load order file");
    ensure_parent_dir(path)?;

    let mut contents = String::new();
    for entry in order.entries() {
        contents.push_str(entry.name().as_str());
        contents.push('\n');
    }
    atomic_write(path, contents.as_bytes())
}

fn write_active_plugins(order: &LoadOrder, profile: &GameProfile) -> Result<()> {
    let path = profile.active_plugins_file();
    ensure_parent_dir(path)?;

    let mut contents: Vec<u8> = Vec::new();
    if profile.id() == GameId::Morrowind {
        contents.extend_from_slice(&morrowind_prelude(path)?);
    }

    for entry in order.entries().iter().filter(|entry| entry.is_active()) {
        if profile.id() == GameId::Morrowind {
            contents.extend_from_slice(MORROWIND_LINE_PREFIX);
        }
        let name = entry.name().as_str();
        let (encoded, _, unmappable) = profile.encoding().encode(name);
        if unmappable {
            return Err(Error::Encode(name.to_string()));
        }
        contents.extend_from_slice(&encoded);
        contents.push(b'\n');
    }

    atomic_write(path, &contents)
}

/// Everything in `Morrowind.ini` up to and including the `[Game Files]`
/// header is carried over unchanged when the file is rewritten. A fresh
/// file gets the standard two-line prelude.
fn morrowind_prelude(path: &Utf8Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Ok(b"isrealmorrowindini=false\n[Game Files]\n".to_vec());
    }

    let bytes = fs::read(path)?;
    let mut offset = 0;
    for raw in bytes.split(|&b| b == b'\n') {
        let end = offset + raw.len();
        if trim_line(raw).starts_with(GAME_FILES_HEADER) {
            let mut prelude = bytes[..end].to_vec();
            prelude.push(b'\n');
            return Ok(prelude);
        }
        offset = end + 1;
    }

    // No [Game Files] section yet; keep the content and start one.
    let mut prelude = bytes;
    if !prelude.is_empty() && !prelude.ends_with(b"\n") {
        prelude.push(b'\n');
    }
    prelude.extend_from_slice(GAME_FILES_HEADER);
    prelude.push(b'\n');
    Ok(prelude)
}

fn trim_line(raw: &[u8]) -> &[u8] {
    let mut line = raw;
    while let [rest @ .., last] = line {
        if last.is_ascii_whitespace() {
            line = rest;
        } else {
            break;
        }
    }
    while let [first, rest @ ..] = line {
        if first.is_ascii_whitespace() {
            line = rest;
        } else {
            break;
        }
    }
    line
}

fn ensure_parent_dir(path: &Utf8Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Writes to a sibling temporary file, then renames it over the target, so
/// an interrupted save cannot leave a partial manifest behind.
fn atomic_write(path: &Utf8Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::other(format!("\"{path}\" has no parent directory")))?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(path.as_std_path())
        .map_err(|persist_error| Error::Io(persist_error.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_trim_line_strips_crlf_and_padding() {
        assert_eq!(trim_line(b"Blank.esp\r"), b"Blank.esp");
        assert_eq!(trim_line(b"  Blank.esp  "), b"Blank.esp");
        assert_eq!(trim_line(b"\r\n"), b"");
        assert_eq!(trim_line(b""), b"");
    }

    #[test]
    fn test_morrowind_prelude_for_a_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("Morrowind.ini")).unwrap();

        let prelude = morrowind_prelude(&path).unwrap();
        assert_eq!(prelude, b"isrealmorrowindini=false\n[Game Files]\n");
    }

    #[test]
    fn test_morrowind_prelude_preserves_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("Morrowind.ini")).unwrap();
        fs::write(
            &path,
            b"[General]\nkey=value\n[Game Files]\nGameFile0=Blank.esm\n",
        )
        .unwrap();

        let prelude = morrowind_prelude(&path).unwrap();
        assert_eq!(prelude, b"[General]\nkey=value\n[Game Files]\n");
    }

    #[test]
    fn test_morrowind_prelude_adds_a_missing_section_header() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("Morrowind.ini")).unwrap();
        fs::write(&path, b"[General]\nkey=value").unwrap();

        let prelude = morrowind_prelude(&path).unwrap();
        assert_eq!(prelude, b"[General]\nkey=value\n[Game Files]\n");
    }

    #[test]
    fn test_atomic_write_replaces_the_target() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("plugins.txt")).unwrap();
        fs::write(&path, b"old contents").unwrap();

        atomic_write(&path, b"new contents").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new contents");

        // No stray temporary files left behind.
        let survivors: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(survivors.len(), 1);
    }
}
