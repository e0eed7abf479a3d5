//! loadorder - command-line load order inspector.
//!
//! Loads the persisted load order for one game installation and prints it,
//! marking active plugins with an asterisk and reporting whether the two
//! text manifests agree (Textfile games only).
//!
//! ```text
//! loadorder <game> <game-path> [local-path]
//! ```
//!
//! `<game>` is one of `morrowind`, `oblivion`, `skyrim`, `fallout3` or
//! `falloutnv`. `<local-path>` is the game's local application data folder
//! and defaults to `<game-path>` when omitted (Morrowind needs none).

use anyhow::{bail, Context, Result};
use camino::Utf8PathBuf;
use loadorder::{GameId, GameProfile, LoadOrderManager, APP_NAME, VERSION};

fn parse_game_id(name: &str) -> Result<GameId> {
    match name.to_ascii_lowercase().as_str() {
        "morrowind" | "tes3" => Ok(GameId::Morrowind),
        "oblivion" | "tes4" => Ok(GameId::Oblivion),
        "skyrim" | "tes5" => Ok(GameId::Skyrim),
        "fallout3" | "fo3" => Ok(GameId::Fallout3),
        "falloutnv" | "fnv" => Ok(GameId::FalloutNV),
        _ => bail!(
            "unknown game \"{name}\"; expected morrowind, oblivion, skyrim, fallout3 or falloutnv"
        ),
    }
}

fn main() -> Result<()> {
    loadorder::logging::setup_logging(false)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (game, game_path, local_path) = match args.as_slice() {
        [game, game_path] => (game, game_path.clone(), game_path.clone()),
        [game, game_path, local_path] => (game, game_path.clone(), local_path.clone()),
        _ => {
            eprintln!("{APP_NAME} {VERSION}");
            eprintln!("usage: {APP_NAME} <game> <game-path> [local-path]");
            std::process::exit(2);
        }
    };

    let id = parse_game_id(game)?;
    let profile = GameProfile::new(
        id,
        &Utf8PathBuf::from(game_path),
        &Utf8PathBuf::from(local_path),
    );

    let mut manager = LoadOrderManager::new(profile);
    manager
        .load()
        .with_context(|| format!("failed to load the {game} load order"))?;

    for (position, entry) in manager.load_order().entries().iter().enumerate() {
        let marker = if entry.is_active() { "*" } else { " " };
        println!("{position:3} {marker} {}", entry.name());
    }

    if !manager.is_synchronised()? {
        println!();
        println!("warning: loadorder.txt and plugins.txt are out of sync");
    }

    Ok(())
}
