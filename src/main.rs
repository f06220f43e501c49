use clap::{Parser, Subcommand};
use colored::Colorize;
use log::info;
use powerflow_game::{
    decode_to_game_message, FileGameRepo, GameId, GameManager, GameSettings, PresetName, RecordingFrontEnd,
};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "powerflow-game")]
#[command(about = "Runs and inspects PowerFlow Game sessions from the command line.")]
struct Args {
    /// Directory game state is persisted under.
    #[arg(long, default_value = "./games")]
    data_dir: PathBuf,

    /// Log level if RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, default_value_t = false)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new game and print its id.
    NewGame {
        /// Comma-separated human player names.
        #[arg(long, value_delimiter = ',')]
        players: Vec<String>,

        /// Path to a YAML or TOML settings file.
        #[arg(long)]
        config: Option<String>,

        /// Use a preset configuration instead of a file.
        #[arg(long)]
        preset: Option<String>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Send a message envelope (as JSON) to an existing game.
    Send {
        game_id: i64,
        /// A `ToGameMessage` JSON document, e.g. `{"message_type":"end_turn","player_id":0}`.
        message: String,
    },

    /// Print the current state of a game as pretty JSON.
    Show { game_id: i64 },

    /// List every persisted game id.
    List,

    /// Delete a persisted game.
    Delete { game_id: i64 },

    /// List available preset configurations.
    ListPresets,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", &args.log_level);
    }
    env_logger::init();

    if let Command::ListPresets = args.command {
        println!("Available preset configurations:\n");
        for preset in PresetName::all() {
            let settings = GameSettings::from_preset(preset.clone());
            println!("  {}", preset.as_str().green());
            println!("    {}", preset.description());
            println!(
                "    {} buses, {:.0} initial funds, seed {}",
                settings.n_buses, settings.initial_funds, settings.seed
            );
            println!();
        }
        return Ok(());
    }

    let repo = FileGameRepo::new(&args.data_dir)?;
    let manager = GameManager::new(repo, RecordingFrontEnd::new());

    match args.command {
        Command::NewGame { players, config, preset, seed } => {
            if players.is_empty() {
                return Err("at least one player is required, pass --players a,b,c".into());
            }
            let mut settings = if let Some(path) = config {
                GameSettings::from_file(path)?
            } else if let Some(preset_name) = preset {
                let preset = PresetName::from_str(&preset_name)
                    .map_err(|e| format!("{}. Use list-presets to see available presets.", e))?;
                GameSettings::from_preset(preset)
            } else {
                GameSettings::default()
            };
            if let Some(seed) = seed {
                settings.seed = seed;
            }
            settings.validate()?;

            let game_id = manager.new_game(players, settings)?;
            info!("created game {}", game_id);
            println!("{}", game_id.value());
        }

        Command::Send { game_id, message } => {
            let msg = decode_to_game_message(&message)?;
            manager.handle_player_message(GameId::new(game_id), msg)?;
            println!("{}", "ok".green());
        }

        Command::Show { game_id } => {
            let state = manager
                .get_game_state(GameId::new(game_id))?
                .ok_or_else(|| format!("game {} does not exist", game_id))?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        Command::List => {
            let mut ids: Vec<i64> = manager.list_games()?.into_iter().map(|g| g.value()).collect();
            ids.sort();
            for id in ids {
                println!("{}", id);
            }
        }

        Command::Delete { game_id } => {
            manager.delete_game_state(GameId::new(game_id))?;
            println!("{}", "deleted".green());
        }

        Command::ListPresets => unreachable!("handled above"),
    }

    Ok(())
}
