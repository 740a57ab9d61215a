use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use playlist_engine::sequence::RowKind;
use playlist_engine::validation::check_tree;
use playlist_engine::{Exporter, JsonDirStore, PlaylistStore, PlaylistTree, SequenceKey, Track, TreeConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "playlist-engine")]
#[command(about = "Edit and play nested playlists kept in a JSON store", long_about = None)]
struct Args {
    /// Directory holding one <id>.json file per playlist
    #[arg(short = 's', long, default_value = "~/.local/share/playlist-engine")]
    store: String,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Continue from the other end when playback runs past the first or last track
    #[arg(long)]
    wrap: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored playlists
    List,

    /// Print a playlist as a flattened, indented view
    Show { id: i64 },

    /// Create a playlist from a JSON array of tracks
    Create {
        name: String,

        #[arg(short = 't', long)]
        tracks: PathBuf,
    },

    /// Insert tracks from a JSON array (appends without --at)
    Add {
        id: i64,

        #[arg(short = 't', long)]
        tracks: PathBuf,

        /// Flat-view index to insert at
        #[arg(long)]
        at: Option<usize>,
    },

    /// Embed another stored playlist
    Embed {
        id: i64,
        child: i64,

        #[arg(long)]
        at: Option<usize>,
    },

    /// Remove the row at a flat-view index (a marker removes its playlist)
    Remove { id: i64, index: usize },

    /// Move a row so it lands before the row at another index
    Move { id: i64, from: usize, to: usize },

    /// Walk the playback cursor and print each track
    Play {
        id: i64,

        /// Number of tracks to advance
        #[arg(long, default_value = "1")]
        steps: usize,

        /// Flat-view index to start from
        #[arg(long)]
        start: Option<usize>,
    },

    /// Verify the structure of a playlist
    Check { id: i64 },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    // Expand ~ in paths
    let store_path = shellexpand::tilde(&args.store);
    let store = Arc::new(
        JsonDirStore::open(PathBuf::from(store_path.as_ref()))
            .with_context(|| format!("Failed to open playlist store at {}", store_path))?,
    );
    let exporter = Exporter::new(store.clone());
    let mut tree = PlaylistTree::with_config(TreeConfig::new().with_wrap_around(args.wrap));

    match args.command {
        Command::List => {
            for info in store.list_playlists()? {
                println!("{:>5}  {}", info.id, info.name);
            }
        }
        Command::Show { id } => {
            let key = load(&mut tree, store.as_ref(), id)?;
            print_rows(&tree, key)?;
        }
        Command::Create { name, tracks } => {
            let tracks = read_tracks(&tracks)?;
            let key = tree.new_sequence(name, tracks);
            save(&mut tree, &exporter, key)?;
        }
        Command::Add { id, tracks, at } => {
            let key = load(&mut tree, store.as_ref(), id)?;
            let tracks = read_tracks(&tracks)?;
            match at {
                Some(index) => tree.insert_tracks(key, index, tracks)?,
                None => tree.queue_tracks(key, tracks)?,
            }
            save(&mut tree, &exporter, key)?;
        }
        Command::Embed { id, child, at } => {
            let key = load(&mut tree, store.as_ref(), id)?;
            let child_key = load(&mut tree, store.as_ref(), child)?;
            let index = match at {
                Some(index) => index,
                None => tree.flat_view(key)?.len(),
            };
            if !tree.insert_sequence(key, index, child_key)? {
                anyhow::bail!("Playlist {} already contains playlist {}", child, id);
            }
            save(&mut tree, &exporter, key)?;
        }
        Command::Remove { id, index } => {
            let key = load(&mut tree, store.as_ref(), id)?;
            tree.remove(key, index)?;
            save(&mut tree, &exporter, key)?;
        }
        Command::Move { id, from, to } => {
            let key = load(&mut tree, store.as_ref(), id)?;
            if tree.move_element(key, from, to)? {
                save(&mut tree, &exporter, key)?;
            } else {
                log::info!("Nothing to move");
            }
        }
        Command::Play { id, steps, start } => {
            let key = load(&mut tree, store.as_ref(), id)?;
            if let Some(index) = start {
                tree.select(key, index)?;
            }
            match tree.current(key)? {
                Some(track) => println!("Now playing: {}", track.display_name()),
                None => println!("Nothing to play"),
            }
            for _ in 0..steps {
                match tree.select_next(key)? {
                    Some(track) => println!("Next: {}", track.display_name()),
                    None => {
                        println!("End of playlist");
                        break;
                    }
                }
            }
        }
        Command::Check { id } => {
            let key = load(&mut tree, store.as_ref(), id)?;
            check_tree(&tree, key).with_context(|| format!("Playlist {} is inconsistent", id))?;
            log::info!("✅ Playlist {} is consistent", id);
        }
    }

    Ok(())
}

fn load(tree: &mut PlaylistTree, store: &dyn PlaylistStore, id: i64) -> Result<SequenceKey> {
    let transfer = store
        .load_playlist(id)
        .with_context(|| format!("Failed to load playlist {}", id))?;
    let key = tree
        .from_transfer(&transfer)
        .with_context(|| format!("Playlist {} is malformed", id))?;
    Ok(key)
}

fn save(tree: &mut PlaylistTree, exporter: &Exporter, key: SequenceKey) -> Result<()> {
    let saved = exporter.export(tree, key)?.wait().context("Failed to save playlist")?;
    tree.adopt_saved_id(key, &saved)?;
    log::info!("Playlist {} saved ({} tracks)", saved.id, saved.track_ids().len());
    Ok(())
}

fn read_tracks(path: &Path) -> Result<Vec<Track>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let tracks = serde_json::from_str(&content).with_context(|| format!("Failed to parse tracks in {:?}", path))?;
    Ok(tracks)
}

fn print_rows(tree: &PlaylistTree, key: SequenceKey) -> Result<()> {
    let node = tree.get(key).context("Playlist vanished")?;
    println!("{} ({} tracks)", node.name(), tree.track_count(key)?);

    for row in tree.rows(key)? {
        let pointer = if row.current { ">" } else { " " };
        let indent = "  ".repeat(row.depth);
        let label = match row.kind {
            RowKind::Track(track) => track.display_name(),
            RowKind::Folded { name, tracks, .. } => format!("[+] {} ({} tracks)", name, tracks),
            RowKind::Start { name, .. } => format!("[-] {}", name),
            RowKind::End { name, .. } => format!("[/] {}", name),
        };
        println!("{} {:>4}  {}{}", pointer, row.index, indent, label);
    }
    Ok(())
}
