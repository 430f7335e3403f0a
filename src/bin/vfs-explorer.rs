//! vfs-explorer - Inspect entry snapshots and permission rules
//!
//! Usage:
//!   vfs-explorer list <entries.json> [--path P] [--sort KEY] [--desc]
//!   vfs-explorer tree <entries.json>
//!   vfs-explorer check <entries.json> <rules.json> <action> <path>...

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::{Path, PathBuf};
    use std::process::ExitCode;

    use clap::{Parser, Subcommand};
    use serde::de::DeserializeOwned;

    use vfs_explorer::config::{MAX_NAME_DISPLAY_LEN, ROOT_FOLDER_NAME};
    use vfs_explorer::core::{EntryStore, FolderNode, PermissionEngine, derive_listing, derive_tree};
    use vfs_explorer::models::{Action, Entry, PermissionRule, SortConfig, SortDirection, SortKey};
    use vfs_explorer::utils::format::{ellipsis_in_middle, format_date_iso, format_size};
    use vfs_explorer::utils::path::normalize_path;

    #[derive(Parser)]
    #[command(
        name = "vfs-explorer",
        about = "Inspect virtual filesystem snapshots and permission rules",
        version
    )]
    struct Cli {
        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// List a folder the way the explorer shows it
        List {
            /// JSON array of entries
            entries: PathBuf,
            /// Folder to list (default: root)
            #[arg(long, default_value = "")]
            path: String,
            /// Sort column: name, size or modified
            #[arg(long, default_value = "name", value_parser = parse_sort_key)]
            sort: SortKey,
            /// Sort descending
            #[arg(long)]
            desc: bool,
        },
        /// Print the folder tree
        Tree {
            /// JSON array of entries
            entries: PathBuf,
        },
        /// Evaluate an action against permission rules
        Check {
            /// JSON array of entries
            entries: PathBuf,
            /// JSON array of permission rules
            rules: PathBuf,
            /// create, copy, move, read, write, rename, delete or upload
            action: Action,
            /// Entry paths to check
            #[arg(required = true)]
            paths: Vec<String>,
        },
    }

    fn parse_sort_key(s: &str) -> Result<SortKey, String> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "size" => Ok(SortKey::Size),
            "modified" | "date" => Ok(SortKey::Modified),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))
    }

    fn load_store(path: &Path) -> Result<EntryStore, String> {
        read_json::<Vec<Entry>>(path).map(EntryStore::from_entries)
    }

    fn list(entries: &Path, path: &str, sort: SortConfig) -> Result<(), String> {
        let store = load_store(entries)?;
        let path = normalize_path(path);
        if !store.is_folder(&path) {
            return Err(format!("'{}' is not a folder", path));
        }

        for entry in derive_listing(&store, &path, sort).entries {
            let name = ellipsis_in_middle(entry.label(), MAX_NAME_DISPLAY_LEN);
            let kind = if entry.is_directory { 'd' } else { '-' };
            println!(
                "{} {} {}  {}{}",
                kind,
                format_size(entry.size, true),
                format_date_iso(entry.updated_at.as_ref()),
                name,
                if entry.is_directory { "/" } else { "" }
            );
        }
        Ok(())
    }

    fn print_node(node: &FolderNode, depth: usize) {
        println!("{}{}/", "  ".repeat(depth), node.entry.label());
        for child in &node.children {
            print_node(child, depth + 1);
        }
    }

    fn tree(entries: &Path) -> Result<(), String> {
        let store = load_store(entries)?;
        let nodes = derive_tree(&store);
        println!("{}/", ROOT_FOLDER_NAME);
        for node in &nodes {
            print_node(node, 1);
        }
        let total: usize = nodes.iter().map(FolderNode::count).sum();
        println!("\n{} folders", total);
        Ok(())
    }

    fn check(entries: &Path, rules: &Path, action: Action, paths: &[String]) -> Result<bool, String> {
        let store = load_store(entries)?;
        let rules: Vec<PermissionRule> = read_json(rules)?;
        let engine = PermissionEngine::new(&rules);

        let mut all_allowed = true;
        for path in paths {
            let path = normalize_path(path);
            let home = Entry::home();
            let entry = if path.is_empty() {
                &home
            } else {
                store
                    .get(&path)
                    .ok_or_else(|| format!("'{}' not found", path))?
            };

            let decision = engine.decide(entry, action);
            all_allowed &= decision.allowed;
            println!(
                "{:5} {} {}{}",
                if decision.allowed { "allow" } else { "deny" },
                action.as_str(),
                entry.path,
                decision
                    .rule
                    .map(|rule| format!("  (rule {})", rule))
                    .unwrap_or_default()
            );
        }
        Ok(all_allowed)
    }

    pub fn main() -> ExitCode {
        let cli = Cli::parse();

        let result = match &cli.command {
            Commands::List {
                entries,
                path,
                sort,
                desc,
            } => {
                let direction = if *desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                };
                list(entries, path, SortConfig::new(*sort, direction)).map(|()| true)
            }
            Commands::Tree { entries } => tree(entries).map(|()| true),
            Commands::Check {
                entries,
                rules,
                action,
                paths,
            } => check(entries, rules, *action, paths),
        };

        match result {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::from(2),
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    cli::main()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
