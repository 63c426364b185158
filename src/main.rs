use clap::Parser;
use openclaw_config_manager::cli::{Cli, Commands, SnapshotAction, ThemeArg};
use openclaw_config_manager::codec;
use openclaw_config_manager::config::write_document_file;
use openclaw_config_manager::editor::{
    CacheState, Editor, ExampleSource, FileSource, PersistedSnapshot, RestoreOutcome,
};
use openclaw_config_manager::logging;
use openclaw_config_manager::settings::EditorSettings;
use openclaw_config_manager::storage::{FileKeyValueStore, ThemePreference};
use std::io::{BufRead, Write};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();

    let mut settings = EditorSettings::from_env();
    if let Some(dir) = cli.state_dir.clone() {
        settings.state_dir = dir;
    }

    let store = FileKeyValueStore::open(&settings.state_dir)?;
    let mut editor = Editor::new(Box::new(store));

    if cli.config.exists() {
        editor.load_from(&FileSource::new(&cli.config)).await?;
    } else if let Some(url) = &settings.example_url {
        editor.load_example(&ExampleSource::new(url.as_str())).await;
    } else {
        info!("{} not found, starting from the template", cli.config.display());
    }

    match cli.command {
        Commands::Show => {
            println!("{}", codec::serialize(editor.document())?);
        }
        Commands::Validate => {
            let errors = editor.validate();
            for dangling in editor.dangling_references() {
                warn!("{dangling}");
                println!("warning: {dangling}");
            }
            for error in &errors {
                println!("error: {error}");
            }
            if !errors.is_empty() {
                anyhow::bail!("{} validation error(s)", errors.len());
            }
            println!("Configuration is valid");
        }
        Commands::Commands(opts) => {
            let user = opts.user.unwrap_or(settings.command_user);
            let path = opts.path.unwrap_or(settings.command_base_path);
            for command in editor.commands(&user, &path)? {
                println!("# {} ({})", command.title, command.description);
                println!("{}\n", command.command);
            }
        }
        Commands::RenameProvider(opts) => {
            editor.rename_provider(&opts.old, &opts.new)?;
            write_document_file(&cli.config, editor.document()).await?;
            for dangling in editor.dangling_references() {
                println!("warning: {dangling}");
            }
        }
        Commands::Export(opts) => {
            let export = editor.export()?;
            match opts.out {
                Some(out) => {
                    let target = if out.is_dir() {
                        out.join(export.file_name)
                    } else {
                        out
                    };
                    tokio::fs::write(&target, &export.contents).await?;
                    info!("Exported configuration to {}", target.display());
                }
                None => println!("{}", export.contents),
            }
        }
        Commands::Snapshot { action } => match action {
            SnapshotAction::Save => {
                editor.commit_snapshot()?;
                println!("Snapshot saved");
            }
            SnapshotAction::Restore { yes } => {
                let outcome = editor.offer_restore(|snapshot| yes || confirm_restore(snapshot))?;
                match outcome {
                    RestoreOutcome::NoSnapshot => println!("No saved snapshot"),
                    RestoreOutcome::Declined => println!("Restore cancelled"),
                    RestoreOutcome::Restored => {
                        write_document_file(&cli.config, editor.document()).await?;
                        println!("Restored snapshot into {}", cli.config.display());
                    }
                }
            }
            SnapshotAction::Status => match editor.persisted_snapshot()? {
                None => println!("{}", CacheState::Empty),
                Some(snapshot) => {
                    let saved = codec::fingerprint(&snapshot.document);
                    let state = if saved == codec::fingerprint(editor.document()) {
                        CacheState::Saved
                    } else {
                        CacheState::Modified
                    };
                    let at = snapshot.committed_at.as_deref().unwrap_or("unknown time");
                    println!("{state} (snapshot {} from {at})", &saved[..12]);
                }
            },
        },
        Commands::Theme { mode } => {
            let theme = match mode {
                None => editor.theme(),
                Some(ThemeArg::Toggle) => editor.toggle_theme()?,
                Some(ThemeArg::Dark) => {
                    editor.set_theme(ThemePreference::Dark)?;
                    ThemePreference::Dark
                }
                Some(ThemeArg::Light) => {
                    editor.set_theme(ThemePreference::Light)?;
                    ThemePreference::Light
                }
            };
            println!("{theme}");
        }
    }

    Ok(())
}

fn confirm_restore(snapshot: &PersistedSnapshot) -> bool {
    let at = snapshot.committed_at.as_deref().unwrap_or("an earlier session");
    print!("Restore the snapshot saved at {at}? [y/N] ");
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}
