use crate::cli::Cli;
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use stickies::controller::{FocusState, NoteCommand, NoteController};
use stickies::model::{Foreground, NoteColor, NoteId};
use stickies::manager::Ticker;
use stickies::{JsonFileStore, NoteStore, NotesConfig, NotesManager};

pub fn config_from(cli: &Cli) -> Result<NotesConfig> {
    let mut config = match &cli.data_file {
        Some(path) => NotesConfig::at(path),
        None => NotesConfig::with_default_location().context("locating notes file")?,
    };
    config.debounce = Duration::from_millis(cli.debounce_ms);
    if let Some(screen) = cli.screen {
        config.screen = screen;
    }
    Ok(config)
}

fn open(config: &NotesConfig) -> NotesManager {
    let store: Arc<dyn NoteStore> = Arc::new(JsonFileStore::new(&config.data_file));
    NotesManager::load(store, config)
}

pub async fn list(config: &NotesConfig, search: Option<String>) -> Result<()> {
    let mut manager = open(config);
    if let Some(text) = search {
        manager.set_search_text(text);
    }
    println!("Notes in {}", config.data_file.display());
    let mut shown = 0;
    for note in manager.visible_notes() {
        print_note(note);
        shown += 1;
    }
    if shown == 0 {
        println!("  (no matching notes)");
    }
    Ok(())
}

pub async fn new(
    config: &NotesConfig,
    content: Option<String>,
    color: Option<String>,
    minutes: Option<i64>,
    pin: bool,
) -> Result<()> {
    let color = color
        .map(|c| NoteColor::resolve(&c))
        .transpose()
        .context("parsing --color")?;
    let mut manager = open(config);
    let id = manager.create_note();
    let note = manager
        .note_mut(id)
        .ok_or_else(|| anyhow!("new note {} vanished", id))?;
    if let Some(text) = content {
        note.set_content(text);
    }
    if let Some(color) = color {
        note.set_color(color);
    }
    if let Some(minutes) = minutes {
        note.set_duration_minutes(minutes);
    }
    note.set_pinned(pin);
    manager.shutdown().await.context("saving notes")?;
    println!("Added note {}", id);
    Ok(())
}

pub async fn delete(config: &NotesConfig, note_id: String) -> Result<()> {
    let mut manager = open(config);
    let id = resolve(&manager, &note_id)?;
    manager.select(id);
    manager.delete_selected();
    manager.shutdown().await.context("saving notes")?;
    println!("Deleted note {}", id);
    Ok(())
}

pub async fn pin(config: &NotesConfig, note_id: String) -> Result<()> {
    let mut manager = open(config);
    let id = resolve(&manager, &note_id)?;
    let pinned = {
        let note = manager
            .note_mut(id)
            .ok_or_else(|| anyhow!("note {} not found", note_id))?;
        note.execute(NoteCommand::TogglePin);
        note.is_pinned()
    };
    manager.shutdown().await.context("saving notes")?;
    println!("{} note {}", if pinned { "Pinned" } else { "Unpinned" }, id);
    Ok(())
}

pub async fn duration(config: &NotesConfig, note_id: String, minutes: i64) -> Result<()> {
    let mut manager = open(config);
    let id = resolve(&manager, &note_id)?;
    let note = manager
        .note_mut(id)
        .ok_or_else(|| anyhow!("note {} not found", note_id))?;
    note.set_duration_minutes(minutes);
    let shown = note.remaining_display();
    manager.shutdown().await.context("saving notes")?;
    println!("Timer for {} set to {}", id, shown);
    Ok(())
}

pub async fn focus(config: &NotesConfig, note_id: String) -> Result<()> {
    let mut manager = open(config);
    let id = resolve(&manager, &note_id)?;
    manager.select(id);
    {
        let note = manager
            .selected_mut()
            .ok_or_else(|| anyhow!("note {} not found", note_id))?;
        if !note.execute(NoteCommand::FocusPrimary) {
            return Err(anyhow!("note {} has no timer length; set one first", id));
        }
        println!("Focus on: {}", headline(note));
    }

    let mut ticker = Ticker::new();
    loop {
        tokio::select! {
            _ = ticker.wait() => {
                let finished = manager.tick().contains(&id);
                if let Some(note) = manager.note(id) {
                    print!("\r  {} remaining ", note.remaining_display());
                    std::io::stdout().flush().ok();
                }
                if finished {
                    println!("\nSession complete.");
                    break;
                }
            }
            res = tokio::signal::ctrl_c() => {
                res.context("listening for Ctrl-C")?;
                if let Some(note) = manager.selected_mut() {
                    note.execute(NoteCommand::FocusPrimary);
                    if note.focus_state() == FocusState::Paused {
                        println!("\nPaused with {} left.", note.remaining_display());
                    }
                }
                break;
            }
        }
    }
    manager.shutdown().await.context("saving notes")?;
    Ok(())
}

fn resolve(manager: &NotesManager, raw: &str) -> Result<NoteId> {
    manager
        .find_by_prefix(raw)
        .ok_or_else(|| anyhow!("no single note matches id {:?}", raw))
}

fn headline(note: &NoteController) -> String {
    let preview = note.preview_text();
    if preview.is_empty() {
        "(empty note)".to_string()
    } else if preview.chars().count() > 60 {
        format!("{}…", preview.chars().take(59).collect::<String>())
    } else {
        preview
    }
}

fn print_note(note: &NoteController) {
    let id = note.id().to_string();
    let short = &id[..8];
    let pin = if note.is_pinned() { "📌" } else { "  " };
    let text = match note.foreground() {
        Foreground::DarkOnLight => "light",
        Foreground::LightOnDark => "dark",
    };
    println!("  {} {} {}", pin, short, headline(note));
    println!(
        "       color {} ({}) timer {} / {} min",
        note.color(),
        text,
        note.remaining_display(),
        note.duration_minutes()
    );
}
