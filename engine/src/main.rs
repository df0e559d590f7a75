//! Interactive terminal demo for the typebooster engine.
//!
//! Types lines character by character through the engine and shows the
//! preedit, the candidate list and commits. Not an input method host; a
//! way to poke at the pipeline without one.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use typebooster::Engine;
use typebooster_core::config::{ConfigStore, Settings};
use typebooster_core::userdb::UserDb;

#[derive(Parser, Debug)]
#[command(name = "typebooster", about = "Predictive input engine demo")]
struct Args {
    /// Comma-separated dictionary locales (max 10).
    #[arg(long, default_value = "en")]
    dictionary: String,

    /// Comma-separated input methods, priority first (e.g. "hi-itrans,NoIME").
    #[arg(long, default_value = "")]
    inputmethod: String,

    /// Enable emoji predictions.
    #[arg(long)]
    emoji: bool,

    /// User database file; a temp file when not given.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Import a plain-text training file into the user database and exit.
    #[arg(long)]
    import: Option<PathBuf>,

    /// Optional TOML configuration file; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => {
            let (settings, errors) = Settings::load_toml(path);
            for error in errors {
                eprintln!("config: {error}");
            }
            settings
        }
        None => Settings::default(),
    };
    settings.dictionary = split_list(&args.dictionary);
    settings.inputmethod = split_list(&args.inputmethod);
    if args.emoji {
        settings.emojipredictions = true;
    }
    // Immediate feedback beats debouncing on a terminal.
    settings.candidatesdelaymilliseconds = 0;

    let (user_db, notice) = match &args.db {
        Some(path) => UserDb::open(path).context("open user database")?,
        None => (UserDb::new_temp(), None),
    };
    if let Some(notice) = notice {
        eprintln!("{notice}");
    }

    if let Some(path) = &args.import {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read training file {}", path.display()))?;
        user_db.import_training_text(&text);
        let meta = user_db.metadata();
        println!(
            "imported; {} entries, total frequency {}",
            meta.entry_count, meta.total_frequency
        );
        return Ok(());
    }

    let mut engine = Engine::new(Arc::new(ConfigStore::new(settings)), user_db);
    engine.focus_in("typebooster-demo");

    println!("type text; 1-9 selects, :commit commits, :esc cancels,");
    println!(":bs backspace, :related related emoji, :stats database stats, :q quits");
    let stdin = io::stdin();
    print!("> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        match line.trim() {
            ":q" => break,
            ":commit" => {
                let _ = engine.process_char(' ');
            }
            ":esc" => {
                let _ = engine.process_key(&typebooster_core::keymap::KeyEvent::press(
                    typebooster_core::keysym::KEY_ESCAPE,
                    typebooster_core::keysym::Modifiers::NONE,
                ));
            }
            ":bs" => {
                let _ = engine.process_key(&typebooster_core::keymap::KeyEvent::press(
                    typebooster_core::keysym::KEY_BACKSPACE,
                    typebooster_core::keysym::Modifiers::NONE,
                ));
            }
            ":related" => {
                let _ = engine.process_key(&typebooster_core::keymap::KeyEvent::press(
                    typebooster_core::keysym::Keysym::from_char('r'),
                    typebooster_core::keysym::Modifiers::CONTROL,
                ));
            }
            ":stats" => {
                let meta = engine.user_db().metadata();
                println!(
                    "entries: {}, total frequency: {}",
                    meta.entry_count, meta.total_frequency
                );
            }
            text => {
                for ch in text.chars() {
                    let _ = engine.process_char(ch);
                }
            }
        }
        engine.pump(Duration::from_secs(2));
        show(&engine);
        print!("> ");
        io::stdout().flush()?;
    }
    Ok(())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn show(engine: &Engine) {
    let ctx = engine.context();
    for notice in &ctx.notices {
        println!("! {notice}");
    }
    if !ctx.commit_text.is_empty() {
        println!("committed: {:?}", ctx.commit_text);
    }
    if ctx.preedit_visible {
        println!("preedit:   {} (cursor {})", ctx.preedit_text, ctx.preedit_cursor);
    }
    if ctx.candidates_visible {
        for (index, candidate) in ctx.candidates.iter().enumerate() {
            let marker = match ctx.candidate_cursor {
                Some(cursor) if cursor == index => '>',
                _ => ' ',
            };
            let annotation = candidate
                .annotation
                .as_deref()
                .map(|a| format!("  [{a}]"))
                .unwrap_or_default();
            let star = if candidate.deletable { " ⭐" } else { "" };
            println!("{marker}{}. {}{}{}", index + 1, candidate.text, annotation, star);
        }
    }
    if ctx.auxiliary_visible {
        println!("aux:       {}", ctx.auxiliary_text);
    }
}
