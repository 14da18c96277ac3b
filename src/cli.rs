use std::cmp;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ideogloss_rs::navigate::{self, UnitFilter};
use ideogloss_rs::{
    DictionaryEntry, DictionarySource, DictionaryStore, Document, FileSource, GridLayout,
    HostServices, LoadState, LookupSession, MatchRow, MemoryStorage, ScriptProfile, Segmenter,
    TracingNotifier,
};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "ideogloss", about = "Dictionary lookup over ideographic text", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the longest dictionary match at one position of a text.
    Lookup {
        /// Directory (or, with the `http` feature, URL) holding the resources.
        #[arg(long)]
        dict: String,
        /// Script profile: `lzh` (Literary Chinese) or `zh` (Mandarin).
        #[arg(long, default_value = "lzh")]
        profile: String,
        /// Zero-based index of the non-punctuation unit to resolve at.
        #[arg(long, default_value_t = 0)]
        at: usize,
        /// Print the popup markup instead of a table.
        #[arg(long)]
        html: bool,
        /// Text or markup fragment to look up.
        text: String,
    },
    /// Print the segmented markup of an HTML file.
    Segment {
        #[arg(long, default_value = "lzh")]
        profile: String,
        file: PathBuf,
    },
    /// List dictionary keys that start with the provided prefix.
    Prefix {
        #[arg(long)]
        dict: String,
        #[arg(long, default_value = "lzh")]
        profile: String,
        /// Maximum number of matches to return.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        prefix: String,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Lookup {
            dict,
            profile,
            at,
            html,
            text,
        } => handle_lookup(&dict, &profile, at, html, &text, cli.json),
        Command::Segment { profile, file } => handle_segment(&profile, &file, cli.json),
        Command::Prefix {
            dict,
            profile,
            limit,
            prefix,
        } => handle_prefix(&dict, &profile, limit, &prefix, cli.json),
    }
}

fn profile_by_name(name: &str) -> Result<ScriptProfile, Box<dyn Error>> {
    ScriptProfile::by_name(name)
        .ok_or_else(|| format!("Unknown profile {name:?}; expected `lzh` or `zh`").into())
}

fn source_for(dict: &str) -> Result<Arc<dyn DictionarySource>, Box<dyn Error>> {
    if dict.starts_with("http://") || dict.starts_with("https://") {
        #[cfg(feature = "http")]
        {
            let source: Arc<dyn DictionarySource> = Arc::new(ideogloss_rs::HttpSource::new(dict)?);
            return Ok(source);
        }
        #[cfg(not(feature = "http"))]
        {
            return Err("Remote dictionaries need the `http` feature".into());
        }
    }
    let source: Arc<dyn DictionarySource> = Arc::new(FileSource::new(dict));
    Ok(source)
}

fn open_store(dict: &str, profile: &ScriptProfile) -> Result<DictionaryStore, Box<dyn Error>> {
    Ok(DictionaryStore::new(
        source_for(dict)?,
        profile.resources().to_vec(),
        profile.fetch_timeout(),
    ))
}

fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn Error>> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn handle_lookup(
    dict: &str,
    profile_name: &str,
    at: usize,
    html: bool,
    text: &str,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let profile = profile_by_name(profile_name)?;
    let store = open_store(dict, &profile)?;
    let mut session = LookupSession::mount(
        profile,
        store.clone(),
        text,
        HostServices {
            notifier: Arc::new(TracingNotifier),
            storage: Arc::new(MemoryStorage::new()),
            layout: Box::new(GridLayout::default()),
        },
    )?;

    runtime()?.block_on(async {
        let load = session.activate();
        session.run_segmentation().await;
        if let Some(load) = load {
            load.await?;
        }
        Ok::<_, Box<dyn Error>>(())
    })?;
    if store.state() == LoadState::Failed {
        let reason = store
            .last_error()
            .map(|err| err.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(format!("Failed to load dictionary: {reason}").into());
    }

    let document = session.document();
    let mut cursor = navigate::first(document, UnitFilter::SkipPunctuation);
    for _ in 0..at {
        cursor = cursor.and_then(|node| navigate::next(document, node, UnitFilter::SkipPunctuation));
    }
    let node = cursor.ok_or_else(|| format!("No ideograph at position {at}"))?;
    let sequence_start = navigate::unit_text(document, node);
    let result = session.set_current(node);

    if as_json {
        let payload = json!({
            "position": at,
            "character": sequence_start,
            "rows": result.rows,
            "popup": session.popup().map(|popup| json!({
                "html": popup.content.html,
                "rect": popup.rect,
            })),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if html {
        match session.popup() {
            Some(popup) => println!("{}", popup.content.html),
            None => println!("No dictionary match at \"{sequence_start}\"."),
        }
    } else {
        print_match_table(&sequence_start, &result.rows);
    }
    Ok(())
}

fn handle_segment(profile_name: &str, file: &Path, as_json: bool) -> Result<(), Box<dyn Error>> {
    let profile = profile_by_name(profile_name)?;
    let markup = std::fs::read_to_string(file)
        .map_err(|err| format!("Failed to read {}: {err}", file.display()))?;
    let mut document = Document::parse(&markup)?;
    let stats = Segmenter::new(profile.batch_size()).run_to_completion(&mut document, &profile);

    if as_json {
        let payload = json!({
            "file": file.display().to_string(),
            "text_nodes_visited": stats.text_nodes_visited,
            "text_nodes_wrapped": stats.text_nodes_wrapped,
            "units_created": stats.units_created,
            "markup": document.serialize(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", document.serialize());
    }
    Ok(())
}

fn handle_prefix(
    dict: &str,
    profile_name: &str,
    limit: usize,
    prefix: &str,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let profile = profile_by_name(profile_name)?;
    let store = open_store(dict, &profile)?;
    runtime()?.block_on(store.ensure_loaded());
    let tables = match store.tables() {
        Some(tables) => tables,
        None => {
            let reason = store
                .last_error()
                .map(|err| err.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(format!("Failed to load dictionary: {reason}").into());
        }
    };
    let limit = cmp::max(1, limit);
    let matches = tables.prefix(prefix, limit);

    if as_json {
        let payload = json!({
            "prefix": prefix,
            "limit": limit,
            "results": matches.iter().map(|(word, entry)| {
                json!({"word": word, "short": entry.short_gloss, "long": entry.long_gloss})
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_prefix_table(prefix, &matches);
    }
    Ok(())
}

fn column_width<'a>(words: impl Iterator<Item = &'a str>, header: &str) -> usize {
    words
        .map(|word| word.chars().count())
        .max()
        .unwrap_or(0)
        .max(header.len())
}

fn print_match_table(at: &str, rows: &[MatchRow]) {
    if rows.is_empty() {
        println!("No dictionary match at \"{at}\".");
        return;
    }
    let width = column_width(rows.iter().map(|row| row.sequence.as_str()), "WORD");
    println!("{:<width$}  {:<8}  {}", "WORD", "TABLE", "GLOSS", width = width);
    println!("{:-<width$}  {:-<8}  {}", "", "", "-----", width = width);
    for row in rows {
        let table = if row.is_fallback { "fallback" } else { "primary" };
        println!(
            "{:<width$}  {:<8}  {}: {}",
            row.sequence,
            table,
            row.short_gloss,
            row.long_gloss,
            width = width
        );
        if let Some(href) = &row.href {
            println!("{:<width$}  {:<8}  {}", "", "", href, width = width);
        }
    }
}

fn print_prefix_table(prefix: &str, rows: &[(String, DictionaryEntry)]) {
    if rows.is_empty() {
        println!("No entries matched prefix \"{prefix}\".");
        return;
    }
    let width = column_width(rows.iter().map(|(word, _)| word.as_str()), "WORD");
    println!("Matches for prefix \"{prefix}\":");
    println!("{:<width$}  {}", "WORD", "GLOSS", width = width);
    println!("{:-<width$}  {}", "", "-----", width = width);
    for (word, entry) in rows {
        println!("{:<width$}  {}", word, entry.short_gloss, width = width);
    }
}
