use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use dictcache::storage::list_filtered_files;
use dictcache::{
    CacheRegistry, FilePrefixFilter, LocaleKey, PersonalizationDictionary, PersonalizedDictionary,
    RegistryConfig, UserHistoryDictionary,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dict-tool")]
#[command(about = "Maintenance tooling for personalized dictionaries")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record typed words (and consecutive pairs) in the user history
    Learn {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        locale: String,
        words: Vec<String>,
    },
    /// Run one decay sweep over the given locales' history dictionaries
    Decay {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, required = true)]
        locale: Vec<String>,
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Flush and delete every personalized dictionary
    Reset {
        #[arg(long)]
        dir: PathBuf,
    },
    /// List dictionary files per kind
    List {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct KindListing {
    kind: &'static str,
    files: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Learn { dir, locale, words } => learn(&dir, &locale, &words),
        Command::Decay {
            dir,
            locale,
            interval_secs,
        } => decay(&dir, &locale, interval_secs),
        Command::Reset { dir } => reset(&dir),
        Command::List { dir, json } => list(&dir, json),
    }
}

fn open_registry(config: RegistryConfig) -> Result<CacheRegistry> {
    let dir = config.files_dir.display().to_string();
    CacheRegistry::new(config).with_context(|| format!("Failed to open dictionaries in '{}'", dir))
}

fn learn(dir: &Path, locale: &str, words: &[String]) -> Result<()> {
    if words.is_empty() {
        return Err(anyhow!("No words given. Example: learn --dir D --locale en_US good morning"));
    }

    let registry = open_registry(RegistryConfig::new(dir))?;
    let dict = registry.get_user_history_dictionary(&LocaleKey::from(locale))?;

    dict.add_word(&words[0])?;
    for pair in words.windows(2) {
        dict.add_bigram(&pair[0], &pair[1])?;
    }
    dict.flush()?;

    println!("Recorded {} word(s) into {}", words.len(), dict.path().display());
    Ok(())
}

fn decay(dir: &Path, locales: &[String], interval_secs: Option<u64>) -> Result<()> {
    let mut config = RegistryConfig::new(dir);
    if let Some(secs) = interval_secs {
        config = config.decay_interval(std::time::Duration::from_secs(secs));
    }
    let registry = open_registry(config)?;

    // Held until the sweep is done so no dictionary can be reclaimed.
    let mut opened = Vec::with_capacity(locales.len());
    for locale in locales {
        opened.push(registry.get_user_history_dictionary(&LocaleKey::from(locale.as_str()))?);
    }

    let report = registry.decay_all_history_dictionaries()?;
    println!("Decay sweep: {}", report);
    Ok(())
}

fn reset(dir: &Path) -> Result<()> {
    let registry = open_registry(RegistryConfig::new(dir))?;
    let report = registry.reset_all()?;
    println!("Reset: {}", report);

    if !report.files_deleted() {
        return Err(anyhow!("Some dictionary files in '{}' could not be deleted", dir.display()));
    }
    Ok(())
}

fn list(dir: &Path, json: bool) -> Result<()> {
    let mut listings = Vec::new();
    for kind in [UserHistoryDictionary::NAME, PersonalizationDictionary::NAME] {
        let files = list_filtered_files(dir, &FilePrefixFilter::new(kind))
            .with_context(|| format!("Failed to list '{}'", dir.display()))?
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()).map(str::to_string))
            .collect();
        listings.push(KindListing { kind, files });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
    } else {
        for listing in &listings {
            println!("{} ({} file(s))", listing.kind, listing.files.len());
            for file in &listing.files {
                println!("  {}", file);
            }
        }
    }
    Ok(())
}
