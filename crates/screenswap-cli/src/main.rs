mod config;
mod probe;
mod source;
mod storage;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use screenswap::format::{calculate_duration, format_date, format_time};
use screenswap::widgets::{
    FieldInput, apply_input, click_option, click_tag, init_progress_bar, restore_selections,
};
use screenswap::{FieldStore, LoadReport, ScreenLoader, VirtualDocument, parse_fragment};
use serde::Serialize;

use config::Overrides;
use probe::{Probe, ProbeScriptHost};
use source::CliSource;
use storage::FileStore;

#[derive(Parser)]
#[command(name = "screenswap")]
#[command(about = "Load and inspect wizard screens")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the screens
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// HTTP origin serving the screens, instead of a directory
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Id of the element screens are mounted into
    #[arg(long, global = true)]
    mount_id: Option<String>,

    /// Directory where field values persist between runs
    #[arg(long, global = true)]
    state: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a screen file and list what it would mount and run
    Parse {
        /// Path to the screen fragment
        file: PathBuf,
        /// Print a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },
    /// Load screens in order, as the wizard would
    Load {
        /// Screen locations, e.g. step1.html
        #[arg(required = true)]
        screens: Vec<String>,
        /// Re-apply saved selections after each screen is ready
        #[arg(long)]
        restore: bool,
        /// Total step count for the progress bar; screens count from 1
        #[arg(long)]
        steps: Option<u32>,
    },
    /// Load a screen with its saved state, then click or type into it
    Select {
        /// Screen location, e.g. step2.html
        screen: String,
        #[command(subcommand)]
        action: SelectAction,
    },
    /// Inspect or edit saved field values
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
    /// Format values the way summary screens show them
    Format {
        #[command(subcommand)]
        action: FormatAction,
    },
}

#[derive(Subcommand)]
enum SelectAction {
    /// Click the n-th option button, counting from 0
    Option { index: usize },
    /// Toggle the n-th tag button, counting from 0
    Tag { index: usize },
    /// Type a value into the field with this data-key
    Input { key: String, value: String },
    /// Check or uncheck the checkbox with this data-key
    Check {
        key: String,
        #[arg(action = clap::ArgAction::Set)]
        checked: bool,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Print a field value, or every field when no key is given
    Get { key: Option<String> },
    /// Save a field value given as JSON
    Set { key: String, value: String },
    /// Remove every saved field
    Clear,
}

#[derive(Subcommand)]
enum FormatAction {
    /// Minutes past midnight as a clock time
    Time { minutes: u32 },
    /// Duration between two times in minutes past midnight
    Duration { start: u32, end: u32 },
    /// A YYYY-MM-DD date in long form
    Date { date: String },
}

#[derive(Serialize)]
struct ParseSummary<'a> {
    file: String,
    content: String,
    scripts: Vec<ScriptSummary<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ScriptSummary<'a> {
    External { locator: &'a str },
    Inline { bytes: usize },
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_module("reqwest", log::LevelFilter::Warn)
        .filter_module("hyper", log::LevelFilter::Warn)
        .filter_module("hyper_util", log::LevelFilter::Warn)
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("failed to read the working directory")?;
    let config = config::detect(&cwd)?;
    log::debug!("configuration from {}", config.describe());
    let settings = config.resolve(Overrides {
        root: cli.root,
        base_url: cli.base_url,
        mount_id: cli.mount_id,
        state_dir: cli.state,
    })?;

    match cli.command {
        Commands::Parse { file, json } => parse_file(&file, json)?,

        Commands::Load {
            screens,
            restore,
            steps,
        } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let local = tokio::task::LocalSet::new();
            local.block_on(&runtime, load_screens(&settings, &screens, restore, steps))?;
        }

        Commands::Select { screen, action } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let local = tokio::task::LocalSet::new();
            local.block_on(&runtime, select(&settings, &screen, action))?;
        }

        Commands::Store { action } => {
            let store = FileStore::new(settings.state_dir);
            match action {
                StoreAction::Get { key: Some(key) } => match store.get(&key) {
                    Some(value) => println!("{value}"),
                    None => bail!("no saved value for '{key}'"),
                },
                StoreAction::Get { key: None } => {
                    for key in store.keys()? {
                        let value = store.get(&key).unwrap_or_default();
                        println!("{key} = {value}");
                    }
                }
                StoreAction::Set { key, value } => {
                    let value = serde_json::from_str(&value)
                        .with_context(|| format!("value for '{key}' is not valid JSON"))?;
                    store.set(&key, value);
                }
                StoreAction::Clear => store.clear_all(),
            }
        }

        Commands::Format { action } => match action {
            FormatAction::Time { minutes } => println!("{}", format_time(minutes)),
            FormatAction::Duration { start, end } => println!("{}", calculate_duration(start, end)),
            FormatAction::Date { date } => println!("{}", format_date(&date)?),
        },
    }

    Ok(())
}

fn parse_file(file: &Path, json: bool) -> Result<()> {
    let markup = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let location = file.display().to_string();
    let fragment = match parse_fragment(&location, &markup) {
        Ok(fragment) => fragment,
        Err(error) => {
            eprint!("{}", error.report());
            bail!(error);
        }
    };

    let scripts = fragment
        .scripts
        .iter()
        .map(|script| match script {
            screenswap::ScriptDescriptor::External { locator } => ScriptSummary::External { locator },
            screenswap::ScriptDescriptor::Inline { source } => ScriptSummary::Inline {
                bytes: source.len(),
            },
        })
        .collect::<Vec<_>>();

    if json {
        let summary = ParseSummary {
            file: location,
            content: fragment.to_markup(),
            scripts,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", fragment.to_markup());
    eprintln!("{} script(s):", scripts.len());
    for (index, script) in scripts.iter().enumerate() {
        match script {
            ScriptSummary::External { locator } => eprintln!("  {index}: src={locator}"),
            ScriptSummary::Inline { bytes } => eprintln!("  {index}: inline, {bytes} bytes"),
        }
    }
    Ok(())
}

type CliLoader = ScreenLoader<Rc<CliSource>, VirtualDocument, ProbeScriptHost<CliSource>>;

fn cli_loader(settings: &config::Settings) -> CliLoader {
    let source = Rc::new(CliSource::new(&settings.origin));
    let host = ProbeScriptHost::new(Rc::clone(&source));
    ScreenLoader::new(source, VirtualDocument::new(&settings.mount_id), host)
}

async fn load_ready(loader: &CliLoader, screen: &str) -> Result<()> {
    let completion = loader
        .load(screen)
        .await
        .with_context(|| format!("failed to load {screen}"))?;
    let report = completion
        .await
        .with_context(|| format!("{screen} did not become ready"))?;
    print_report(&report, &loader.host().take_probes());
    Ok(())
}

async fn load_screens(
    settings: &config::Settings,
    screens: &[String],
    restore: bool,
    steps: Option<u32>,
) -> Result<()> {
    let loader = cli_loader(settings);
    let document = loader.document();
    let store = FileStore::new(settings.state_dir.clone());

    for (index, screen) in screens.iter().enumerate() {
        load_ready(&loader, screen).await?;

        if restore {
            document.with_content_mut(|content| restore_selections(content, &store))?;
        }
        if let Some(total) = steps {
            let step = u32::try_from(index + 1).unwrap_or(u32::MAX);
            document.with_content_mut(|content| init_progress_bar(content, step, total))?;
        }
        println!("{}", document.to_markup().unwrap_or_default());
    }
    Ok(())
}

async fn select(settings: &config::Settings, screen: &str, action: SelectAction) -> Result<()> {
    let loader = cli_loader(settings);
    let store = FileStore::new(settings.state_dir.clone());
    load_ready(&loader, screen).await?;

    let applied = loader.document().with_content_mut(|content| {
        restore_selections(content, &store);
        match action {
            SelectAction::Option { index } => click_option(content, index, &store),
            SelectAction::Tag { index } => click_tag(content, index, &store).is_some(),
            SelectAction::Input { key, value } => {
                apply_input(content, &key, FieldInput::Text(value), &store)
            }
            SelectAction::Check { key, checked } => {
                apply_input(content, &key, FieldInput::Checked(checked), &store)
            }
        }
    })?;
    if !applied {
        bail!("{screen} has no widget matching that selection");
    }
    println!("{}", loader.document().to_markup().unwrap_or_default());
    Ok(())
}

fn print_report(report: &LoadReport, probes: &[Probe]) {
    eprintln!(
        "{} ready: {} script(s), load {} (generation {})",
        report.location, report.scripts, report.load_id, report.generation
    );
    for probe in probes {
        match probe {
            Probe::Inline { generation, bytes } => {
                eprintln!("  ran inline script ({bytes} bytes, generation {generation})")
            }
            Probe::External {
                locator,
                bytes: Some(bytes),
                ..
            } => eprintln!("  loaded {locator} ({bytes} bytes)"),
            Probe::External { .. } => {}
            Probe::InitHook {
                generation,
                location,
            } => log::debug!("{location}: hook of generation {generation} recorded"),
        }
    }
    for failure in &report.failures {
        eprintln!("  {failure}");
    }
    if report.hook_fired {
        eprintln!("  init hook fired");
    }
}
