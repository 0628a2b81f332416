//! symptom-intel - command-line front end for the triage engine.
//!
//! Describe symptoms, get a triage report, and revisit the last few
//! assessments without contacting the engine again.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use symptom_intelligence::analysis_client::HttpAnalysisClient;
use symptom_intelligence::config;
use symptom_intelligence::dictation::{dictate, LineDictation};
use symptom_intelligence::history::HistoryCache;
use symptom_intelligence::models::{HistoryEntry, IntakeDraft, VitalSign};
use symptom_intelligence::report::{export_report, render_report};
use symptom_intelligence::session::{SessionController, SessionState};
use symptom_intelligence::store::FileStore;

#[derive(Parser)]
#[command(name = "symptom-intel")]
#[command(about = "Symptom Intelligence - triage assessment from a symptom description", long_about = None)]
#[command(version = config::APP_VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe symptoms and request an assessment
    Analyze {
        /// Symptom description (words are joined with spaces)
        text: Vec<String>,

        /// Current medication (repeatable)
        #[arg(long = "med", value_name = "NAME")]
        medications: Vec<String>,

        /// Body temperature, e.g. "101"
        #[arg(long)]
        temp: Option<String>,

        /// Heart rate, e.g. "110"
        #[arg(long)]
        hr: Option<String>,

        /// Blood pressure, e.g. "140/90"
        #[arg(long)]
        bp: Option<String>,

        /// Append dictated transcripts read line by line from stdin
        #[arg(long)]
        dictate: bool,

        /// Also write the report to the exports directory
        #[arg(long)]
        save: bool,
    },

    /// List recent assessments, most recent first
    History,

    /// Show a past assessment by its position in `history`
    Show {
        index: usize,

        /// Also write the report to the exports directory
        #[arg(long)]
        save: bool,
    },

    /// Check whether the triage engine is reachable
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    symptom_intelligence::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            text,
            medications,
            temp,
            hr,
            bp,
            dictate: use_dictation,
            save,
        } => {
            let mut draft = IntakeDraft::new();
            draft.text = text.join(" ");
            for med in &medications {
                draft.add_medication(med);
            }
            for (sign, value) in [
                (VitalSign::Temperature, temp),
                (VitalSign::HeartRate, hr),
                (VitalSign::BloodPressure, bp),
            ] {
                if let Some(value) = value {
                    draft.set_vital(sign, value);
                }
            }
            if use_dictation {
                let stdin = std::io::stdin();
                dictate(&mut draft, LineDictation::new(stdin.lock()));
            }
            analyze(draft, save).await
        }
        Commands::History => history(),
        Commands::Show { index, save } => show(index, save),
        Commands::Status => status().await,
    }
}

fn open_session() -> Result<SessionController<HttpAnalysisClient, FileStore>> {
    let client = HttpAnalysisClient::from_env().context("Cannot configure engine client")?;
    Ok(SessionController::start(client, FileStore::new(config::history_dir())))
}

async fn analyze(draft: IntakeDraft, save: bool) -> Result<()> {
    if !draft.can_submit() {
        bail!("Describe your symptoms, e.g. `symptom-intel analyze severe chest pain`");
    }

    let session = open_session()?;
    eprintln!("Analyzing with {} ...", session.client().base_url());

    match session.submit(draft.to_request()).await? {
        SessionState::Result { entry, .. } => print_report(&entry, save),
        SessionState::Failed { message } => bail!(message),
        other => bail!("Unexpected session state: {}", other.name()),
    }
}

fn history() -> Result<()> {
    let entries = HistoryCache::open(FileStore::new(config::history_dir())).entries()?;
    if entries.is_empty() {
        println!("No past assessments.");
        return Ok(());
    }

    for (index, entry) in entries.iter().enumerate() {
        let date = entry
            .created_on()
            .map(|d| d.to_string())
            .unwrap_or_else(|| entry.date.clone());
        println!(
            "{index}  {date}  {:<9}  {}",
            entry.result.triage_level.as_str(),
            entry.headline()
        );
    }
    Ok(())
}

fn show(index: usize, save: bool) -> Result<()> {
    let session = open_session()?;
    let entry = session.select_history(index)?;
    print_report(&entry, save)
}

async fn status() -> Result<()> {
    let client = HttpAnalysisClient::from_env().context("Cannot configure engine client")?;
    match client.health().await {
        Ok(health) => {
            println!(
                "{} v{} at {}: {}",
                health.service,
                health.version,
                client.base_url(),
                health.status
            );
            Ok(())
        }
        Err(e) => bail!("Engine at {} is not reachable: {e}", client.base_url()),
    }
}

fn print_report(entry: &HistoryEntry, save: bool) -> Result<()> {
    print!("{}", render_report(entry));
    if save {
        let path = export_report(entry, &config::exports_dir(), Utc::now().date_naive())
            .context("Cannot save report")?;
        eprintln!("Saved to {}", path.display());
    }
    Ok(())
}
