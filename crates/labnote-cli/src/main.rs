//! labnote CLI: lab report authoring, self-assessment and rendering.

use std::path::PathBuf;
use std::process;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use labnote_core::config::DocumentFormat;
use labnote_core::model::ExperimentTitle;

mod commands;

#[derive(Parser)]
#[command(
    name = "labnote",
    version,
    about = "Lab report authoring and self-assessment"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter labnote.toml
    Init,

    /// Start a new session file with factory defaults
    New {
        /// Experiment title or alias (heat, fuel-cell, water)
        #[arg(long)]
        title: Option<ExperimentTitle>,

        /// Experiment date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Session file to create
        #[arg(long)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show or edit identity and experiment date
    Info {
        /// Session file
        #[arg(long)]
        session: PathBuf,

        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long = "class")]
        class_name: Option<String>,
        #[arg(long = "seat")]
        seat_number: Option<String>,
        #[arg(long)]
        student_id: Option<String>,
        #[arg(long)]
        student_name: Option<String>,
        #[arg(long)]
        partner1_id: Option<String>,
        #[arg(long)]
        partner1_name: Option<String>,
        #[arg(long)]
        partner2_id: Option<String>,
        #[arg(long)]
        partner2_name: Option<String>,
    },

    /// Set a text field or a question answer
    Set {
        #[arg(long)]
        session: PathBuf,

        /// Field name (see `labnote fields`)
        #[arg(long)]
        field: String,

        /// New text
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        value: Option<String>,

        /// Read the text from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Set one table cell
    Cell {
        #[arg(long)]
        session: PathBuf,

        /// Table field name
        #[arg(long)]
        field: String,

        /// Row index, starting at 0
        #[arg(long)]
        row: usize,

        /// Column name
        #[arg(long)]
        column: String,

        #[arg(long, allow_hyphen_values = true)]
        value: String,
    },

    /// Append an empty row to a dynamic table
    AddRow {
        #[arg(long)]
        session: PathBuf,

        #[arg(long)]
        field: String,
    },

    /// Remove a row from a dynamic table
    RemoveRow {
        #[arg(long)]
        session: PathBuf,

        #[arg(long)]
        field: String,

        #[arg(long)]
        row: usize,
    },

    /// Attach or clear a photo
    Photo {
        #[arg(long)]
        session: PathBuf,

        #[arg(long)]
        field: String,

        /// Image file to attach
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        image: Option<PathBuf>,

        /// Remove the photo
        #[arg(long)]
        clear: bool,
    },

    /// Switch the session to another experiment title
    Switch {
        #[arg(long)]
        session: PathBuf,

        #[arg(long)]
        title: ExperimentTitle,
    },

    /// Apply an exported snapshot to the session
    Import {
        #[arg(long)]
        session: PathBuf,

        /// Snapshot JSON file
        #[arg(long)]
        input: PathBuf,
    },

    /// Show the self-assessment score
    Score {
        #[arg(long)]
        session: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Keyword checklist and length hint per question
    Check {
        #[arg(long)]
        session: PathBuf,
    },

    /// List field names
    Fields,

    /// Write a timestamped snapshot for submission or backup
    Export {
        #[arg(long)]
        session: PathBuf,

        /// Output directory (default: output_dir from config)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Render the report document
    Render {
        #[arg(long)]
        session: PathBuf,

        /// Output directory (default: output_dir from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Document format: html or pdf (default: report.format from config)
        #[arg(long)]
        format: Option<DocumentFormat>,

        /// TrueType font embedded in PDF output (default: report.pdf_font)
        #[arg(long)]
        font: Option<PathBuf>,
    },
}

fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "labnote=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::New {
            title,
            date,
            output,
            force,
        } => commands::new::execute(title, date, output, force, config),
        Commands::Info {
            session,
            date,
            class_name,
            seat_number,
            student_id,
            student_name,
            partner1_id,
            partner1_name,
            partner2_id,
            partner2_name,
        } => {
            let update = commands::info::InfoUpdate {
                date,
                class_name,
                seat_number,
                student_id,
                student_name,
                partner1_id,
                partner1_name,
                partner2_id,
                partner2_name,
            };
            commands::info::execute(session, update, config)
        }
        Commands::Set {
            session,
            field,
            value,
            file,
        } => commands::edit::set(session, field, value, file, config),
        Commands::Cell {
            session,
            field,
            row,
            column,
            value,
        } => commands::edit::cell(session, field, row, column, value, config),
        Commands::AddRow { session, field } => commands::edit::add_row(session, field, config),
        Commands::RemoveRow {
            session,
            field,
            row,
        } => commands::edit::remove_row(session, field, row, config),
        Commands::Photo {
            session,
            field,
            image,
            clear,
        } => commands::edit::photo(session, field, image, clear, config),
        Commands::Switch { session, title } => commands::switch::execute(session, title, config),
        Commands::Import { session, input } => commands::edit::import(session, input, config),
        Commands::Score { session, format } => commands::score::execute(session, format, config),
        Commands::Check { session } => commands::check::execute(session, config),
        Commands::Fields => commands::edit::list_fields(),
        Commands::Export { session, output } => commands::export::execute(session, output, config),
        Commands::Render {
            session,
            output,
            format,
            font,
        } => commands::render::execute(session, output, format, font, config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
