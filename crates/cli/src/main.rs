// rollcall - reconcile submitted attendance sheets against the backend export

mod batch;
mod exit_codes;
mod inspect;
mod logging;
mod run;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use rollcall_io::{LoadError, WriteError};
use rollcall_recon::{ReconError, Side};

use exit_codes::{
    EXIT_DUPLICATE_KEY, EXIT_INVALID_CONFIG, EXIT_IO, EXIT_SCHEMA, EXIT_SUCCESS, EXIT_UNSUPPORTED_FORMAT, EXIT_USAGE,
};
use logging::LogFormat;
use settings::ReconArgs;

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Reconcile submitted attendance sheets against the backend export")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Report file format for batch output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Xlsx,
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one submitted sheet against the backend export
    #[command(after_help = "\
Examples:
  rollcall run attendance.xlsx
  rollcall run attendance.xlsx --backend backend/Qandle.xlsx --out report.csv
  rollcall run attendance.csv --id-column 'Staff No' --json
  rollcall run attendance.csv --backend-id-column 'Staff No' --submission-id-column 'Emp ID'
  rollcall run attendance.xlsx --prompt-id-column")]
    Run {
        /// Submitted attendance sheet (.xlsx, .xlsm, .xls, .xlsb, .ods, .csv)
        submission: PathBuf,

        #[command(flatten)]
        recon: ReconArgs,

        /// Report file (.xlsx, .csv or .json; default from config)
        #[arg(long, short = 'o', value_name = "FILE")]
        out: Option<PathBuf>,

        /// Print the run outcome as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Ask for the identity column on stdin when it cannot be found
        #[arg(long, conflicts_with = "json")]
        prompt_id_column: bool,
    },

    /// Reconcile many submitted sheets against one backend export, in parallel
    #[command(after_help = "\
Examples:
  rollcall batch submissions/*.xlsx --out-dir reports
  rollcall batch a.xlsx b.csv --out-dir reports --format csv --json")]
    Batch {
        /// Submitted attendance sheets
        #[arg(required = true)]
        submissions: Vec<PathBuf>,

        #[command(flatten)]
        recon: ReconArgs,

        /// Directory for per-submission reports
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,

        /// Report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Xlsx)]
        format: ReportFormat,

        /// Print per-file outcomes as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Show how a sheet's columns are recognized
    #[command(after_help = "\
Examples:
  rollcall inspect attendance.xlsx
  rollcall inspect backend/Qandle.xlsx --sheet Qandle --json")]
    Inspect {
        /// Sheet to inspect
        file: PathBuf,

        /// Worksheet name (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Apply the positional fallback for code and name columns
        #[arg(long)]
        positional_fallback: bool,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Validate a config file without running
    Validate {
        /// Path to the rollcall.toml config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.log_format);

    let result = match cli.command {
        Commands::Run {
            submission,
            recon,
            out,
            json,
            prompt_id_column,
        } => run::cmd_run(submission, recon, out, json, prompt_id_column),
        Commands::Batch {
            submissions,
            recon,
            out_dir,
            format,
            json,
        } => batch::cmd_batch(submissions, recon, out_dir, format, json),
        Commands::Inspect {
            file,
            sheet,
            positional_fallback,
            json,
        } => inspect::cmd_inspect(file, sheet, positional_fallback, json),
        Commands::Validate { config } => inspect::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug, Clone)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let side = match &err {
            ReconError::InTable { side, .. } => Some(*side),
            _ => None,
        };
        let prefix = side.map(|s| format!("{s} table: ")).unwrap_or_default();
        let flag = match side {
            Some(Side::Reference) => "backend-",
            Some(Side::Submission) => "submission-",
            None => "",
        };

        match err.root() {
            ReconError::Schema { column, found } => {
                CliError::new(EXIT_SCHEMA, format!("{prefix}identity column '{column}' not found")).with_hint(format!(
                    "columns found: {}; pass --{}id-column NAME or --prompt-id-column",
                    found.join(", "),
                    flag
                ))
            }
            ReconError::DuplicateKey(_) => CliError::new(EXIT_DUPLICATE_KEY, err.to_string())
                .with_hint("employee codes must be unique; fix the sheet or pass --on-duplicate keep-first|keep-last"),
            ReconError::MissingDisplayColumn { .. } => CliError::new(EXIT_SCHEMA, err.to_string())
                .with_hint("rename the employee name column so its header contains \"name\""),
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
                CliError::new(EXIT_INVALID_CONFIG, err.to_string())
            }
            ReconError::InTable { .. } => CliError::new(EXIT_SCHEMA, err.to_string()),
        }
    }
}

impl From<LoadError> for CliError {
    fn from(err: LoadError) -> Self {
        match &err {
            LoadError::UnsupportedFormat { .. } => CliError::new(EXIT_UNSUPPORTED_FORMAT, err.to_string()),
            LoadError::NoBackend { .. } => {
                CliError::new(EXIT_IO, err.to_string()).with_hint("pass --backend FILE or set [backend] file in rollcall.toml")
            }
            LoadError::SheetNotFound { .. } => {
                CliError::new(EXIT_IO, err.to_string()).with_hint("set [backend] sheet or [submission] sheet in rollcall.toml to one of the listed sheets")
            }
            LoadError::NotFound(_) | LoadError::Access { .. } | LoadError::Parse { .. } => {
                CliError::new(EXIT_IO, err.to_string())
            }
        }
    }
}

impl From<WriteError> for CliError {
    fn from(err: WriteError) -> Self {
        let code = match err {
            WriteError::UnsupportedFormat(_) => EXIT_UNSUPPORTED_FORMAT,
            WriteError::Io { .. } | WriteError::Encode { .. } => EXIT_IO,
        };
        CliError::new(code, err.to_string())
    }
}
