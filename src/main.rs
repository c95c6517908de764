use clap::{Parser, Subcommand};
use sheetmacro::cli::{self, CalculateOptions};
use sheetmacro::error::SheetResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetmacro")]
#[command(about = "Fill `?` cells by calling the function named in the column header.")]
#[command(long_about = "SheetMacro - spreadsheet macro engine

Row 1 names columns. A column whose label matches a registered function
(case-insensitive) is a function column. In every later row, a `?` in a
function column is replaced by the function's result. Arguments come from
same-row columns named like the function's parameters, then from the
parameter's default, then from the sentinel value `foo`.

COMMANDS:
  calculate   - Evaluate `?` cells in a CSV file or YAML store
  validate    - Show header bindings and pending cells without writing
  functions   - List registered functions
  import      - Load a CSV file into a YAML snapshot store
  watch       - Re-calculate whenever the file changes

EXAMPLES:
  sheetmacro calculate sample.csv
  sheetmacro calculate sample.csv --dry-run
  sheetmacro calculate sample.csv -o result.csv --config functions.yaml
  sheetmacro import sample.csv rows.yaml && sheetmacro calculate rows.yaml")]
#[command(version)]
struct Cli {
    /// Engine configuration file (YAML)
    #[arg(short, long, global = true, env = "SHEETMACRO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate placeholder cells and write results back
    Calculate {
        /// CSV file, or .yaml/.yml snapshot store
        file: PathBuf,

        /// Write results to this CSV file instead of the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Preview changes without writing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show verbose output and debug logs
        #[arg(short, long)]
        verbose: bool,

        /// Print the processing report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show header bindings and pending cells
    Validate {
        /// Files to validate
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List registered functions
    Functions,

    /// Load a CSV file into a YAML snapshot store
    Import {
        /// CSV file
        input: PathBuf,

        /// YAML store to create
        output: PathBuf,
    },

    /// Watch a file and re-calculate on changes
    Watch {
        /// File to watch
        file: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> SheetResult<()> {
    let cli = Cli::parse();

    let verbose = matches!(
        cli.command,
        Commands::Calculate { verbose: true, .. } | Commands::Watch { verbose: true, .. }
    );
    cli::init_logging(verbose);

    match cli.command {
        Commands::Calculate {
            file,
            output,
            dry_run,
            verbose,
            json,
        } => cli::calculate(
            file,
            CalculateOptions {
                output,
                dry_run,
                verbose,
                json,
                config: cli.config,
            },
        )
        .map(|_| ()),

        Commands::Validate { files } => cli::validate(files, cli.config),

        Commands::Functions => cli::functions(cli.config),

        Commands::Import { input, output } => cli::import(input, output),

        Commands::Watch { file, verbose } => cli::watch(file, cli.config, verbose),
    }
}
