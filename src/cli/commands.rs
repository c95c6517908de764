use crate::config::EngineConfig;
use crate::core::{process_sheet, CancelToken, FunctionRegistry, HeaderBinder, ProcessingReport};
use crate::error::{SheetError, SheetResult};
use crate::source::{import_csv, open_source, DryRunSource, RowSource};
use chrono::Local;
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

/// Options for the calculate command
#[derive(Debug, Clone, Default)]
pub struct CalculateOptions {
    pub output: Option<PathBuf>,
    pub dry_run: bool,
    pub verbose: bool,
    pub json: bool,
    pub config: Option<PathBuf>,
}

fn load_engine(config: Option<&Path>) -> SheetResult<(EngineConfig, FunctionRegistry)> {
    let config = EngineConfig::load_optional(config)?;
    let registry = config.build_registry()?;
    Ok((config, registry))
}

/// Execute the calculate command
pub fn calculate(file: PathBuf, options: CalculateOptions) -> SheetResult<ProcessingReport> {
    let (config, registry) = load_engine(options.config.as_deref())?;

    if !options.json {
        println!("{}", "🔥 SheetMacro - Calculating cells".bold().green());
        println!("   File: {}", file.display());
        if let Some(ref out) = options.output {
            println!("   Output: {}", out.display());
        }
        println!();
        if options.dry_run {
            println!(
                "{}",
                "📋 DRY RUN MODE - No changes will be written\n".yellow()
            );
        }
    }

    let source = open_source(&file, options.output.clone(), config.retry)?;
    let cancel = CancelToken::new();

    let report = if options.dry_run {
        let mut dry = DryRunSource::new(source);
        let report = process_sheet(&mut dry, &registry, &config, &cancel)?;
        if !options.json {
            for row in dry.changes() {
                println!("   {} {}", format!("row {}:", row.id).cyan(), row.cells.join(" | "));
            }
            if !dry.changes().is_empty() {
                println!();
            }
        }
        report
    } else {
        let mut source = source;
        process_sheet(&mut source, &registry, &config, &cancel)?
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, options.verbose);
        if options.dry_run {
            println!("{}", "📋 Dry run complete - no changes written".yellow());
        }
    }

    Ok(report)
}

fn print_report(report: &ProcessingReport, verbose: bool) {
    if report.is_clean() {
        println!("{}", "✅ Calculation Results:".bold().green());
    } else {
        println!("{}", "⚠️  Calculation finished with problems:".bold().yellow());
    }
    println!("   Rows processed: {}", report.rows_processed);
    println!("   Rows changed:   {}", report.rows_changed);
    println!(
        "   Cells computed: {}",
        report.cells_computed.to_string().bold()
    );

    if !report.failures.is_empty() {
        println!(
            "\n   {}",
            format!("❌ {} cells failed:", report.failures.len()).red()
        );
        for failure in &report.failures {
            println!(
                "      row {} col {} {}: {}",
                failure.row_id,
                failure.column + 1,
                failure.function.bright_blue(),
                failure.cause
            );
        }
    }

    for collision in &report.collisions {
        println!(
            "   {} '{}' ignored, '{}' kept",
            "⚠️  Name collision:".yellow(),
            collision.ignored,
            collision.kept
        );
    }

    if report.cancelled {
        println!("   {}", "⏹  Pass was cancelled".yellow());
    }

    if verbose {
        println!("\n   {}", report.summary().dimmed());
    }
    println!();
}

/// Execute the validate command: bind headers and report what a pass would do
pub fn validate(files: Vec<PathBuf>, config: Option<PathBuf>) -> SheetResult<()> {
    let (config, registry) = load_engine(config.as_deref())?;
    let mut failed = Vec::new();

    for file in &files {
        if let Err(e) = validate_file(file, &config, &registry) {
            println!(
                "{}",
                format!("❌ {}: {}", file.display(), e).bold().red()
            );
            failed.push(file.display().to_string());
        }
        println!();
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(SheetError::Validation(format!(
            "{} of {} files failed validation: {}",
            failed.len(),
            files.len(),
            failed.join(", ")
        )))
    }
}

fn validate_file(file: &Path, config: &EngineConfig, registry: &FunctionRegistry) -> SheetResult<()> {
    println!("{}", "✅ Validating sheet".bold().green());
    println!("   File: {}\n", file.display());

    let mut source = open_source(file, None, config.retry)?;
    let rows = source.read_rows()?;
    let (header, data) = rows
        .split_first()
        .ok_or_else(|| SheetError::MissingHeader(file.display().to_string()))?;

    let session = HeaderBinder::bind(registry, &header.cells, config);
    let function_columns: Vec<_> = session.function_columns().collect();

    if function_columns.is_empty() {
        println!("{}", "⚠️  No header label names a known function".yellow());
        return Ok(());
    }

    for (col, function) in &function_columns {
        let pending = data
            .iter()
            .filter(|row| row.cells.get(*col).map(String::as_str) == Some(session.placeholder()))
            .count();
        println!(
            "   {} {} ({} pending)",
            format!("col {}:", col + 1).cyan(),
            function.signature().bright_blue().bold(),
            pending
        );

        for param in &function.parameters {
            let resolution = match session.column_named(&param.name) {
                Some(c) => format!("column {}", c + 1).green(),
                None if param.has_default() => "default".normal(),
                None => format!("sentinel '{}'", session.sentinel()).yellow(),
            };
            println!("      {} ← {}", param.name, resolution);
        }
    }

    println!(
        "\n   {} data rows, {} function columns",
        data.len(),
        function_columns.len()
    );
    Ok(())
}

/// List registered functions
pub fn functions(config: Option<PathBuf>) -> SheetResult<()> {
    let (_, registry) = load_engine(config.as_deref())?;

    println!("{}", "📚 Registered functions".bold().green());
    for function in registry.functions() {
        println!("   {}", function.signature());
    }
    for collision in registry.collisions() {
        println!(
            "   {} '{}' ignored, '{}' kept",
            "⚠️  Name collision:".yellow(),
            collision.ignored,
            collision.kept
        );
    }
    Ok(())
}

/// Execute the import command (CSV -> YAML snapshot store)
pub fn import(input: PathBuf, output: PathBuf) -> SheetResult<()> {
    println!("{}", "📥 SheetMacro - Importing CSV".bold().green());
    println!("   Input:  {}", input.display());
    println!("   Output: {}\n", output.display());

    let rows = import_csv(&input, &output)?;

    println!("{}", "✅ Import Complete!".bold().green());
    println!("   {} rows stored\n", rows);
    Ok(())
}

/// Execute the watch command
pub fn watch(file: PathBuf, config: Option<PathBuf>, verbose: bool) -> SheetResult<()> {
    println!("{}", "👁️  SheetMacro - Watch Mode".bold().green());
    println!("   Watching: {}", file.display());
    println!("   Press {} to stop\n", "Ctrl+C".bold().yellow());

    if !file.exists() {
        return Err(SheetError::Validation(format!(
            "File not found: {}",
            file.display()
        )));
    }

    let canonical_path = file.canonicalize()?;
    let parent_dir = canonical_path
        .parent()
        .ok_or_else(|| SheetError::Validation("Cannot determine parent directory".to_string()))?;

    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(Duration::from_millis(200), tx)
        .map_err(|e| SheetError::Validation(format!("Failed to create file watcher: {}", e)))?;
    debouncer
        .watcher()
        .watch(parent_dir, RecursiveMode::NonRecursive)
        .map_err(|e| SheetError::Validation(format!("Failed to watch directory: {}", e)))?;

    let options = CalculateOptions {
        verbose,
        config,
        ..Default::default()
    };

    println!("{}", "🔄 Initial run...".cyan());
    run_watch_action(&file, &options);

    // Our own write-back triggers one more event; that pass finds no
    // placeholders and writes nothing, so the loop settles.
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().any(|event| {
                    event.kind == DebouncedEventKind::Any
                        && event
                            .path
                            .canonicalize()
                            .map(|p| p == canonical_path)
                            .unwrap_or(false)
                });
                if relevant {
                    println!(
                        "\n{} {}",
                        "🔄 Change detected at".cyan(),
                        Local::now().format("%H:%M:%S").to_string().cyan()
                    );
                    run_watch_action(&file, &options);
                }
            }
            Ok(Err(error)) => {
                eprintln!("{} Watch error: {}", "❌".red(), error);
            }
            Err(e) => {
                eprintln!("{} Channel error: {}", "❌".red(), e);
                break;
            }
        }
    }

    Ok(())
}

fn run_watch_action(file: &Path, options: &CalculateOptions) {
    if let Err(e) = calculate(file.to_path_buf(), options.clone()) {
        println!("{} {}", "❌ Calculation failed:".bold().red(), e);
    }
}
