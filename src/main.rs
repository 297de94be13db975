use clap::Parser;
use filex::{
    ArchiveReader, Cli, Filex, FilexError, FileScanner, OutputFormatter, OutputMode,
    UserFriendlyError,
};
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    // Create Filex instance
    let app = match Filex::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    // Handle dry run mode
    if cli.dry_run {
        return handle_dry_run(&cli, &app);
    }

    // Execute main batch workflow
    match app.run_batch(&cli.root, cli.force).await {
        Ok(report) => {
            app.output_formatter().print_run_report(&report);

            // Recovered per-file errors mean partial failure
            if report.errors.is_empty() {
                0
            } else {
                2
            }
        }
        Err(e) => {
            app.handle_error(&e);

            match e {
                FilexError::Cancelled => 130, // Interrupted (SIGINT)
                _ => 1,
            }
        }
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "filex.toml".to_string());

    match Filex::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  filex <root-dir> --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(cli: &Cli, app: &Filex) -> i32 {
    let formatter = app.output_formatter();

    formatter.info("DRY RUN MODE - No files will be processed");
    formatter.print_separator();

    let config = app.config();

    println!("  Include: {}", config.filters.include.join(", "));
    if !config.filters.exclude.is_empty() {
        println!("  Exclude: {}", config.filters.exclude.join(", "));
    }
    if !config.pipeline.filter_terms.is_empty() {
        println!("  Filter terms: {}", config.pipeline.filter_terms.join(", "));
    }
    println!("  Threads: {}", config.pipeline.threads);
    println!("  Max file size: {} bytes", config.filters.max_file_size);
    println!("  Output file: {}", config.output.out_file.display());
    println!(
        "  Archives: {}",
        if config.pipeline.process_archives {
            "enabled"
        } else {
            "disabled"
        }
    );

    formatter.print_separator();

    let scanner = match FileScanner::new(&config.filters) {
        Ok(scanner) => scanner.with_archives(config.pipeline.process_archives),
        Err(e) => {
            formatter.print_user_friendly_error(&e);
            return 1;
        }
    };

    let outcome = match scanner.scan(&cli.root) {
        Ok(outcome) => outcome,
        Err(e) => {
            formatter.print_user_friendly_error(&e);
            return 1;
        }
    };

    formatter.info("Processing plan:");
    println!("  Files to process: {}", outcome.files.len());
    println!("  Files skipped (size): {}", outcome.skipped);

    for archive in &outcome.archives {
        match ArchiveReader::open(&archive.source_path) {
            Ok(reader) => match reader.list_members() {
                Ok(members) => println!(
                    "  Archive {} ({}): {} members",
                    archive.display_path,
                    reader.kind().display_name(),
                    members.len()
                ),
                Err(e) => println!("  Archive {}: unreadable ({})", archive.display_path, e),
            },
            Err(e) => println!("  Archive {}: unreadable ({})", archive.display_path, e),
        }
    }

    if cli.force {
        formatter.warning("Force mode enabled - would overwrite existing output");
    }

    formatter.print_separator();
    formatter.success("Dry run completed successfully");
    formatter.info("Run without --dry-run to perform actual processing");

    0
}

fn print_startup_error(error: &FilexError) {
    // Create a basic formatter for startup errors
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
