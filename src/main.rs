//! aspfmt - Formatter for classic ASP pages

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use aspfmt::{format_document, parse_args, ChangeSet, CliArgs, Config, HtmlFormatter, Result};
use glob::Pattern;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// File extensions formatted by default
const ASP_EXTENSIONS: &[&str] = &["asp", "asa", "inc", "aspx", "ascx", "html", "htm"];

/// Files larger than this are skipped (100 MB)
const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// A formatted file
struct FileResult {
    path: PathBuf,
    original: String,
    formatted: String,
}

/// What happened to one input file
enum Outcome {
    Formatted(FileResult),
    Skipped,
    Failed,
}

fn main() -> ExitCode {
    let args = parse_args();
    init_logging(&args);

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Install the stderr log subscriber; `RUST_LOG` wins over `--debug`
fn init_logging(args: &CliArgs) {
    let default_level = if args.debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &CliArgs) -> Result<ExitCode> {
    let use_stdin =
        args.inputs.is_empty() || (args.inputs.len() == 1 && args.inputs[0].as_os_str() == "-");

    if args.inputs.is_empty() && io::stdin().is_terminal() {
        print_usage();
        return Ok(ExitCode::SUCCESS);
    }

    if use_stdin {
        let config = build_config(args, None)?;
        return process_stdin(&config, args);
    }

    // An explicit config file applies to every file; otherwise each file
    // discovers its own
    let base_config = match &args.config {
        Some(_) => Some(build_config(args, None)?),
        None => None,
    };

    if let Some(jobs) = args.jobs.filter(|&jobs| jobs > 0) {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
        {
            eprintln!("Warning: failed to configure thread pool: {e}");
        }
    }

    let files = collect_files(args);
    if files.is_empty() {
        if !args.silent {
            eprintln!("No ASP files found to format.");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let format_one = |path: &PathBuf| -> Outcome {
        let result = match &base_config {
            Some(config) => format_file(path, config, args),
            None => build_config(args, Some(path.as_path()))
                .and_then(|config| format_file(path, &config, args)),
        };
        match result {
            Ok(Some(result)) => Outcome::Formatted(result),
            Ok(None) => Outcome::Skipped,
            Err(e) => {
                eprintln!("Error formatting {}: {e:#}", path.display());
                Outcome::Failed
            }
        }
    };
    // Formatting runs in parallel; output and writes happen in input order
    let outcomes: Vec<Outcome> = if args.stdout || args.jobs == Some(1) {
        files.iter().map(format_one).collect()
    } else {
        files.par_iter().map(format_one).collect()
    };
    let errors = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Outcome::Failed))
        .count();
    let results: Vec<FileResult> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            Outcome::Formatted(result) => Some(result),
            Outcome::Skipped | Outcome::Failed => None,
        })
        .collect();

    if args.stdout {
        let mut stdout = io::stdout().lock();
        for result in &results {
            stdout.write_all(result.formatted.as_bytes())?;
        }
        return Ok(exit_code(errors));
    }

    let formatted = results.len();
    let mut changes = ChangeSet::new();
    for result in results {
        changes.push_if_changed(&result.path, &result.original, result.formatted);
    }

    if args.check {
        for edit in changes.edits() {
            if !args.silent {
                println!("Would reformat: {}", edit.path.display());
            }
        }
        if !changes.is_empty() || errors > 0 {
            return Ok(ExitCode::FAILURE);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let changed = changes.apply()?;
    if !args.silent {
        if errors == 0 {
            eprintln!("Formatted {formatted} files successfully ({changed} changed).");
        } else {
            eprintln!("Formatted {formatted} files ({changed} changed), {errors} errors.");
        }
    }
    Ok(exit_code(errors))
}

fn exit_code(errors: usize) -> ExitCode {
    if errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Build configuration from CLI args and optional config file
///
/// If `for_path` is provided and no explicit config file is specified,
/// uses auto-discovery to find config files in parent directories.
fn build_config(args: &CliArgs, for_path: Option<&Path>) -> Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!(path = %config_path.display(), "using explicit config file");
        Config::from_toml_file(config_path)?
    } else {
        let start = match for_path {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir().unwrap_or_default(),
        };
        let discovered = Config::discover_config_files(&start);
        tracing::debug!(start = %start.display(), files = ?discovered, "discovered config files");
        Config::from_discovered_files(&start)
    };

    apply_cli_overrides(&mut config, args);
    tracing::debug!(?config, "effective configuration");

    if let Some(error) = config.validate() {
        anyhow::bail!("Invalid configuration: {error}");
    }
    Ok(config)
}

/// Override config fields set on the command line
fn apply_cli_overrides(config: &mut Config, args: &CliArgs) {
    if let Some(v) = args.vbscript_indent {
        config.vbscript_indent_size = v;
    }
    if let Some(v) = args.jscript_indent {
        config.jscript_indent_size = v;
    }
    if let Some(v) = args.max_line_length {
        config.max_line_length = v;
    }
    if let Some(v) = args.preserve_asp_comments {
        config.preserve_asp_comments = v;
    }
    if let Some(v) = args.preserve_includes {
        config.preserve_include_directives = v;
    }
    if let Some(v) = args.detect_language {
        config.detect_asp_language = v;
    }
    if let Some(v) = args.format_vbscript {
        config.format_vbscript_in_blocks = v;
    }
    if let Some(v) = args.format_jscript {
        config.format_jscript_in_blocks = v;
    }
    if let Some(v) = args.align_vbscript_assignments {
        config.vbscript_align_assignments = v;
    }
    if let Some(v) = args.align_jscript_assignments {
        config.jscript_align_assignments = v;
    }
    if let Some(v) = args.jscript_semicolons {
        config.jscript_semicolons = v;
    }
    if let Some(v) = args.align_server_blocks {
        config.align_server_blocks = v;
    }
    if let Some(v) = args.trim_trailing_whitespace {
        config.trim_trailing_whitespace = v;
    }
    if let Some(v) = args.html_indent {
        config.markup.indent_size = v;
    }
    if let Some(v) = args.html_tabs {
        config.markup.indent_with_tabs = v;
    }
    if let Some(v) = args.end_with_newline {
        config.markup.end_with_newline = v;
    }
}

/// Collect all files to process, handling directories and recursive flag
fn collect_files(args: &CliArgs) -> Vec<PathBuf> {
    let exclude_patterns: Vec<Pattern> = args
        .exclude
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                eprintln!("Warning: ignoring invalid exclude pattern {p:?}: {e}");
                None
            }
        })
        .collect();
    let wanted = |path: &Path| {
        path.is_file()
            && is_asp_file(path, &args.extensions)
            && !is_excluded(path, &exclude_patterns)
    };

    let mut files = Vec::new();
    for input in &args.inputs {
        if input.is_file() {
            if !is_excluded(input, &exclude_patterns) {
                files.push(input.clone());
            }
        } else if input.is_dir() {
            if args.recursive {
                // Symlink loops surface as walk errors and are skipped
                for entry in WalkDir::new(input)
                    .follow_links(true)
                    .max_depth(256)
                    .into_iter()
                    .filter_map(std::result::Result::ok)
                {
                    if wanted(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
            } else if let Ok(entries) = std::fs::read_dir(input) {
                for entry in entries.filter_map(std::result::Result::ok) {
                    let path = entry.path();
                    if wanted(&path) {
                        files.push(path);
                    }
                }
            }
        } else {
            eprintln!("Warning: {} does not exist", input.display());
        }
    }
    files.sort();
    files.dedup();
    files
}

/// Check if a path matches any exclusion pattern
fn is_excluded(path: &Path, patterns: &[Pattern]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let path_str = path.to_string_lossy();

    patterns.iter().any(|pattern| {
        // Full path, then each component (covers the file name and directories)
        pattern.matches(&path_str)
            || path.components().any(|component| match component {
                std::path::Component::Normal(c) => pattern.matches(&c.to_string_lossy()),
                _ => false,
            })
    })
}

/// Check if a file has an ASP extension (default or custom, case-insensitive)
fn is_asp_file(path: &Path, custom_extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ASP_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known))
                || custom_extensions.iter().any(|custom| {
                    ext.eq_ignore_ascii_case(custom.strip_prefix('.').unwrap_or(custom))
                })
        })
}

/// Read and format a single file; `None` means it was skipped
fn format_file(path: &Path, config: &Config, args: &CliArgs) -> Result<Option<FileResult>> {
    let file_size = std::fs::metadata(path)?.len();
    if file_size > DEFAULT_MAX_FILE_SIZE {
        if !args.silent {
            eprintln!(
                "Skipping {} ({} MB exceeds limit of {} MB)",
                path.display(),
                file_size / (1024 * 1024),
                DEFAULT_MAX_FILE_SIZE / (1024 * 1024)
            );
        }
        return Ok(None);
    }

    let original = std::fs::read_to_string(path)?;
    if !args.silent && !args.stdout && !args.check {
        eprintln!("Formatting: {}", path.display());
    }
    let formatted = format_document(&original, config, &HtmlFormatter);
    Ok(Some(FileResult {
        path: path.to_path_buf(),
        original,
        formatted,
    }))
}

/// Process input from stdin, output to stdout
fn process_stdin(config: &Config, args: &CliArgs) -> Result<ExitCode> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    #[allow(clippy::cast_possible_truncation)]
    let input_size = input.len() as u64;
    if input_size > DEFAULT_MAX_FILE_SIZE {
        anyhow::bail!(
            "stdin input too large ({} MB exceeds limit of {} MB)",
            input_size / (1024 * 1024),
            DEFAULT_MAX_FILE_SIZE / (1024 * 1024)
        );
    }

    let formatted = format_document(&input, config, &HtmlFormatter);
    if args.check {
        return Ok(if formatted == input {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }
    io::stdout().write_all(formatted.as_bytes())?;
    Ok(ExitCode::SUCCESS)
}

fn print_usage() {
    println!(
        "aspfmt v{} - formatter for classic ASP pages",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("Usage:");
    println!("  aspfmt [OPTIONS] <FILE>...");
    println!("  aspfmt [OPTIONS] -r <DIRECTORY>");
    println!("  aspfmt [OPTIONS] -              # Read from stdin");
    println!("  cat page.asp | aspfmt           # Pipe input");
    println!();
    println!("Examples:");
    println!("  aspfmt page.asp                         # Format a page in-place");
    println!("  aspfmt -r site/ -e vendor               # Format a tree, skipping vendor/");
    println!("  aspfmt --check -r site/                 # List pages that would change");
    println!("  aspfmt --format-jscript --detect-language page.asp");
    println!();
    println!("Run `aspfmt --help` for every option.");
    println!();
    println!("Supported extensions: .asp .asa .inc .aspx .ascx .html .htm (plus --ext)");
    println!();
    println!("Config file auto-discovery:");
    println!("  Searches for aspfmt.toml in the home directory and in every directory");
    println!("  from the filesystem root down to the file being formatted.");
    println!("  Configs closer to the file override farther ones.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use aspfmt::parse_args_from;

    #[test]
    fn test_is_asp_file() {
        assert!(is_asp_file(Path::new("a/index.asp"), &[]));
        assert!(is_asp_file(Path::new("GLOBAL.ASA"), &[]));
        assert!(!is_asp_file(Path::new("style.css"), &[]));
        assert!(is_asp_file(Path::new("page.tpl"), &[".tpl".to_string()]));
        assert!(!is_asp_file(Path::new("Makefile"), &[]));
    }

    #[test]
    fn test_is_excluded() {
        let patterns = vec![Pattern::new("vendor").unwrap(), Pattern::new("*.min.asp").unwrap()];
        assert!(is_excluded(Path::new("site/vendor/lib.asp"), &patterns));
        assert!(is_excluded(Path::new("site/app.min.asp"), &patterns));
        assert!(!is_excluded(Path::new("site/app.asp"), &patterns));
        assert!(!is_excluded(Path::new("site/app.asp"), &[]));
    }

    #[test]
    fn test_cli_overrides_applied() {
        let args = parse_args_from(vec![
            "aspfmt",
            "--vbscript-indent",
            "2",
            "--format-jscript",
            "--preserve-asp-comments=false",
            "--html-tabs",
            "a.asp",
        ]);
        let mut config = Config::default();
        apply_cli_overrides(&mut config, &args);
        assert_eq!(config.vbscript_indent_size, 2);
        assert!(config.format_jscript_in_blocks);
        assert!(!config.preserve_asp_comments);
        assert!(config.markup.indent_with_tabs);
        assert_eq!(config.jscript_indent_size, 2);
    }

    #[test]
    fn test_collect_files_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("inc");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("a.asp"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(nested.join("b.inc"), "").unwrap();

        let root = dir.path().to_string_lossy().to_string();
        let flat = collect_files(&parse_args_from(vec!["aspfmt", root.as_str()]));
        assert_eq!(flat, vec![dir.path().join("a.asp")]);

        let deep = collect_files(&parse_args_from(vec!["aspfmt", "-r", root.as_str()]));
        assert_eq!(deep, vec![dir.path().join("a.asp"), nested.join("b.inc")]);
    }
}
