//! Command-line interface for aspfmt.
//!
//! Defines CLI arguments using clap builder API

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};

/// CLI arguments parsed from command line
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Files or directories to format
    pub inputs: Vec<PathBuf>,

    /// Spaces per VBScript indent level
    pub vbscript_indent: Option<usize>,

    /// Spaces per JScript indent level
    pub jscript_indent: Option<usize>,

    /// Long-line break threshold (0 disables)
    pub max_line_length: Option<usize>,

    /// Keep `<%-- --%>` comments verbatim
    pub preserve_asp_comments: Option<bool>,

    /// Keep `<!-- #include -->` directives verbatim
    pub preserve_includes: Option<bool>,

    /// Classify each block's script language
    pub detect_language: Option<bool>,

    /// Beautify VBScript blocks
    pub format_vbscript: Option<bool>,

    /// Beautify JScript blocks
    pub format_jscript: Option<bool>,

    /// Align `=` in VBScript blocks
    pub align_vbscript_assignments: Option<bool>,

    /// Align `=` in JScript blocks
    pub align_jscript_assignments: Option<bool>,

    /// Append missing `;` in JScript blocks
    pub jscript_semicolons: Option<bool>,

    /// Re-indent multi-line blocks to their markup position
    pub align_server_blocks: Option<bool>,

    /// Strip trailing whitespace from output lines
    pub trim_trailing_whitespace: Option<bool>,

    /// Spaces per HTML indent level
    pub html_indent: Option<usize>,

    /// Indent HTML with tabs
    pub html_tabs: Option<bool>,

    /// End output with a newline
    pub end_with_newline: Option<bool>,

    /// Output to stdout instead of in-place
    pub stdout: bool,

    /// Report files that would change without writing them
    pub check: bool,

    /// Config file path
    pub config: Option<PathBuf>,

    /// Recursive directory processing
    pub recursive: bool,

    /// Silent mode (no output)
    pub silent: bool,

    /// Number of parallel jobs (0 = auto, 1 = sequential)
    pub jobs: Option<usize>,

    /// Exclude patterns for files/directories (glob patterns)
    pub exclude: Vec<String>,

    /// Custom file extensions (in addition to defaults)
    pub extensions: Vec<String>,

    /// Enable debug output
    pub debug: bool,
}

/// A `--flag[=BOOL]` option; the bare flag means true
fn toggle(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .value_name("BOOL")
        .num_args(0..=1)
        .require_equals(true)
        .default_missing_value("true")
        .value_parser(clap::value_parser!(bool))
}

/// Build the clap Command for parsing CLI arguments
#[must_use]
pub fn build_cli() -> Command {
    Command::new("aspfmt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Formatter for classic ASP pages: HTML with embedded VBScript and JScript")
        .arg(
            Arg::new("inputs")
                .help("Files or directories to format ('-' reads stdin)")
                .value_name("FILE")
                .num_args(1..)
                .required(false)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("vbscript-indent")
                .long("vbscript-indent")
                .help("Spaces per VBScript indent level [default: 4]")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("jscript-indent")
                .long("jscript-indent")
                .help("Spaces per JScript indent level [default: 2]")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("max-line-length")
                .short('l')
                .long("max-line-length")
                .help("Break script lines longer than this, 0 disables [default: 120]")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(toggle(
            "preserve-asp-comments",
            "Keep <%-- --%> comments verbatim [default: true]",
        ))
        .arg(toggle(
            "preserve-includes",
            "Keep <!-- #include --> directives verbatim [default: true]",
        ))
        .arg(toggle(
            "detect-language",
            "Guess each block's script language from its code [default: false]",
        ))
        .arg(toggle(
            "format-vbscript",
            "Beautify VBScript inside blocks [default: true]",
        ))
        .arg(toggle(
            "format-jscript",
            "Beautify JScript inside blocks [default: false]",
        ))
        .arg(toggle(
            "align-vbscript-assignments",
            "Align = of VBScript assignments [default: false]",
        ))
        .arg(toggle(
            "align-jscript-assignments",
            "Align = of JScript assignments [default: false]",
        ))
        .arg(toggle(
            "jscript-semicolons",
            "Append missing ; to JScript statements [default: true]",
        ))
        .arg(toggle(
            "align-server-blocks",
            "Re-indent multi-line blocks to their place in the markup [default: true]",
        ))
        .arg(toggle(
            "trim-trailing-whitespace",
            "Strip trailing whitespace from every line [default: true]",
        ))
        .arg(
            Arg::new("html-indent")
                .long("html-indent")
                .help("Spaces per HTML indent level [default: 4]")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(toggle("html-tabs", "Indent HTML with tabs [default: false]"))
        .arg(toggle(
            "end-with-newline",
            "End the output with a newline [default: false]",
        ))
        .arg(
            Arg::new("stdout")
                .short('s')
                .long("stdout")
                .help("Output to stdout instead of modifying files in-place")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("List files that would change and exit with status 1; write nothing")
                .action(ArgAction::SetTrue)
                .conflicts_with("stdout"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to configuration file (overrides auto-discovery)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("recursive")
                .short('r')
                .long("recursive")
                .help("Recursively format directories")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("exclude")
                .short('e')
                .long("exclude")
                .help("Exclude files/directories matching pattern (glob syntax, can be repeated)")
                .value_name("PATTERN")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("ext")
                .short('x')
                .long("ext")
                .help("Additional file extension to format (can be repeated, e.g., -x shtml)")
                .value_name("EXT")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("debug")
                .short('D')
                .long("debug")
                .help("Enable debug logging (config, block languages, fallbacks)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('S')
                .long("silent")
                .help("Silent mode (no output, for editor integration)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .help("Number of parallel jobs (0=auto, 1=sequential)")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
}

/// Parse CLI arguments from command line
#[must_use]
pub fn parse_args() -> CliArgs {
    args_from_matches(&build_cli().get_matches())
}

/// Parse CLI arguments from an iterator (for testing)
#[must_use]
pub fn parse_args_from<I, T>(args: I) -> CliArgs
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    args_from_matches(&build_cli().get_matches_from(args))
}

/// Convert clap `ArgMatches` to `CliArgs`
fn args_from_matches(matches: &clap::ArgMatches) -> CliArgs {
    let flag = |name: &str| matches.get_one::<bool>(name).copied();
    let strings = |name: &str| -> Vec<String> {
        matches
            .get_many::<String>(name)
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default()
    };

    CliArgs {
        inputs: matches
            .get_many::<PathBuf>("inputs")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default(),
        vbscript_indent: matches.get_one::<usize>("vbscript-indent").copied(),
        jscript_indent: matches.get_one::<usize>("jscript-indent").copied(),
        max_line_length: matches.get_one::<usize>("max-line-length").copied(),
        preserve_asp_comments: flag("preserve-asp-comments"),
        preserve_includes: flag("preserve-includes"),
        detect_language: flag("detect-language"),
        format_vbscript: flag("format-vbscript"),
        format_jscript: flag("format-jscript"),
        align_vbscript_assignments: flag("align-vbscript-assignments"),
        align_jscript_assignments: flag("align-jscript-assignments"),
        jscript_semicolons: flag("jscript-semicolons"),
        align_server_blocks: flag("align-server-blocks"),
        trim_trailing_whitespace: flag("trim-trailing-whitespace"),
        html_indent: matches.get_one::<usize>("html-indent").copied(),
        html_tabs: flag("html-tabs"),
        end_with_newline: flag("end-with-newline"),
        stdout: matches.get_flag("stdout"),
        check: matches.get_flag("check"),
        config: matches.get_one::<PathBuf>("config").cloned(),
        recursive: matches.get_flag("recursive"),
        exclude: strings("exclude"),
        extensions: strings("ext"),
        debug: matches.get_flag("debug"),
        silent: matches.get_flag("silent"),
        jobs: matches.get_one::<usize>("jobs").copied(),
    }
}
