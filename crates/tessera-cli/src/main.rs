use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tessera_compiler::{code_frame_for, compile, CompileMessage, CompiledResult, CompilerOptions, Whitespace};

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Tessera: template to render function compiler")]
#[command(version)]
struct Cli {
    /// Log every compiler stage
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a template into a render function module
    Build {
        #[command(flatten)]
        args: CompileArgs,

        /// Write the output to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check a template for errors without generating output
    Check {
        #[command(flatten)]
        args: CompileArgs,
    },
}

#[derive(Args)]
struct CompileArgs {
    /// Input template file
    path: PathBuf,

    /// JSON file with compiler options
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Interpolation delimiters
    #[arg(long, num_args = 2, value_names = ["OPEN", "CLOSE"])]
    delimiters: Option<Vec<String>>,

    /// Whitespace handling: preserve or condense
    #[arg(long)]
    whitespace: Option<Whitespace>,

    /// Keep HTML comments in the output
    #[arg(long)]
    comments: bool,

    /// Skip static subtree hoisting
    #[arg(long)]
    no_optimize: bool,

    /// Attach source ranges to diagnostics
    #[arg(long)]
    source_range: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid options in {}: {source}", path.display())]
    Options {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Build { args, out } => cmd_build(&args, out.as_deref()),
        Command::Check { args } => cmd_check(&args),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn read_source(path: &Path) -> Result<String, CliError> {
    if !path.exists() {
        return Err(CliError::NotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Options file first, then command line flags on top.
fn load_options(args: &CompileArgs) -> Result<CompilerOptions, CliError> {
    let mut options = match &args.options {
        Some(path) => {
            let text = read_source(path)?;
            serde_json::from_str::<CompilerOptions>(&text).map_err(|source| CliError::Options {
                path: path.clone(),
                source,
            })?
        }
        None => CompilerOptions::new(),
    };
    if let Some([open, close]) = args.delimiters.as_deref() {
        options = options.delimiters(open.as_str(), close.as_str());
    }
    if let Some(whitespace) = args.whitespace {
        options = options.whitespace(whitespace);
    }
    if args.comments {
        options = options.comments(true);
    }
    if args.no_optimize {
        options = options.optimize(false);
    }
    if args.source_range {
        options = options.output_source_range(true);
    }
    Ok(options)
}

fn cmd_build(args: &CompileArgs, out: Option<&Path>) -> Result<ExitCode, CliError> {
    let source = read_source(&args.path)?;
    let options = load_options(args)?;
    log::debug!("building {}", args.path.display());

    let result = compile(&source, &options);
    if !args.json {
        report(&args.path, &source, &result);
        if !result.errors.is_empty() {
            return Ok(ExitCode::FAILURE);
        }
    }

    let output = if args.json {
        serde_json::to_string_pretty(&result)?
    } else {
        render_module(&result)
    };
    match out {
        Some(path) => {
            std::fs::write(path, output).map_err(|source| CliError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            eprintln!("Built {} -> {}", args.path.display(), path.display());
        }
        None => println!("{output}"),
    }

    Ok(if result.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_check(args: &CompileArgs) -> Result<ExitCode, CliError> {
    let source = read_source(&args.path)?;
    // Code frames need located diagnostics.
    let options = load_options(args)?.output_source_range(true);

    let result = compile(&source, &options);
    if args.json {
        let diagnostics = serde_json::json!({
            "errors": result.errors,
            "tips": result.tips,
        });
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);
    } else {
        report(&args.path, &source, &result);
    }

    if result.errors.is_empty() {
        if !args.json {
            println!("OK: {} has no errors", args.path.display());
        }
        Ok(ExitCode::SUCCESS)
    } else {
        if !args.json {
            eprintln!("{} error(s) in {}", result.errors.len(), args.path.display());
        }
        Ok(ExitCode::FAILURE)
    }
}

fn report(path: &Path, source: &str, result: &CompiledResult) {
    for error in &result.errors {
        eprintln!("{}", format_message("error", path, source, error));
    }
    for tip in &result.tips {
        eprintln!("{}", format_message("tip", path, source, tip));
    }
}

fn format_message(level: &str, path: &Path, source: &str, message: &CompileMessage) -> String {
    let range = message.range();
    match range.start {
        Some(start) => {
            let (line, column) = line_column(source, start);
            format!(
                "{level}: {}\n  --> {}:{line}:{column}\n{}",
                message.msg(),
                path.display(),
                code_frame_for(source, range)
            )
        }
        None => format!("{level}: {}", message.msg()),
    }
}

/// 1-based line and column of a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut end = offset.min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let before = &source[..end];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
    (line, column)
}

/// An ES module exporting `render` and `staticRenderFns`.
fn render_module(result: &CompiledResult) -> String {
    let statics: Vec<String> = result
        .static_render_fns
        .iter()
        .map(|code| format!("  function () {{{code}}}"))
        .collect();
    let statics = if statics.is_empty() {
        "[]".to_string()
    } else {
        format!("[\n{}\n]", statics.join(",\n"))
    };
    format!(
        "var render = function () {{{}}};\nvar staticRenderFns = {statics};\nexport {{ render, staticRenderFns }};",
        result.render
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(path: &str) -> CompileArgs {
        CompileArgs {
            path: PathBuf::from(path),
            options: None,
            delimiters: None,
            whitespace: None,
            comments: false,
            no_optimize: false,
            source_range: false,
            json: false,
        }
    }

    // =========================================================================
    // Options
    // =========================================================================

    #[test]
    fn test_flags_become_options() {
        let mut cli_args = args("a.html");
        cli_args.delimiters = Some(vec!["${".to_string(), "}".to_string()]);
        cli_args.whitespace = Some(Whitespace::Condense);
        cli_args.comments = true;
        cli_args.no_optimize = true;
        let options = load_options(&cli_args).unwrap();
        assert_eq!(
            options.delimiters,
            Some(("${".to_string(), "}".to_string()))
        );
        assert_eq!(options.whitespace, Some(Whitespace::Condense));
        assert_eq!(options.comments, Some(true));
        assert_eq!(options.optimize, Some(false));
        assert!(!options.output_source_range);
    }

    #[test]
    fn test_missing_options_file() {
        let mut cli_args = args("a.html");
        cli_args.options = Some(PathBuf::from("/nonexistent/tessera-options.json"));
        let err = load_options(&cli_args).unwrap_err();
        assert!(matches!(err, CliError::NotFound(_)));
    }

    #[test]
    fn test_cli_parses_build_flags() {
        let cli = Cli::try_parse_from([
            "tessera", "build", "app.html", "--delimiters", "[[", "]]", "--whitespace", "condense",
            "-o", "app.js",
        ])
        .unwrap();
        let Command::Build { args, out } = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.delimiters, Some(vec!["[[".to_string(), "]]".to_string()]));
        assert_eq!(args.whitespace, Some(Whitespace::Condense));
        assert_eq!(out, Some(PathBuf::from("app.js")));
    }

    #[test]
    fn test_cli_rejects_unknown_whitespace() {
        assert!(Cli::try_parse_from(["tessera", "check", "a.html", "--whitespace", "tight"]).is_err());
    }

    // =========================================================================
    // Output
    // =========================================================================

    #[test]
    fn test_render_module_without_statics() {
        let result = compile("<div>{{ a }}</div>", &CompilerOptions::default());
        assert_eq!(
            render_module(&result),
            "var render = function () {with(this){return _c('div',[_v(_s(a))])}};\n\
             var staticRenderFns = [];\n\
             export { render, staticRenderFns };"
        );
    }

    #[test]
    fn test_render_module_with_statics() {
        let result = compile("<div><p><b>a</b></p></div>", &CompilerOptions::default());
        let module = render_module(&result);
        assert!(module.contains("var staticRenderFns = [\n  function () {with(this){"));
        assert!(module.ends_with("export { render, staticRenderFns };"));
    }

    #[test]
    fn test_line_column() {
        let source = "<div>\n  <p :a=\"b c\"></p>\n</div>";
        assert_eq!(line_column(source, 0), (1, 1));
        assert_eq!(line_column(source, 8), (2, 3));
        assert_eq!(line_column(source, 999), (3, 7));
    }

    #[test]
    fn test_format_plain_message() {
        let message = CompileMessage::Text("bad".to_string());
        assert_eq!(format_message("error", Path::new("a.html"), "", &message), "error: bad");
    }

    #[test]
    fn test_format_located_message() {
        let source = r#"<div :id="a b"></div>"#;
        let result = compile(source, &CompilerOptions::new().output_source_range(true));
        let text = format_message("error", Path::new("a.html"), source, &result.errors[0]);
        assert!(text.contains("\n  --> a.html:1:6\n"), "{text}");
        assert!(text.ends_with("   |       ^^^^^^^^^"), "{text}");
    }
}
