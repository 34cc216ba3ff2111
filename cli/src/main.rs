mod test_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use blockir::Program;
use blockir::serializer::{Diagnostic, Mode, SerializeError, Serializer};

const SUBCOMMANDS: &[&str] = &["convert", "test", "help"];

#[derive(Parser)]
#[command(name = "blockir", version, about = "Visual program XML to JSON converter")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a workspace XML file into its JSON document
    Convert(ConvertArgs),

    /// Run .test.xml golden files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Workspace XML file to convert
    file: String,

    /// Validate only, don't print the document (exit 0 if clean)
    #[arg(long)]
    check: bool,

    /// Dump the parsed node tree instead of serializing
    #[arg(long)]
    tree: bool,

    /// Reject input that produces error-severity diagnostics
    #[arg(long)]
    strict: bool,

    /// Single-line JSON output
    #[arg(long)]
    compact: bool,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.xml file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // Backwards compatibility: if the first positional arg is not a known
    // subcommand, inject "convert" so `blockir file.xml` works like
    // `blockir convert file.xml`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(first_pos) = args.iter().skip(1).find(|a| !a.starts_with('-')) {
        let first_pos = first_pos.clone();
        if !SUBCOMMANDS.contains(&first_pos.as_str()) {
            let pos = args.iter().position(|a| *a == first_pos).unwrap();
            args.insert(pos, "convert".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Convert(convert_args) => do_convert(convert_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn do_convert(args: ConvertArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    let root = match blockir::xml::parse(&source) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("error: {}: {}", args.file, e);
            process::exit(1);
        }
    };

    // --tree: dump the input model and stop
    if args.tree {
        println!("{:#?}", root);
        return;
    }

    let mode = if args.strict {
        Mode::Strict
    } else {
        Mode::Lenient
    };

    let outcome = match Serializer::new(mode).serialize(&root) {
        Ok(outcome) => outcome,
        Err(SerializeError::Rejected(diagnostics)) => {
            emit_diagnostics(&diagnostics, color_choice);
            eprintln!("error: {}: rejected in strict mode", args.file);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {}: {}", args.file, e);
            process::exit(1);
        }
    };

    emit_diagnostics(&outcome.diagnostics, color_choice);

    if args.check {
        eprintln!("ok: {} serializes cleanly", args.file);
        return;
    }

    let json = match render(&outcome.program, args.compact) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("error: cannot encode document: {}", e);
            process::exit(1);
        }
    };

    match &args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, json + "\n") {
                eprintln!("error: cannot write '{}': {}", path, e);
                process::exit(1);
            }
        }
        None => println!("{}", json),
    }
}

fn render(program: &Program, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(program)
    } else {
        serde_json::to_string_pretty(program)
    }
}

fn emit_diagnostics(diagnostics: &[Diagnostic], color_choice: ColorChoice) {
    if diagnostics.is_empty() {
        return;
    }
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    // Diagnostics carry no spans, so the file database stays empty.
    let files: SimpleFiles<String, String> = SimpleFiles::new();
    for diagnostic in diagnostics {
        let _ = term::emit_to_write_style(
            &mut writer.lock(),
            &config,
            &files,
            &diagnostic.to_diagnostic(),
        );
    }
}
