use anyhow::Result;
use clap::Parser;
use compiler::{diagnostic::Diagnostic, CompilationError};
use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
    process::ExitCode,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{absolute_path, CliOption, PrettyErrorHandler};

mod compile;

/// Compile a Twig template into an incremental DOM render module.
#[derive(Parser)]
#[command(version, about)]
struct Opts {
    /// The template to compile. Stdin is read if no file is provided.
    input_file_name: Option<PathBuf>,

    /// YAML file with `compile` and `generate` option sections.
    #[arg(short, long)]
    options: Option<PathBuf>,

    /// Print the token stream before compiling.
    #[arg(long)]
    dump_tokens: bool,

    /// Print the AST as parsed.
    #[arg(long)]
    dump_ast: bool,

    /// Print the AST after every pass ran.
    #[arg(long)]
    dump_transformed: bool,

    /// Report errors as a plain code frame instead of a colored diagnostic.
    #[arg(long)]
    plain_errors: bool,
}

pub(crate) struct CliInput {
    name: String,
    source: String,
    option: CliOption,
}

pub(crate) struct ShowOption {
    dump_tokens: bool,
    dump_ast: bool,
    dump_transformed: bool,
}

fn read_input(opts: &Opts) -> Result<CliInput> {
    let (name, source) = if let Some(file_name) = &opts.input_file_name {
        let ab_path = absolute_path(file_name)?;
        (file_name.display().to_string(), fs::read_to_string(ab_path)?)
    } else {
        let mut s = String::new();
        io::stdin().read_to_string(&mut s)?;
        ("stdin.twig".to_owned(), s)
    };
    let option = match &opts.options {
        Some(path) => CliOption::from_yaml(&fs::read_to_string(absolute_path(path)?)?)?,
        None => CliOption::default(),
    };
    Ok(CliInput {
        name,
        source,
        option,
    })
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let opts = Opts::parse();
    let input = read_input(&opts)?;
    let (name, source) = (input.name.clone(), input.source.clone());
    let show = ShowOption {
        dump_tokens: opts.dump_tokens,
        dump_ast: opts.dump_ast,
        dump_transformed: opts.dump_transformed,
    };
    match compile::compile_to_stdout(input, show) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => match e.downcast_ref::<CompilationError>() {
            Some(err) if opts.plain_errors => {
                eprint!("{}", Diagnostic::from_error(err, &source));
                Ok(ExitCode::FAILURE)
            }
            Some(err) => {
                PrettyErrorHandler::new(&name, &source).on_error(err)?;
                Ok(ExitCode::FAILURE)
            }
            None => Err(e),
        },
    }
}
