use anyhow::Result;
use compiler::{codegen::to_string_with, Compiler};
use idom::idom;
use serde::Serialize;
use serde_yaml::to_writer;
use std::io::{self, Write};
use tracing::debug;

use super::{CliInput, ShowOption};

fn dump<T: Serialize + ?Sized>(title: &str, value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "============== {} =============", title)?;
    to_writer(&mut out, value)?;
    writeln!(out, "========== End of {} ==========", title)?;
    Ok(())
}

/// Compile errors are returned untouched so the caller can render them.
pub(super) fn compile_to_stdout(input: CliInput, show: ShowOption) -> Result<()> {
    let CliInput {
        name,
        source,
        option,
    } = input;
    let compiler = Compiler::new(vec![idom()])?;

    if show.dump_tokens {
        let tokens = compiler
            .tokenize(&source)
            .collect::<Result<Vec<_>, _>>()?;
        dump("Tokens", &tokens)?;
    }
    if show.dump_ast {
        let ast = compiler.parse(&source, &option.compile.parse_option())?;
        dump("AST", &ast)?;
    }

    let ast = compiler.compile(&name, &source, &option.compile)?;
    if show.dump_transformed {
        dump("Transformed", &ast)?;
    }

    let generated = to_string_with(&ast, &source, &option.generate)?;
    debug!(bytes = generated.code.len(), "generated");
    let stdout = io::stdout();
    let mut out = stdout.lock();
    out.write_all(generated.code.as_bytes())?;
    if let Some(map) = generated.map {
        dump("Source Map", &map)?;
    }
    Ok(())
}
