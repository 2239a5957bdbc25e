use std::{
    env, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use codespan_reporting::{
    diagnostic::{Diagnostic, Label},
    files::SimpleFiles,
    term::{
        self,
        termcolor::{ColorChoice, StandardStream},
    },
};
use compiler::{codegen::GenerateOption, CompilationError, CompileOption};
use path_clean::PathClean;
use serde::Deserialize;

/// Contents of the `--options` YAML file. Missing sections keep defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CliOption {
    pub compile: CompileOption,
    pub generate: GenerateOption,
}

impl CliOption {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("malformed option file")
    }
}

pub struct PrettyErrorHandler<'a> {
    name: &'a str,
    source: &'a str,
}

impl<'a> PrettyErrorHandler<'a> {
    pub fn new(name: &'a str, source: &'a str) -> Self {
        Self { name, source }
    }

    /// The codespan diagnostic for `err`, suggestions become notes.
    pub fn diagnostic(
        &self,
        err: &CompilationError,
    ) -> (SimpleFiles<&'a str, &'a str>, Diagnostic<usize>) {
        let mut files = SimpleFiles::new();
        let file = files.add(self.name, self.source);
        let label = Label::primary(file, err.location)
            .with_message(format!("{:?} error", err.category()));
        let mut diagnostic = Diagnostic::error()
            .with_message(err.to_string())
            .with_labels(vec![label]);
        if !err.suggestions.is_empty() {
            diagnostic = diagnostic.with_notes(vec![format!(
                "did you mean: {}",
                err.suggestions.join(", ")
            )]);
        }
        (files, diagnostic)
    }

    pub fn on_error(&self, err: &CompilationError) -> Result<()> {
        let (files, diagnostic) = self.diagnostic(err);
        let writer = StandardStream::stderr(ColorChoice::Auto);
        let config = term::Config::default();
        let result = term::emit(&mut writer.lock(), &config, &files, &diagnostic)
            .context("unable to generate codespan diagnostic");
        result
    }
}

pub fn absolute_path(path: impl AsRef<Path>) -> io::Result<PathBuf> {
    let path = path.as_ref();

    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    }
    .clean();

    Ok(absolute_path)
}
