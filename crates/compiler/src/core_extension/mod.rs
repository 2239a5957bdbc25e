//! The built-in language: statement tags, Twig operators, standard filter
//! and test names, and the analyse pass lowering sugar the generator does
//! not print.

mod analyse;
mod operators;
mod tags;

use crate::extension::Extension;

pub const CORE_EXTENSION: &str = "core";

pub const FILTERS: &[&str] = &[
    "abs",
    "batch",
    "capitalize",
    "column",
    "convert_encoding",
    "date",
    "date_modify",
    "default",
    "e",
    "escape",
    "filter",
    "first",
    "format",
    "join",
    "json_encode",
    "keys",
    "last",
    "length",
    "lower",
    "map",
    "merge",
    "nl2br",
    "number_format",
    "raw",
    "reduce",
    "replace",
    "reverse",
    "round",
    "slice",
    "sort",
    "spaceless",
    "split",
    "striptags",
    "title",
    "trim",
    "upper",
    "url_encode",
];

pub const TESTS: &[&str] = &[
    "defined",
    "divisible by",
    "empty",
    "even",
    "iterable",
    "none",
    "null",
    "odd",
    "same as",
];

pub fn core() -> Extension {
    let ext = Extension::new(CORE_EXTENSION)
        .filters(FILTERS)
        .tests(TESTS)
        .analyse(analyse::analyse_visitors());
    let ext = operators::register(ext);
    tags::register(ext)
}
