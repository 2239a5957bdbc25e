use glob::glob;
use std::{fs, io, path::PathBuf};

pub fn get_fixtures() -> Vec<(String, String)> {
    glob("./fixtures/*.twig")
        .expect("Failed to load fixtures")
        .filter_map(Result::ok)
        .map(open_twig_file)
        .filter_map(Result::ok)
        .collect()
}

fn open_twig_file(path: PathBuf) -> io::Result<(String, String)> {
    let name = path.file_stem().expect("Fixture should be file");
    let name = name.to_str().expect("Invalid fixture file name").to_owned();
    let source = fs::read_to_string(path)?;
    Ok((name, source))
}
