use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use eyre::WrapErr;

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Get a line-oriented reader for the given path.
///
/// If `-` or if `None`, use stdin, otherwise open the given file
pub fn get_input_reader(input: Option<&Path>) -> eyre::Result<Box<dyn BufRead>> {
    match input {
        Some(path) if !is_stdio(path) => {
            let file = File::open(path).wrap_err(format!("Failed to open input file: {path:?}"))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(std::io::stdin().lock())),
    }
}

/// Get a writer for the given path.
///
/// If `-` or if `None`, use stdout, otherwise create (or truncate) the given file.
///
/// The writer is _not_ buffered; callers pick their own buffering since [csv::Writer] already
/// buffers internally.
pub fn get_output_writer(output: Option<&Path>) -> eyre::Result<Box<dyn Write>> {
    match output {
        Some(path) if !is_stdio(path) => {
            let file =
                File::create(path).wrap_err(format!("Failed to create output file: {path:?}"))?;
            Ok(Box::new(file))
        }
        _ => Ok(Box::new(std::io::stdout())),
    }
}
