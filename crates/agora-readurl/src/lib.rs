//! Splits a URL stored in a text file into its `&`-separated pieces.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

pub const RESULT_FILE: &str = "result.txt";

/// The pieces of `url` between `&` separators, in order. A line terminator
/// at the end of the input is not part of the last piece.
pub fn split_url(url: &str) -> Vec<&str> {
    url.trim_end_matches(['\r', '\n']).split('&').collect()
}

/// Reads the URL in `input` and writes one piece per line to
/// `result.txt` inside `out_dir`. Returns the path written.
pub fn run(input: &Path, out_dir: &Path) -> anyhow::Result<PathBuf> {
    let url = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;

    let mut out = String::with_capacity(url.len() + 16);
    for piece in split_url(&url) {
        out.push_str(piece);
        out.push('\n');
    }

    let path = out_dir.join(RESULT_FILE);
    fs::write(&path, out).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_ampersand() {
        assert_eq!(
            split_url("https://example.com/search?q=rust&page=2&lang=en\n"),
            ["https://example.com/search?q=rust", "page=2", "lang=en"]
        );
        assert_eq!(split_url("no-params"), ["no-params"]);
        assert_eq!(split_url("a&&b"), ["a", "", "b"]);
    }

    #[test]
    fn writes_one_piece_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("url.txt");
        fs::write(&input, "https://x.test/?a=1&b=2\r\n").unwrap();

        let written = run(&input, dir.path()).unwrap();
        assert_eq!(written, dir.path().join("result.txt"));
        assert_eq!(fs::read_to_string(written).unwrap(), "https://x.test/?a=1\nb=2\n");
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&dir.path().join("absent.txt"), dir.path()).is_err());
    }
}
