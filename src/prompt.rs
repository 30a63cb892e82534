//! Interactive operator prompts. Kept out of the scraping path: the batch only
//! ever sees the resulting URL list.

use std::io::{self, BufRead, Write};

use crate::input_loader::{validate_url, InputError};

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<String, PromptError> {
    write!(out, "{}", question)?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub const MAX_PRODUCTS: usize = 1000;

/// Parses the product count: a positive integer no larger than `MAX_PRODUCTS`.
pub fn parse_count(raw: &str) -> Result<usize, InputError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 && n <= MAX_PRODUCTS => Ok(n),
        _ => Err(InputError::InvalidCount(raw.trim().to_string())),
    }
}

/// Asks how many products to scrape, then for each URL. Invalid URLs are
/// reported and skipped; an invalid count aborts before anything else.
pub fn read_source_urls<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Vec<String>, PromptError> {
    let count = parse_count(&ask(input, out, "How many products to scrape? ")?)?;

    let mut urls = Vec::new();
    for i in 1..=count {
        let raw = ask(input, out, &format!("Product URL #{}: ", i))?;
        match validate_url(&raw) {
            Ok(url) => urls.push(url),
            Err(e) => writeln!(out, "{}. Skipped.", e)?,
        }
    }
    Ok(urls)
}

pub fn wait_for_enter<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<(), PromptError> {
    ask(input, out, "\nPress ENTER to exit...")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(script: &str) -> (Result<Vec<String>, PromptError>, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        let result = read_source_urls(&mut input, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn zero_count_aborts() {
        let (result, _) = run("0\nhttps://shop.test/a\n");
        assert!(matches!(result, Err(PromptError::Input(InputError::InvalidCount(ref c))) if c == "0"));
    }

    #[test]
    fn non_numeric_or_negative_count_aborts() {
        assert!(run("dua\n").0.is_err());
        assert!(run("-3\n").0.is_err());
    }

    #[test]
    fn oversized_count_is_rejected_not_allocated() {
        let (result, _) = run("9223372036854775807\nhttps://shop.test/a\n");
        assert!(matches!(result, Err(PromptError::Input(InputError::InvalidCount(_)))));
        assert!(parse_count("1001").is_err());
        assert_eq!(parse_count(" 1000 ").unwrap(), MAX_PRODUCTS);
    }

    #[test]
    fn invalid_urls_are_skipped_with_warning() {
        let (result, out) = run("3\nhttps://shop.test/a\nshop.test/b\nhttp://shop.test/c\n");
        assert_eq!(result.unwrap(), vec!["https://shop.test/a", "http://shop.test/c"]);
        assert!(out.contains("Skipped."));
        assert!(out.contains("Product URL #3: "));
    }

    #[test]
    fn closed_input_yields_skips_not_panics() {
        let (result, _) = run("2\nhttps://shop.test/a\n");
        assert_eq!(result.unwrap(), vec!["https://shop.test/a"]);
    }
}
