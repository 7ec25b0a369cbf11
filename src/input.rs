//! URL collection: arguments, piped stdin or an interactive prompt.

use std::io::{self, BufRead, IsTerminal, Read, Write};

use anyhow::{Context, Result};

/// Message when no input was provided at all.
pub const NO_INPUT_GUIDANCE: &str = "No URLs provided. Pass image URLs as arguments or pipe them via stdin.";

/// Example for piping input.
pub const INPUT_PIPE_EXAMPLE: &str = "Example: echo 'https://example.com/cat.png' | image-fetcher";

/// Where the URLs of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Arguments,
    Stdin,
    Prompt,
}

/// Collects URLs from `args`, else piped stdin, else the interactive prompt.
pub fn collect_urls(args: &[String]) -> Result<(Vec<String>, InputSource)> {
    if !args.is_empty() {
        return Ok((parse_url_lines(&args.join("\n")), InputSource::Arguments));
    }

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut buffer = String::new();
        stdin
            .lock()
            .read_to_string(&mut buffer)
            .context("Failed to read URLs from stdin")?;
        return Ok((parse_url_lines(&buffer), InputSource::Stdin));
    }

    let urls = prompt_urls(&mut stdin.lock(), &mut io::stdout())
        .context("Failed to read URLs from the prompt")?;
    Ok((urls, InputSource::Prompt))
}

/// One URL per line; blank lines and `#` comments are skipped.
#[must_use]
pub fn parse_url_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Asks for single or batch mode, then reads URLs.
///
/// In batch mode an empty line ends entry. End of input ends the prompt at
/// any point with whatever has been entered.
pub fn prompt_urls<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<Vec<String>> {
    let batch = loop {
        write!(output, "Fetch a single image (1) or multiple images (2)? ")?;
        output.flush()?;
        let Some(choice) = read_trimmed_line(input)? else {
            return Ok(Vec::new());
        };
        match choice.as_str() {
            "1" | "" => break false,
            "2" => break true,
            other => writeln!(output, "Please enter 1 or 2 (got {other:?}).")?,
        }
    };

    if !batch {
        write!(output, "Image URL: ")?;
        output.flush()?;
        return Ok(read_trimmed_line(input)?
            .filter(|line| !line.is_empty())
            .into_iter()
            .collect());
    }

    writeln!(output, "Enter image URLs, one per line. Finish with an empty line.")?;
    let mut urls = Vec::new();
    loop {
        write!(output, "URL {}: ", urls.len() + 1)?;
        output.flush()?;
        match read_trimmed_line(input)? {
            Some(line) if !line.is_empty() => urls.push(line),
            _ => break,
        }
    }
    Ok(urls)
}

fn read_trimmed_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
