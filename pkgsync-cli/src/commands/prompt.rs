//! Yes/no confirmation on stdin.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

/// Ask `question` on stderr and read one answer from stdin.
///
/// End of input counts as "no".
pub fn confirm(question: &str) -> Result<bool> {
    let stdin = io::stdin();
    confirm_with(question, &mut stdin.lock(), &mut io::stderr())
}

pub fn confirm_with(question: &str, input: &mut impl BufRead, out: &mut impl Write) -> Result<bool> {
    write!(out, "{question} [y/N] ").context("failed to write prompt")?;
    out.flush().context("failed to flush prompt")?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("failed to read answer")?;
    if read == 0 {
        writeln!(out).ok();
        return Ok(false);
    }
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
