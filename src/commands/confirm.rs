//! Overwrite confirmation for output files

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Result};

/// Interpret an answer to a yes/no question, `None` if it is neither
pub fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "o" | "oui" => Some(true),
        "n" | "no" | "non" => Some(false),
        _ => None,
    }
}

/// Ask until a recognised answer is given. End of input counts as a refusal.
pub fn confirm_overwrite<R: BufRead, W: Write>(
    path: &Path,
    mut input: R,
    mut output: W,
) -> io::Result<bool> {
    loop {
        write!(
            output,
            "\"{}\" already exists. Overwrite it ? [Y/N] ",
            path.display()
        )?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        if let Some(answer) = parse_answer(&line) {
            return Ok(answer);
        }
    }
}

/// Fail unless `path` is free or the user agrees to overwrite it
pub fn ensure_writable(path: &Path, noconfirm: bool) -> Result<()> {
    if noconfirm || !path.exists() {
        return Ok(());
    }

    let stdin = io::stdin();
    if !confirm_overwrite(path, stdin.lock(), io::stdout())? {
        bail!("Not overwriting {:?}", path);
    }
    Ok(())
}
