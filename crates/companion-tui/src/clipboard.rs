//! Copy text to the system clipboard.
//!
//! Platform clipboard tools are tried first. When none of them works (no display
//! server, remote session) the OSC 52 escape sequence asks the terminal to do it.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use base64::{engine::general_purpose::STANDARD, Engine as _};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    Command(&'static str),
    Osc52,
}

const COMMANDS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip", &[]),
];

pub fn copy(text: &str) -> io::Result<CopyMethod> {
    for &(program, args) in COMMANDS {
        if pipe_to(program, args, text).is_ok() {
            return Ok(CopyMethod::Command(program));
        }
    }

    let mut stderr = io::stderr();
    stderr.write_all(osc52_sequence(text).as_bytes())?;
    stderr.flush()?;
    Ok(CopyMethod::Osc52)
}

fn pipe_to(program: &str, args: &[&str], text: &str) -> io::Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    // stdin must be dropped before waiting so the tool sees EOF.
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(text.as_bytes()),
        None => Ok(()),
    };

    // Reap the child even when the write failed.
    let status = child.wait()?;
    written?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} exited with {}", program, status),
        ))
    }
}

fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}
