//! External collaborator for `clipboard {read|write|clear}` (§9 design note): a thin
//! `pbpaste`/`pbcopy` shell wrapper. Not part of the core UI interaction engine.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::AxError;

pub fn read() -> Result<String, AxError> {
    let output = Command::new("pbpaste")
        .output()
        .map_err(|e| AxError::Provider(format!("failed to run pbpaste: {e}")))?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub fn write(text: &str) -> Result<(), AxError> {
    let mut child = Command::new("pbcopy")
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| AxError::Provider(format!("failed to spawn pbcopy: {e}")))?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| AxError::Provider(format!("failed to write to pbcopy stdin: {e}")))?;
    }
    let status = child.wait().map_err(|e| AxError::Provider(format!("failed to wait for pbcopy: {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(AxError::Provider(format!("pbcopy exited with: {status}")))
    }
}

/// `clear()`: analogous to `write`, with empty stdin.
pub fn clear() -> Result<(), AxError> {
    write("")
}
