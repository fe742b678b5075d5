//! External collaborator for the `open` verb (§9 design note): launch an application by name,
//! or a URL in the default or a named browser. Not part of the core UI interaction engine.

use std::process::Command;

use crate::error::AxError;

/// Characters rejected from URLs/app names to prevent shell injection via `open`/`osascript`.
const FORBIDDEN_CHARS: &[char] = &['"', '`', '$', ';', '|', '&'];

fn validate_url(url: &str) -> Result<(), AxError> {
    if !url.starts_with("http://") && !url.starts_with("https://") && !url.starts_with("file://") {
        return Err(AxError::InvalidArgument("URL must start with http://, https://, or file://".into()));
    }
    if let Some(c) = url.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(AxError::InvalidArgument(format!("URL contains forbidden character: {c}")));
    }
    Ok(())
}

/// Launch an installed application by name (`open -a <name>`).
pub fn launch_app(name: &str) -> Result<(), AxError> {
    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(AxError::InvalidArgument(format!("app name contains forbidden character: {c}")));
    }
    let output = Command::new("open")
        .args(["-a", name])
        .output()
        .map_err(|e| AxError::Provider(format!("failed to run open: {e}")))?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(AxError::Provider(format!("failed to launch '{name}': {stderr}")))
    }
}

/// Open a URL in the default browser, or a named one when `browser` is given.
pub fn open_url(url: &str, browser: Option<&str>) -> Result<(), AxError> {
    validate_url(url)?;
    let output = match browser {
        Some(name) => Command::new("open").args(["-a", name, url]).output(),
        None => Command::new("open").arg(url).output(),
    }
    .map_err(|e| AxError::Provider(format!("failed to run open: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(AxError::Provider(format!("failed to open '{url}': {stderr}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_url_rejects_non_http_scheme() {
        assert!(validate_url("ftp://example.com").is_err());
    }

    #[test]
    fn validate_url_rejects_shell_metacharacters() {
        assert!(validate_url("https://example.com/`whoami`").is_err());
    }

    #[test]
    fn validate_url_accepts_plain_https() {
        assert!(validate_url("https://example.com/path?x=1").is_ok());
    }
}
