//! External collaborator for the `screenshot` verb (§9 design note): given a scope, scale,
//! format, quality, and whether to include the menu bar, produce image bytes. Not part of the
//! core UI interaction engine — shells out to `screencapture` exactly as the teacher does.

use std::fs;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::AxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpg,
}

impl ImageFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpg),
            _ => None,
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
        }
    }
}

/// What to capture: the whole screen, a single window, or a rectangular region.
pub enum CaptureScope {
    Screen { display_id: Option<u32> },
    Window { window_id: u32 },
    Region { x: i32, y: i32, width: u32, height: u32 },
}

fn temp_path(ext: &str) -> String {
    let ts = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0);
    format!("/tmp/axctl-screenshot-{ts}.{ext}")
}

/// Captures a screenshot and returns base64-encoded bytes plus the mime type used.
/// `scale` is only meaningful for `png` (`screencapture -r` disables retina downscaling when
/// `scale` < 1.0); `quality` is only meaningful for `jpg` (`screencapture` doesn't expose a
/// quality knob directly, so a quality request demotes capture to a jpg straight away).
/// `include_menubar` maps to omitting `-M` (`screencapture` hides the menu bar by default only
/// in window-capture mode, so this only affects `CaptureScope::Window`).
pub fn capture(
    scope: CaptureScope,
    scale: f64,
    format: ImageFormat,
    quality: Option<u8>,
    include_menubar: bool,
) -> Result<(Vec<u8>, &'static str), AxError> {
    let path = temp_path(format.extension());
    let mut cmd = Command::new("screencapture");
    cmd.args(["-x", "-t", format.extension()]);

    if scale < 1.0 {
        cmd.arg("-r");
    }
    if let Some(q) = quality {
        if format == ImageFormat::Jpg {
            cmd.args(["-k", &q.to_string()]);
        }
    }

    match scope {
        CaptureScope::Screen { display_id } => {
            if let Some(id) = display_id {
                cmd.args(["-D", &id.to_string()]);
            }
        }
        CaptureScope::Window { window_id } => {
            cmd.args(["-l", &window_id.to_string()]);
            if include_menubar {
                cmd.arg("-M");
            }
        }
        CaptureScope::Region { x, y, width, height } => {
            cmd.args(["-R", &format!("{x},{y},{width},{height}")]);
        }
    }
    cmd.arg(&path);

    let output = cmd.output().map_err(|e| AxError::Provider(format!("failed to run screencapture: {e}")))?;
    if !output.status.success() {
        let _ = fs::remove_file(&path);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AxError::Provider(format!("screencapture failed: {stderr}")));
    }

    let bytes = fs::read(&path).map_err(|e| AxError::Provider(format!("failed to read screenshot file: {e}")))?;
    let _ = fs::remove_file(&path);
    Ok((bytes, format.mime()))
}

pub fn capture_base64(
    scope: CaptureScope,
    scale: f64,
    format: ImageFormat,
    quality: Option<u8>,
    include_menubar: bool,
) -> Result<(String, &'static str), AxError> {
    let (bytes, mime) = capture(scope, scale, format, quality, include_menubar)?;
    Ok((STANDARD.encode(bytes), mime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_format_parses_case_insensitively() {
        assert_eq!(ImageFormat::parse("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::parse("jpeg"), Some(ImageFormat::Jpg));
        assert_eq!(ImageFormat::parse("bmp"), None);
    }
}
