use std::ffi::OsStr;
use std::io::ErrorKind;
use std::process::{Command, Stdio};

use docsearch_core::ExtractionError;

/// Runs an external converter and returns its trimmed stdout.
pub(crate) fn run_tool<I, S>(tool: &str, args: I) -> Result<String, ExtractionError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ExtractionError::ToolMissing { tool: tool.to_string() },
            _ => ExtractionError::ToolFailed { tool: tool.to_string(), message: e.to_string() },
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::ToolFailed {
            tool: tool.to_string(),
            message: format!("{} ({})", stderr.trim(), output.status),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
