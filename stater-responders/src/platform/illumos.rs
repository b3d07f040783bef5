use std::process::Command;

use super::first_line;
use crate::PlatformVersion;

pub const PLATFORM_NAME: &str = "illumos";

/// Distribution version as reported by uname -v, e.g. "omnios-r151048".
pub fn platform_version() -> Result<PlatformVersion, String> {
    let output = Command::new("/usr/bin/uname")
        .arg("-v")
        .output()
        .map_err(|e| format!("failed to execute uname: {}", e))?;

    if !output.status.success() {
        return Err(format!(
            "uname failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    let version = first_line(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| "uname produced no output".to_string())?;

    Ok(PlatformVersion::new(PLATFORM_NAME, version))
}
