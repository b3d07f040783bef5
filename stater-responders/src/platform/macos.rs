use std::process::Command;

use super::first_line;
use crate::PlatformVersion;

pub const PLATFORM_NAME: &str = "macOS";

/// Product version as reported by sw_vers, e.g. "14.4.1".
pub fn platform_version() -> Result<PlatformVersion, String> {
    let output = Command::new("/usr/bin/sw_vers")
        .arg("-productVersion")
        .output()
        .map_err(|e| format!("failed to execute sw_vers: {}", e))?;

    if !output.status.success() {
        return Err(format!(
            "sw_vers failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    let version = first_line(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| "sw_vers produced no output".to_string())?;

    Ok(PlatformVersion::new(PLATFORM_NAME, version))
}
