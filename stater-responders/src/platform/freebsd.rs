use std::process::Command;

use super::first_line;
use crate::PlatformVersion;

pub const PLATFORM_NAME: &str = "FreeBSD";

/// Release level as reported by uname, e.g. "14.0-RELEASE".
pub fn platform_version() -> Result<PlatformVersion, String> {
    let output = Command::new("/usr/bin/uname")
        .arg("-r")
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
