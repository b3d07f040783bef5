use std::fs;
use std::process::Command;

use super::first_line;
use crate::PlatformVersion;

pub const PLATFORM_NAME: &str = "Linux";

const OSRELEASE: &str = "/proc/sys/kernel/osrelease";

/// Kernel release, e.g. "6.1.0-18-amd64". Reads procfs and falls back to
/// uname when procfs is unavailable (e.g. minimal containers).
pub fn platform_version() -> Result<PlatformVersion, String> {
    let version = match fs::read_to_string(OSRELEASE) {
        Ok(contents) => first_line(&contents)
            .ok_or_else(|| format!("empty version string in {}", OSRELEASE))?,
        Err(_) => uname_release()?,
    };

    Ok(PlatformVersion::new(PLATFORM_NAME, version))
}

fn uname_release() -> Result<String, String> {
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

    first_line(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| "uname produced no output".to_string())
}
