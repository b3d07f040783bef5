//! Per-OS version probes.
//!
//! Each module knows how to obtain the version string of one operating
//! system. Probes run once at responder startup. The modules compile on any
//! OS so every responder binary can be built anywhere; only the probe that
//! matches the running system is expected to succeed.

pub mod freebsd;
pub mod illumos;
pub mod linux;
pub mod macos;

/// First non-empty line of a probe's output, trimmed.
pub(crate) fn first_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_trims_and_skips_blanks() {
        assert_eq!(first_line("\n  14.4.1  \nDarwin\n").as_deref(), Some("14.4.1"));
        assert_eq!(first_line("6.1.0-18-amd64\n").as_deref(), Some("6.1.0-18-amd64"));
        assert_eq!(first_line("\n   \n"), None);
        assert_eq!(first_line(""), None);
    }
}
