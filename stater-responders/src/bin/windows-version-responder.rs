// Minimal stub for the Windows version responder. This is intentionally
// lightweight and does not start a server; Unix-socket transport does not
// apply on Windows, so this binary serves as a placeholder.

#[cfg(not(target_os = "windows"))]
fn main() {
    eprintln!("windows-version-responder is stubbed and intended for Windows only. Nothing to do on this OS.");
}

#[cfg(target_os = "windows")]
fn main() {
    println!("windows-version-responder stub: Windows support is planned. Exiting.");
}
