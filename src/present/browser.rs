//! Opening a URL in the platform's default browser.

use std::io;
use std::process::{Command, Stdio};

/// Launch the default browser on `url` without waiting for it.
pub fn open(url: &str) -> io::Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("rundll32");
        command.arg("url.dll,FileProtocolHandler");
        command
    } else if cfg!(unix) {
        Command::new("xdg-open")
    } else {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "unsupported platform",
        ));
    };

    command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_child| ())
}
