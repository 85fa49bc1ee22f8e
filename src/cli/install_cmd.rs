//! `snipsave install` — Chromium setup helper.

use crate::browser::chromium::find_chromium;
use anyhow::Result;

/// Report an existing Chromium, or print per-platform setup steps.
///
/// Automated download of Chrome for Testing is not wired up yet; until
/// it is, this prints the manual steps and the override knobs.
pub async fn run() -> Result<()> {
    if let Some(path) = find_chromium() {
        println!("Chromium already available: {}", path.display());
        println!("Nothing to install.");
        return Ok(());
    }

    println!("No Chromium found. Install one of:");
    println!();
    if cfg!(target_os = "macos") {
        println!("  brew install --cask google-chrome");
        println!("  # or chromium:");
        println!("  brew install --cask chromium");
    } else if cfg!(target_os = "linux") {
        println!("  sudo apt-get install chromium-browser   # Debian/Ubuntu");
        println!("  sudo dnf install chromium               # Fedora");
    } else {
        println!("  https://www.google.com/chrome/");
    }
    println!();
    println!("Or unpack Chrome for Testing under ~/.snipsave/chromium/:");
    println!("  https://googlechromelabs.github.io/chrome-for-testing/");
    println!();
    println!("A custom binary can always be pointed at directly:");
    println!("  export SNIPSAVE_CHROMIUM_PATH=/path/to/chrome");

    Ok(())
}
