//! Console progress and the one-line notification printed per operation

use kits_lib::{InstallOutcome, ProgressReporter};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Logs steps and coarse download progress; the final line is printed by [`notify_install`]
#[derive(Default)]
pub struct ConsoleReporter {
    last_percent: AtomicU64,
}

impl ProgressReporter for ConsoleReporter {
    fn start_step(&self, name: &str) {
        self.last_percent.store(0, Ordering::Relaxed);
        log::info!("{}...", name);
    }

    fn update_bytes(&self, transferred: u64, total: Option<u64>) {
        let Some(total) = total.filter(|t| *t > 0) else {
            return;
        };
        let percent = transferred * 100 / total;
        // Every 10%
        let bucket = percent / 10 * 10;
        if bucket > self.last_percent.swap(bucket, Ordering::Relaxed) {
            log::info!("Downloaded {}% ({} / {} bytes)", bucket, transferred, total);
        }
    }

    fn set_message(&self, message: &str) {
        log::info!("{}", message);
    }

    fn done(&self, success: bool, message: Option<&str>) {
        log::debug!("Operation finished: success={}, {:?}", success, message);
    }
}

/// Print the user-facing result of an install and optionally reveal the folder
pub fn notify_install(outcome: &InstallOutcome, open_folder: bool) {
    match outcome {
        InstallOutcome::Installed { path, version } => {
            println!("Installed {} to {}", version, path.display());
        }
        InstallOutcome::AlreadyInstalled { path, version } => {
            println!("Already installed: {} at {}", version, path.display());
        }
    }
    if open_folder {
        reveal(outcome.path());
    }
}

pub fn reveal(path: &Path) {
    if let Err(e) = open::that(path) {
        log::warn!("Failed to open {:?}: {}", path, e);
    }
}
