use crate::commands::session::SessionArgs;
use crate::core::{
    error::Result,
    events::Notification,
    output::{print_info, print_log_line},
};
use colored::*;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

/// Follow the working tree and print every snapshot and log line until `seconds` pass
/// (forever when `None`)
pub fn execute_watch(args: &SessionArgs, seconds: Option<u64>) -> Result<()> {
    let coordinator = args.open(true)?;
    let notifications = coordinator.subscribe();

    if !coordinator.watcher_active() {
        print_info("File watcher is not running; showing the current state only");
    }
    print_info(&format!(
        "Watching {} on {} (Ctrl-C to stop)",
        coordinator.workdir().display(),
        coordinator.current_branch()
    ));

    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs(s));
    loop {
        let wait = match deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(left) => left,
                None => break,
            },
            None => Duration::from_secs(3600),
        };

        match notifications.recv_timeout(wait) {
            Ok(Notification::Log(line)) => print_log_line(&line),
            Ok(Notification::State(state)) => {
                println!(
                    "{} {} change(s), {} staged, branch {}",
                    format!("#{}", state.generation).bright_black(),
                    state.changes.len(),
                    state.staged_count(),
                    state.branch.blue()
                );
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
