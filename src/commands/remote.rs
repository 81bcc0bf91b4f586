use crate::commands::session::SessionArgs;
use crate::core::{
    backend::PullOutcome, config::SyncConfig, coordinator::Outcome,
    coordinator::SyncCoordinator, error::Result, print_info, print_success, state::short_id,
};
use std::path::Path;

pub fn execute_push(args: &SessionArgs) -> Result<()> {
    let coordinator = args.open(false)?;
    coordinator.push().wait()?;
    print_success(&format!("Pushed {}", coordinator.current_branch()));
    Ok(())
}

pub fn execute_pull(args: &SessionArgs) -> Result<()> {
    let coordinator = args.open(false)?;
    match coordinator.pull().wait()? {
        Outcome::Pulled(PullOutcome::UpToDate) => print_info("Already up to date"),
        Outcome::Pulled(PullOutcome::FastForward { to }) => {
            print_success(&format!("Fast-forwarded to {}", short_id(&to)))
        }
        Outcome::Pulled(PullOutcome::Merged { commit }) => {
            print_success(&format!("Merged remote changes as {}", short_id(&commit)))
        }
        _ => {}
    }
    Ok(())
}

pub fn execute_fetch(args: &SessionArgs) -> Result<()> {
    let coordinator = args.open(false)?;
    coordinator.fetch().wait()?;
    print_success("Fetch complete");
    Ok(())
}

pub fn execute_clone(args: &SessionArgs, url: &str, path: &Path) -> Result<()> {
    let mut config = SyncConfig::load_or_default()?;
    config.watch_enabled = false;

    let coordinator = SyncCoordinator::clone_repository(url, path, args.credentials(), config)?;
    let state = coordinator.snapshot();
    print_success(&format!(
        "Cloned {} into {} (branch {}, {} commit(s) loaded)",
        url,
        coordinator.workdir().display(),
        state.branch,
        state.commits.len()
    ));
    Ok(())
}
