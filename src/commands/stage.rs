use crate::commands::session::{absolute_paths, SessionArgs};
use crate::core::{error::Result, print_info, print_success};
use std::path::PathBuf;

pub fn execute_stage(args: &SessionArgs, paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        print_info("Nothing to stage: no paths given");
        return Ok(());
    }
    let coordinator = args.open(false)?;
    coordinator.stage(&absolute_paths(paths)?).wait()?;
    print_success(&format!(
        "Staged {} path(s); {} change(s) staged in total",
        paths.len(),
        coordinator.snapshot().staged_count()
    ));
    Ok(())
}

pub fn execute_unstage(args: &SessionArgs, paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        print_info("Nothing to unstage: no paths given");
        return Ok(());
    }
    let coordinator = args.open(false)?;
    coordinator.unstage(&absolute_paths(paths)?).wait()?;
    print_success(&format!("Unstaged {} path(s)", paths.len()));
    Ok(())
}

pub fn execute_stage_all(args: &SessionArgs) -> Result<()> {
    let coordinator = args.open(false)?;
    coordinator.stage_all().wait()?;
    print_success(&format!(
        "Staged all changes ({} staged)",
        coordinator.snapshot().staged_count()
    ));
    Ok(())
}

pub fn execute_unstage_all(args: &SessionArgs) -> Result<()> {
    let coordinator = args.open(false)?;
    coordinator.unstage_all().wait()?;
    print_success("Unstaged all changes");
    Ok(())
}
