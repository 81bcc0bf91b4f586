use crate::commands::session::SessionArgs;
use crate::core::{error::Result, print_info, print_section_header, print_success};
use colored::*;

pub fn execute_branches(args: &SessionArgs) -> Result<()> {
    let coordinator = args.open(false)?;
    let state = coordinator.snapshot();

    if state.branches.is_empty() {
        print_info("No branches found. Make your first commit to create one.");
        return Ok(());
    }

    print_section_header("Local Branches");
    for branch in &state.branches {
        if *branch == state.branch {
            println!(
                "{}{}{} {}",
                "[".bright_black(),
                "*".white(),
                "]".bright_black(),
                branch.blue()
            );
        } else {
            println!("    {}", branch.white());
        }
    }
    println!();
    Ok(())
}

pub fn execute_branch(args: &SessionArgs, name: &str, checkout: bool) -> Result<()> {
    let coordinator = args.open(false)?;
    coordinator.create_branch(name, checkout).wait()?;
    if checkout {
        print_success(&format!("Created and switched to branch '{name}'"));
    } else {
        print_success(&format!("Created branch '{name}'"));
    }
    Ok(())
}

pub fn execute_checkout(args: &SessionArgs, name: &str) -> Result<()> {
    let coordinator = args.open(false)?;
    coordinator.checkout_branch(name).wait()?;
    print_success(&format!("Switched to branch '{name}'"));
    Ok(())
}
