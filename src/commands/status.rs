use crate::commands::session::SessionArgs;
use crate::core::{
    change::ChangeEntry,
    colors::format_change_line,
    coordinator::Outcome,
    error::Result,
    print_info, print_section_header,
    state::RepositoryState,
};
use colored::*;

pub fn execute_status(args: &SessionArgs) -> Result<()> {
    let coordinator = args.open(false)?;
    let state = coordinator.snapshot();

    print_header(&state);

    if state.is_clean() {
        print_info("Nothing to commit, working tree clean");
        return Ok(());
    }

    print_change_sections(&state.changes);
    Ok(())
}

fn print_header(state: &RepositoryState) {
    println!();
    println!("{} {}", "On branch".bright_black(), state.branch.blue());
    match state.commits.first() {
        Some(head) => println!(
            "{} {} {}",
            "Parent".bright_black(),
            head.short_id.yellow(),
            head.message.white()
        ),
        None => println!("{} {}", "Parent".bright_black(), "- no commits yet -".white()),
    }
}

fn print_change_sections(changes: &[ChangeEntry]) {
    let (staged, unstaged): (Vec<(usize, &ChangeEntry)>, Vec<(usize, &ChangeEntry)>) = changes
        .iter()
        .enumerate()
        .map(|(i, entry)| (i + 1, entry))
        .partition(|(_, entry)| entry.staged);

    if !staged.is_empty() {
        print_section_header("Staged changes");
        for (index, entry) in &staged {
            println!("{}", format_change_line(*index, entry));
        }
    }

    if !unstaged.is_empty() {
        print_section_header("Changes not staged");
        for (index, entry) in &unstaged {
            println!("{}", format_change_line(*index, entry));
        }
    }
    println!();
}

pub fn execute_log(args: &SessionArgs, limit: usize) -> Result<()> {
    let coordinator = args.open(false)?;
    let commits = match coordinator.history(limit).wait()? {
        Outcome::History(commits) => commits,
        _ => coordinator.commits(limit),
    };

    if commits.is_empty() {
        print_info("No commits yet");
        return Ok(());
    }

    print_section_header(&format!("Recent commits on {}", coordinator.current_branch()));
    for commit in &commits {
        println!(
            "{} {} {} {}",
            commit.short_id.yellow(),
            commit
                .timestamp
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bright_black(),
            commit.author.cyan(),
            commit.message.white()
        );
    }
    println!();
    Ok(())
}
