use crate::commands::session::SessionArgs;
use crate::core::{
    coordinator::Outcome,
    error::Result,
    print_success,
    state::short_id,
};

pub fn execute_commit(args: &SessionArgs, message: &str, push: bool) -> Result<()> {
    let coordinator = args.open(false)?;
    let ticket = if push {
        coordinator.commit_and_push(message)
    } else {
        coordinator.commit(message)
    };

    if let Outcome::Committed(id) = ticket.wait()? {
        let summary = message.lines().next().unwrap_or_default();
        print_success(&format!("[{}] {}", short_id(&id), summary));
        if push {
            print_success(&format!("Pushed {}", coordinator.current_branch()));
        }
    }
    Ok(())
}
