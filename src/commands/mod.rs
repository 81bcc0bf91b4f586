pub mod branches;
pub mod commit;
pub mod remote;
pub mod session;
pub mod stage;
pub mod status;
pub mod watch;

pub use branches::*;
pub use commit::*;
pub use remote::*;
pub use session::SessionArgs;
pub use stage::*;
pub use status::*;
pub use watch::*;
