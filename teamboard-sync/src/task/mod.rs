//! Task commands that cross column boundaries

mod mv;
mod protocol;
mod recover;

pub use mv::{MoveOutcome, MovePreview, MoveTask};
pub use protocol::MoveReport;
pub use recover::{RecoverMoves, RecoveryReport};
