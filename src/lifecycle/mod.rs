pub mod listen;
pub mod ordering;
pub mod scheduler;
pub mod state_machine;
pub mod tally;
pub mod vote_guard;
pub mod vote_limits;
