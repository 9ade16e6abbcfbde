/// Pipeline lifecycle state

pub mod process_state;

pub use process_state::{ProcessState, ProcessStateMachine};
