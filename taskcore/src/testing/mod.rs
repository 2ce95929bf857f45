//! Testing utilities for taskcore.
//!
//! Available to this crate's own tests and, behind the `testing` feature, to
//! downstream crates.
//!
//! - [`generators`]: `proptest` strategies for identifiers, statuses and
//!   whole command sequences
//! - [`harness`]: a given/when/then [`Scenario`](harness::Scenario) over one
//!   task identity
//!
//! # Example
//!
//! ```rust,ignore
//! use taskcore::testing::prelude::*;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn accepted_commands_replay(commands in arb_command_sequence(task_id(), 20)) {
//!         let mut scenario = Scenario::for_task(task_id());
//!         for command in commands {
//!             let _ = scenario.when(command).into_result();
//!         }
//!         scenario.assert_replay_matches();
//!     }
//! }
//! ```

pub mod generators;
pub mod harness;

/// Everything in one import.
pub mod prelude {
    pub use super::generators::*;
    pub use super::harness::{split_history, Outcome, Scenario};
}
