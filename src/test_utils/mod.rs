//! Test doubles for exercising the execution layer without a database.

mod mock;
mod test_helpers;

pub use mock::{MockDriver, MockHandle, MockOutcome, MockResult};
pub use test_helpers::{create_test_row, row_of};
