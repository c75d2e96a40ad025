//! Shared types for the master/detail claim-and-stream pipeline: the record
//! shapes every other crate in the workspace passes between components, plus
//! the error taxonomy they all report through.

mod aggregates;
mod detail;
mod error;
mod master;

pub use aggregates::{FileHeader, TrailerStats};
pub use detail::{
    Address, Customer, DetailRow, FlatProjection, Item, Merchant, PaymentMethod,
    TransactionDocument,
};
pub use error::{DrainError, Result};
pub use master::{MasterRecord, MasterStatus, WorkerId};
