//! Presenters: pure mappings from records to output columns or response
//! bodies. No I/O.

pub mod calculation;
pub mod customer_file;
pub mod format;
pub mod transaction_file;

pub use customer_file::{CustomerFileContext, CustomerFilePresenter};
pub use transaction_file::{TransactionFileContext, TransactionFilePresenter, TransactionFileRow};
