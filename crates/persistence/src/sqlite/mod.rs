//! SQLite persistence module
//!
//! Repository pattern for SQLite database access.

pub mod repos;
pub mod schema;

pub use repos::{
    create_pool, init_database, memory_pool, run_migrations, BankAccountRepo, BankChangeRepo,
    BatchRepo, CompanyRepo, EmployeeRepo, NewEmployee, NewTransaction, ProfileChangeRepo,
    ReversalRepo, SalaryTxnRepo,
};
pub use schema::{
    BankAccountRow, BankChangeRequestRow, BatchReversalRow, CompanyRow, EmployeeRow,
    ProfileChangeRequestRow, SalaryBatchRow, SalaryTransactionRow, TransactionDetailRow,
};
