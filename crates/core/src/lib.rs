//! # Payroll Core
//!
//! Pure domain types for the payroll engine: periods, companies, employees,
//! bank accounts, salary batches and transactions, the hold evaluator and the
//! audit event type. Nothing here touches storage or files.

pub mod bank;
pub mod batch;
pub mod company;
pub mod employee;
pub mod error;
pub mod event;
pub mod hold;
pub mod period;
pub mod request;
pub mod transaction;

pub use bank::{
    mask_account_number, BankAccount, BankAccountDetails, BankChangeRequest, BankSnapshot,
    RoutingCode, ROUTING_CODE_LENGTH,
};
pub use batch::{BatchAction, BatchReversal, BatchStatus, SalaryBatch};
pub use company::Company;
pub use employee::{Employee, FieldChange, ProfileChangeRequest, ProfileField};
pub use error::{CoreError, CoreResult};
pub use event::{AuditAction, AuditEvent};
pub use hold::{evaluate, HoldDecision, HoldFacts, HoldScope};
pub use period::PayrollPeriod;
pub use request::{RequestAction, RequestStatus};
pub use transaction::{HoldReason, ResponseStatus, SalaryTransaction, TxnAction, TxnStatus};
