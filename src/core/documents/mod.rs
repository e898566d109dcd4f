//! Document versions: records, the derived campaign edit lock and the
//! ledger service that owns both.

pub mod ledger;
pub mod types;

pub use ledger::{
    DocumentVersionLedger, EditLockStatus, LedgerError, LedgerResult, VersionOptions,
};
pub use types::{
    lock_directive_for, ContentSnapshot, CustomerApproval, DocumentVersionRecord,
    DocumentVersionStatus, EditLockReason, LockDirective, VersionMetadata,
};
