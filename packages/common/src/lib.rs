pub mod phase;
pub mod status;
pub mod storage;

pub use phase::{Phase, PhaseSchedule};
pub use status::{
    EventKind, RegistrationSource, SubmissionKind, TransactionKind, VerificationStatus,
};
