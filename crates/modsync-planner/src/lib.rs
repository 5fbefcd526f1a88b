mod candidate;
mod classify;
mod error;
mod execute;
mod operation;
mod plan;
mod schedule;

pub use candidate::{Action, Candidate};
pub use classify::{
    classify, prepare_candidates, ALREADY_INSTALLED_REASON, DUPLICATE_REASON,
    NEWER_INSTALLED_REASON,
};
pub use error::{ExecutionFailure, PlanError};
pub use execute::{execute_plan, plan_and_execute};
pub use operation::{Operation, OperationBag, OperationKind};
pub use plan::build_plan;
pub use schedule::extract_next;
