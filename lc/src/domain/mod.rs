//! Domain types for loopcheck
//!
//! - [`spec`]: the loop specification input contract
//! - [`result`]: the validation report produced for each loop

mod result;
mod spec;

pub use result::{
    AlternativeMatch, CheckResult, CheckStatus, FileValidationResult, FunctionValidationResult, LoopValidationResult,
};
pub use spec::{FileRequirement, FunctionRequirement, LoopSpec, RawCheck, Requirements, StructuredCheck};
