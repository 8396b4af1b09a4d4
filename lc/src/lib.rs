//! loopcheck - growth loop requirement verification
//!
//! A growth loop specification names files, functions, classes, imports and
//! text patterns that a Python codebase must contain. loopcheck checks each
//! requirement against the source, reports what is met, and (optionally) asks
//! a language model whether an existing function already covers a missing one.
//!
//! # Modules
//!
//! - [`domain`] - Loop specifications and validation results
//! - [`check`] - Check normalization (structured and legacy forms) and running
//! - [`source`] - Python parsing and symbol extraction
//! - [`inventory`] - Every function in a codebase, for semantic matching
//! - [`semantic`] - Alternative search for missing functions
//! - [`validate`] - Loop and batch orchestration
//! - [`events`] - Lifecycle events and the JSONL event log
//! - [`llm`] - LLM client trait and providers
//! - [`loader`] - Loop specification loading
//! - [`report`] - Console and JSON reports
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod check;
pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod inventory;
pub mod llm;
pub mod loader;
pub mod prompts;
pub mod report;
pub mod semantic;
pub mod source;
pub mod validate;

// Re-export commonly used types
pub use check::{CheckKind, CheckType, NormalizedCheck, normalize, run_check};
pub use config::{Config, LlmConfig};
pub use domain::{
    AlternativeMatch, CheckResult, CheckStatus, FileRequirement, FileValidationResult, FunctionRequirement,
    FunctionValidationResult, LoopSpec, LoopValidationResult, RawCheck,
};
pub use events::{EventBus, EventLogEntry, ValidationEvent, read_event_log, spawn_event_logger};
pub use inventory::{FunctionInfo, build_inventory};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, create_client};
pub use loader::{load_loop_spec, load_loop_specs};
pub use source::{ParsedSource, SourceFile};
pub use validate::{CancelToken, ValidationError, Validator, ValidatorSettings};
