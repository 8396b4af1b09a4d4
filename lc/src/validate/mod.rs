//! Loop validation orchestrator
//!
//! A [`Validator`] is bound to one codebase root and one [`EventBus`]. Each
//! loop goes through the same sequence:
//!
//! ```text
//!   LoopValidationStarted
//!     ├── file requirements      (checks run against the parsed file)
//!     │     └── RequirementMet   (per passing file, in declaration order)
//!     ├── function requirements  (presence, signature, alternatives)
//!     │     └── RequirementMet   (per passing function, in declaration order)
//!   ValidationTime
//!   LoopCompleted                (only when everything passed)
//! ```
//!
//! Reading and parsing run on the blocking pool, one task per requirement,
//! and each task owns its parsed file. The semantic query is awaited on the
//! async side and never holds a parsed file.

mod cancel;
mod error;
mod paths;

pub use cancel::CancelToken;
pub use error::ValidationError;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::pin::pin;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::check::{
    DETAIL_FILE_MISSING, DETAIL_NOT_PARSED, NormalizedCheck, failed_missing_file, failed_with_detail, normalize,
    run_check,
};
use crate::config::{Config, InventoryConfig, SemanticConfig};
use crate::domain::{
    AlternativeMatch, FileRequirement, FileValidationResult, FunctionRequirement, FunctionValidationResult, LoopSpec,
    LoopValidationResult,
};
use crate::events::{EventBus, ValidationEvent};
use crate::inventory::{self, FunctionInfo};
use crate::llm::LlmClient;
use crate::semantic;
use crate::source::SourceFile;

/// Tunables for a [`Validator`]
#[derive(Debug, Clone)]
pub struct ValidatorSettings {
    /// Loops validated at once in batch mode
    pub concurrency: usize,
    /// Deadline around each semantic query
    pub llm_deadline: Duration,
    pub inventory: InventoryConfig,
    pub semantic: SemanticConfig,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            llm_deadline: Duration::from_secs(60),
            inventory: InventoryConfig::default(),
            semantic: SemanticConfig::default(),
        }
    }
}

impl ValidatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.validation.concurrency.max(1),
            llm_deadline: Duration::from_millis(config.validation.llm_deadline_ms),
            inventory: config.inventory.clone(),
            semantic: config.semantic.clone(),
        }
    }
}

/// Collapse whitespace runs to one space and trim
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// What a single look at the requirement's file found
struct Inspection {
    found: bool,
    signature_match: bool,
    detail: String,
}

impl Inspection {
    fn missing(detail: impl Into<String>) -> Self {
        Self {
            found: false,
            signature_match: false,
            detail: detail.into(),
        }
    }
}

fn resolve(root: &Path, relative: &str) -> Option<PathBuf> {
    paths::resolve_in_root(root, relative).filter(|p| p.is_file())
}

/// Run every check of a file requirement (blocking)
///
/// A missing file fails every one of its checks.
fn check_file(root: &Path, requirement: &FileRequirement) -> FileValidationResult {
    debug!(path = %requirement.path, checks = requirement.checks.len(), "check_file: called");
    let checks: Vec<NormalizedCheck> = requirement.checks.iter().map(normalize).collect();
    let resolved = resolve(root, &requirement.path);

    let mut result = FileValidationResult {
        path: requirement.path.clone(),
        purpose: requirement.purpose.clone(),
        required: requirement.required,
        exists: resolved.is_some(),
        checks: Vec::with_capacity(checks.len()),
    };

    let Some(path) = resolved else {
        debug!(path = %requirement.path, "check_file: file missing");
        result.checks = checks.iter().map(failed_missing_file).collect();
        return result;
    };

    result.checks = match SourceFile::open(&path) {
        Ok(file) => checks.iter().map(|check| run_check(check, &file)).collect(),
        Err(e) => {
            warn!(?path, error = %e, "check_file: could not read file");
            let detail = format!("could not read file: {}", e);
            checks.iter().map(|check| failed_with_detail(check, detail.as_str())).collect()
        }
    };
    result
}

/// Look for the function and compare its signature (blocking)
fn inspect_function(root: &Path, requirement: &FunctionRequirement) -> Inspection {
    let Some(path) = resolve(root, &requirement.file) else {
        return Inspection::missing(DETAIL_FILE_MISSING);
    };
    let file = match SourceFile::open(&path) {
        Ok(file) => file,
        Err(e) => {
            warn!(?path, error = %e, "inspect_function: could not read file");
            return Inspection::missing(format!("could not read file: {}", e));
        }
    };
    let Some(parsed) = file.parsed() else {
        return Inspection::missing(DETAIL_NOT_PARSED);
    };
    if !parsed.function_names().iter().any(|n| n == &requirement.name) {
        return Inspection::missing(format!("Function '{}' not found", requirement.name));
    }

    if requirement.expected_signature.trim().is_empty() {
        return Inspection {
            found: true,
            signature_match: true,
            detail: String::new(),
        };
    }

    match parsed.function_signature(&requirement.name) {
        Some(actual) => {
            let expected = normalize_whitespace(&requirement.expected_signature);
            let actual = normalize_whitespace(actual);
            if expected == actual {
                Inspection {
                    found: true,
                    signature_match: true,
                    detail: String::new(),
                }
            } else {
                debug!(%expected, %actual, "inspect_function: signature mismatch");
                Inspection {
                    found: true,
                    signature_match: false,
                    detail: format!("Signature mismatch: expected '{}', got '{}'", expected, actual),
                }
            }
        }
        None => Inspection {
            found: true,
            signature_match: false,
            detail: "Function found but could not extract signature".to_string(),
        },
    }
}

/// State shared by every loop of one batch
struct Batch<'a> {
    inventory: OnceCell<Arc<Vec<FunctionInfo>>>,
    cancel: &'a CancelToken,
}

impl<'a> Batch<'a> {
    fn new(validator: &Validator, cancel: &'a CancelToken) -> Self {
        Self {
            inventory: OnceCell::new_with(validator.inventory.clone()),
            cancel,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Inventory for this batch, built on first use
    async fn inventory(&self, validator: &Validator) -> Arc<Vec<FunctionInfo>> {
        self.inventory
            .get_or_init(|| async {
                match validator.build_inventory().await {
                    Ok(functions) => functions,
                    Err(e) => {
                        warn!(error = %e, "Batch::inventory: build failed, continuing without candidates");
                        Arc::new(Vec::new())
                    }
                }
            })
            .await
            .clone()
    }
}

/// Validates loop specifications against one codebase
pub struct Validator {
    root: PathBuf,
    bus: Arc<EventBus>,
    llm: Option<Arc<dyn LlmClient>>,
    inventory: Option<Arc<Vec<FunctionInfo>>>,
    settings: ValidatorSettings,
}

impl Validator {
    /// Bind a validator to a codebase root
    ///
    /// The root must be an accessible directory; this is the only check that
    /// can fail before validation starts.
    pub fn new(root: impl AsRef<Path>, bus: Arc<EventBus>) -> Result<Self, ValidationError> {
        let path = root.as_ref();
        debug!(?path, "Validator::new: called");
        let root = path.canonicalize().map_err(|source| ValidationError::RootNotAccessible {
            path: path.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(ValidationError::RootNotAccessible {
                path: path.to_path_buf(),
                source: std::io::Error::other("not a directory"),
            });
        }

        Ok(Self {
            root,
            bus,
            llm: None,
            inventory: None,
            settings: ValidatorSettings::default(),
        })
    }

    pub fn with_settings(mut self, settings: ValidatorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Enable the semantic alternative search for missing functions
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Use a prebuilt inventory instead of walking the root
    pub fn with_inventory(mut self, inventory: Arc<Vec<FunctionInfo>>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    /// Canonical codebase root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Walk the root and collect every function, off the async threads
    pub async fn build_inventory(&self) -> Result<Arc<Vec<FunctionInfo>>, ValidationError> {
        debug!(root = ?self.root, "Validator::build_inventory: called");
        let root = self.root.clone();
        let config = self.settings.inventory.clone();
        let functions = tokio::task::spawn_blocking(move || inventory::build_inventory(&root, &config))
            .await
            .map_err(|e| ValidationError::Io(std::io::Error::other(e)))?;
        Ok(Arc::new(functions))
    }

    /// Check one file requirement on the calling thread
    ///
    /// A missing file fails every one of its checks.
    pub fn validate_file_requirement(&self, requirement: &FileRequirement) -> FileValidationResult {
        check_file(&self.root, requirement)
    }

    /// File checks on the blocking pool
    async fn file_requirement(&self, requirement: &FileRequirement) -> FileValidationResult {
        let root = self.root.clone();
        let owned = requirement.clone();
        match tokio::task::spawn_blocking(move || check_file(&root, &owned)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(path = %requirement.path, error = %e, "file_requirement: check task failed");
                let detail = format!("check task failed: {}", e);
                FileValidationResult {
                    path: requirement.path.clone(),
                    purpose: requirement.purpose.clone(),
                    required: requirement.required,
                    exists: false,
                    checks: requirement
                        .checks
                        .iter()
                        .map(|check| failed_with_detail(&normalize(check), detail.as_str()))
                        .collect(),
                }
            }
        }
    }

    /// Function lookup on the blocking pool
    async fn inspect(&self, requirement: &FunctionRequirement) -> Inspection {
        let root = self.root.clone();
        let owned = requirement.clone();
        match tokio::task::spawn_blocking(move || inspect_function(&root, &owned)).await {
            Ok(inspection) => inspection,
            Err(e) => {
                warn!(name = %requirement.name, error = %e, "inspect: lookup task failed");
                Inspection::missing(format!("check task failed: {}", e))
            }
        }
    }

    /// Check one function requirement on its own
    pub async fn validate_function_requirement(&self, requirement: &FunctionRequirement) -> FunctionValidationResult {
        let cancel = CancelToken::new();
        let batch = Batch::new(self, &cancel);
        self.function_requirement(requirement, &batch).await
    }

    async fn function_requirement(&self, requirement: &FunctionRequirement, batch: &Batch<'_>) -> FunctionValidationResult {
        debug!(file = %requirement.file, name = %requirement.name, "validate_function_requirement: called");
        let inspection = self.inspect(requirement).await;

        let mut result = FunctionValidationResult {
            file: requirement.file.clone(),
            name: requirement.name.clone(),
            required: requirement.required,
            expected_signature: requirement.expected_signature.clone(),
            found: inspection.found,
            signature_match: inspection.signature_match,
            detail: inspection.detail,
            alternatives: Vec::new(),
        };

        if !result.found
            && let Some(llm) = &self.llm
        {
            let inventory = batch.inventory(self).await;
            result.alternatives = self.query_alternatives(requirement, &inventory, llm.as_ref()).await;
        }
        result
    }

    async fn query_alternatives(
        &self,
        requirement: &FunctionRequirement,
        inventory: &[FunctionInfo],
        llm: &dyn LlmClient,
    ) -> Vec<AlternativeMatch> {
        let query = semantic::find_alternatives(requirement, inventory, llm, &self.settings.semantic);
        match tokio::time::timeout(self.settings.llm_deadline, query).await {
            Ok(matches) => matches,
            Err(_) => {
                debug!(name = %requirement.name, "query_alternatives: deadline exceeded");
                Vec::new()
            }
        }
    }

    /// Validate every requirement of one loop, emitting lifecycle events
    pub async fn validate_loop(&self, spec: &LoopSpec) -> LoopValidationResult {
        let cancel = CancelToken::new();
        let batch = Batch::new(self, &cancel);
        self.run_loop(spec, &batch).await
    }

    async fn run_loop(&self, spec: &LoopSpec, batch: &Batch<'_>) -> LoopValidationResult {
        debug!(loop_id = %spec.loop_id, "validate_loop: called");
        self.bus.emit(ValidationEvent::LoopValidationStarted {
            loop_id: spec.loop_id.clone(),
            loop_name: spec.name.clone(),
        });
        let start = Instant::now();

        // requirements run side by side; results and events keep declaration order
        let width = self.settings.concurrency.max(1);

        let mut file_results = Vec::with_capacity(spec.requirements.files.len());
        let mut files = pin!(
            stream::iter(&spec.requirements.files)
                .map(|req| async move {
                    if batch.is_cancelled() {
                        return None;
                    }
                    Some(self.file_requirement(req).await)
                })
                .buffered(width)
        );
        while let Some(Some(file)) = files.next().await {
            if batch.is_cancelled() {
                break;
            }
            if file.passed() {
                self.bus.emit(ValidationEvent::file_met(&spec.loop_id, &file.path));
            }
            file_results.push(file);
        }

        let mut function_results = Vec::with_capacity(spec.requirements.functions.len());
        let mut functions = pin!(
            stream::iter(&spec.requirements.functions)
                .map(|req| async move {
                    if batch.is_cancelled() {
                        return None;
                    }
                    Some(self.function_requirement(req, batch).await)
                })
                .buffered(width)
        );
        while let Some(Some(func)) = functions.next().await {
            if batch.is_cancelled() {
                break;
            }
            if func.passed() {
                self.bus.emit(ValidationEvent::function_met(&spec.loop_id, &func.name, &func.file));
            }
            function_results.push(func);
        }

        let result = LoopValidationResult {
            loop_id: spec.loop_id.clone(),
            loop_name: spec.name.clone(),
            source_identifier: spec.source_identifier(),
            file_results,
            function_results,
            elapsed: start.elapsed(),
        };

        if batch.is_cancelled() {
            debug!(loop_id = %spec.loop_id, "validate_loop: cancelled, result discarded");
            return result;
        }

        self.bus.emit(ValidationEvent::ValidationTime {
            loop_id: result.loop_id.clone(),
            elapsed_ms: (result.elapsed_ms() * 100.0).round() / 100.0,
        });

        if result.all_passed() {
            self.bus.emit(ValidationEvent::LoopCompleted {
                loop_id: result.loop_id.clone(),
                loop_name: result.loop_name.clone(),
                total_checks: result.total_checks(),
            });
        }

        debug!(
            loop_id = %result.loop_id,
            passed = result.passed_checks(),
            total = result.total_checks(),
            "validate_loop: done"
        );
        result
    }

    /// Validate many loops, at most `concurrency` at a time
    ///
    /// Results come back in input order. The function inventory is built at
    /// most once for the whole batch. Cancelling the token stops scheduling
    /// new requirement checks and turns the call into
    /// [`ValidationError::Cancelled`].
    pub async fn validate_batch(
        &self,
        specs: &[LoopSpec],
        cancel: &CancelToken,
    ) -> Result<Vec<LoopValidationResult>, ValidationError> {
        info!(loops = specs.len(), root = ?self.root, "validate_batch: starting");
        if cancel.is_cancelled() {
            return Err(ValidationError::Cancelled);
        }

        let batch = Batch::new(self, cancel);
        let results: Vec<LoopValidationResult> = stream::iter(specs)
            .map(|spec| self.run_loop(spec, &batch))
            .buffered(self.settings.concurrency.max(1))
            .map(|result| {
                if batch.is_cancelled() {
                    Err(ValidationError::Cancelled)
                } else {
                    Ok(result)
                }
            })
            .try_collect()
            .await?;

        info!(
            loops = results.len(),
            passed = results.iter().filter(|r| r.all_passed()).count(),
            "validate_batch: done"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CheckStatus, RawCheck};
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionRequest, CompletionResponse, LlmError};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::{TempDir, tempdir};

    const AUTH_PY: &str = "def login(user, password):\n    return True\n\ndef logout(user: str) -> None:\n    pass\n";

    fn codebase() -> TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/auth.py"), AUTH_PY).unwrap();
        fs::write(
            dir.path().join("src/invites.py"),
            "def record_invite(inviter, invitee):\n    \"\"\"Store who invited whom.\"\"\"\n    pass\n",
        )
        .unwrap();
        dir
    }

    fn validator(dir: &TempDir) -> (Validator, Arc<EventBus>) {
        let bus = Arc::new(EventBus::with_default_capacity());
        (Validator::new(dir.path(), bus.clone()).unwrap(), bus)
    }

    fn record_events(bus: &EventBus) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.add_listener(move |e| sink.lock().unwrap().push(e.event_type().to_string()));
        seen
    }

    const ALTERNATIVE: &str = r#"[{"file": "src/invites.py", "function_name": "record_invite", "signature": "record_invite(inviter, invitee)", "confidence": 0.8, "reasoning": "Stores invites"}]"#;

    /// Answers with [`ALTERNATIVE`] and remembers which events were out at the time
    struct WatchingLlm {
        seen: Arc<Mutex<Vec<String>>>,
        at_call: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for WatchingLlm {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let snapshot = self.seen.lock().unwrap().clone();
            *self.at_call.lock().unwrap() = snapshot;
            Ok(CompletionResponse::text(ALTERNATIVE))
        }
    }

    #[test]
    fn test_root_not_accessible() {
        let dir = tempdir().unwrap();
        let bus = Arc::new(EventBus::default());
        let result = Validator::new(dir.path().join("missing"), bus.clone());
        assert!(matches!(result, Err(ValidationError::RootNotAccessible { .. })));

        fs::write(dir.path().join("file.txt"), "x").unwrap();
        assert!(Validator::new(dir.path().join("file.txt"), bus).is_err());
    }

    #[test]
    fn test_missing_file_fails_every_check() {
        let dir = codebase();
        let (v, _) = validator(&dir);
        let req = FileRequirement::new("src/billing.py")
            .with_check(RawCheck::structured("contains", "stripe"))
            .with_check(RawCheck::legacy("function_exists('charge')"));

        let result = v.validate_file_requirement(&req);
        assert!(!result.exists);
        assert_eq!(result.checks.len(), 2);
        assert!(result.checks.iter().all(|c| c.status == CheckStatus::Failed && c.detail == DETAIL_FILE_MISSING));
        assert!(!result.passed());
    }

    #[test]
    fn test_file_checks_run_against_parsed_file() {
        let dir = codebase();
        let (v, _) = validator(&dir);
        let req = FileRequirement::new("/src/auth.py")
            .with_check(RawCheck::legacy("function_exists('login')"))
            .with_check(RawCheck::structured("class_exists", "Session"));

        let result = v.validate_file_requirement(&req);
        assert!(result.exists);
        assert_eq!(result.checks[0].status, CheckStatus::Passed);
        assert_eq!(result.checks[1].status, CheckStatus::Failed);
    }

    #[test]
    fn test_path_escaping_root_is_missing() {
        let dir = codebase();
        let (v, _) = validator(&dir);
        let result = v.validate_file_requirement(&FileRequirement::new("../../etc/passwd"));
        assert!(!result.exists);
    }

    #[tokio::test]
    async fn test_function_found_without_signature() {
        let dir = codebase();
        let (v, _) = validator(&dir);
        let result = v
            .validate_function_requirement(&FunctionRequirement::new("src/auth.py", "login"))
            .await;
        assert!(result.found);
        assert!(result.signature_match);
        assert!(result.passed());
        assert_eq!(result.detail, "");
    }

    #[tokio::test]
    async fn test_signature_comparison() {
        let dir = codebase();
        let (v, _) = validator(&dir);

        let matching = FunctionRequirement::new("src/auth.py", "logout").with_signature("logout(user:  str)  -> None");
        let result = v.validate_function_requirement(&matching).await;
        assert!(result.signature_match, "{}", result.detail);

        let differing = FunctionRequirement::new("src/auth.py", "logout").with_signature("logout(user: int)");
        let result = v.validate_function_requirement(&differing).await;
        assert!(result.found);
        assert!(!result.signature_match);
        assert!(result.passed());
        assert_eq!(
            result.detail,
            "Signature mismatch: expected 'logout(user: int)', got 'logout(user: str) -> None'"
        );
    }

    #[tokio::test]
    async fn test_unparseable_function_file() {
        let dir = codebase();
        fs::write(dir.path().join("src/broken.py"), "def broken(:\n").unwrap();
        let (v, _) = validator(&dir);

        let result = v
            .validate_function_requirement(&FunctionRequirement::new("src/broken.py", "broken"))
            .await;
        assert!(!result.found);
        assert_eq!(result.detail, DETAIL_NOT_PARSED);
    }

    #[tokio::test]
    async fn test_missing_function_gets_alternatives() {
        let dir = codebase();
        let (v, _) = validator(&dir);
        let mock = Arc::new(MockLlmClient::with_text(ALTERNATIVE));
        let v = v.with_llm(mock.clone());

        let req = FunctionRequirement::new("src/referrals.py", "track_referral").with_logic("Record referrals");
        let result = v.validate_function_requirement(&req).await;

        assert!(!result.found);
        assert!(!result.passed());
        assert_eq!(result.detail, DETAIL_FILE_MISSING);
        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.alternatives[0].function_name, "record_invite");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_optional_missing_function_passes() {
        let dir = codebase();
        let (v, _) = validator(&dir);
        let result = v
            .validate_function_requirement(&FunctionRequirement::new("src/auth.py", "refresh").optional())
            .await;
        assert!(!result.found);
        assert!(result.passed());
        assert!(result.alternatives.is_empty());
    }

    #[tokio::test]
    async fn test_semantic_deadline_yields_no_alternatives() {
        let dir = codebase();
        let (v, _) = validator(&dir);
        let mock = Arc::new(MockLlmClient::with_text(ALTERNATIVE).with_delay(Duration::from_millis(500)));
        let v = v.with_llm(mock).with_settings(ValidatorSettings {
            llm_deadline: Duration::from_millis(20),
            ..ValidatorSettings::default()
        });

        let result = v
            .validate_function_requirement(&FunctionRequirement::new("src/auth.py", "refresh"))
            .await;
        assert!(result.alternatives.is_empty());
    }

    #[tokio::test]
    async fn test_loop_events_in_order() {
        let dir = codebase();
        let (v, bus) = validator(&dir);
        let seen = record_events(&bus);

        let mut spec = LoopSpec::new("auth-loop", "Auth Loop");
        spec.requirements.files.push(FileRequirement::new("src/auth.py"));
        spec.requirements
            .functions
            .push(FunctionRequirement::new("src/auth.py", "login"));

        let result = v.validate_loop(&spec).await;
        assert!(result.all_passed());
        assert_eq!(result.total_checks(), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "loop_validation_started",
                "requirement_met",
                "requirement_met",
                "validation_time",
                "loop_completed"
            ]
        );
    }

    #[tokio::test]
    async fn test_file_met_is_emitted_before_function_work() {
        let dir = codebase();
        let (v, bus) = validator(&dir);
        let seen = record_events(&bus);
        let llm = Arc::new(WatchingLlm {
            seen: seen.clone(),
            at_call: Mutex::new(Vec::new()),
        });
        let v = v.with_llm(llm.clone());

        let mut spec = LoopSpec::new("auth-loop", "Auth Loop");
        spec.requirements.files.push(FileRequirement::new("src/auth.py"));
        spec.requirements
            .functions
            .push(FunctionRequirement::new("src/auth.py", "refresh"));

        let result = v.validate_loop(&spec).await;
        assert_eq!(result.function_results[0].alternatives.len(), 1);
        assert_eq!(
            *llm.at_call.lock().unwrap(),
            vec!["loop_validation_started", "requirement_met"]
        );
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["loop_validation_started", "requirement_met", "validation_time"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_requirements_keep_declaration_order() {
        let dir = codebase();
        fs::create_dir_all(dir.path().join("src/gen")).unwrap();
        let mut spec = LoopSpec::new("many", "Many");
        for i in 0..24 {
            let rel = format!("src/gen/mod_{}.py", i);
            let name = format!("handler_{}", i);
            fs::write(dir.path().join(&rel), format!("def {}():\n    pass\n", name)).unwrap();
            spec.requirements.files.push(
                FileRequirement::new(rel.clone()).with_check(RawCheck::structured("function_exists", name.clone())),
            );
            spec.requirements.functions.push(FunctionRequirement::new(rel, name));
        }

        let (v, bus) = validator(&dir);
        let v = v.with_settings(ValidatorSettings {
            concurrency: 6,
            ..ValidatorSettings::default()
        });
        let paths = Arc::new(Mutex::new(Vec::new()));
        let sink = paths.clone();
        bus.add_listener(move |e| {
            if let ValidationEvent::RequirementMet { path, name, .. } = e {
                sink.lock().unwrap().push(path.clone().or_else(|| name.clone()).unwrap_or_default());
            }
        });

        let result = v.validate_loop(&spec).await;
        assert!(result.all_passed());

        let files: Vec<String> = (0..24).map(|i| format!("src/gen/mod_{}.py", i)).collect();
        let names: Vec<String> = (0..24).map(|i| format!("handler_{}", i)).collect();
        let got_files: Vec<_> = result.file_results.iter().map(|f| f.path.clone()).collect();
        let got_names: Vec<_> = result.function_results.iter().map(|f| f.name.clone()).collect();
        assert_eq!(got_files, files);
        assert_eq!(got_names, names);
        assert_eq!(*paths.lock().unwrap(), [files, names].concat());
    }

    #[tokio::test]
    async fn test_failing_loop_has_no_completed_event() {
        let dir = codebase();
        let (v, bus) = validator(&dir);
        let seen = record_events(&bus);

        let mut spec = LoopSpec::new("billing", "Billing");
        spec.requirements.files.push(FileRequirement::new("src/billing.py"));

        let result = v.validate_loop(&spec).await;
        assert!(!result.all_passed());
        assert_eq!(*seen.lock().unwrap(), vec!["loop_validation_started", "validation_time"]);
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_shares_inventory() {
        let dir = codebase();
        let (v, _) = validator(&dir);
        let mock = Arc::new(MockLlmClient::with_text(ALTERNATIVE));
        let v = v.with_llm(mock.clone()).with_settings(ValidatorSettings {
            concurrency: 2,
            ..ValidatorSettings::default()
        });

        let specs: Vec<LoopSpec> = (0..4)
            .map(|i| {
                let mut spec = LoopSpec::new(format!("loop-{}", i), "Loop");
                spec.requirements
                    .functions
                    .push(FunctionRequirement::new("src/auth.py", format!("missing_{}", i)));
                spec
            })
            .collect();

        let results = v.validate_batch(&specs, &CancelToken::new()).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.loop_id.as_str()).collect();
        assert_eq!(ids, vec!["loop-0", "loop-1", "loop-2", "loop-3"]);
        assert!(results.iter().all(|r| r.function_results[0].alternatives.len() == 1));
        assert_eq!(mock.call_count(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_batch_returns_error() {
        let dir = codebase();
        let (v, bus) = validator(&dir);
        let seen = record_events(&bus);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = v.validate_batch(&[LoopSpec::new("l", "L")], &cancel).await;
        assert!(matches!(result, Err(ValidationError::Cancelled)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_batch_discards_results() {
        let dir = codebase();
        let (v, bus) = validator(&dir);
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        bus.add_listener(move |e| {
            if e.event_type() == "loop_validation_started" {
                trigger.cancel();
            }
        });

        let mut spec = LoopSpec::new("l", "L");
        spec.requirements.files.push(FileRequirement::new("src/auth.py"));
        let result = v.validate_batch(&[spec.clone(), spec], &cancel).await;
        assert!(matches!(result, Err(ValidationError::Cancelled)));
    }
}
