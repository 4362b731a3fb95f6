//! Consolidated log codes and their metadata
//!
//! Single source of truth for every code emitted through the logging macros.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// Profile loading and binding codes
pub mod profile {
    use super::Code;

    pub const PROFILE_NOT_FOUND: Code = Code::new("E010");
    pub const PROFILE_PARSE_ERROR: Code = Code::new("E011");
    pub const INVALID_EXPECTATION: Code = Code::new("E012");
    pub const MISSING_INPUT: Code = Code::new("E013");
    pub const INVALID_INPUT: Code = Code::new("E014");
}

/// Resource fetch codes
pub mod fetch {
    use super::Code;

    pub const INVALID_LOCATOR: Code = Code::new("E020");
    pub const PROVIDER_FAILURE: Code = Code::new("E021");
    pub const FETCH_TIMEOUT: Code = Code::new("E022");
    pub const UNSUPPORTED_TYPE: Code = Code::new("E023");
}

/// Evaluation and run codes
pub mod runner {
    use super::Code;

    pub const EXPECTATION_FAILED: Code = Code::new("E030");
    pub const RUN_TIMEOUT: Code = Code::new("E031");
    pub const REPORT_SINK_FAILURE: Code = Code::new("E032");
}

/// Success codes
pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("S001");
    pub const PROFILE_LOADED: Code = Code::new("S010");
    pub const INPUTS_BOUND: Code = Code::new("S011");
    pub const CONTROL_PASSED: Code = Code::new("S030");
    pub const RUN_COMPLETED: Code = Code::new("S031");
}

// ============================================================================
// CODE METADATA
// ============================================================================

static DESCRIPTIONS: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

fn descriptions() -> &'static HashMap<&'static str, &'static str> {
    DESCRIPTIONS.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert(system::INTERNAL_ERROR.as_str(), "Internal error");
        map.insert(
            system::INITIALIZATION_FAILURE.as_str(),
            "Initialization failure",
        );
        map.insert(profile::PROFILE_NOT_FOUND.as_str(), "Profile not found");
        map.insert(profile::PROFILE_PARSE_ERROR.as_str(), "Profile parse error");
        map.insert(
            profile::INVALID_EXPECTATION.as_str(),
            "Invalid expectation declaration",
        );
        map.insert(profile::MISSING_INPUT.as_str(), "Missing required input");
        map.insert(profile::INVALID_INPUT.as_str(), "Invalid input value");
        map.insert(fetch::INVALID_LOCATOR.as_str(), "Invalid resource locator");
        map.insert(fetch::PROVIDER_FAILURE.as_str(), "Provider request failed");
        map.insert(fetch::FETCH_TIMEOUT.as_str(), "Resource fetch timed out");
        map.insert(fetch::UNSUPPORTED_TYPE.as_str(), "Unsupported resource type");
        map.insert(runner::EXPECTATION_FAILED.as_str(), "Expectation failed");
        map.insert(runner::RUN_TIMEOUT.as_str(), "Run deadline exceeded");
        map.insert(runner::REPORT_SINK_FAILURE.as_str(), "Report sink failure");
        map.insert(
            success::SYSTEM_INITIALIZATION_COMPLETED.as_str(),
            "Logging initialized",
        );
        map.insert(success::PROFILE_LOADED.as_str(), "Profile loaded");
        map.insert(success::INPUTS_BOUND.as_str(), "Inputs bound");
        map.insert(success::CONTROL_PASSED.as_str(), "Control passed");
        map.insert(success::RUN_COMPLETED.as_str(), "Run completed");
        map
    })
}

/// Human-readable description of a code
pub fn get_description(code: &str) -> &'static str {
    descriptions().get(code).copied().unwrap_or("Unknown error")
}
