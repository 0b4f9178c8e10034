use serde::{Deserialize, Serialize};

/// A named group of test cases sharing an optional base URL.
///
/// Parsed once from a suite file and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suite {
    pub name: String,

    /// Each case's fresh page opens here before its first step.
    /// Relative navigation targets resolve against it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub steps: Vec<Step>,
}

/// One natural-language instruction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    #[serde(alias = "raw_instruction")]
    pub instruction: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Step {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            description: None,
        }
    }
}

impl From<&str> for Step {
    fn from(instruction: &str) -> Self {
        Step::new(instruction)
    }
}

impl TestCase {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps,
        }
    }
}

impl Suite {
    /// Resolve a navigation target against the suite's base URL.
    ///
    /// Absolute URLs and targets without a base pass through unchanged.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.contains("://") || url.starts_with("about:") || url.starts_with("data:") {
            return url.to_string();
        }
        match &self.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = url.trim_start_matches('/');
                format!("{}/{}", base, path)
            }
            None => url.to_string(),
        }
    }

    pub fn step_count(&self) -> usize {
        self.test_cases.iter().map(|c| c.steps.len()).sum()
    }
}

// ============================================================================
// On-disk forms
// ============================================================================

/// A step as written in a suite file: a bare string or a mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StepEntry {
    Text(String),
    Detailed {
        #[serde(alias = "raw_instruction")]
        instruction: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl From<StepEntry> for Step {
    fn from(entry: StepEntry) -> Self {
        match entry {
            StepEntry::Text(instruction) => Step::new(instruction),
            StepEntry::Detailed {
                instruction,
                description,
            } => Step {
                instruction,
                description,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaseEntry {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepEntry>,
}

/// Either suite file layout.
///
/// The flat form holds one implicit case named after the suite.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SuiteFile {
    Structured {
        name: String,
        #[serde(default)]
        base_url: Option<String>,
        test_cases: Vec<CaseEntry>,
    },
    Flat {
        name: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        description: Option<String>,
        steps: Vec<StepEntry>,
    },
}

impl From<SuiteFile> for Suite {
    fn from(file: SuiteFile) -> Self {
        match file {
            SuiteFile::Structured {
                name,
                base_url,
                test_cases,
            } => Suite {
                name,
                base_url,
                test_cases: test_cases
                    .into_iter()
                    .map(|c| TestCase {
                        name: c.name,
                        description: c.description,
                        steps: c.steps.into_iter().map(Step::from).collect(),
                    })
                    .collect(),
            },
            SuiteFile::Flat {
                name,
                base_url,
                description,
                steps,
            } => Suite {
                test_cases: vec![TestCase {
                    name: name.clone(),
                    description,
                    steps: steps.into_iter().map(Step::from).collect(),
                }],
                name,
                base_url,
            },
        }
    }
}
