//! Page test execution
//!
//! Injects the accessibility rule engine into an already loaded page, runs
//! its audit and normalizes the verdict.

use crate::browser::{call_expression, PageHandle};
use crate::scan::{IssueCounts, Violation};
use crate::PageError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// In-page audit entry point; always resolves, errors are returned as data
const AUDIT_FUNCTION: &str = r#"async (tags) => {
  try {
    if (typeof axe === 'undefined') {
      return { error: 'accessibility engine is not loaded' };
    }
    const results = await axe.run(document, { runOnly: { type: 'tag', values: tags } });
    return { violations: results.violations };
  } catch (e) {
    return { error: String((e && e.message) || e) };
  }
}"#;

/// Normalized verdict of one page audit
#[derive(Debug, Clone, Default)]
pub struct PageAudit {
    pub violations: Vec<Violation>,
    pub counts: IssueCounts,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default)]
    violations: Option<Vec<Violation>>,

    #[serde(default)]
    error: Option<String>,
}

/// Runs the accessibility engine against live pages
#[derive(Debug, Clone)]
pub struct PageTester {
    engine_source: Arc<str>,
    rule_tags: Vec<String>,
    audit_timeout: Duration,
}

impl PageTester {
    /// Creates a tester from the engine's JavaScript source
    ///
    /// The source is kept in memory and injected into every page.
    pub fn new(engine_source: impl Into<Arc<str>>, rule_tags: Vec<String>, audit_timeout: Duration) -> Self {
        Self {
            engine_source: engine_source.into(),
            rule_tags,
            audit_timeout,
        }
    }

    /// Loads the engine source from a file
    pub fn from_file(
        path: &std::path::Path,
        rule_tags: Vec<String>,
        audit_timeout: Duration,
    ) -> std::io::Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Ok(Self::new(source, rule_tags, audit_timeout))
    }

    /// Audits the page currently loaded in `page`
    ///
    /// Does not navigate or close the page.
    ///
    /// # Errors
    ///
    /// * [`PageError::Engine`] if injection fails or the engine reports an error
    /// * [`PageError::AuditTimeout`] if no verdict arrives in time
    /// * [`PageError::Verdict`] if the verdict cannot be understood
    pub async fn test(&self, page: &dyn PageHandle) -> Result<PageAudit, PageError> {
        page.evaluate(&self.engine_source)
            .await
            .map_err(|e| PageError::Engine(format!("failed to inject engine: {}", e)))?;

        let expression = call_expression(AUDIT_FUNCTION, &self.rule_tags)
            .map_err(|e| PageError::Engine(e.to_string()))?;

        let value = tokio::time::timeout(self.audit_timeout, page.evaluate(&expression))
            .await
            .map_err(|_| PageError::AuditTimeout {
                timeout_ms: self.audit_timeout.as_millis() as u64,
            })?
            .map_err(|e| PageError::Engine(e.to_string()))?;

        parse_verdict(value)
    }
}

/// Normalizes the raw verdict object returned by the audit function
fn parse_verdict(value: serde_json::Value) -> Result<PageAudit, PageError> {
    let verdict: Verdict =
        serde_json::from_value(value).map_err(|e| PageError::Verdict(e.to_string()))?;

    if let Some(error) = verdict.error {
        return Err(PageError::Engine(error));
    }

    let violations = verdict
        .violations
        .ok_or_else(|| PageError::Verdict("verdict has no violations list".to_string()))?;

    Ok(PageAudit {
        counts: IssueCounts::from_violations(&violations),
        violations,
    })
}
