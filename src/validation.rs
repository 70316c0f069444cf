// SPDX-License-Identifier: AGPL-3.0-only

//! Pass/fail harness for the validation binaries.
//!
//! Every validation binary follows the same pattern: run checks against
//! documented tolerances from [`crate::tolerances`], print a summary,
//! exit 0 only if everything passed. Checks record observed and
//! expected values so a failure is diagnosable from the output alone.

use std::fmt;
use std::process;

/// How a check compares observed against expected.
#[derive(Debug, Clone, Copy)]
pub enum CheckKind {
    /// |observed − expected| < tolerance
    Absolute,
    /// |observed − expected| / |expected| < tolerance
    Relative,
    /// observed < expected
    Below,
    /// observed > expected
    Above,
    /// observed.to_bits() == expected.to_bits()
    BitExact,
    /// boolean condition
    Condition,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "abs"),
            Self::Relative => write!(f, "rel"),
            Self::Below => write!(f, "<"),
            Self::Above => write!(f, ">"),
            Self::BitExact => write!(f, "bits"),
            Self::Condition => write!(f, "cond"),
        }
    }
}

/// One recorded check.
#[derive(Debug, Clone)]
pub struct Check {
    pub label: String,
    pub passed: bool,
    pub observed: f64,
    pub expected: f64,
    pub tolerance: f64,
    pub kind: CheckKind,
}

/// Accumulates checks; prints a summary and exits.
#[derive(Debug, Default)]
#[must_use]
pub struct ValidationHarness {
    pub name: String,
    pub checks: Vec<Check>,
}

impl ValidationHarness {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    fn push(
        &mut self,
        label: &str,
        passed: bool,
        observed: f64,
        expected: f64,
        tolerance: f64,
        kind: CheckKind,
    ) {
        self.checks.push(Check {
            label: label.to_string(),
            passed,
            observed,
            expected,
            tolerance,
            kind,
        });
    }

    /// |observed − expected| < tolerance.
    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = (observed - expected).abs() < tolerance;
        self.push(label, passed, observed, expected, tolerance, CheckKind::Absolute);
    }

    /// |observed − expected| / |expected| < tolerance, with an absolute
    /// fallback when expected is (near) zero.
    pub fn check_rel(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = if expected.abs() > f64::EPSILON {
            ((observed - expected) / expected).abs() < tolerance
        } else {
            observed.abs() < tolerance
        };
        self.push(label, passed, observed, expected, tolerance, CheckKind::Relative);
    }

    /// observed strictly below threshold.
    pub fn check_below(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(
            label,
            observed < threshold,
            observed,
            threshold,
            threshold,
            CheckKind::Below,
        );
    }

    /// observed strictly above threshold.
    pub fn check_above(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(
            label,
            observed > threshold,
            observed,
            threshold,
            threshold,
            CheckKind::Above,
        );
    }

    /// Bitwise f64 identity — the cache's exact-reuse guarantee.
    pub fn check_bits(&mut self, label: &str, observed: f64, expected: f64) {
        self.push(
            label,
            observed.to_bits() == expected.to_bits(),
            observed,
            expected,
            0.0,
            CheckKind::BitExact,
        );
    }

    /// Boolean condition.
    pub fn check_that(&mut self, label: &str, condition: bool) {
        self.push(
            label,
            condition,
            f64::from(u8::from(condition)),
            1.0,
            0.0,
            CheckKind::Condition,
        );
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Render the summary block.
    #[must_use]
    pub fn summary(&self) -> String {
        use std::fmt::Write;
        let mut s = String::new();
        let _ = writeln!(
            s,
            "─── {}: {}/{} checks passed ───",
            self.name,
            self.passed_count(),
            self.total_count()
        );
        for check in &self.checks {
            let icon = if check.passed { "✓" } else { "✗" };
            let _ = writeln!(
                s,
                "  {icon} {}: observed={:.6e}, expected={:.6e}, tol={:.2e} ({})",
                check.label, check.observed, check.expected, check.tolerance, check.kind
            );
        }
        s
    }

    /// Print the summary and exit 0 (all passed) or 1.
    pub fn finish(&self) -> ! {
        println!();
        print!("{}", self.summary());
        if self.all_passed() {
            println!("ALL CHECKS PASSED");
            process::exit(0);
        }
        let failed: Vec<&str> = self
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.label.as_str())
            .collect();
        println!("FAILED CHECKS: {}", failed.join(", "));
        process::exit(1);
    }
}
