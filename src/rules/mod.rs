//! Derivation rules mapping raw cost-type codes and job numbers to report categories.
//!
//! The rules are immutable lookup tables built once at start-up
//! ([`DerivationRules::standard`], optionally extended from `gadash.toml`) and
//! passed explicitly into the extractor. Every lookup is total: any input,
//! including a missing value, yields a defined label.
//!
//! # Cost types
//!
//! A cost type reads like `"611000 - Regular Time"`. The code before `" - "` is
//! matched against a closed set of prefixes, longest prefix first, so the
//! three-digit allocation prefix `693` wins over the two-digit `69`.
//!
//! # Departments
//!
//! The department is encoded in the last three characters of the job number.
//! Known codes render as `"711 - Fuel"`, unknown ones as `"Unknown (999)"`, and a
//! missing job as `"Unknown"`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::utils::fs::content_checksum;

/// Label used when a cost type or department code has no rule.
pub const OTHER: &str = "Other";

/// Label used when the job field itself is absent.
pub const UNKNOWN: &str = "Unknown";

/// Cost-type prefix marking allocation credits.
pub const ALLOCATION_PREFIX: &str = "693";

/// Cost-type prefix → category, in the order the finance team defined them.
const CATEGORY_PREFIXES: &[(&str, &str)] = &[
    ("61", "Labor Costs"),
    ("62", "Travel & Per Diem"),
    ("64", "Fleet & Materials"),
    ("65", "Facilities & Services"),
    ("67", "Equipment Costs"),
    (ALLOCATION_PREFIX, "Allocation Credits"),
    ("69", "Other Allocations"),
    ("71", "Corporate Overhead"),
    ("72", "Corporate Overhead"),
    ("73", "G&A & Other"),
    ("74", "G&A & Other"),
    ("75", "G&A & Other"),
];

/// Department code → (name, department category).
const DEPARTMENTS: &[(&str, &str, &str)] = &[
    ("110", "Exec", "G&A"),
    ("130", "Bus Dev", "G&A"),
    ("140", "Admin", "G&A"),
    ("150", "Acct", "G&A"),
    ("165", "Treasury", "G&A"),
    ("170", "HR Payroll", "G&A"),
    ("180", "IT", "G&A"),
    ("190", "Risk Mgmt", "G&A"),
    ("210", "Intl Ops", "G&A"),
    ("230", "Safety Mgmt", "G&A"),
    ("250", "Estimating", "G&A"),
    ("260", "Proposals", "G&A"),
    ("520", "Ops Proj Mgmt", "Ops Support"),
    ("530", "Ops Proj Cont", "Ops Support"),
    ("540", "Ops Proc Subs", "Ops Support"),
    ("550", "Ops Eng", "Ops Support"),
    ("560", "NonBillable", "Ops Support"),
    ("590", "Field Ops", "Other"),
    ("710", "Eqp Gen", "Equipment"),
    ("711", "Fuel", "Equipment"),
    ("720", "Eqp Mech", "Equipment"),
    ("730", "Eqp Haul", "Equipment"),
    ("740", "Aviation Fixed Wing", "Equipment"),
    ("750", "Aviation Rotary Wing", "Equipment"),
    ("760", "Small Tools", "Tools"),
    ("770", "Warehouse", "Other"),
    ("810", "Safety Gen", "Safety"),
    ("820", "Safety Train", "Safety"),
    ("850", "Comm IT Cell", "Other"),
    ("860", "Facilities", "Other"),
];

/// One department entry of the lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    /// Short display name, e.g. `"Fuel"`
    pub name: String,
    /// Department category, e.g. `"Equipment"`
    pub category: String,
}

/// Fields computed for every source record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedFields {
    /// High-level cost category (`"Other"` when no prefix matches)
    pub category: String,
    /// True iff the cost-type code starts with the allocation prefix
    pub is_allocation: bool,
    /// `"<code> - <name>"`, `"Unknown (<code>)"`, or `"Unknown"`
    pub department: String,
    /// Department category, `"Other"` for unmapped codes, `"Unknown"` without a job
    pub department_category: String,
}

#[derive(Debug, Clone)]
struct CategoryRule {
    prefix: String,
    label: String,
}

/// Immutable classification tables.
#[derive(Debug, Clone)]
pub struct DerivationRules {
    /// Sorted by descending prefix length; ties keep declaration order.
    categories: Vec<CategoryRule>,
    departments: BTreeMap<String, Department>,
    allocation_prefix: String,
}

impl DerivationRules {
    /// The built-in tables.
    #[must_use]
    pub fn standard() -> Self {
        let mut categories: Vec<CategoryRule> = CATEGORY_PREFIXES
            .iter()
            .map(|(prefix, label)| CategoryRule {
                prefix: (*prefix).to_string(),
                label: (*label).to_string(),
            })
            .collect();
        categories.sort_by_key(|rule| std::cmp::Reverse(rule.prefix.len()));

        let departments = DEPARTMENTS
            .iter()
            .map(|(code, name, category)| {
                (
                    (*code).to_string(),
                    Department {
                        name: (*name).to_string(),
                        category: (*category).to_string(),
                    },
                )
            })
            .collect();

        Self {
            categories,
            departments,
            allocation_prefix: ALLOCATION_PREFIX.to_string(),
        }
    }

    /// Return a copy with extra or replaced department entries.
    #[must_use]
    pub fn with_departments<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, Department)>,
    {
        for (code, department) in overrides {
            self.departments.insert(code, department);
        }
        self
    }

    /// Number of known department codes.
    #[must_use]
    pub fn department_count(&self) -> usize {
        self.departments.len()
    }

    /// Stable digest of every table entry.
    ///
    /// Two rule sets with the same fingerprint classify every record identically,
    /// which lets a cached transform be reused safely.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut canonical = String::new();
        for rule in &self.categories {
            canonical.push_str(&format!("c\t{}\t{}\n", rule.prefix, rule.label));
        }
        for (code, department) in &self.departments {
            canonical.push_str(&format!("d\t{code}\t{}\t{}\n", department.name, department.category));
        }
        canonical.push_str(&format!("a\t{}\n", self.allocation_prefix));
        content_checksum(canonical.as_bytes())
    }

    /// Category label for a raw cost-type value.
    #[must_use]
    pub fn category(&self, cost_type: Option<&str>) -> &str {
        let Some(code) = cost_type.map(cost_type_code).filter(|code| !code.is_empty()) else {
            return OTHER;
        };

        self.categories
            .iter()
            .find(|rule| code.starts_with(rule.prefix.as_str()))
            .map_or(OTHER, |rule| rule.label.as_str())
    }

    /// Whether a raw cost-type value is an allocation credit.
    #[must_use]
    pub fn is_allocation(&self, cost_type: Option<&str>) -> bool {
        cost_type
            .map(cost_type_code)
            .is_some_and(|code| code.starts_with(self.allocation_prefix.as_str()))
    }

    /// Department label for a raw job value.
    #[must_use]
    pub fn department(&self, job: Option<&str>) -> String {
        let Some(code) = job.and_then(department_code) else {
            return UNKNOWN.to_string();
        };

        match self.departments.get(code) {
            Some(department) => format!("{code} - {}", department.name),
            None => format!("{UNKNOWN} ({code})"),
        }
    }

    /// Department category for a raw job value.
    #[must_use]
    pub fn department_category(&self, job: Option<&str>) -> &str {
        let Some(code) = job.and_then(department_code) else {
            return UNKNOWN;
        };

        self.departments.get(code).map_or(OTHER, |department| department.category.as_str())
    }

    /// Compute all derived fields for one record.
    #[must_use]
    pub fn derive(&self, cost_type: Option<&str>, job: Option<&str>) -> DerivedFields {
        DerivedFields {
            category: self.category(cost_type).to_string(),
            is_allocation: self.is_allocation(cost_type),
            department: self.department(job),
            department_category: self.department_category(job).to_string(),
        }
    }
}

impl Default for DerivationRules {
    fn default() -> Self {
        Self::standard()
    }
}

/// Numeric code of a cost type: the text before the first `" - "`, trimmed.
#[must_use]
pub fn cost_type_code(cost_type: &str) -> &str {
    cost_type.split(" - ").next().unwrap_or_default().trim()
}

/// Department code of a job number: its last three characters.
///
/// Returns `None` for an empty (or whitespace-only) job.
#[must_use]
pub fn department_code(job: &str) -> Option<&str> {
    let job = job.trim();
    if job.is_empty() {
        return None;
    }

    let start = job.char_indices().rev().nth(2).map_or(0, |(index, _)| index);
    Some(&job[start..])
}
