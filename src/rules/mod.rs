//! Biotransformation rule catalog.
//!
//! Rules live in a JSON table; the built-in one is compiled into the crate
//! from `data/rules.json`. Each rule's reaction SMARTS is parsed once at
//! load time and the catalog is immutable afterwards.

mod error;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reaction::{from_reaction_smarts, Reaction};

pub use error::CatalogError;

const BUILTIN_RULES: &str = include_str!("../../data/rules.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Functionalization: oxidation, reduction, hydrolysis.
    Phase1,
    /// Conjugation.
    Phase2,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Phase1 => f.write_str("phase1"),
            Phase::Phase2 => f.write_str("phase2"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RuleRecord {
    name: String,
    pattern: String,
    priority: f64,
    phase: Phase,
    family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    literature_weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleTable {
    #[serde(default)]
    version: Option<String>,
    rules: Vec<RuleRecord>,
}

/// A compiled biotransformation rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    /// Reaction SMARTS, `reactant>>product`.
    pub pattern: String,
    /// Weight multiplied into every candidate's score.
    pub priority: f64,
    pub phase: Phase,
    /// Enzyme family tag, e.g. `CYP` or `UGT`.
    pub family: String,
    pub literature_weight: Option<f64>,
    reaction: Reaction,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        priority: f64,
        phase: Phase,
        family: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        Self::compile(RuleRecord {
            name: name.into(),
            pattern: pattern.into(),
            priority,
            phase,
            family: family.into(),
            literature_weight: None,
        })
    }

    fn compile(record: RuleRecord) -> Result<Self, CatalogError> {
        if !record.priority.is_finite() || record.priority < 0.0 {
            return Err(CatalogError::InvalidPriority {
                name: record.name,
                priority: record.priority,
            });
        }
        let reaction = from_reaction_smarts(&record.pattern).map_err(|source| CatalogError::InvalidPattern {
            name: record.name.clone(),
            source,
        })?;
        Ok(Self {
            name: record.name,
            pattern: record.pattern,
            priority: record.priority,
            phase: record.phase,
            family: record.family,
            literature_weight: record.literature_weight,
            reaction,
        })
    }

    pub fn with_literature_weight(mut self, weight: f64) -> Self {
        self.literature_weight = Some(weight);
        self
    }

    pub fn reaction(&self) -> &Reaction {
        &self.reaction
    }
}

/// Which part of the catalog a prediction uses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSelector {
    Phase1,
    Phase2,
    #[default]
    Phase1AndPhase2,
    /// Rules whose family tag is listed, compared case-insensitively.
    Families(Vec<String>),
}

impl RuleSelector {
    pub fn accepts(&self, rule: &Rule) -> bool {
        match self {
            RuleSelector::Phase1 => rule.phase == Phase::Phase1,
            RuleSelector::Phase2 => rule.phase == Phase::Phase2,
            RuleSelector::Phase1AndPhase2 => true,
            RuleSelector::Families(families) => families.iter().any(|f| f.eq_ignore_ascii_case(&rule.family)),
        }
    }
}

/// Ordered, immutable collection of compiled rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleCatalog {
    version: Option<String>,
    rules: Vec<Rule>,
}

impl RuleCatalog {
    /// Builds a catalog from already compiled rules. Names must be unique.
    pub fn new(rules: Vec<Rule>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(CatalogError::DuplicateName(rule.name.clone()));
            }
        }
        Ok(Self { version: None, rules })
    }

    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_RULES)
    }

    /// Reads `{"version": ..., "rules": [{name, pattern, priority, phase,
    /// family, literature_weight?}, ...]}`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let table: RuleTable = serde_json::from_str(json).map_err(|e| CatalogError::Json(e.to_string()))?;
        let rules = table
            .rules
            .into_iter()
            .map(Rule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let mut catalog = Self::new(rules)?;
        catalog.version = table.version;
        debug!(rules = catalog.len(), version = ?catalog.version, "loaded rule catalog");
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Sub-catalog of the rules `selector` accepts, in catalog order.
    pub fn select(&self, selector: &RuleSelector) -> RuleCatalog {
        RuleCatalog {
            version: self.version.clone(),
            rules: self.rules.iter().filter(|r| selector.accepts(r)).cloned().collect(),
        }
    }
}
