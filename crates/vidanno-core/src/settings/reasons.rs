//! Reason Catalogs
//!
//! Accept and Reject each offer an ordered catalog of reasons. In the config
//! file a catalog is a table with a `_simple` list of plain reasons and any
//! number of group tables:
//!
//! ```toml
//! [accept_reasons]
//! _simple = ["1", "2", "3", "4"]
//!
//! [accept_reasons.3]
//! name = "3"
//! type = "RadioButton"
//! options = ["3.1", "3.2", "3.3"]
//! ```
//!
//! A group takes the position of the simple reason with the same name, or is
//! appended when there is none.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::clips::ClipLabel;
use crate::{CoreError, CoreResult};

// =============================================================================
// Config Representation
// =============================================================================

/// How the options of a reason group are chosen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKind {
    /// Any number of options
    #[default]
    CheckBox,
    /// At most one option
    RadioButton,
    /// The group name itself is the reason; options only describe it
    Label,
}

/// Group table as written in the config file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReasonGroupTable {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: GroupKind,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Reason table as written in the config file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasonTable {
    #[serde(rename = "_simple", default)]
    pub simple: Vec<String>,
    #[serde(flatten)]
    pub groups: IndexMap<String, ReasonGroupTable>,
}

// =============================================================================
// Catalog
// =============================================================================

/// One entry of a reason catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReasonOption {
    Simple {
        name: String,
    },
    Group {
        name: String,
        kind: GroupKind,
        options: Vec<String>,
    },
}

impl ReasonOption {
    pub fn name(&self) -> &str {
        match self {
            ReasonOption::Simple { name } | ReasonOption::Group { name, .. } => name,
        }
    }

    /// Reason strings this entry contributes to a clip
    pub fn selectable(&self) -> Vec<&str> {
        match self {
            ReasonOption::Simple { name } => vec![name.as_str()],
            ReasonOption::Group {
                name,
                kind: GroupKind::Label,
                ..
            } => vec![name.as_str()],
            ReasonOption::Group { options, .. } => options.iter().map(String::as_str).collect(),
        }
    }
}

/// Ordered reason catalog for one label
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReasonCatalog {
    options: Vec<ReasonOption>,
}

impl ReasonCatalog {
    pub fn new(options: Vec<ReasonOption>) -> Self {
        Self { options }
    }

    /// Converts a config table into catalog order
    pub fn from_table(table: &ReasonTable) -> Self {
        let mut options: Vec<ReasonOption> = table
            .simple
            .iter()
            .map(|name| ReasonOption::Simple { name: name.clone() })
            .collect();

        for group in table.groups.values() {
            let entry = ReasonOption::Group {
                name: group.name.clone(),
                kind: group.kind,
                options: group.options.clone(),
            };
            let placeholder = options
                .iter()
                .position(|o| matches!(o, ReasonOption::Simple { name } if *name == group.name));
            match placeholder {
                Some(i) => options[i] = entry,
                None => options.push(entry),
            }
        }

        Self { options }
    }

    pub fn options(&self) -> &[ReasonOption] {
        &self.options
    }

    /// Every reason string a clip may carry, in catalog order
    pub fn selectable(&self) -> Vec<&str> {
        self.options.iter().flat_map(ReasonOption::selectable).collect()
    }

    /// Checks that every reason is offered and single-choice groups hold at
    /// most one choice
    pub fn validate(&self, label: ClipLabel, reasons: &IndexSet<String>) -> CoreResult<()> {
        let offered: HashSet<&str> = self.selectable().into_iter().collect();
        if let Some(unknown) = reasons.iter().find(|r| !offered.contains(r.as_str())) {
            return Err(CoreError::UnknownReason {
                label: label.as_str().to_string(),
                reason: unknown.clone(),
            });
        }

        for option in &self.options {
            let ReasonOption::Group {
                name,
                kind: GroupKind::RadioButton,
                options,
            } = option
            else {
                continue;
            };
            let mut chosen = options.iter().filter(|o| reasons.contains(*o));
            if let (Some(first), Some(second)) = (chosen.next(), chosen.next()) {
                return Err(CoreError::ConflictingReasons {
                    group: name.clone(),
                    first: first.clone(),
                    second: second.clone(),
                });
            }
        }

        Ok(())
    }

    /// Reorders reasons into catalog order. Unknown reasons keep their
    /// relative order at the end.
    pub fn ordered(&self, reasons: &IndexSet<String>) -> IndexSet<String> {
        let mut ordered: IndexSet<String> = self
            .selectable()
            .into_iter()
            .filter(|r| reasons.contains(*r))
            .map(str::to_string)
            .collect();
        ordered.extend(reasons.iter().cloned());
        ordered
    }
}
