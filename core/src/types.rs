//! Shared primitive types used across the entire billing core.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, unique identifier for any persisted entity.
pub type EntityId = String;

/// Charging-rule version. Each ruleset owns its validation rules, rules
/// service envelope, storage mapping and file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ruleset {
    Presroc,
    Sroc,
}

impl Ruleset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ruleset::Presroc => "presroc",
            Ruleset::Sroc => "sroc",
        }
    }

    /// Resolve the `ruleset` discriminator of a client payload.
    /// Absent means presroc; anything unrecognised is rejected.
    pub fn from_payload(raw: Option<&str>) -> Result<Self, ValidationError> {
        match raw {
            None => Ok(Ruleset::Presroc),
            Some(value) => Self::parse(value).ok_or_else(|| {
                ValidationError::single("ruleset", "must be one of [presroc, sroc]")
            }),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "presroc" => Some(Ruleset::Presroc),
            "sroc" => Some(Ruleset::Sroc),
            _ => None,
        }
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillRunStatus {
    Initialised,
    Generated,
    Approved,
    Pending,
    Billed,
    BillingNotRequired,
}

impl BillRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillRunStatus::Initialised => "initialised",
            BillRunStatus::Generated => "generated",
            BillRunStatus::Approved => "approved",
            BillRunStatus::Pending => "pending",
            BillRunStatus::Billed => "billed",
            BillRunStatus::BillingNotRequired => "billing_not_required",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "initialised" => Some(BillRunStatus::Initialised),
            "generated" => Some(BillRunStatus::Generated),
            "approved" => Some(BillRunStatus::Approved),
            "pending" => Some(BillRunStatus::Pending),
            "billed" => Some(BillRunStatus::Billed),
            "billing_not_required" => Some(BillRunStatus::BillingNotRequired),
            _ => None,
        }
    }

    /// Bill runs still open for new transactions.
    pub fn is_editable(&self) -> bool {
        matches!(self, BillRunStatus::Initialised | BillRunStatus::Generated)
    }
}

impl fmt::Display for BillRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two flat-file exports sent to the settlement system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Transaction,
    Customer,
}

impl FileKind {
    /// Character embedded in the file reference.
    pub fn type_char(&self) -> char {
        match self {
            FileKind::Transaction => 'i',
            FileKind::Customer => 'c',
        }
    }

    /// Folder segment of the upload key.
    pub fn folder(&self) -> &'static str {
        match self {
            FileKind::Transaction => "transaction",
            FileKind::Customer => "customer",
        }
    }
}
