use crate::types::Ruleset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// A regulatory regime and the numbering it starts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeConfig {
    pub slug: String,
    pub name: String,
    /// Lower-case prefix of every file reference, e.g. `nal`.
    pub file_prefix: String,
    pub regions: Vec<String>,
    #[serde(default = "default_bill_run_number")]
    pub initial_bill_run_number: i64,
    #[serde(default = "default_file_number")]
    pub initial_file_number: i64,
    #[serde(default)]
    pub initial_transaction_number: i64,
}

fn default_bill_run_number() -> i64 {
    10000
}

fn default_file_number() -> i64 {
    50000
}

#[derive(Debug, Clone, Deserialize)]
struct RegimesFile {
    regimes: Vec<RegimeConfig>,
}

/// Where a ruleset lives on the rules service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesetEndpoint {
    pub application: String,
    pub ruleset: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesServiceConfig {
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    pub presroc: RulesetEndpoint,
    pub sroc: RulesetEndpoint,
}

fn default_timeout_ms() -> u64 {
    1500
}

impl RulesServiceConfig {
    pub fn endpoint(&self, ruleset: Ruleset) -> &RulesetEndpoint {
        match ruleset {
            Ruleset::Presroc => &self.presroc,
            Ruleset::Sroc => &self.sroc,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Scratch directory generated files are written to before upload.
    pub temp_dir: PathBuf,
    /// Root directory backing the local object store.
    pub storage_root: PathBuf,
    pub bucket: String,
    pub archive_bucket: String,
    #[serde(default)]
    pub copy_to_archive: bool,
}

#[derive(Debug, Clone)]
pub struct ChargingConfig {
    pub regimes: HashMap<String, RegimeConfig>,
    pub rules_service: RulesServiceConfig,
    pub export: ExportConfig,
}

impl ChargingConfig {
    /// Load from the data/ directory, then apply environment overrides.
    /// In tests, use ChargingConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let regimes_path = format!("{data_dir}/regimes.json");
        let regimes_content = std::fs::read_to_string(&regimes_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {regimes_path}: {e}"))?;
        let regimes_file: RegimesFile = serde_json::from_str(&regimes_content)?;
        let regimes = regimes_file
            .regimes
            .into_iter()
            .map(|r| (r.slug.clone(), r))
            .collect();

        let rules_path = format!("{data_dir}/rules_service.json");
        let rules_content = std::fs::read_to_string(&rules_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {rules_path}: {e}"))?;
        let mut rules_service: RulesServiceConfig = serde_json::from_str(&rules_content)?;

        let export_path = format!("{data_dir}/export.json");
        let export_content = std::fs::read_to_string(&export_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {export_path}: {e}"))?;
        let mut export: ExportConfig = serde_json::from_str(&export_content)?;

        if let Ok(url) = std::env::var("RULES_SERVICE_URL") {
            rules_service.url = url;
        }
        if let Ok(user) = std::env::var("RULES_SERVICE_USER") {
            rules_service.username = user;
        }
        if let Ok(password) = std::env::var("RULES_SERVICE_PASSWORD") {
            rules_service.password = password;
        }
        if let Ok(timeout) = std::env::var("RULES_SERVICE_TIMEOUT_MS") {
            rules_service.timeout_ms = timeout
                .parse()
                .map_err(|e| anyhow::anyhow!("RULES_SERVICE_TIMEOUT_MS: {e}"))?;
        }
        if let Ok(dir) = std::env::var("EXPORT_TEMP_DIR") {
            export.temp_dir = PathBuf::from(dir);
        }
        if let Ok(root) = std::env::var("EXPORT_STORAGE_ROOT") {
            export.storage_root = PathBuf::from(root);
        }
        if let Ok(flag) = std::env::var("EXPORT_COPY_TO_ARCHIVE") {
            export.copy_to_archive = matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(Self {
            regimes,
            rules_service,
            export,
        })
    }

    pub fn regime(&self, slug: &str) -> anyhow::Result<&RegimeConfig> {
        self.regimes
            .get(slug)
            .ok_or_else(|| anyhow::anyhow!("Regime '{slug}' is not configured"))
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let wrls = RegimeConfig {
            slug: "wrls".into(),
            name: "Water Resources".into(),
            file_prefix: "nal".into(),
            regions: ["A", "B", "E", "N", "S", "T", "W", "Y"]
                .iter()
                .map(|r| r.to_string())
                .collect(),
            initial_bill_run_number: default_bill_run_number(),
            initial_file_number: default_file_number(),
            initial_transaction_number: 0,
        };

        let mut regimes = HashMap::new();
        regimes.insert(wrls.slug.clone(), wrls);

        Self {
            regimes,
            rules_service: RulesServiceConfig {
                url: "http://localhost:8080/rest/DecisionService".into(),
                username: String::new(),
                password: String::new(),
                timeout_ms: default_timeout_ms(),
                presroc: RulesetEndpoint {
                    application: "WRLSChargingResponse".into(),
                    ruleset: "WRLS_Presroc_Ruleset".into(),
                },
                sroc: RulesetEndpoint {
                    application: "WRLSChargingResponse".into(),
                    ruleset: "WRLS_Sroc_Ruleset".into(),
                },
            },
            export: ExportConfig {
                temp_dir: std::env::temp_dir().join("charging-export"),
                storage_root: std::env::temp_dir().join("charging-storage"),
                bucket: "upload-bucket".into(),
                archive_bucket: "archive-bucket".into(),
                copy_to_archive: false,
            },
        }
    }
}
