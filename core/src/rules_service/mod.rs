//! Gateway to the external charge-calculation rules service.
//!
//! The service is a black box: a ruleset-specific JSON request goes in, a
//! JSON decision comes out. `RulesService` is the seam; `HttpRulesService`
//! is the real client and tests substitute their own.

mod http;
pub mod request;
pub mod response;

pub use http::HttpRulesService;
pub use request::build_request;
pub use response::{
    agreement_adjustment, decode, extract_factor, parse_percentage, to_pence, RulesOutcome,
};

use crate::config::RulesetEndpoint;
use crate::error::ChargingResult;
use crate::types::Ruleset;
use serde_json::Value;

pub trait RulesService {
    /// Send `request` to the ruleset for `financial_year` and return the
    /// raw response body.
    fn calculate(&self, ruleset: Ruleset, financial_year: i32, request: &Value) -> ChargingResult<Value>;
}

/// `{application}/{ruleset}_{year}_{yy}`, where `yy` is the last two
/// digits of the following year: 2021 gives `_2021_22`.
pub fn path(endpoint: &RulesetEndpoint, financial_year: i32) -> String {
    let suffix = (financial_year + 1).rem_euclid(100);
    format!(
        "{}/{}_{}_{:02}",
        endpoint.application, endpoint.ruleset, financial_year, suffix
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_names_the_financial_year() {
        let endpoint = RulesetEndpoint {
            application: "WRLSChargingResponse".into(),
            ruleset: "WRLS_Presroc_Ruleset".into(),
        };
        assert_eq!(
            path(&endpoint, 2021),
            "WRLSChargingResponse/WRLS_Presroc_Ruleset_2021_22"
        );
        assert_eq!(
            path(&endpoint, 2099),
            "WRLSChargingResponse/WRLS_Presroc_Ruleset_2099_00"
        );
    }
}
