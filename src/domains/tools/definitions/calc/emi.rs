//! Loan EMI calculator tool definition.
//!
//! Standard reducing-balance formula:
//! `emi = P·r·(1+r)^n / ((1+r)^n − 1)` with `r` the monthly rate, or `P/n`
//! for interest-free loans.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{round2, structured_result, tool_error_result};

const DEFAULT_SCHEDULE_MONTHS: u32 = 12;
const MAX_TENURE_MONTHS: u32 = 1200;
const MAX_ANNUAL_RATE: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TenureUnit {
    #[default]
    Months,
    Years,
}

/// Parameters for the EMI calculator.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EmiParams {
    /// Loan amount.
    pub principal: f64,

    /// Annual interest rate in percent (e.g. 8.5).
    pub annual_rate: f64,

    /// Loan duration, in `tenure_unit`.
    pub tenure: u32,

    /// "months" (default) or "years".
    #[serde(default)]
    pub tenure_unit: TenureUnit,

    /// Number of amortization rows to include (default: 12, capped at the tenure).
    #[serde(default)]
    pub schedule_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct AmortizationRow {
    pub month: u32,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct EmiBreakdown {
    pub principal: f64,
    pub annual_rate: f64,
    pub months: u32,
    pub emi: f64,
    pub total_payment: f64,
    pub total_interest: f64,
    pub schedule: Vec<AmortizationRow>,
}

/// Compute the monthly installment and the first `schedule_months` rows of
/// the amortization table. Money values are rounded to cents.
pub fn calculate_emi(
    principal: f64,
    annual_rate: f64,
    months: u32,
    schedule_months: u32,
) -> Result<EmiBreakdown, ToolError> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(ToolError::invalid_arguments("principal must be positive"));
    }
    if !annual_rate.is_finite() || !(0.0..=MAX_ANNUAL_RATE).contains(&annual_rate) {
        return Err(ToolError::invalid_arguments(format!(
            "annual_rate must be between 0 and {}",
            MAX_ANNUAL_RATE
        )));
    }
    if months == 0 || months > MAX_TENURE_MONTHS {
        return Err(ToolError::invalid_arguments(format!(
            "tenure must be between 1 and {} months",
            MAX_TENURE_MONTHS
        )));
    }

    let r = annual_rate / 12.0 / 100.0;
    let n = f64::from(months);
    let emi = if r == 0.0 {
        principal / n
    } else {
        let growth = (1.0 + r).powf(n);
        principal * r * growth / (growth - 1.0)
    };
    let total = emi * n;

    let mut balance = principal;
    let schedule = (1..=schedule_months.min(months))
        .map(|month| {
            let interest = balance * r;
            let principal_part = emi - interest;
            balance = (balance - principal_part).max(0.0);
            AmortizationRow {
                month,
                payment: round2(emi),
                principal: round2(principal_part),
                interest: round2(interest),
                balance: round2(balance),
            }
        })
        .collect();

    Ok(EmiBreakdown {
        principal: round2(principal),
        annual_rate,
        months,
        emi: round2(emi),
        total_payment: round2(total),
        total_interest: round2(total - principal),
        schedule,
    })
}

/// EMI calculator tool.
pub struct CalcEmiTool;

impl CalcEmiTool {
    pub const NAME: &'static str = "calc_emi";

    pub const DESCRIPTION: &'static str = "Calculate the monthly installment (EMI) of a loan from principal, annual \
         interest rate and tenure. Returns total payment, total interest and an \
         amortization schedule.";

    #[instrument(skip_all, fields(principal = params.principal, rate = params.annual_rate))]
    pub fn execute(params: &EmiParams) -> CallToolResult {
        info!(
            "EMI tool called: {} at {}% for {} {:?}",
            params.principal, params.annual_rate, params.tenure, params.tenure_unit
        );

        let months = match params.tenure_unit {
            TenureUnit::Months => Some(params.tenure),
            TenureUnit::Years => params.tenure.checked_mul(12),
        };
        let Some(months) = months else {
            return tool_error_result(&ToolError::invalid_arguments("tenure is too large"));
        };
        let schedule_months = params.schedule_months.unwrap_or(DEFAULT_SCHEDULE_MONTHS);

        match calculate_emi(params.principal, params.annual_rate, months, schedule_months) {
            Ok(breakdown) => {
                let summary = format!(
                    "EMI: {:.2} per month for {} months. Total payment {:.2}, total interest {:.2}",
                    breakdown.emi, breakdown.months, breakdown.total_payment, breakdown.total_interest
                );
                structured_result(summary, &breakdown)
            }
            Err(e) => tool_error_result(&e),
        }
    }

    #[cfg(feature = "http")]
    pub fn http_handler(arguments: serde_json::Value) -> Result<serde_json::Value, String> {
        use crate::domains::tools::definitions::common::{http_response, parse_http_args};

        let params: EmiParams = parse_http_args(arguments)?;
        Ok(http_response(Self::execute(&params)))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<EmiParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    pub fn create_route<S>() -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            async move {
                let params: EmiParams = serde_json::from_value(serde_json::Value::Object(args))
                    .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params))
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_value() {
        // 100k at 10% over 12 months.
        let b = calculate_emi(100_000.0, 10.0, 12, 12).unwrap();
        assert_eq!(b.emi, 8791.59);
        assert_eq!(b.total_payment, 105_499.06);
        assert_eq!(b.total_interest, 5_499.06);
        assert_eq!(b.schedule.len(), 12);
        assert_eq!(b.schedule[0].interest, 833.33);
        assert_eq!(b.schedule[0].principal, 7958.26);
        assert_eq!(b.schedule[11].balance, 0.0);
    }

    #[test]
    fn test_zero_rate() {
        let b = calculate_emi(1_200.0, 0.0, 12, 3).unwrap();
        assert_eq!(b.emi, 100.0);
        assert_eq!(b.total_interest, 0.0);
        assert_eq!(b.schedule.len(), 3);
        assert_eq!(b.schedule[2].balance, 900.0);
    }

    #[test]
    fn test_schedule_capped_at_tenure() {
        let b = calculate_emi(5_000.0, 12.0, 6, 24).unwrap();
        assert_eq!(b.schedule.len(), 6);
        assert!(b.schedule.iter().all(|row| row.balance >= 0.0));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(calculate_emi(0.0, 5.0, 12, 12).is_err());
        assert!(calculate_emi(1_000.0, -1.0, 12, 12).is_err());
        assert!(calculate_emi(1_000.0, 5.0, 0, 12).is_err());
        assert!(calculate_emi(f64::NAN, 5.0, 12, 12).is_err());
    }

    #[test]
    fn test_years_unit() {
        let params: EmiParams = serde_json::from_value(serde_json::json!({
            "principal": 100000,
            "annual_rate": 10,
            "tenure": 1,
            "tenure_unit": "years"
        }))
        .unwrap();
        let result = CalcEmiTool::execute(&params);
        assert_eq!(result.is_error, Some(false));
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["months"], 12);
        assert_eq!(structured["emi"], 8791.59);
    }
}
