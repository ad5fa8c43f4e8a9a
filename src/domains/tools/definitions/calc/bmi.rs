//! BMI calculator tool definition.

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

const KG_PER_LB: f64 = 0.453_592_37;
const M_PER_INCH: f64 = 0.0254;
const HEALTHY_MIN_BMI: f64 = 18.5;
const HEALTHY_MAX_BMI: f64 = 24.9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Kilograms and centimeters.
    #[default]
    Metric,
    /// Pounds and inches.
    Imperial,
}

impl UnitSystem {
    fn weight_unit(self) -> &'static str {
        match self {
            Self::Metric => "kg",
            Self::Imperial => "lb",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }
}

/// Parameters for the BMI calculator.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BmiParams {
    /// Body weight (kg for metric, lb for imperial).
    pub weight: f64,

    /// Height (cm for metric, inches for imperial).
    pub height: f64,

    /// "metric" (default) or "imperial".
    #[serde(default)]
    pub units: UnitSystem,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct BmiReport {
    pub bmi: f64,
    pub category: BmiCategory,
    pub healthy_weight_min: f64,
    pub healthy_weight_max: f64,
    pub weight_unit: String,
}

/// BMI plus the healthy weight range for the given height, in the input units.
pub fn calculate_bmi(weight: f64, height: f64, units: UnitSystem) -> Result<BmiReport, ToolError> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(ToolError::invalid_arguments("weight must be positive"));
    }
    if !height.is_finite() || height <= 0.0 {
        return Err(ToolError::invalid_arguments("height must be positive"));
    }

    let (kg, meters, kg_to_unit) = match units {
        UnitSystem::Metric => (weight, height / 100.0, 1.0),
        UnitSystem::Imperial => (weight * KG_PER_LB, height * M_PER_INCH, 1.0 / KG_PER_LB),
    };
    let area = meters * meters;
    let bmi = kg / area;

    Ok(BmiReport {
        bmi: round2(bmi),
        category: BmiCategory::from_bmi(bmi),
        healthy_weight_min: round2(HEALTHY_MIN_BMI * area * kg_to_unit),
        healthy_weight_max: round2(HEALTHY_MAX_BMI * area * kg_to_unit),
        weight_unit: units.weight_unit().to_string(),
    })
}

/// BMI calculator tool.
pub struct CalcBmiTool;

impl CalcBmiTool {
    pub const NAME: &'static str = "calc_bmi";

    pub const DESCRIPTION: &'static str = "Calculate body mass index from weight and height (metric or imperial), with \
         the weight category and the healthy weight range for that height.";

    #[instrument(skip_all)]
    pub fn execute(params: &BmiParams) -> CallToolResult {
        info!("BMI tool called ({:?})", params.units);

        match calculate_bmi(params.weight, params.height, params.units) {
            Ok(report) => {
                let summary = format!(
                    "BMI {:.1} ({:?}). Healthy weight for this height: {:.1}-{:.1} {}",
                    report.bmi,
                    report.category,
                    report.healthy_weight_min,
                    report.healthy_weight_max,
                    report.weight_unit
                );
                structured_result(summary, &report)
            }
            Err(e) => tool_error_result(&e),
        }
    }

    #[cfg(feature = "http")]
    pub fn http_handler(arguments: serde_json::Value) -> Result<serde_json::Value, String> {
        use crate::domains::tools::definitions::common::{http_response, parse_http_args};

        let params: BmiParams = parse_http_args(arguments)?;
        Ok(http_response(Self::execute(&params)))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<BmiParams>(),
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
                let params: BmiParams = serde_json::from_value(serde_json::Value::Object(args))
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
    fn test_metric() {
        let report = calculate_bmi(70.0, 175.0, UnitSystem::Metric).unwrap();
        assert_eq!(report.bmi, 22.86);
        assert_eq!(report.category, BmiCategory::Normal);
        assert_eq!(report.healthy_weight_min, 56.66);
        assert_eq!(report.healthy_weight_max, 76.26);
        assert_eq!(report.weight_unit, "kg");
    }

    #[test]
    fn test_imperial_matches_metric() {
        let report = calculate_bmi(154.0, 69.0, UnitSystem::Imperial).unwrap();
        assert_eq!(report.bmi, 22.74);
        assert_eq!(report.weight_unit, "lb");
        assert!(report.healthy_weight_min < 154.0 && report.healthy_weight_max > 154.0);
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(BmiCategory::from_bmi(18.49), BmiCategory::Underweight);
        assert_eq!(BmiCategory::from_bmi(18.5), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(25.0), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(30.0), BmiCategory::Obese);
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(calculate_bmi(0.0, 170.0, UnitSystem::Metric).is_err());
        assert!(calculate_bmi(70.0, -1.0, UnitSystem::Metric).is_err());
        let result = CalcBmiTool::execute(&BmiParams {
            weight: 70.0,
            height: 0.0,
            units: UnitSystem::Metric,
        });
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_units_deserialize() {
        let params: BmiParams =
            serde_json::from_str(r#"{"weight": 150, "height": 65, "units": "imperial"}"#).unwrap();
        assert_eq!(params.units, UnitSystem::Imperial);
    }
}
