//! Age calculator tool definition.

use chrono::{Datelike, Local, Months, NaiveDate};
use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{structured_result, tool_error_result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parameters for the age calculator.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AgeParams {
    /// Date of birth, `YYYY-MM-DD`.
    pub birth_date: String,

    /// Date to measure the age at, `YYYY-MM-DD` (default: today, local time).
    #[serde(default)]
    pub reference_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct AgeReport {
    pub birth_date: String,
    pub reference_date: String,
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub total_months: u32,
    pub total_weeks: i64,
    pub total_days: i64,
    pub next_birthday: String,
    pub next_birthday_weekday: String,
    pub days_until_next_birthday: i64,
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, ToolError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        ToolError::invalid_arguments(format!("{} must be YYYY-MM-DD ({}): {}", field, e, value))
    })
}

/// Birthday in `year`; Feb 29 falls back to Feb 28 in common years.
fn birthday_in(birth: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birth.month(), birth.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, birth.month(), birth.day() - 1))
}

/// Age of someone born on `birth` as of `reference`.
pub fn calculate_age(birth: NaiveDate, reference: NaiveDate) -> Result<AgeReport, ToolError> {
    if birth > reference {
        return Err(ToolError::invalid_arguments(
            "birth date is after the reference date",
        ));
    }

    // Whole months elapsed: the last monthly anniversary on or before the
    // reference. Anniversaries past a short month's end clamp to its last day.
    let mut elapsed = ((reference.year() - birth.year()) * 12 + reference.month() as i32
        - birth.month() as i32)
        .max(0) as u32;
    let anniversary = |months: u32| {
        birth
            .checked_add_months(Months::new(months))
            .ok_or_else(|| ToolError::execution_failed("date is out of range"))
    };
    let mut anchor = anniversary(elapsed)?;
    while anchor > reference && elapsed > 0 {
        elapsed -= 1;
        anchor = anniversary(elapsed)?;
    }

    let years = elapsed / 12;
    let months = elapsed % 12;
    let days = (reference - anchor).num_days() as u32;

    let total_days = (reference - birth).num_days();

    let next = birthday_in(birth, reference.year())
        .filter(|d| *d >= reference)
        .or_else(|| birthday_in(birth, reference.year() + 1))
        .ok_or_else(|| ToolError::execution_failed("next birthday is out of range"))?;

    debug!("Age {}y {}m {}d, next birthday {}", years, months, days, next);

    Ok(AgeReport {
        birth_date: birth.format(DATE_FORMAT).to_string(),
        reference_date: reference.format(DATE_FORMAT).to_string(),
        years,
        months,
        days,
        total_months: elapsed,
        total_weeks: total_days / 7,
        total_days,
        next_birthday: next.format(DATE_FORMAT).to_string(),
        next_birthday_weekday: next.format("%A").to_string(),
        days_until_next_birthday: (next - reference).num_days(),
    })
}

/// Age calculator tool.
pub struct CalcAgeTool;

impl CalcAgeTool {
    pub const NAME: &'static str = "calc_age";

    pub const DESCRIPTION: &'static str = "Calculate an exact age from a birth date: years, months and days, totals in \
         months, weeks and days, and the date and weekday of the next birthday.";

    #[instrument(skip_all, fields(birth_date = %params.birth_date))]
    pub fn execute(params: &AgeParams) -> CallToolResult {
        info!("Age tool called for birth date: {}", params.birth_date);

        match Self::run(params) {
            Ok(report) => {
                let summary = format!(
                    "Age on {}: {} years, {} months, {} days ({} days total). \
                     Next birthday {} ({}) in {} days",
                    report.reference_date,
                    report.years,
                    report.months,
                    report.days,
                    report.total_days,
                    report.next_birthday,
                    report.next_birthday_weekday,
                    report.days_until_next_birthday
                );
                structured_result(summary, &report)
            }
            Err(e) => tool_error_result(&e),
        }
    }

    fn run(params: &AgeParams) -> Result<AgeReport, ToolError> {
        let birth = parse_date(&params.birth_date, "birth_date")?;
        let reference = match &params.reference_date {
            Some(date) => parse_date(date, "reference_date")?,
            None => Local::now().date_naive(),
        };
        calculate_age(birth, reference)
    }

    #[cfg(feature = "http")]
    pub fn http_handler(arguments: serde_json::Value) -> Result<serde_json::Value, String> {
        use crate::domains::tools::definitions::common::{http_response, parse_http_args};

        let params: AgeParams = parse_http_args(arguments)?;
        Ok(http_response(Self::execute(&params)))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<AgeParams>(),
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
                let params: AgeParams = serde_json::from_value(serde_json::Value::Object(args))
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

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_breakdown_with_borrow() {
        let report = calculate_age(date("1990-05-15"), date("2024-03-10")).unwrap();
        assert_eq!((report.years, report.months, report.days), (33, 9, 24));
        assert_eq!(report.total_months, 33 * 12 + 9);
        assert_eq!(report.next_birthday, "2024-05-15");
        assert_eq!(report.next_birthday_weekday, "Wednesday");
        assert_eq!(report.days_until_next_birthday, 66);
    }

    #[test]
    fn test_totals() {
        let report = calculate_age(date("2000-01-01"), date("2000-12-31")).unwrap();
        assert_eq!(report.total_days, 365);
        assert_eq!(report.total_weeks, 52);
        assert_eq!((report.years, report.months, report.days), (0, 11, 30));
    }

    #[test]
    fn test_birthday_today() {
        let report = calculate_age(date("1985-07-04"), date("2025-07-04")).unwrap();
        assert_eq!((report.years, report.months, report.days), (40, 0, 0));
        assert_eq!(report.days_until_next_birthday, 0);
    }

    #[test]
    fn test_leap_day_birthday() {
        let report = calculate_age(date("2000-02-29"), date("2023-02-01")).unwrap();
        assert_eq!(report.next_birthday, "2023-02-28");
        assert_eq!(report.days_until_next_birthday, 27);
    }

    #[test]
    fn test_month_end_birthday_across_short_february() {
        let report = calculate_age(date("2000-01-31"), date("2023-03-01")).unwrap();
        assert_eq!((report.years, report.months, report.days), (23, 1, 1));
        assert_eq!(report.total_months, 23 * 12 + 1);
    }

    #[test]
    fn test_month_end_birthday_clamps_to_short_month() {
        let report = calculate_age(date("1999-03-31"), date("2024-04-30")).unwrap();
        assert_eq!((report.years, report.months, report.days), (25, 1, 0));
        let report = calculate_age(date("1999-03-31"), date("2024-04-29")).unwrap();
        assert_eq!((report.years, report.months, report.days), (25, 0, 29));
    }

    #[test]
    fn test_leap_day_birthday_in_common_year() {
        let report = calculate_age(date("2000-02-29"), date("2001-02-28")).unwrap();
        assert_eq!((report.years, report.months, report.days), (1, 0, 0));
        assert_eq!(report.next_birthday, "2001-02-28");
        assert_eq!(report.days_until_next_birthday, 0);

        let report = calculate_age(date("2000-02-29"), date("2004-02-29")).unwrap();
        assert_eq!((report.years, report.months, report.days), (4, 0, 0));
    }

    #[test]
    fn test_born_today() {
        let report = calculate_age(date("2024-06-15"), date("2024-06-15")).unwrap();
        assert_eq!((report.years, report.months, report.days), (0, 0, 0));
        assert_eq!(report.total_days, 0);
    }

    #[test]
    fn test_birth_after_reference() {
        assert!(calculate_age(date("2030-01-01"), date("2024-01-01")).is_err());
    }

    #[test]
    fn test_execute_bad_date() {
        let result = CalcAgeTool::execute(&AgeParams {
            birth_date: "15/05/1990".into(),
            reference_date: None,
        });
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_execute_defaults_to_today() {
        let result = CalcAgeTool::execute(&AgeParams {
            birth_date: "1970-01-01".into(),
            reference_date: None,
        });
        assert_eq!(result.is_error, Some(false));
        let structured = result.structured_content.unwrap();
        assert!(structured["years"].as_u64().unwrap() >= 50);
    }
}
