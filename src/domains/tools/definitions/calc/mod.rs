//! Calculator tools module.

pub mod age;
pub mod bmi;
pub mod emi;

pub use age::{AgeParams, CalcAgeTool};
pub use bmi::{BmiParams, CalcBmiTool};
pub use emi::{CalcEmiTool, EmiParams};
