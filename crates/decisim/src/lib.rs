//! Decision-confidence tools and command line front end
//!
//! Wraps `decisim_core` with business-facing tools:
//! - `validate` - probability that a recommendation meets its success criterion
//! - `robustness` - how often stressed assumptions move the answer
//! - `scenario` - multi-period profitability with growth, churn and cost risk
//! - `tornado` - ranking of variables by low/high impact

pub mod logging;
pub mod request;
pub mod tools;

pub use logging::init_logging;
pub use request::{InputLimits, ToolError, load_request, parse_request};
pub use tools::ToolRequest;
