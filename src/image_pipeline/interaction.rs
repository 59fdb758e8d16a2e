//! Operator decisions: background ROI, channel pair, threshold and series.

mod operator;
mod scripted;

pub use operator::Operator;
pub use scripted::ScriptedOperator;
