pub mod types;
pub mod normalize;
pub mod classify;
pub mod fields;
pub mod confidence;
pub mod orchestrator;
pub mod fallback;

pub use types::*;
pub use normalize::*;
pub use orchestrator::*;
pub use fallback::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProductError {
    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },
}

/// Compile every regex lexicon now instead of on first document.
/// Returns the number of patterns compiled.
pub fn warm_up() -> usize {
    normalize::warm_up() + classify::warm_up() + fields::warm_up() + confidence::warm_up()
}
