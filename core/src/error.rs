use thiserror::Error;

/// Everything that can go wrong while building or querying a food log.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FoodError {
    /// An ingredient with this name already exists.
    #[error("Ingredient '{0}' is already defined")]
    DuplicateName(String),

    /// A `combine` or `eat` record names an ingredient that was never defined.
    #[error("Unknown ingredient '{0}'")]
    UnknownIngredient(String),

    /// A divisor or window length that must be nonzero (or positive) wasn't.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Wrong arity, missing flag, bad number, or unknown command keyword.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// A percentage was requested against a zero total.
    #[error("Degenerate statistics: {0}")]
    DegenerateStats(String),

    /// A record failed during bulk integration. `index` is 0-based.
    #[error("{source_id}:{index}: {error} (in `{line}`)")]
    AtRecord {
        source_id: String,
        index: usize,
        line: String,
        error: Box<FoodError>,
    },
}

impl FoodError {
    /// The underlying condition, with any positional wrapper removed.
    #[must_use]
    pub fn root(&self) -> &FoodError {
        match self {
            FoodError::AtRecord { error, .. } => error.root(),
            other => other,
        }
    }
}

pub type FoodResult<T> = Result<T, FoodError>;
