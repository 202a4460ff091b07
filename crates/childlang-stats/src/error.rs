use std::error::Error;
use std::fmt;

/// Failures raised by the statistical stages.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Schema columns absent from the input file.
    MissingColumns(Vec<String>),
    UnknownColumn(String),
    /// Derived columns are additive; an existing name is never overwritten.
    DuplicateColumn(String),
    NotNumeric(String),
    Parse {
        row: usize,
        column: String,
        value: String,
    },
    /// Fewer usable (complete) rows than the computation needs.
    InsufficientData {
        what: String,
        needed: usize,
        found: usize,
    },
    LengthMismatch(usize, usize),
    SingularDesign(String),
    /// Baseline predictors that do not appear in the extended model.
    NotNested {
        baseline: String,
        extended: String,
        offending: Vec<String>,
    },
    RowMismatch,
    Distribution(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnalysisError::MissingColumns(cols) => {
                write!(f, "Input is missing required columns: {}", cols.join(", "))
            }
            AnalysisError::UnknownColumn(name) => write!(f, "Unknown column '{}'", name),
            AnalysisError::DuplicateColumn(name) => {
                write!(f, "Column '{}' already exists and cannot be replaced", name)
            }
            AnalysisError::NotNumeric(name) => write!(f, "Column '{}' is not numeric", name),
            AnalysisError::Parse { row, column, value } => write!(
                f,
                "Could not parse '{}' as a number in column '{}' at row {}",
                value, column, row
            ),
            AnalysisError::InsufficientData { what, needed, found } => write!(
                f,
                "{} needs at least {} complete rows, found {}",
                what, needed, found
            ),
            AnalysisError::LengthMismatch(a, b) => {
                write!(f, "Samples must have equal length ({} vs {})", a, b)
            }
            AnalysisError::SingularDesign(model) => {
                write!(f, "Design matrix for model '{}' is singular", model)
            }
            AnalysisError::NotNested {
                baseline,
                extended,
                offending,
            } if offending.is_empty() => write!(
                f,
                "Model '{}' adds no predictors to '{}'; nested comparison needs a strict superset",
                extended, baseline
            ),
            AnalysisError::NotNested {
                baseline,
                extended,
                offending,
            } => write!(
                f,
                "Model '{}' is not nested in '{}': predictors {} are absent from the extended model",
                baseline,
                extended,
                offending.join(", ")
            ),
            AnalysisError::RowMismatch => {
                write!(f, "Nested models must be fit on the same rows")
            }
            AnalysisError::Distribution(msg) => write!(f, "Distribution error: {}", msg),
        }
    }
}

impl Error for AnalysisError {}

pub type Result<T> = std::result::Result<T, AnalysisError>;
