//! Model handles for linear and mixed integer programs.
//!
//! A [Model] owns one instance of solver engine state. The problem is built incrementally through
//! the mutation API (objective, constraints, bounds, variable kinds and solver options) and is then
//! solved either synchronously with [Model::solve], or on a background worker with
//! [Model::solve_async], in which case the result is delivered on the thread that owns the
//! [Context].
//!
//! Row and column indexes are 1-based throughout.
//!
//! # Example
//!
//! ```rust
//! use lpmodel::*;
//!
//! // A data-only engine: the model can be built, queried and written, but not solved.
//! let factory = dummy::factory();
//! let model = Model::create(&factory, 0, 2).unwrap();
//! model.set_obj_fn(&[2.0, 3.0]).unwrap();
//! model.set_maxim(true).unwrap();
//! model.add_constraint(&[1.0, 1.0], ConstraintType::LE, 4.0).unwrap();
//!
//! assert_eq!(model.rows().unwrap(), 1);
//! assert_eq!(model.to_lp_string().unwrap(),
//!            "/* Objective function */\nmax: +2 C1 +3 C2;\n\n/* Constraints */\n+C1 +C2 <= 4;\n");
//! model.dispose().unwrap();
//! ```

pub mod error;
pub mod value;
pub mod marshal;
pub mod engine;
pub mod model;
pub mod executor;
pub mod lpformat;
pub mod dummy;
mod binding;

pub use error::{ModelError, Result};
pub use value::Value;
pub use engine::{Engine, Factory, Solution};
pub use model::{Model, ModelData, VariableKind};
pub use executor::Context;

/// Comparison operator of a constraint row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ConstraintType {
    LE = 1,
    GE = 2,
    EQ = 3,
}

impl ConstraintType {
    pub fn code(self) -> i32 { self as i32 }

    pub fn from_code(code : i32) -> Option<ConstraintType> {
        match code {
            1 => Some(ConstraintType::LE),
            2 => Some(ConstraintType::GE),
            3 => Some(ConstraintType::EQ),
            _ => None
        }
    }

    /// Operator as written in LP format.
    pub fn operator(self) -> &'static str {
        match self {
            ConstraintType::LE => "<=",
            ConstraintType::GE => ">=",
            ConstraintType::EQ => "=",
        }
    }
}

/// Amount of output produced by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(i32)]
pub enum Verbosity {
    Neutral   = 0,
    Critical  = 1,
    Severe    = 2,
    Important = 3,
    #[default]
    Normal    = 4,
    Detailed  = 5,
    Full      = 6,
}

impl Verbosity {
    pub fn code(self) -> i32 { self as i32 }

    pub fn from_code(code : i32) -> Option<Verbosity> {
        match code {
            0 => Some(Verbosity::Neutral),
            1 => Some(Verbosity::Critical),
            2 => Some(Verbosity::Severe),
            3 => Some(Verbosity::Important),
            4 => Some(Verbosity::Normal),
            5 => Some(Verbosity::Detailed),
            6 => Some(Verbosity::Full),
            _ => None
        }
    }
}

/// Result of a solve. The integer codes are part of the host interface and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SolveStatus {
    NoMemory    = -2,
    Optimal     = 0,
    SubOptimal  = 1,
    Infeasible  = 2,
    Unbounded   = 3,
    Degenerate  = 4,
    NumFailure  = 5,
    UserAbort   = 6,
    Timeout     = 7,
    Presolved   = 9,
    ProcFail    = 10,
    ProcBreak   = 11,
    FeasFound   = 12,
    NoFeasFound = 13,
}

impl SolveStatus {
    pub fn code(self) -> i32 { self as i32 }

    pub fn from_code(code : i32) -> Option<SolveStatus> {
        use SolveStatus::*;
        [NoMemory, Optimal, SubOptimal, Infeasible, Unbounded, Degenerate, NumFailure,
         UserAbort, Timeout, Presolved, ProcFail, ProcBreak, FeasFound, NoFeasFound]
            .into_iter()
            .find(|s| s.code() == code)
    }

    /// Indicates if the status comes with a usable primal solution.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::SubOptimal | SolveStatus::Presolved | SolveStatus::FeasFound)
    }
}

/// Solver options carried by each model and passed to the engine on every solve.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Options {
    pub verbosity      : Verbosity,
    /// Wall-clock limit in seconds, 0 means no limit.
    pub timeout        : u64,
    /// Stop at the first feasible integer solution.
    pub break_at_first : bool,
    /// Constraint appends are batched; does not change results.
    pub add_row_mode   : bool,
}

/// Version of the library as `(major, minor, release, build)`.
pub fn version() -> (u32,u32,u32,u32) {
    (env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
     env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
     env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
     0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(SolveStatus::NoMemory.code(), -2);
        assert_eq!(SolveStatus::Optimal.code(), 0);
        assert_eq!(SolveStatus::SubOptimal.code(), 1);
        assert_eq!(SolveStatus::Infeasible.code(), 2);
        assert_eq!(SolveStatus::Unbounded.code(), 3);
        assert_eq!(SolveStatus::Degenerate.code(), 4);
        assert_eq!(SolveStatus::NumFailure.code(), 5);
        assert_eq!(SolveStatus::UserAbort.code(), 6);
        assert_eq!(SolveStatus::Timeout.code(), 7);
        assert_eq!(SolveStatus::Presolved.code(), 9);
        assert_eq!(SolveStatus::ProcFail.code(), 10);
        assert_eq!(SolveStatus::ProcBreak.code(), 11);
        assert_eq!(SolveStatus::FeasFound.code(), 12);
        assert_eq!(SolveStatus::NoFeasFound.code(), 13);
        assert_eq!(SolveStatus::from_code(8), None);
        assert_eq!(SolveStatus::from_code(7), Some(SolveStatus::Timeout));
    }

    #[test]
    fn enum_codes() {
        assert_eq!(ConstraintType::from_code(1), Some(ConstraintType::LE));
        assert_eq!(ConstraintType::from_code(3), Some(ConstraintType::EQ));
        assert_eq!(ConstraintType::from_code(0), None);
        assert_eq!(Verbosity::from_code(6), Some(Verbosity::Full));
        assert_eq!(Verbosity::from_code(7), None);
        assert_eq!(Verbosity::default(), Verbosity::Normal);
    }

    #[test]
    fn default_options() {
        let o = Options::default();
        assert_eq!(o.verbosity, Verbosity::Normal);
        assert_eq!(o.timeout, 0);
        assert!(!o.break_at_first);
        assert!(!o.add_row_mode);
    }

    #[test]
    fn version_matches_package() {
        let (major,minor,release,_) = version();
        assert_eq!(format!("{}.{}.{}",major,minor,release), env!("CARGO_PKG_VERSION"));
    }
}
