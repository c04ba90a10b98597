//! Learns the monotone frontier (maximal lower sets / minimal upper sets) of an unknown
//! monotone Boolean predicate over `{0, ..., N-1}` by querying an oracle.
//!
//! The predicate itself, the SAT/MILP solvers used to hunt for unclassified points, and
//! on-disk persistence are all external collaborators; this crate only owns the learning
//! engine and the knowledge base it accumulates into.

mod macros;

mod sparse_set;
mod level_cache;
mod meta;
mod oracle;
mod extra_prec;
mod knowledge_base;
mod error;
mod constraint;
mod learn;
pub mod persist;

pub use sparse_set::SparseSet;
pub use level_cache::{LevelCache, Presence};
pub use meta::{Meta, Bin, TaggedValue};
pub use oracle::{Oracle, Predicate, FnPredicate};
pub use extra_prec::{ExtraPrec, Identity, LowerSetExtraPrec};
pub use knowledge_base::KnowledgeBase;
pub use error::Error;
pub use constraint::{ConstraintModel, VarId, Lit, SolveResult, SatBackend, SatModel};
pub use learn::{LearnContext, LearnOutcome, Interrupt};
pub use learn::level::LevelLearn;
pub use learn::gainanov::{GainanovSat, Sense};

#[cfg(feature = "sat-batsat")]
pub use constraint::sat_backend::BatSatBackend;

#[cfg(feature = "milp")]
pub use constraint::milp_backend::MilpModel;

pub type Result<T> = std::result::Result<T, Error>;
