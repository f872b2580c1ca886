//! # cge-core: steel model core
//!
//! Sets, parameters and policy types shared by every stage of the steel
//! partial-equilibrium pipeline, plus the dense linear-system backends used by
//! the complementarity solver.
//!
//! ## Core Data Structures
//!
//! - [`SteelData`] - technology coefficients, factor markets, plants and scalars
//! - [`Technology`], [`Factor`], [`PlantId`] - index sets
//! - [`FactorTable`], [`TechTable`] - fixed-size parameter tables indexed by set member
//! - [`Policy`], [`ScenarioConfig`] - immutable scenario descriptions
//! - [`CgeError`] - unified error type

pub mod data;
pub mod error;
pub mod scenario;
pub mod sets;
pub mod solver;

pub use data::{FactorParams, Plant, SteelData, TechnologyData, DEFAULT_EPSILON};
pub use error::{CgeError, CgeResult};
pub use scenario::{default_sweep, Policy, ScenarioConfig};
pub use sets::{Factor, FactorTable, PlantId, TechTable, Technology};
pub use solver::{FaerSolver, GaussSolver, LinearSolverKind, LinearSystemBackend};
