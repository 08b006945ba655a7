//! Domain models for modelshare.
//!
//! # Core Concepts
//!
//! ## Persisted Entities
//!
//! - [`Model`]: A versioned document. Models form a derivation tree via
//!   `derivation_of`, and a coarser forest of visibility roots via `original`.
//! - [`Link`]: A shareable handle to a model, either public or private.
//!   Every share creates exactly one public link and, when the code contains
//!   secret regions, one private link.
//!
//! ## Transient Entities
//!
//! These live only inside an execution session on the client:
//!
//! - [`Instance`]: One solver outcome for the selected command. Either a
//!   satisfying instance, an unsatisfiable marker, or a model error report.
//! - [`SolveRequest`] / [`SolveResponse`]: The solver wire contract.

mod instance;
mod link;
mod model;

pub use instance::*;
pub use link::*;
pub use model::*;
