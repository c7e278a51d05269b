//! # roster-session
//!
//! The Roster kernel proper: the unit-of-work [`Session`] (identity map,
//! dirty tracking, flush ordering), the query [`Executor`], the entity
//! mapper with audit lifecycle hooks, the projection materializer, the
//! pagination engine, the concurrency controller, and the repository
//! facades consumers call.

pub mod concurrency;
pub mod executor;
pub mod mapper;
pub mod pagination;
pub mod projection;
pub mod repositories;
pub mod session;

pub use concurrency::{bulk_update, find_with_lock};
pub use executor::Executor;
pub use pagination::{paginate, paginate_concurrent, slice};
pub use projection::{project, project_as};
pub use repositories::{MemberRepository, Repository, TeamRepository};
pub use session::Session;
