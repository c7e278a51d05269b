//! Team repository facade.

use roster_core::KernelResult;
use roster_core::traits::StoreSession;
use roster_core::types::{FilterField, SelectStatement};
use roster_entity::{Record, Team};

use crate::session::Session;

use super::Repository;

/// Repository for team CRUD and queries.
pub struct TeamRepository;

impl Repository<Team> for TeamRepository {}

impl TeamRepository {
    /// Find a single team by name.
    pub async fn find_by_name<S: StoreSession>(
        session: &mut Session<S>,
        name: &str,
    ) -> KernelResult<Option<Team>> {
        let select = SelectStatement::all(Team::table())
            .filter(FilterField::eq("name", name).into())
            .limit(1);
        Ok(session.query(select).await?.into_iter().next())
    }
}
