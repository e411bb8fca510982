//! No-action policy
//!
//! Baseline that never acts. With the default open-ended contracts the
//! network stays fixed for the whole trial; bounded contracts
//! (`mean_contract_duration: Some(_)`) still expire.

use super::{Action, BehaviorPolicy, LocalContext};
use crate::models::agent::Agent;
use crate::rng::DrawSource;
use crate::scenario::RegulatoryRules;

/// Policy that always answers [`Action::NoAction`]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActionPolicy;

impl BehaviorPolicy for NoActionPolicy {
    fn name(&self) -> &'static str {
        "no_action"
    }

    fn decide(
        &self,
        _agent: &Agent,
        _context: &LocalContext<'_>,
        _rules: &RegulatoryRules,
        _draw: &mut dyn DrawSource,
    ) -> Action {
        Action::NoAction
    }
}
