//! Session planning
//!
//! Brackets the fusion pipeline for one session: issue the identity,
//! normalize difficulty, resolve the persona selection and compose the
//! instruction payload. The plan records resolved labels inline so a replay
//! never depends on catalog entries that may since have been removed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{CatalogLookup, PersonaSelection, ResolvedPersona};
use crate::difficulty::{self, DifficultyTier};
use crate::error::Result;
use crate::fusion::{render_client_instructions, Composer, FocusArea, FusionPromptBlock, FusionRequest};
use crate::identity::{IdentityManager, SimulationIdentity};

/// What a caller asks for when starting a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(flatten)]
    pub selection: PersonaSelection,
    pub age: u32,
    pub industry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub focus_areas: Vec<FocusArea>,
    /// Untyped difficulty as received from upstream.
    #[serde(default)]
    pub difficulty: serde_json::Value,
}

/// Everything needed to run, and later replay, one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPlan {
    pub identity: SimulationIdentity,
    pub difficulty: DifficultyTier,
    pub persona: ResolvedPersona,
    pub age: u32,
    pub industry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub focus_areas: Vec<FocusArea>,
    pub block: FusionPromptBlock,
    pub fingerprint: String,
    pub instructions: String,
    pub planned_at: DateTime<Utc>,
}

impl SessionPlan {
    pub fn selection(&self) -> PersonaSelection {
        self.persona.selection()
    }
}

/// Builds session plans from injected collaborators.
pub struct SessionPlanner {
    catalog: Arc<dyn CatalogLookup>,
    composer: Composer,
    identity: IdentityManager,
}

impl SessionPlanner {
    pub fn new(catalog: Arc<dyn CatalogLookup>, composer: Composer, identity: IdentityManager) -> Self {
        Self {
            catalog,
            composer,
            identity,
        }
    }

    pub fn identity_manager(&self) -> &IdentityManager {
        &self.identity
    }

    /// Plan a fresh session.
    pub fn start(&self, request: &SessionRequest) -> Result<SessionPlan> {
        let persona = self.catalog.resolve(&request.selection)?;
        let tier = difficulty::normalize_value(&request.difficulty);
        let identity = self.identity.issue_fresh();

        let plan = assemble(
            &self.composer,
            identity,
            tier,
            persona,
            request.age,
            &request.industry,
            request.subcategory.clone(),
            request.focus_areas.clone(),
        );
        info!(
            id = %plan.identity.id,
            difficulty = %plan.difficulty,
            fingerprint = %plan.fingerprint,
            "Session planned"
        );
        Ok(plan)
    }

    /// Plan a replay of a recorded session.
    ///
    /// The persona and cultural context are taken from the recorded plan
    /// rather than the catalog and this planner's composer, so the composed
    /// block is identical to the original one.
    pub fn replay(&self, plan: &SessionPlan, retry_count: u32) -> Result<SessionPlan> {
        let identity = self.identity.issue_replay(plan.identity.original(), retry_count)?;
        let recorded = Composer::new(plan.block.cultural_context.clone());

        let replay = assemble(
            &recorded,
            identity,
            plan.difficulty,
            plan.persona.clone(),
            plan.age,
            &plan.industry,
            plan.subcategory.clone(),
            plan.focus_areas.clone(),
        );
        info!(
            id = %replay.identity.id,
            original = %plan.identity.original(),
            retry_count,
            "Replay planned"
        );
        Ok(replay)
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    composer: &Composer,
    identity: SimulationIdentity,
    tier: DifficultyTier,
    persona: ResolvedPersona,
    age: u32,
    industry: &str,
    subcategory: Option<String>,
    focus_areas: Vec<FocusArea>,
) -> SessionPlan {
    let block = composer.compose(
        &FusionRequest::new(age, &persona, industry)
            .with_subcategory(subcategory.as_deref())
            .with_focus_areas(&focus_areas),
    );

    SessionPlan {
        identity,
        difficulty: tier,
        fingerprint: block.fingerprint(),
        instructions: render_client_instructions(&block, tier),
        planned_at: Utc::now(),
        persona,
        age,
        industry: industry.to_string(),
        subcategory,
        focus_areas,
        block,
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogRegistry, TraitCatalog};
    use crate::error::Error;
    use crate::identity;
    use serde_json::json;

    fn planner() -> SessionPlanner {
        let catalog = CatalogRegistry::new().bundled().unwrap();
        SessionPlanner::new(Arc::new(catalog), Composer::default(), IdentityManager::default())
    }

    fn request(mood: &str, difficulty: serde_json::Value) -> SessionRequest {
        SessionRequest {
            selection: PersonaSelection {
                mood: mood.into(),
                communication_style: "direct".into(),
                archetype: "skeptic".into(),
                age_group: "midlife".into(),
            },
            age: 42,
            industry: "insurance".into(),
            subcategory: None,
            focus_areas: vec![FocusArea::named("premiums")],
            difficulty,
        }
    }

    #[test]
    fn test_start_plans_fresh_session() {
        let plan = planner().start(&request("calm", json!("Moderate"))).unwrap();
        assert!(!plan.identity.is_replay);
        assert!(plan.identity.id.starts_with("SIM-"));
        assert_eq!(plan.difficulty, DifficultyTier::Intermediate);
        assert_eq!(plan.persona.mood.description, "Speaks evenly");
        assert_eq!(plan.block.tone_guidance, "Speaks evenly");
        assert!(plan.instructions.contains("COMMUNICATION GUIDELINES"));
    }

    #[test]
    fn test_start_rejects_unknown_key() {
        let err = planner().start(&request("furious", json!(null))).unwrap_err();
        assert!(matches!(err, Error::UnknownCatalogKey { .. }));
    }

    #[test]
    fn test_replay_is_equivalent() {
        let planner = planner();
        let plan = planner.start(&request("calm", json!({"weird": true}))).unwrap();
        let replay = planner.replay(&plan, 1).unwrap();

        assert!(replay.identity.is_replay);
        assert_eq!(identity::original_of(&replay.identity.id), plan.identity.id);
        assert_eq!(replay.block, plan.block);
        assert_eq!(replay.fingerprint, plan.fingerprint);
        assert_eq!(replay.difficulty, DifficultyTier::Beginner);
        assert!(replay.planned_at >= plan.planned_at);
    }

    #[test]
    fn test_replay_of_replay_uses_original() {
        let planner = planner();
        let plan = planner.start(&request("calm", json!("easy"))).unwrap();
        let first = planner.replay(&plan, 1).unwrap();
        let second = planner.replay(&first, 2).unwrap();
        assert_eq!(second.identity.id, format!("{}-02", plan.identity.id));
    }

    #[test]
    fn test_replay_survives_catalog_removal() {
        let plan = planner().start(&request("calm", json!("hard"))).unwrap();
        let empty = SessionPlanner::new(
            Arc::new(TraitCatalog::default()),
            Composer::default(),
            IdentityManager::default(),
        );
        let replay = empty.replay(&plan, 3).unwrap();
        assert_eq!(replay.block, plan.block);
    }

    #[test]
    fn test_replay_keeps_recorded_cultural_context() {
        let plan = planner().start(&request("calm", json!("easy"))).unwrap();
        let relocated = SessionPlanner::new(
            Arc::new(CatalogRegistry::new().bundled().unwrap()),
            Composer::new("Canadian general adult population"),
            IdentityManager::default(),
        );

        let replay = relocated.replay(&plan, 1).unwrap();
        assert_eq!(replay.block.cultural_context, plan.block.cultural_context);
        assert_eq!(replay.block, plan.block);
        assert_eq!(replay.fingerprint, plan.fingerprint);
        assert_eq!(replay.instructions, plan.instructions);

        // Fresh sessions still pick up the planner's context
        let fresh = relocated.start(&request("calm", json!("easy"))).unwrap();
        assert_eq!(fresh.block.cultural_context, "Canadian general adult population");
    }

    #[test]
    fn test_replay_retry_bounds() {
        let planner = planner();
        let plan = planner.start(&request("calm", json!(null))).unwrap();
        assert!(matches!(
            planner.replay(&plan, 100).unwrap_err(),
            Error::RetryCountOutOfRange { .. }
        ));
    }

    #[test]
    fn test_plan_round_trips_through_json() {
        let planner = planner();
        let plan = planner.start(&request("calm", json!("advanced"))).unwrap();
        let stored = serde_json::to_string(&plan).unwrap();
        let restored: SessionPlan = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored, plan);
        assert_eq!(restored.selection().mood, "calm");
    }

    #[test]
    fn test_request_deserializes_flat() {
        let request: SessionRequest = serde_json::from_value(json!({
            "mood": "calm",
            "communicationStyle": "direct",
            "archetype": "skeptic",
            "ageGroup": "midlife",
            "age": 42,
            "industry": "insurance",
            "difficulty": ["hard"]
        }))
        .unwrap();
        let plan = planner().start(&request).unwrap();
        assert_eq!(plan.difficulty, DifficultyTier::Beginner);
    }
}
