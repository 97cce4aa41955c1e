/// Multi-agent orchestration: seven themed analytic personas run over a
/// shared base snapshot, each producing a narrative conclusion, fanned out
/// and aggregated into a consensus.
///
/// Each persona is stateless configuration rather than an object with its
/// own instance state; all seven share one analyzer and one snapshot.
use crate::entity::EntityAnalysis;
use crate::evidence::EvidenceAnalysis;
use crate::flow::FlowAttribution;
use crate::graph::NetworkMetrics;
use crate::influence::InfluenceAnalysis;
use crate::parser::{DataQuality, ParsedTransaction};
use crate::risk::RiskAssessment;
use crate::rpc::{AccountIdentity, ProviderPoolStats};
use crate::taint::TaintOutcome;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaId {
    Poirot,
    Marple,
    Spade,
    Marlowe,
    Dupin,
    Shadow,
    Raven,
}

impl PersonaId {
    pub const ALL: [PersonaId; 7] = [
        PersonaId::Poirot,
        PersonaId::Marple,
        PersonaId::Spade,
        PersonaId::Marlowe,
        PersonaId::Dupin,
        PersonaId::Shadow,
        PersonaId::Raven,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            PersonaId::Poirot => "poirot",
            PersonaId::Marple => "marple",
            PersonaId::Spade => "spade",
            PersonaId::Marlowe => "marlowe",
            PersonaId::Dupin => "dupin",
            PersonaId::Shadow => "shadow",
            PersonaId::Raven => "raven",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PersonaId::Poirot => "Hercule Poirot",
            PersonaId::Marple => "Miss Marple",
            PersonaId::Spade => "Sam Spade",
            PersonaId::Marlowe => "Philip Marlowe",
            PersonaId::Dupin => "C. Auguste Dupin",
            PersonaId::Shadow => "The Shadow",
            PersonaId::Raven => "The Raven",
        }
    }

    pub fn specialty(&self) -> &'static str {
        match self {
            PersonaId::Poirot => "methodical transaction pattern analysis",
            PersonaId::Marple => "anomaly and pattern observation",
            PersonaId::Spade => "risk assessment and threat classification",
            PersonaId::Marlowe => "bridge and mixer tracking, network paths",
            PersonaId::Dupin => "analytical reasoning and statistics",
            PersonaId::Shadow => "cluster detection, stealth networks",
            PersonaId::Raven => "synthesis and final narrative",
        }
    }

    pub fn analysis_focus(&self) -> &'static str {
        match self {
            PersonaId::Poirot => "temporal regularity and fee consistency",
            PersonaId::Marple => "outliers and unusual counterparties",
            PersonaId::Spade => "component-weighted risk drivers",
            PersonaId::Marlowe => "integration events and flow attribution",
            PersonaId::Dupin => "statistical distributions over transaction history",
            PersonaId::Shadow => "entity clustering and side-wallet detection",
            PersonaId::Raven => "cross-agent synthesis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectiveStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectiveRecord {
    pub id: String,
    pub name: String,
    pub persona: String,
    pub specialty: String,
    pub analysis_focus: String,
    pub status: DetectiveStatus,
    pub risk_score: f64,
    pub confidence: f64,
    pub conclusion: String,
    pub methodology: String,
    pub sample_transactions: Vec<String>,
    pub linked_addresses: Vec<String>,
}

/// The cached, agent-agnostic base analysis for a wallet: every analytic
/// stage's output plus rpc observability. This is exactly what C3 caches;
/// LLM narratives are generated per agent from this and never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseSnapshot {
    pub wallet_address: String,
    pub identity: AccountIdentity,
    pub transactions: Vec<ParsedTransaction>,
    pub data_quality: DataQuality,
    pub graph_stats: Option<NetworkMetrics>,
    pub taint: Option<TaintOutcome>,
    pub entity: Option<EntityAnalysis>,
    pub evidence: Option<EvidenceAnalysis>,
    pub flow: Option<FlowAttribution>,
    pub influence: Option<InfluenceAnalysis>,
    pub risk: RiskAssessment,
    pub rpc_stats: ProviderPoolStats,
}

/// Narrative generation behind a trait so an LLM-backed implementation can
/// be swapped in without touching the orchestrator. The default is
/// deterministic so tests and offline runs don't depend on an external
/// model.
pub trait Narrator: Send + Sync {
    fn summarize(&self, persona: PersonaId, snapshot: &BaseSnapshot) -> String;
}

pub struct TemplateNarrator;

impl Narrator for TemplateNarrator {
    fn summarize(&self, persona: PersonaId, snapshot: &BaseSnapshot) -> String {
        let level = format!("{:?}", snapshot.risk.level).to_uppercase();
        match persona {
            PersonaId::Poirot => format!(
                "Methodically, I observe {} transactions with a quality score of {:.2}; the pattern here is {level}.",
                snapshot.transactions.len(),
                snapshot.data_quality.quality_score
            ),
            PersonaId::Marple => format!(
                "Now, this reminds me of something peculiar: the risk score sits at {:.1}, which is {level}.",
                snapshot.risk.final_score
            ),
            PersonaId::Spade => format!(
                "The facts are these: final risk score {:.1}, level {level}. Confidence: {:.2}.",
                snapshot.risk.final_score, snapshot.risk.confidence
            ),
            PersonaId::Marlowe => format!(
                "I followed the money through {} integration-adjacent paths; the trail reads {level}.",
                snapshot
                    .evidence
                    .as_ref()
                    .map(|e| e.paths.len())
                    .unwrap_or(0)
            ),
            PersonaId::Dupin => format!(
                "By pure ratiocination: {} components contributed to a final score of {:.1} ({level}).",
                snapshot.risk.components.len(),
                snapshot.risk.final_score
            ),
            PersonaId::Shadow => format!(
                "Who knows what evil lurks in the clusters of wallets? This one assesses as {level}.",
                level = level
            ),
            PersonaId::Raven => format!(
                "Quoth the synthesis: {level}, nevermore to be treated as lower risk without new evidence.",
            ),
        }
    }
}

fn coverage_confidence(snapshot: &BaseSnapshot, persona: PersonaId) -> f64 {
    let base = snapshot.risk.confidence;
    let bonus = match persona {
        PersonaId::Marlowe if snapshot.flow.is_some() || snapshot.evidence.is_some() => 0.1,
        PersonaId::Shadow if snapshot.entity.is_some() => 0.1,
        PersonaId::Dupin if snapshot.graph_stats.is_some() => 0.1,
        _ => 0.0,
    };
    (base + bonus).clamp(0.0, 1.0)
}

/// Run a single persona over the shared snapshot.
pub fn run_agent(persona: PersonaId, snapshot: &BaseSnapshot, narrator: &dyn Narrator) -> DetectiveRecord {
    let linked_addresses = snapshot
        .transactions
        .iter()
        .flat_map(|t| t.counterparties.iter().cloned())
        .take(10)
        .collect();

    let sample_transactions = snapshot
        .transactions
        .iter()
        .take(5)
        .map(|t| t.signature.clone())
        .collect();

    DetectiveRecord {
        id: persona.id().to_string(),
        name: persona.name().to_string(),
        persona: persona.id().to_string(),
        specialty: persona.specialty().to_string(),
        analysis_focus: persona.analysis_focus().to_string(),
        status: DetectiveStatus::Completed,
        risk_score: snapshot.risk.final_score,
        confidence: coverage_confidence(snapshot, persona),
        conclusion: narrator.summarize(persona, snapshot),
        methodology: format!("shared_snapshot:{}", persona.id()),
        sample_transactions,
        linked_addresses,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationStatus {
    Completed,
    Partial,
    AnalysisError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investigation {
    pub investigation_id: Uuid,
    pub wallet_address: String,
    pub individual_results: HashMap<String, DetectiveRecord>,
    pub successful_investigations: usize,
    pub failed_investigations: usize,
    pub consensus_risk_score: Option<f64>,
    pub consensus_risk_level: Option<String>,
    pub framework_status: InvestigationStatus,
}

fn consensus(records: &HashMap<String, DetectiveRecord>) -> (Option<f64>, Option<String>) {
    let completed: Vec<&DetectiveRecord> = records
        .values()
        .filter(|r| r.status == DetectiveStatus::Completed)
        .collect();

    if completed.is_empty() {
        return (None, None);
    }

    let mean_score = completed.iter().map(|r| r.risk_score).sum::<f64>() / completed.len() as f64;
    let consensus_score = mean_score.round();

    let level = crate::risk::RiskLevel::from_score(mean_score);
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in &completed {
        let lvl = crate::risk::RiskLevel::from_score(record.risk_score);
        *counts.entry(format!("{lvl:?}")).or_insert(0) += 1;
    }
    let max_count = counts.values().copied().max().unwrap_or(0);
    let modal_level = counts
        .into_iter()
        .filter(|(_, c)| *c == max_count)
        .map(|(l, _)| l)
        .max_by_key(|l| severity_rank(l))
        .unwrap_or_else(|| format!("{level:?}"));

    (Some(consensus_score), Some(modal_level.to_uppercase()))
}

fn severity_rank(level_name: &str) -> u8 {
    match level_name {
        "Minimal" => 0,
        "Low" => 1,
        "Medium" => 2,
        "High" => 3,
        "Critical" => 4,
        _ => 0,
    }
}

/// Fan out all seven personas over the snapshot and build the consensus
/// investigation record. Individual agent failures (modeled by the
/// `failing` set, used by tests and by callers that detect a mid-analysis
/// panic out of band) are tolerated down to a single surviving agent.
pub fn run_comprehensive(
    wallet_address: &str,
    snapshot: &BaseSnapshot,
    narrator: &dyn Narrator,
    failing: &[PersonaId],
) -> Investigation {
    let mut individual_results = HashMap::new();

    for persona in PersonaId::ALL {
        let record = if failing.contains(&persona) {
            DetectiveRecord {
                id: persona.id().to_string(),
                name: persona.name().to_string(),
                persona: persona.id().to_string(),
                specialty: persona.specialty().to_string(),
                analysis_focus: persona.analysis_focus().to_string(),
                status: DetectiveStatus::Failed,
                risk_score: 0.0,
                confidence: 0.0,
                conclusion: "analysis failed mid-run".to_string(),
                methodology: format!("shared_snapshot:{}", persona.id()),
                sample_transactions: Vec::new(),
                linked_addresses: Vec::new(),
            }
        } else {
            run_agent(persona, snapshot, narrator)
        };
        individual_results.insert(persona.id().to_string(), record);
    }

    let successful_investigations = individual_results
        .values()
        .filter(|r| r.status == DetectiveStatus::Completed)
        .count();
    let failed_investigations = individual_results.len() - successful_investigations;

    let (consensus_risk_score, consensus_risk_level) = consensus(&individual_results);

    let framework_status = if successful_investigations == 0 {
        InvestigationStatus::AnalysisError
    } else if failed_investigations > 0 {
        InvestigationStatus::Partial
    } else {
        InvestigationStatus::Completed
    };

    Investigation {
        investigation_id: Uuid::new_v4(),
        wallet_address: wallet_address.to_string(),
        individual_results,
        successful_investigations,
        failed_investigations,
        consensus_risk_score,
        consensus_risk_level,
        framework_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{RiskAssessment, RiskLevel};
    use crate::rpc::{AccountCategory, AccountIdentity, ProviderPoolStats};

    fn sample_snapshot() -> BaseSnapshot {
        BaseSnapshot {
            wallet_address: "wallet1".to_string(),
            identity: AccountIdentity {
                address: "wallet1".to_string(),
                category: AccountCategory::Individual,
                executable: false,
                owner_program: None,
                account_exists: true,
            },
            transactions: Vec::new(),
            data_quality: crate::parser::DataQuality::default(),
            graph_stats: None,
            taint: None,
            entity: None,
            evidence: None,
            flow: None,
            influence: None,
            risk: RiskAssessment {
                final_score: 45.0,
                level: RiskLevel::Medium,
                confidence: 0.7,
                components: Vec::new(),
                flags: Vec::new(),
                recommendations: Vec::new(),
                configuration_used: "balanced".to_string(),
                fallback_used: false,
            },
            rpc_stats: ProviderPoolStats {
                total_calls: 10,
                total_retries: 0,
                total_fallbacks: 0,
                failed_endpoints: Vec::new(),
                success_rate: 1.0,
            },
        }
    }

    #[test]
    fn comprehensive_run_with_all_agents_completes() {
        let snapshot = sample_snapshot();
        let investigation = run_comprehensive("wallet1", &snapshot, &TemplateNarrator, &[]);
        assert_eq!(investigation.successful_investigations, 7);
        assert_eq!(investigation.failed_investigations, 0);
        matches!(investigation.framework_status, InvestigationStatus::Completed);
        assert!(investigation.consensus_risk_level.is_some());
    }

    #[test]
    fn one_failing_agent_yields_partial_with_six_successes() {
        let snapshot = sample_snapshot();
        let investigation =
            run_comprehensive("wallet1", &snapshot, &TemplateNarrator, &[PersonaId::Marple]);
        assert_eq!(investigation.successful_investigations, 6);
        assert_eq!(investigation.failed_investigations, 1);
        assert_ne!(
            investigation.individual_results["marple"].status,
            DetectiveStatus::Completed
        );
    }

    #[test]
    fn all_agents_failing_yields_analysis_error() {
        let snapshot = sample_snapshot();
        let investigation = run_comprehensive("wallet1", &snapshot, &TemplateNarrator, &PersonaId::ALL);
        matches!(investigation.framework_status, InvestigationStatus::AnalysisError);
        assert!(investigation.consensus_risk_level.is_none());
    }
}
