use super::ports::{ColliderClass, EndpointProbe};
use super::types::DecodedPath;
use crate::config::{ScoreWeights, SelectionConfig};
use crate::domains::motion::{ground_angle_deg, Vec3};
use serde::{Deserialize, Serialize};

/// Heading deviation reported for a candidate with no usable direction.
pub const DEGENERATE_HEADING_DEG: f64 = 999.0;
/// Goal distance reported for a candidate with no usable waypoints.
pub const UNREACHABLE_DISTANCE: f64 = 1.0e9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub index: usize,
    pub heading_deviation_deg: f64,
    pub end_distance: f64,
    pub path_length: f64,
    pub end_blocked: bool,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub candidates: Vec<CandidateScore>,
    /// `None` when every candidate is blocked.
    pub chosen: Option<usize>,
}

impl Evaluation {
    pub fn all_blocked(&self) -> bool {
        self.chosen.is_none()
    }
}

/// Agent state the candidates are judged against.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub agent_id: &'a str,
    pub position: Vec3,
    pub forward: Vec3,
    pub goal: Vec3,
}

#[derive(Debug, Clone)]
pub struct CandidateEvaluator {
    weights: ScoreWeights,
    agent_radius: f64,
    static_radius: f64,
}

impl CandidateEvaluator {
    pub fn new(weights: ScoreWeights, agent_radius: f64, static_radius: f64) -> Self {
        Self { weights, agent_radius, static_radius }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new(config.weights, config.agent_radius, config.static_radius)
    }

    /// Linear score; lower is better.
    pub fn score(weights: &ScoreWeights, heading_deviation_deg: f64, end_distance: f64) -> f64 {
        weights.goal_weight * end_distance + weights.angle_weight * heading_deviation_deg
    }

    /// Lowest-scoring clear candidate; ties keep the earliest index.
    pub fn select(candidates: &[CandidateScore]) -> Option<usize> {
        let mut best: Option<&CandidateScore> = None;
        for c in candidates.iter().filter(|c| !c.end_blocked) {
            match best {
                Some(b) if c.score >= b.score => {}
                _ => best = Some(c),
            }
        }
        best.map(|c| c.index)
    }

    pub fn measure(
        &self,
        index: usize,
        path: &DecodedPath,
        ctx: &EvaluationContext<'_>,
        probe: &dyn EndpointProbe,
    ) -> CandidateScore {
        let (first, last) = match (path.first_usable(), path.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return CandidateScore {
                    index,
                    heading_deviation_deg: DEGENERATE_HEADING_DEG,
                    end_distance: UNREACHABLE_DISTANCE,
                    path_length: 0.0,
                    end_blocked: true,
                    score: f64::INFINITY,
                }
            }
        };

        let heading_deviation_deg = ground_angle_deg(ctx.forward, first.sub(ctx.position))
            .unwrap_or(DEGENERATE_HEADING_DEG);
        let end_distance = last.with_y(ctx.goal.y).distance(ctx.goal);
        let path_length = path.path_length_from(ctx.position);

        let end_blocked =
            probe.overlaps(last, self.agent_radius, ColliderClass::Agent, ctx.agent_id)
                || probe.overlaps(last, self.static_radius, ColliderClass::Static, ctx.agent_id);

        CandidateScore {
            index,
            heading_deviation_deg,
            end_distance,
            path_length,
            end_blocked,
            score: Self::score(&self.weights, heading_deviation_deg, end_distance),
        }
    }

    pub fn evaluate(
        &self,
        candidates: &[DecodedPath],
        ctx: &EvaluationContext<'_>,
        probe: &dyn EndpointProbe,
    ) -> Evaluation {
        let scores: Vec<CandidateScore> = candidates
            .iter()
            .enumerate()
            .map(|(i, path)| self.measure(i, path, ctx, probe))
            .collect();
        let chosen = Self::select(&scores);
        Evaluation { candidates: scores, chosen }
    }
}
