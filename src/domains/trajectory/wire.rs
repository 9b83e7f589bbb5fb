use super::types::RawStep;
use crate::common::FetchError;
use crate::config::GoalFormat;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Everything the transport needs to issue one prediction request.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRequest {
    pub request_id: Uuid,
    pub agent_id: String,
    /// Goal relative to the agent, already flip-adjusted.
    pub goal_offset: [f64; 2],
    pub goal_format: GoalFormat,
    pub remaining_time: f64,
    pub history: Option<String>,
    pub group_field_name: String,
    pub group_rel_positions: Vec<[f64; 2]>,
    #[serde(skip)]
    pub image: Vec<u8>,
}

impl PredictionRequest {
    pub fn goal_field(&self) -> String {
        let [x, z] = self.goal_offset;
        match self.goal_format {
            GoalFormat::Csv => format!("{:.4},{:.4}", x, z),
            GoalFormat::Json => Value::from(vec![x, z]).to_string(),
        }
    }

    pub fn remaining_time_field(&self) -> String {
        format!("{:.2}", self.remaining_time.max(0.0))
    }

    pub fn group_field(&self) -> Option<String> {
        if self.group_rel_positions.is_empty() {
            return None;
        }
        serde_json::to_string(&self.group_rel_positions).ok()
    }

    /// Text form fields in send order. The `image` part is attached by the
    /// transport.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("goal_position".to_string(), self.goal_field()),
            ("remaining_time".to_string(), self.remaining_time_field()),
        ];
        if let Some(history) = &self.history {
            fields.push(("history".to_string(), history.clone()));
        }
        if let Some(group) = self.group_field() {
            fields.push((self.group_field_name.clone(), group));
        }
        fields
    }
}

/// Parsed service response: one or more candidate step arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResponse {
    pub candidates: Vec<Vec<RawStep>>,
    pub latency_sec: Option<f64>,
    pub anchor_idx: Option<i64>,
}

const NAMED_OUTPUTS: [&str; 3] = ["output1", "output2", "output3"];

impl PredictionResponse {
    pub fn parse(body: &str) -> Result<Self, FetchError> {
        let root: Value =
            serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
        let obj = root
            .as_object()
            .ok_or_else(|| FetchError::Parse("response is not a JSON object".to_string()))?;

        let candidates = if let Some(output) = obj.get("output") {
            parse_output(output)?
        } else {
            let named: Vec<&Value> =
                NAMED_OUTPUTS.iter().filter_map(|k| obj.get(*k)).collect();
            if named.is_empty() {
                return Err(FetchError::Parse("response has no output field".to_string()));
            }
            named
                .into_iter()
                .map(parse_steps)
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            candidates,
            latency_sec: obj.get("latency_sec").and_then(Value::as_f64),
            anchor_idx: obj.get("anchor_idx").and_then(Value::as_i64),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.iter().all(|c| c.is_empty())
    }
}

/// `output` is normally `[batch][step][2]`; a bare `[step][2]` is accepted
/// as a single candidate.
fn parse_output(output: &Value) -> Result<Vec<Vec<RawStep>>, FetchError> {
    let outer = output
        .as_array()
        .ok_or_else(|| FetchError::Parse("output is not an array".to_string()))?;

    if is_step_list(outer) {
        return Ok(vec![parse_steps(output)?]);
    }
    outer.iter().map(parse_steps).collect()
}

/// True when the entries look like `[x, z]` steps rather than step arrays.
///
/// Decided by the first entry holding a non-null element, so leading
/// malformed steps (or candidates starting with one) do not change the shape.
/// An array with no decidable entry is read as a batch.
fn is_step_list(entries: &[Value]) -> bool {
    entries
        .iter()
        .filter_map(Value::as_array)
        .find_map(|entry| entry.iter().find(|v| !v.is_null()))
        .map_or(false, |v| !v.is_array())
}

fn parse_steps(value: &Value) -> Result<Vec<RawStep>, FetchError> {
    let steps = value
        .as_array()
        .ok_or_else(|| FetchError::Parse("trajectory is not an array".to_string()))?;
    Ok(steps.iter().map(parse_step).collect())
}

fn parse_step(value: &Value) -> RawStep {
    let pair = value.as_array()?;
    let x = pair.first()?.as_f64()?;
    let z = pair.get(1)?.as_f64()?;
    Some([x, z])
}
