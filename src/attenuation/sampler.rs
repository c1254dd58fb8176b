//! Relay evaluation and selection at a single instant

use nalgebra::Vector3;

use super::{RelayEvaluation, RelaySelection};
use crate::geometry::{line_of_sight, path_loss_db};

/// Path losses closer than this (dB) count as equal; the earlier relay wins
pub const TIE_EPSILON_DB: f64 = 1e-9;

/// Invalid geometry at one instant
#[derive(Debug, Clone, PartialEq)]
pub enum SampleError {
    /// Ground asset and relay share the same position
    Colocated { relay_id: u32 },

    /// Ground asset or relay position has a NaN or infinite coordinate
    NonFinite { relay_id: u32 },
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Colocated { relay_id } => {
                write!(f, "ground asset and satellite #{} are colocated", relay_id)
            }
            Self::NonFinite { relay_id } => {
                write!(
                    f,
                    "non-finite position while evaluating satellite #{}",
                    relay_id
                )
            }
        }
    }
}

impl std::error::Error for SampleError {}

/// Every relay's evaluation plus the chosen one
#[derive(Debug, Clone, PartialEq)]
pub struct SampleResult {
    pub selection: Option<RelaySelection>,
    /// Same order as the relays passed in
    pub evaluations: Vec<RelayEvaluation>,
}

/// Computes distance, visibility and path loss between the ground and each relay
#[derive(Debug, Clone, Copy)]
pub struct AttenuationSampler {
    frequency_hz: f64,
}

impl AttenuationSampler {
    pub fn new(frequency_hz: f64) -> Self {
        Self { frequency_hz }
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    /// Evaluate one relay against the ground position
    pub fn evaluate(
        &self,
        ground: &Vector3<f64>,
        relay_id: u32,
        relay: &Vector3<f64>,
    ) -> Result<RelayEvaluation, SampleError> {
        let finite = |p: &Vector3<f64>| p.iter().all(|c| c.is_finite());
        if !finite(ground) || !finite(relay) {
            return Err(SampleError::NonFinite { relay_id });
        }

        let distance_m = (relay - ground).norm();
        if distance_m <= 0.0 {
            return Err(SampleError::Colocated { relay_id });
        }

        let visible = line_of_sight(ground, relay);
        let path_loss = visible.then(|| path_loss_db(self.frequency_hz, distance_m));

        Ok(RelayEvaluation {
            relay_id,
            distance_m,
            line_of_sight: visible,
            path_loss_db: path_loss,
            subpoint: None,
        })
    }

    /// Evaluate every relay and pick the visible one with the lowest path loss
    pub fn sample(
        &self,
        ground: &Vector3<f64>,
        relays: &[(u32, Vector3<f64>)],
    ) -> Result<SampleResult, SampleError> {
        let mut evaluations = Vec::with_capacity(relays.len());
        let mut selection: Option<RelaySelection> = None;

        for (relay_id, position) in relays {
            let evaluation = self.evaluate(ground, *relay_id, position)?;

            if let Some(loss) = evaluation.path_loss_db {
                let better = match &selection {
                    Some(best) => loss < best.path_loss_db - TIE_EPSILON_DB,
                    None => true,
                };
                if better {
                    selection = Some(RelaySelection {
                        relay_id: evaluation.relay_id,
                        distance_m: evaluation.distance_m,
                        path_loss_db: loss,
                    });
                }
            }

            evaluations.push(evaluation);
        }

        Ok(SampleResult {
            selection,
            evaluations,
        })
    }
}
