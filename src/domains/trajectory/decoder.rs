use super::types::{DecodedPath, RawStep};
use crate::config::DecoderConfig;
use crate::domains::motion::{Pose, Quat, Vec3};

/// Turns raw service step vectors into absolute world waypoints.
///
/// Each step is flipped, scaled and optionally rotated out of the agent's
/// local frame. Cumulative steps are offsets from the base position (each one
/// replaces the previous waypoint); incremental steps are summed onto a
/// running position that starts at the base.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    config: DecoderConfig,
}

impl FrameDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// World-space offset for a single well-formed step.
    pub fn step_offset(&self, step: [f64; 2], base_rotation: Quat) -> Vec3 {
        let c = &self.config;
        let mut dx = step[0];
        let mut dz = step[1];
        if c.flip_x {
            dx = -dx;
        }
        if c.flip_z {
            dz = -dz;
        }
        let v = Vec3::ground(dx * c.scale, dz * c.scale);

        if !c.local_frame {
            return v;
        }
        let frame = if c.yaw_only { base_rotation.yaw_only() } else { base_rotation };
        frame.mul(Quat::from_yaw_deg(c.yaw_offset_deg)).rotate(v)
    }

    pub fn decode(&self, steps: &[RawStep], base: Pose) -> DecodedPath {
        let mut waypoints = Vec::with_capacity(steps.len());
        let mut running = base.position;
        let mut start_index = 0;

        for (i, raw) in steps.iter().enumerate() {
            let offset = raw
                .filter(|s| s[0].is_finite() && s[1].is_finite())
                .map(|s| self.step_offset(s, base.rotation));

            if i == 0 && offset.map_or(true, |o| self.is_origin_marker(o)) {
                start_index = 1;
            }

            // Malformed entries hold the previous position.
            if let Some(o) = offset {
                running = if self.config.cumulative {
                    base.position.add(o)
                } else {
                    running.add(o)
                };
            }
            waypoints.push(running);
        }

        DecodedPath { waypoints, start_index: start_index.min(steps.len()) }
    }

    fn is_origin_marker(&self, offset: Vec3) -> bool {
        let eps = self.config.origin_epsilon;
        offset.x.abs() <= eps && offset.z.abs() <= eps
    }
}
