use crowdpilot::config::DecoderConfig;
use crowdpilot::domains::motion::{Pose, Quat, Vec3};
use crowdpilot::domains::trajectory::{FrameDecoder, RawStep};

fn steps(raw: &[[f64; 2]]) -> Vec<RawStep> {
    raw.iter().map(|s| Some(*s)).collect()
}

fn origin() -> Pose {
    Pose::new(Vec3::ZERO, Quat::IDENTITY)
}

fn assert_close(a: Vec3, b: Vec3) {
    assert!(a.distance(b) < 1e-9, "expected {:?}, got {:?}", b, a);
}

#[cfg(test)]
mod decoder_tests {
    use super::*;

    #[test]
    fn test_cumulative_offsets_are_relative_to_base() {
        let decoder = FrameDecoder::new(DecoderConfig { cumulative: true, ..Default::default() });
        let path = decoder.decode(&steps(&[[1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]), origin());

        assert_eq!(path.start_index, 0);
        assert_eq!(
            path.waypoints,
            vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)]
        );
    }

    #[test]
    fn test_incremental_offsets_accumulate() {
        let decoder = FrameDecoder::new(DecoderConfig { cumulative: false, ..Default::default() });
        let path = decoder.decode(&steps(&[[1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]), origin());

        assert_eq!(
            path.waypoints,
            vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(6.0, 0.0, 0.0)]
        );
    }

    #[test]
    fn test_cumulative_from_offset_base() {
        let decoder = FrameDecoder::default();
        let base = Pose::new(Vec3::new(10.0, 1.5, -4.0), Quat::IDENTITY);
        let path = decoder.decode(&steps(&[[1.0, 2.0], [2.0, 4.0]]), base);

        assert_close(path.waypoints[0], Vec3::new(11.0, 1.5, -2.0));
        assert_close(path.waypoints[1], Vec3::new(12.0, 1.5, 0.0));
    }

    #[test]
    fn test_origin_marker_advances_start_index() {
        let decoder = FrameDecoder::default();
        let path = decoder.decode(&steps(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]), origin());

        assert_eq!(path.start_index, 1);
        assert_eq!(path.usable_len(), 2);
        assert_eq!(path.first_usable(), Some(Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_origin_marker_within_epsilon() {
        let decoder = FrameDecoder::default();
        let path = decoder.decode(&steps(&[[0.00005, -0.00005], [1.0, 0.0]]), origin());
        assert_eq!(path.start_index, 1);
    }

    #[test]
    fn test_origin_only_trajectory_has_no_usable_steps() {
        let decoder = FrameDecoder::default();
        let path = decoder.decode(&steps(&[[0.0, 0.0]]), origin());

        assert_eq!(path.start_index, 1);
        assert_eq!(path.usable_len(), 0);
        assert!(!path.has_usable_steps());
        assert!(path.last().is_none());
    }

    #[test]
    fn test_zero_step_later_in_path_is_not_skipped() {
        let decoder = FrameDecoder::new(DecoderConfig { cumulative: false, ..Default::default() });
        let path = decoder.decode(&steps(&[[1.0, 0.0], [0.0, 0.0]]), origin());
        assert_eq!(path.start_index, 0);
        assert_eq!(path.usable_len(), 2);
    }

    #[test]
    fn test_flips_and_scale() {
        let decoder = FrameDecoder::new(DecoderConfig {
            flip_x: true,
            flip_z: true,
            scale: 2.0,
            ..Default::default()
        });
        let path = decoder.decode(&steps(&[[1.0, 3.0]]), origin());
        assert_close(path.waypoints[0], Vec3::new(-2.0, 0.0, -6.0));
    }

    #[test]
    fn test_local_frame_rotates_by_base_heading() {
        let decoder = FrameDecoder::new(DecoderConfig { local_frame: true, ..Default::default() });
        // Facing +X: a local forward step (0, 1) becomes world +X.
        let base = Pose::new(Vec3::ZERO, Quat::from_yaw_deg(90.0));
        let path = decoder.decode(&steps(&[[0.0, 1.0]]), base);
        assert_close(path.waypoints[0], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_local_frame_applies_yaw_offset() {
        let decoder = FrameDecoder::new(DecoderConfig {
            local_frame: true,
            yaw_offset_deg: -90.0,
            ..Default::default()
        });
        let base = Pose::new(Vec3::ZERO, Quat::from_yaw_deg(90.0));
        let path = decoder.decode(&steps(&[[0.0, 1.0]]), base);
        assert_close(path.waypoints[0], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_world_frame_ignores_base_rotation() {
        let decoder = FrameDecoder::new(DecoderConfig { local_frame: false, ..Default::default() });
        let base = Pose::new(Vec3::ZERO, Quat::from_yaw_deg(90.0));
        let path = decoder.decode(&steps(&[[0.0, 1.0]]), base);
        assert_close(path.waypoints[0], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_malformed_step_holds_previous_position() {
        let decoder = FrameDecoder::new(DecoderConfig { cumulative: false, ..Default::default() });
        let raw = vec![Some([1.0, 0.0]), None, Some([f64::NAN, 1.0]), Some([1.0, 0.0])];
        let path = decoder.decode(&raw, origin());

        assert_eq!(path.len(), 4);
        assert_close(path.waypoints[1], Vec3::new(1.0, 0.0, 0.0));
        assert_close(path.waypoints[2], Vec3::new(1.0, 0.0, 0.0));
        assert_close(path.waypoints[3], Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_malformed_first_step_counts_as_origin() {
        let decoder = FrameDecoder::default();
        let path = decoder.decode(&[None, Some([1.0, 0.0])], origin());
        assert_eq!(path.start_index, 1);
        assert_close(path.waypoints[0], Vec3::ZERO);
    }

    #[test]
    fn test_path_length_skips_origin_marker() {
        let decoder = FrameDecoder::default();
        let path = decoder.decode(&steps(&[[0.0, 0.0], [3.0, 0.0], [3.0, 4.0]]), origin());
        assert!((path.path_length_from(Vec3::ZERO) - 7.0).abs() < 1e-9);
    }
}
