use crate::common::DomainResult;
use crate::domains::trajectory::ObservationSource;

/// Minimal 1x1 transparent PNG.
pub const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Observation source that always returns the same image bytes. Stands in
/// for the renderer when running headless.
#[derive(Debug, Clone)]
pub struct StaticObservation {
    image: Vec<u8>,
}

impl StaticObservation {
    pub fn new(image: Vec<u8>) -> Self {
        Self { image }
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_PNG.to_vec())
    }
}

impl ObservationSource for StaticObservation {
    fn capture(&self, _agent_id: &str) -> DomainResult<Vec<u8>> {
        Ok(self.image.clone())
    }
}
