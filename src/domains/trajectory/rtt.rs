/// Exponential moving average of request round-trip time, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttEstimator {
    average: f64,
    samples: u64,
}

impl RttEstimator {
    pub const SMOOTHING: f64 = 0.1;

    pub fn new(initial_sec: f64) -> Self {
        Self { average: initial_sec.max(0.0), samples: 0 }
    }

    pub fn record(&mut self, measured_sec: f64) -> f64 {
        if measured_sec.is_finite() && measured_sec >= 0.0 {
            self.average = (1.0 - Self::SMOOTHING) * self.average + Self::SMOOTHING * measured_sec;
            self.samples += 1;
        }
        self.average
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}
