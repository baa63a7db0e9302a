// LeakyReluConfig — Constants of the shifted leaky-ReLU
//
// The epilogue this crate reproduces is hard-wired to
//
//   y   = x + 1
//   out = y >= 0 ? y : 0.01 * y
//
// Default gives exactly those constants. The fields are public so a caller
// fusing the activation into a different pipeline can move them, but every
// free function in `activation` uses the default.

/// Constants of the shifted leaky-ReLU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeakyReluConfig {
    /// Added to the input before thresholding (default: 1.0).
    pub offset: f64,
    /// Multiplier applied below the threshold (default: 0.01).
    pub negative_slope: f64,
    /// Values `>= threshold` after the shift pass through (default: 0.0).
    pub threshold: f64,
}

impl LeakyReluConfig {
    /// The constants of the epilogue function.
    pub const EPILOGUE: LeakyReluConfig = LeakyReluConfig {
        offset: 1.0,
        negative_slope: 0.01,
        threshold: 0.0,
    };

    /// Set the pre-threshold offset.
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Set the negative slope.
    pub fn with_negative_slope(mut self, negative_slope: f64) -> Self {
        self.negative_slope = negative_slope;
        self
    }

    /// Set the threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

impl Default for LeakyReluConfig {
    fn default() -> Self {
        Self::EPILOGUE
    }
}
