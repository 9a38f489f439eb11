use crate::core::nodata::is_nodata;
use serde::{Deserialize, Serialize};

/// Summary statistics of a band's corrected values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    /// Pixels that contributed (finite and not no-data)
    pub valid_count: usize,
}

impl BandStatistics {
    pub fn is_empty(&self) -> bool {
        self.valid_count == 0
    }
}

/// Streaming accumulator (Welford) used chunk by chunk
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    nodata: Option<f64>,
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl StatsAccumulator {
    pub fn new(nodata: Option<f64>) -> Self {
        Self {
            nodata,
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, value: f64) {
        if !value.is_finite() || self.nodata.map_or(false, |nd| is_nodata(value, nd)) {
            return;
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for value in values {
            self.add(value);
        }
    }

    /// Population statistics; NaN fields when nothing was accumulated
    pub fn finish(&self) -> BandStatistics {
        if self.count == 0 {
            return BandStatistics {
                min: f64::NAN,
                max: f64::NAN,
                mean: f64::NAN,
                stddev: f64::NAN,
                valid_count: 0,
            };
        }
        BandStatistics {
            min: self.min,
            max: self.max,
            mean: self.mean,
            stddev: (self.m2 / self.count as f64).sqrt(),
            valid_count: self.count,
        }
    }
}
