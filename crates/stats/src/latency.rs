// Rust guideline compliant 2026-07-20

//! Latency sample sets: a memory-bounded tiered histogram (default) and an
//! exact unbounded sample array, behind one [`LatencyTracker`] front.

/// Tier boundaries in ms: (exclusive tier end, bucket step).
const TIERS: &[(f64, f64)] = &[
    (100.0, 1.0),
    (1_000.0, 10.0),
    (10_000.0, 100.0),
    (100_000.0, 1_000.0),
];

/// Upper bounds of every histogram bucket, ascending. 370 buckets:
/// 1 ms steps in [1,100], 10 ms in (100,1000], 100 ms in (1,10] s,
/// 1 s in (10,100] s. Samples above 100 s land in the last bucket.
fn bucket_bounds() -> Vec<f64> {
    let mut bounds = Vec::with_capacity(370);
    let mut at = 0.0;
    for &(end, step) in TIERS {
        while at < end {
            at += step;
            bounds.push(at);
        }
    }
    bounds
}

/// Half the bucket width at `bound`, used to report the bucket midpoint.
fn half_step(bound: f64) -> f64 {
    for &(end, step) in TIERS {
        if bound <= end {
            return step / 2.0;
        }
    }
    500.0
}

// ---------------------------------------------------------------------------
// LatencyTracker
// ---------------------------------------------------------------------------

/// Per-workload latency sample set.
///
/// Single-threaded: only the owning dispatch loop touches it.
#[derive(Debug)]
pub enum LatencyTracker {
    /// Fixed-bucket tiered histogram; memory-bounded.
    Histogram(Histogram),
    /// Append-only exact millisecond samples; unbounded.
    Exact(Exact),
}

impl LatencyTracker {
    /// The default, memory-bounded tracker.
    #[must_use]
    pub fn histogram() -> Self {
        Self::Histogram(Histogram::new())
    }

    /// Exact tracker (`--latency-histograms=0`).
    #[must_use]
    pub fn exact() -> Self {
        Self::Exact(Exact::default())
    }

    /// Record one sample in milliseconds.
    pub fn add(&mut self, ms: f64) {
        match self {
            Self::Histogram(h) => h.add(ms),
            Self::Exact(e) => e.add(ms),
        }
    }

    /// The `p`-th percentile in milliseconds; 0 for an empty set.
    #[must_use]
    pub fn percentile(&self, p: f64) -> f64 {
        match self {
            Self::Histogram(h) => h.percentile(p),
            Self::Exact(e) => e.percentile(p),
        }
    }

    /// Mean sample in milliseconds; 0 for an empty set.
    #[must_use]
    pub fn average(&self) -> f64 {
        match self {
            Self::Histogram(h) => h.average(),
            Self::Exact(e) => e.average(),
        }
    }

    /// Samples recorded so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        match self {
            Self::Histogram(h) => h.count,
            Self::Exact(e) => e.samples.len() as u64,
        }
    }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Tiered fixed-bucket histogram with running sum and count.
#[derive(Debug)]
pub struct Histogram {
    bounds: Vec<f64>,
    counts: Vec<u64>,
    sum: f64,
    count: u64,
}

impl Histogram {
    #[must_use]
    fn new() -> Self {
        let bounds = bucket_bounds();
        let counts = vec![0; bounds.len()];
        Self {
            bounds,
            counts,
            sum: 0.0,
            count: 0,
        }
    }

    fn add(&mut self, ms: f64) {
        // First bucket whose upper bound covers the sample; everything past
        // the cap lands in the last bucket.
        let idx = self
            .bounds
            .partition_point(|b| *b < ms)
            .min(self.bounds.len() - 1);
        self.counts[idx] += 1;
        self.sum += ms;
        self.count += 1;
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let target = ((p / 100.0) * self.count as f64).ceil().max(1.0) as u64;
        let mut seen = 0;
        for (idx, n) in self.counts.iter().enumerate() {
            seen += n;
            if seen >= target {
                let bound = self.bounds[idx];
                return bound - half_step(bound);
            }
        }
        // Unreachable with count > 0; keep the cap as a safe answer.
        *self.bounds.last().unwrap_or(&0.0)
    }

    fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Exact
// ---------------------------------------------------------------------------

/// Exact sample array; percentiles from a sorted copy.
#[derive(Debug, Default)]
pub struct Exact {
    samples: Vec<f64>,
    sum: f64,
}

impl Exact {
    fn add(&mut self, ms: f64) {
        self.samples.push(ms);
        self.sum += ms;
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((sorted.len() as f64 * p / 100.0).ceil() as usize)
            .max(1)
            .min(sorted.len())
            - 1;
        sorted[idx]
    }

    fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum / self.samples.len() as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{LatencyTracker, bucket_bounds};

    // LT-T01: the tier table yields the documented 370 bucket bounds.
    #[test]
    fn bounds_shape() {
        let bounds = bucket_bounds();
        assert_eq!(bounds.len(), 370);
        assert_eq!(bounds[0], 1.0);
        assert_eq!(bounds[99], 100.0);
        assert_eq!(bounds[100], 110.0);
        assert_eq!(bounds[189], 1_000.0);
        assert_eq!(bounds[190], 1_100.0);
        assert_eq!(bounds[279], 10_000.0);
        assert_eq!(bounds[280], 11_000.0);
        assert_eq!(bounds[369], 100_000.0);
    }

    // LT-T02: percentiles report the bucket midpoint for each tier.
    #[test]
    fn histogram_midpoints() {
        let mut t = LatencyTracker::histogram();
        t.add(1.5); // bucket 2 ms -> 1.5
        assert_eq!(t.percentile(50.0), 1.5);

        let mut t = LatencyTracker::histogram();
        t.add(245.0); // bucket 250 ms (10 ms tier) -> 245
        assert_eq!(t.percentile(50.0), 245.0);

        let mut t = LatencyTracker::histogram();
        t.add(2_050.0); // bucket 2100 ms (100 ms tier) -> 2050
        assert_eq!(t.percentile(99.0), 2_050.0);

        let mut t = LatencyTracker::histogram();
        t.add(250_000.0); // beyond cap -> last bucket -> 99500
        assert_eq!(t.percentile(99.0), 99_500.0);
    }

    // LT-T03: uniform 1..=100 ms: p50 = 49.5 (bucket 50 midpoint),
    // average = 50.5 (true sum / count).
    #[test]
    fn histogram_uniform() {
        let mut t = LatencyTracker::histogram();
        for ms in 1..=100 {
            t.add(f64::from(ms));
        }
        assert_eq!(t.percentile(50.0), 49.5);
        assert_eq!(t.percentile(100.0), 99.5);
        assert!((t.average() - 50.5).abs() < 1e-9);
        assert_eq!(t.count(), 100);
    }

    // LT-T04: percentile is monotone non-decreasing in p.
    #[test]
    fn histogram_monotone() {
        let mut t = LatencyTracker::histogram();
        // Deterministic spread across tiers.
        for i in 0..500u32 {
            t.add(f64::from(i * 37 % 12_000) + 0.3);
        }
        let mut last = 0.0;
        for p in [1.0, 5.0, 25.0, 50.0, 75.0, 95.0, 99.0, 100.0] {
            let v = t.percentile(p);
            assert!(v >= last, "p{p} = {v} < previous {last}");
            last = v;
        }
    }

    // LT-T05: empty sets report zeros, not errors.
    #[test]
    fn empty_is_zero() {
        for t in [LatencyTracker::histogram(), LatencyTracker::exact()] {
            assert_eq!(t.percentile(50.0), 0.0);
            assert_eq!(t.percentile(99.0), 0.0);
            assert_eq!(t.average(), 0.0);
            assert_eq!(t.count(), 0);
        }
    }

    // LT-T06: exact percentile uses ceil(count * p / 100) - 1 on the sorted
    // samples.
    #[test]
    fn exact_index_rule() {
        let mut t = LatencyTracker::exact();
        for ms in [5.0, 1.0, 3.0, 2.0, 4.0] {
            t.add(ms);
        }
        // sorted: [1,2,3,4,5]; p50 -> ceil(2.5)=3 -> index 2 -> 3.0
        assert_eq!(t.percentile(50.0), 3.0);
        // p100 -> index 4 -> 5.0; p1 -> ceil(0.05)=1 -> index 0 -> 1.0
        assert_eq!(t.percentile(100.0), 5.0);
        assert_eq!(t.percentile(1.0), 1.0);
        assert_eq!(t.average(), 3.0);
    }
}
