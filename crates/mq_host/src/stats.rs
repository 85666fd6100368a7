//! Matter-qubit statistics over a batch of measurement orders.

/// Counts at or above this value share the last histogram bucket.
const BUCKETS: usize = 16;

/// Running summary of per-order matter-qubit counts.
///
/// Failed orders are counted separately and never enter the min, max or
/// average.
#[derive(Clone, Debug)]
pub struct MatterStats {
    pub min: u64,
    pub max: u64,
    pub sum: u64,
    pub count: u64,
    pub failures: u64,
    pub mismatches: u64,
    pub buckets: [u64; BUCKETS],
}

impl Default for MatterStats {
    fn default() -> Self {
        Self::new()
    }
}

impl MatterStats {
    pub fn new() -> Self {
        Self {
            min: u64::MAX,
            max: 0,
            sum: 0,
            count: 0,
            failures: 0,
            mismatches: 0,
            buckets: [0; BUCKETS],
        }
    }

    /// Records one order; negative values are failures.
    pub fn update(&mut self, matter: i64) {
        let Ok(matter) = u64::try_from(matter) else {
            self.failures += 1;
            return;
        };
        self.min = self.min.min(matter);
        self.max = self.max.max(matter);
        self.sum += matter;
        self.count += 1;

        let idx = (matter as usize).min(BUCKETS - 1);
        self.buckets[idx] += 1;
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    /// Prints the summary and the distribution of counts.
    pub fn print_report(&self) {
        println!("\nMatter Qubits");
        println!("Orders:   {}", self.count + self.failures);
        println!("Failed:   {}", self.failures);
        if self.count > 0 {
            println!("Min:      {}", self.min);
            println!("Avg:      {:.2}", self.avg());
            println!("Max:      {}", self.max);
        }
        if self.mismatches > 0 {
            println!("Differs from stored count: {}", self.mismatches);
        }

        println!("Distribution:");
        for (i, &count) in self.buckets.iter().enumerate() {
            if count > 0 {
                let more = if i == BUCKETS - 1 { "+" } else { "" };
                println!("[{i:2}{more}]: {count}");
            }
        }
    }
}
