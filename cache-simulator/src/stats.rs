// Reporting for trace replay results

use crate::models::{CsvResultRow, SimulationConfig, SimulationResult};
use std::path::Path;

/// Holds a finished replay together with the configuration that produced it
#[derive(Debug)]
pub struct SimulationStats<'a> {
    config: &'a SimulationConfig,
    result: &'a SimulationResult,
}

impl<'a> SimulationStats<'a> {
    pub fn new(config: &'a SimulationConfig, result: &'a SimulationResult) -> Self {
        Self { config, result }
    }

    /// Print a summary report of the replay
    pub fn print_summary(&self) {
        let r = self.result;

        println!("\nLeCaR Replay Summary");
        println!("====================");
        println!("Mode: {}", self.config.mode);
        println!("Capacity: {} bytes", self.config.capacity);
        println!(
            "Learning rate: {}  Discount rate: {}",
            self.config.learning_rate, self.config.discount_rate
        );
        println!();
        println!("Requests:       {:>12}", r.requests);
        println!("Unique objects: {:>12}", r.unique_objects);
        println!("Hits:           {:>12}", r.hits);
        println!("Misses:         {:>12}", r.misses);
        println!("Rejected:       {:>12}  (larger than the cache)", r.rejected);
        println!("Hit rate:       {:>11.2}%", r.hit_rate());
        println!("Byte hit rate:  {:>11.2}%", r.byte_hit_rate());
        println!();
        println!(
            "Weights:        LRU {:.4}  LFU {:.4}",
            r.weight_lru, r.weight_lfu
        );
        println!(
            "Evictions:      LRU {}  LFU {}  (clock {})",
            r.lru_evictions, r.lfu_evictions, r.clock
        );
        println!("Regrets:        LRU {}  LFU {}", r.lru_regrets, r.lfu_regrets);
        println!("Final storage:  {} bytes", r.final_storage_bytes);
        println!();
        println!(
            "Replayed in {:.2?} ({:.0} cache ops/sec)",
            r.duration,
            r.ops_per_sec()
        );
    }

    /// The CSV row for this replay
    pub fn row(&self) -> CsvResultRow {
        let r = self.result;
        CsvResultRow {
            mode: self.config.mode.as_str().to_string(),
            capacity: self.config.capacity,
            learning_rate: self.config.learning_rate,
            discount_rate: self.config.discount_rate,
            requests: r.requests,
            hits: r.hits,
            misses: r.misses,
            hit_rate: r.hit_rate(),
            byte_hit_rate: r.byte_hit_rate(),
            rejected: r.rejected,
            unique_objects: r.unique_objects,
            weight_lru: r.weight_lru,
            weight_lfu: r.weight_lfu,
            clock: r.clock,
            lru_evictions: r.lru_evictions,
            lfu_evictions: r.lfu_evictions,
            lru_regrets: r.lru_regrets,
            lfu_regrets: r.lfu_regrets,
            final_storage_bytes: r.final_storage_bytes,
            duration_ms: r.duration.as_millis(),
            ops_per_sec: r.ops_per_sec(),
        }
    }

    /// Export the replay as a one-row CSV file with a header
    pub fn export_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.serialize(self.row())?;
        writer.flush()?;
        Ok(())
    }
}
