use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct StageStats {
    pub stage: String,
    pub stage_elapsed: Duration,
    pub total_elapsed: Duration,
    pub memory_usage_mb: Option<u64>,
    pub cpu_usage: Option<f32>,
}

/// Per-stage timings, plus process CPU and memory when the `cli` feature
/// brings in `sysinfo`.
pub struct StageMonitor {
    enabled: bool,
    start_time: Instant,
    stage_start: Instant,
    peak_memory_mb: u64,
    #[cfg(feature = "cli")]
    system: Option<(sysinfo::System, sysinfo::Pid)>,
}

impl StageMonitor {
    pub fn new(enabled: bool) -> Self {
        let now = Instant::now();
        Self {
            enabled,
            start_time: now,
            stage_start: now,
            peak_memory_mb: 0,
            #[cfg(feature = "cli")]
            system: if enabled { process_handle() } else { None },
        }
    }

    /// Close the current stage and start timing the next one.
    pub fn finish_stage(&mut self, stage: &str) -> StageStats {
        let now = Instant::now();
        let (memory_usage_mb, cpu_usage) = self.sample();
        if let Some(memory) = memory_usage_mb {
            self.peak_memory_mb = self.peak_memory_mb.max(memory);
        }

        let stats = StageStats {
            stage: stage.to_string(),
            stage_elapsed: now - self.stage_start,
            total_elapsed: now - self.start_time,
            memory_usage_mb,
            cpu_usage,
        };
        self.stage_start = now;

        if self.enabled {
            tracing::info!(
                stage = %stats.stage,
                elapsed_ms = stats.stage_elapsed.as_millis() as u64,
                memory_mb = stats.memory_usage_mb,
                cpu = stats.cpu_usage,
                "📊 Stage finished"
            );
        }
        stats
    }

    pub fn log_final_stats(&self) {
        if self.enabled {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                self.start_time.elapsed(),
                self.peak_memory_mb
            );
        }
    }

    #[cfg(feature = "cli")]
    fn sample(&mut self) -> (Option<u64>, Option<f32>) {
        let Some((system, pid)) = self.system.as_mut() else {
            return (None, None);
        };
        system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[*pid]), true);
        match system.process(*pid) {
            Some(process) => (Some(process.memory() / 1024 / 1024), Some(process.cpu_usage())),
            None => (None, None),
        }
    }

    #[cfg(not(feature = "cli"))]
    fn sample(&mut self) -> (Option<u64>, Option<f32>) {
        (None, None)
    }
}

#[cfg(feature = "cli")]
fn process_handle() -> Option<(sysinfo::System, sysinfo::Pid)> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = sysinfo::System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
    Some((system, pid))
}

impl Default for StageMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
