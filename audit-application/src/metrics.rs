use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    audit_runs: AtomicU64,
    audit_run_errors: AtomicU64,
    anomalies_detected: AtomicU64,
    anomalies_persisted: AtomicU64,
    persist_errors: AtomicU64,
}

impl Metrics {
    pub fn record_run(&self) {
        self.audit_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_error(&self) {
        self.audit_run_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_anomalies(&self, count: usize) {
        self.anomalies_detected
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_persisted(&self, count: usize) {
        self.anomalies_persisted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_persist_error(&self) {
        self.persist_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_prometheus(&self) -> String {
        let runs = self.audit_runs.load(Ordering::Relaxed);
        let run_errors = self.audit_run_errors.load(Ordering::Relaxed);
        let detected = self.anomalies_detected.load(Ordering::Relaxed);
        let persisted = self.anomalies_persisted.load(Ordering::Relaxed);
        let persist_errors = self.persist_errors.load(Ordering::Relaxed);

        format!(
            "# TYPE finsentry_audit_runs_total counter\n\
finsentry_audit_runs_total {}\n\
# TYPE finsentry_audit_run_errors_total counter\n\
finsentry_audit_run_errors_total {}\n\
# TYPE finsentry_anomalies_detected_total counter\n\
finsentry_anomalies_detected_total {}\n\
# TYPE finsentry_anomalies_persisted_total counter\n\
finsentry_anomalies_persisted_total {}\n\
# TYPE finsentry_persist_errors_total counter\n\
finsentry_persist_errors_total {}\n",
            runs, run_errors, detected, persisted, persist_errors
        )
    }
}
