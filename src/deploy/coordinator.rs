// ABOUTME: Group commit/rollback decision across all service workers.
// ABOUTME: Collects one report per worker, then broadcasts a single decision to all of them.

use tokio::sync::{mpsc, watch};

use crate::types::ServiceName;

/// Code reported on behalf of a worker that went away without reporting.
pub const ABANDONED_CODE: u8 = 1;

/// The single group-wide outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Every service succeeded; keep the candidates.
    Commit,
    /// At least one service failed; restore every original.
    Rollback,
}

impl Decision {
    /// Roll back if any code is non-zero.
    pub fn from_codes(codes: impl IntoIterator<Item = u8>) -> Self {
        if codes.into_iter().any(|code| code > 0) {
            Decision::Rollback
        } else {
            Decision::Commit
        }
    }

    pub fn is_rollback(self) -> bool {
        self == Decision::Rollback
    }
}

/// One worker's pre-decision status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReport {
    pub service: ServiceName,
    pub code: u8,
}

/// What the coordinator saw and decided.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub decision: Decision,
    pub reports: Vec<ServiceReport>,
    /// Reports that never arrived because every gate was gone.
    pub missing: usize,
}

/// Waits for every worker's report, then decides once.
#[derive(Debug)]
pub struct RollbackCoordinator {
    expected: usize,
    reports: mpsc::Receiver<ServiceReport>,
    decision: watch::Sender<Option<Decision>>,
}

impl RollbackCoordinator {
    /// Create a coordinator and one decision gate per service, in order.
    pub fn new(services: &[ServiceName]) -> (Self, Vec<DecisionGate>) {
        let (reports_tx, reports_rx) = mpsc::channel(services.len().max(1));
        let (decision_tx, decision_rx) = watch::channel(None);

        let gates = services
            .iter()
            .map(|service| DecisionGate {
                service: service.clone(),
                reports: reports_tx.clone(),
                decision: decision_rx.clone(),
                reported: false,
            })
            .collect();

        let coordinator = Self {
            expected: services.len(),
            reports: reports_rx,
            decision: decision_tx,
        };

        (coordinator, gates)
    }

    /// Collect all reports and broadcast the decision.
    ///
    /// No decision is visible to any gate before every expected report has
    /// arrived. If the report channel closes early, the missing reports count
    /// as failures.
    pub async fn run(mut self) -> Verdict {
        let mut reports = Vec::with_capacity(self.expected);

        while reports.len() < self.expected {
            match self.reports.recv().await {
                Some(report) => {
                    tracing::debug!(service = %report.service, code = report.code, "worker reported");
                    reports.push(report);
                }
                None => break,
            }
        }

        let missing = self.expected - reports.len();
        let decision = if missing > 0 {
            Decision::Rollback
        } else {
            Decision::from_codes(reports.iter().map(|r| r.code))
        };

        tracing::info!(?decision, reports = reports.len(), missing, "group decision made");
        self.decision.send_replace(Some(decision));

        Verdict {
            decision,
            reports,
            missing,
        }
    }
}

/// A worker's handle on the coordinator.
///
/// Reports exactly once. Dropping a gate that never reported files an
/// abandoned report so the barrier still resolves.
#[derive(Debug)]
pub struct DecisionGate {
    service: ServiceName,
    reports: mpsc::Sender<ServiceReport>,
    decision: watch::Receiver<Option<Decision>>,
    reported: bool,
}

impl DecisionGate {
    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    /// Report this worker's code. Later calls are ignored.
    pub fn report(&mut self, code: u8) {
        if self.reported {
            tracing::debug!(service = %self.service, "already reported, ignoring");
            return;
        }
        self.reported = true;

        // Capacity equals the number of gates, each sends at most once.
        if let Err(e) = self.reports.try_send(ServiceReport {
            service: self.service.clone(),
            code,
        }) {
            tracing::warn!(service = %self.service, error = %e, "coordinator unavailable");
        }
    }

    /// Block until the group decision is known.
    ///
    /// Resolves to `Rollback` if the coordinator disappears without deciding.
    pub async fn decision(&mut self) -> Decision {
        let decided = self
            .decision
            .wait_for(Option::is_some)
            .await
            .map(|decision| *decision);

        match decided {
            Ok(Some(decision)) => decision,
            _ => Decision::Rollback,
        }
    }
}

impl Drop for DecisionGate {
    fn drop(&mut self) {
        if !self.reported {
            tracing::warn!(service = %self.service, "worker went away without reporting");
            self.report(ABANDONED_CODE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn names(values: &[&str]) -> Vec<ServiceName> {
        values.iter().map(|v| ServiceName::new(v).unwrap()).collect()
    }

    #[test]
    fn decision_from_codes() {
        assert_eq!(Decision::from_codes([0, 0, 0]), Decision::Commit);
        assert_eq!(Decision::from_codes([0, 5, 0]), Decision::Rollback);
        assert_eq!(Decision::from_codes(Vec::new()), Decision::Commit);
        assert!(Decision::Rollback.is_rollback());
    }

    #[tokio::test]
    async fn all_success_commits_everyone() {
        let (coordinator, gates) = RollbackCoordinator::new(&names(&["a", "b", "c"]));
        let verdict = tokio::spawn(coordinator.run());

        let mut handles = Vec::new();
        for mut gate in gates {
            handles.push(tokio::spawn(async move {
                gate.report(0);
                gate.decision().await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Decision::Commit);
        }
        let verdict = verdict.await.unwrap();
        assert_eq!(verdict.decision, Decision::Commit);
        assert_eq!(verdict.reports.len(), 3);
        assert_eq!(verdict.missing, 0);
    }

    #[tokio::test]
    async fn one_failure_rolls_back_everyone() {
        let (coordinator, gates) = RollbackCoordinator::new(&names(&["a", "b", "c"]));
        let verdict = tokio::spawn(coordinator.run());

        let mut handles = Vec::new();
        for (i, mut gate) in gates.into_iter().enumerate() {
            handles.push(tokio::spawn(async move {
                gate.report(if i == 1 { 5 } else { 0 });
                gate.decision().await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Decision::Rollback);
        }
        assert_eq!(verdict.await.unwrap().decision, Decision::Rollback);
    }

    #[tokio::test]
    async fn no_decision_before_all_reports() {
        let (coordinator, mut gates) = RollbackCoordinator::new(&names(&["fast", "slow"]));
        let _verdict = tokio::spawn(coordinator.run());

        let mut slow = gates.pop().unwrap();
        let mut fast = gates.pop().unwrap();

        fast.report(5);
        let early = tokio::time::timeout(Duration::from_millis(50), fast.decision()).await;
        assert!(early.is_err(), "decision must wait for the slow worker");

        slow.report(0);
        assert_eq!(fast.decision().await, Decision::Rollback);
        assert_eq!(slow.decision().await, Decision::Rollback);
    }

    #[tokio::test]
    async fn dropped_gate_counts_as_failure() {
        let (coordinator, mut gates) = RollbackCoordinator::new(&names(&["a", "b"]));
        let verdict = tokio::spawn(coordinator.run());

        let gone = gates.pop().unwrap();
        drop(gone);

        let mut survivor = gates.pop().unwrap();
        survivor.report(0);
        assert_eq!(survivor.decision().await, Decision::Rollback);

        let verdict = verdict.await.unwrap();
        assert!(
            verdict
                .reports
                .iter()
                .any(|r| r.service.as_str() == "b" && r.code == ABANDONED_CODE)
        );
    }

    #[tokio::test]
    async fn second_report_is_ignored() {
        let (coordinator, mut gates) = RollbackCoordinator::new(&names(&["a", "b"]));
        let verdict = tokio::spawn(coordinator.run());

        let mut b = gates.pop().unwrap();
        let mut a = gates.pop().unwrap();
        a.report(0);
        a.report(5);
        b.report(0);

        assert_eq!(a.decision().await, Decision::Commit);
        let verdict = verdict.await.unwrap();
        assert_eq!(verdict.reports.len(), 2);
        assert!(verdict.reports.iter().all(|r| r.code == 0));
    }
}
