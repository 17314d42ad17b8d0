// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-scheduler submit-output and status-line parsing (§4.7). Each
//! scheduler speaks a different dialect over the same transport; this
//! module is where that dialect lives, kept separate from the transport
//! and the pipeline state machine so a new scheduler needs only a new
//! `SchedulerProtocol` impl.

use mq_core::{JobState, QueueJobId, QueueType};
use regex::Regex;

/// Translates a scheduler's submission and status output into the
/// types the pipeline engine understands. Implementations are pure and
/// synchronous: all I/O happens in the transport layer.
pub trait SchedulerProtocol: Send + Sync {
    /// Extract the backend-assigned job id from a successful submission
    /// command's combined stdout+stderr.
    fn parse_submit_output(&self, output: &str) -> Option<QueueJobId>;

    /// Parse one line of a status listing, returning the job it
    /// describes and the state to transition it to. Lines that do not
    /// describe a job (headers, blanks) return `None`.
    fn parse_status_line(&self, line: &str) -> Option<(QueueJobId, JobState)>;

    /// Build the status-query command for a single job id, used when
    /// the queue's `queue_status_command` template needs no further
    /// templating than appending the id.
    fn status_command(&self, base_command: &str, id: &QueueJobId) -> String {
        format!("{base_command} {}", id.as_str())
    }
}

pub fn for_queue_type(queue_type: QueueType) -> Box<dyn SchedulerProtocol> {
    match queue_type {
        QueueType::Pbs => Box::new(PbsProtocol::new()),
        QueueType::Sge => Box::new(SgeProtocol::new()),
        QueueType::Slurm => Box::new(SlurmProtocol::new()),
        QueueType::Oar => Box::new(OarProtocol::new()),
        QueueType::Local | QueueType::Uit => {
            panic!("for_queue_type called with a non-batch queue type: {queue_type:?}")
        }
    }
}

pub struct PbsProtocol {
    submit_re: Regex,
    status_re: Regex,
}

impl PbsProtocol {
    pub fn new() -> Self {
        Self {
            submit_re: Regex::new(r"^(\S+)\s*$").expect("static regex"),
            status_re: Regex::new(r"^(\S+)\.\S+\s+\S+\s+\S+\s+\S+\s+(\S)\s").expect("static regex"),
        }
    }
}

impl Default for PbsProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerProtocol for PbsProtocol {
    fn parse_submit_output(&self, output: &str) -> Option<QueueJobId> {
        let line = output.lines().next_back().unwrap_or("").trim();
        self.submit_re
            .captures(line)
            .map(|c| QueueJobId::new(c[1].to_string()))
    }

    fn parse_status_line(&self, line: &str) -> Option<(QueueJobId, JobState)> {
        let caps = self.status_re.captures(line)?;
        let id = QueueJobId::new(caps[1].to_string());
        let state = match &caps[2] {
            "Q" | "H" | "W" => JobState::QueuedRemote,
            // "C" (complete) still means the job is present in the
            // listing; the pipeline only finalizes once it drops out.
            "R" | "E" | "S" | "C" => JobState::RunningRemote,
            _ => return None,
        };
        Some((id, state))
    }
}

pub struct SgeProtocol {
    submit_re: Regex,
    status_re: Regex,
}

impl SgeProtocol {
    pub fn new() -> Self {
        Self {
            submit_re: Regex::new(r"Your job (\d+) ").expect("static regex"),
            status_re: Regex::new(r"^\s*(\d+)\s+\S+\s+\S+\s+\S+\s+(\S+)\s").expect("static regex"),
        }
    }
}

impl Default for SgeProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerProtocol for SgeProtocol {
    fn parse_submit_output(&self, output: &str) -> Option<QueueJobId> {
        self.submit_re
            .captures(output)
            .map(|c| QueueJobId::new(c[1].to_string()))
    }

    fn parse_status_line(&self, line: &str) -> Option<(QueueJobId, JobState)> {
        let caps = self.status_re.captures(line)?;
        let id = QueueJobId::new(caps[1].to_string());
        let state = match &caps[2] {
            s if s.contains('E') => JobState::Error,
            s if s.contains('q') && s.contains('w') => JobState::QueuedRemote,
            // "r"/"t" running, "d" deleting: both still present in
            // `qstat`'s listing, finalized once the listing drops them.
            "r" | "t" => JobState::RunningRemote,
            s if s.contains('d') => JobState::RunningRemote,
            _ => return None,
        };
        Some((id, state))
    }
}

pub struct SlurmProtocol {
    submit_re: Regex,
    status_re: Regex,
}

impl SlurmProtocol {
    pub fn new() -> Self {
        Self {
            submit_re: Regex::new(r"Submitted batch job (\d+)").expect("static regex"),
            status_re: Regex::new(r"^\s*(\S+)\s+(\S+)\s*$").expect("static regex"),
        }
    }
}

impl Default for SlurmProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerProtocol for SlurmProtocol {
    fn parse_submit_output(&self, output: &str) -> Option<QueueJobId> {
        self.submit_re
            .captures(output)
            .map(|c| QueueJobId::new(c[1].to_string()))
    }

    fn parse_status_line(&self, line: &str) -> Option<(QueueJobId, JobState)> {
        let caps = self.status_re.captures(line)?;
        let id = QueueJobId::new(caps[1].to_string());
        let state = match caps[2].to_ascii_uppercase().as_str() {
            "PENDING" | "CONFIGURING" => JobState::QueuedRemote,
            "FAILED" | "TIMEOUT" | "NODE_FAIL" => JobState::Error,
            // `squeue` keeps reporting COMPLETED/CANCELLED for a job
            // still in its listing; finalization waits for it to drop
            // out rather than acting on this status directly.
            "RUNNING" | "COMPLETING" | "COMPLETED" | "CANCELLED" => JobState::RunningRemote,
            _ => return None,
        };
        Some((id, state))
    }
}

pub struct OarProtocol {
    submit_re: Regex,
    status_re: Regex,
}

impl OarProtocol {
    pub fn new() -> Self {
        Self {
            submit_re: Regex::new(r"OAR_JOB_ID=(\d+)").expect("static regex"),
            status_re: Regex::new(r"^\s*(\d+)\s+\S+\s+(\S+)\s*$").expect("static regex"),
        }
    }
}

impl Default for OarProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerProtocol for OarProtocol {
    fn parse_submit_output(&self, output: &str) -> Option<QueueJobId> {
        self.submit_re
            .captures(output)
            .map(|c| QueueJobId::new(c[1].to_string()))
    }

    fn parse_status_line(&self, line: &str) -> Option<(QueueJobId, JobState)> {
        let caps = self.status_re.captures(line)?;
        let id = QueueJobId::new(caps[1].to_string());
        let state = match &caps[2] {
            "Waiting" | "toLaunch" | "toAckReservation" => JobState::QueuedRemote,
            "Error" => JobState::Error,
            // "Terminated" still appears in `oarstat`'s listing; wait
            // for it to vanish before finalizing.
            "Launching" | "Running" | "Finishing" | "Terminated" => JobState::RunningRemote,
            _ => return None,
        };
        Some((id, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pbs_parses_submit_output() {
        let p = PbsProtocol::new();
        assert_eq!(p.parse_submit_output("12345.headnode.cluster\n").unwrap().as_str(), "12345");
    }

    #[yare::parameterized(
        queued_q = {"Q", JobState::QueuedRemote},
        queued_h = {"H", JobState::QueuedRemote},
        queued_w = {"W", JobState::QueuedRemote},
        running_r = {"R", JobState::RunningRemote},
        running_e = {"E", JobState::RunningRemote},
        running_s = {"S", JobState::RunningRemote},
        // "C" (complete) is still present in the listing, so it stays
        // in the closed {Queued,Running,Error} set until it vanishes.
        completing_c = {"C", JobState::RunningRemote},
    )]
    fn pbs_status_mapping(code: &str, expected: JobState) {
        let p = PbsProtocol::new();
        let line = format!("12345.srv  user  batch  job  {code} 00:00:00");
        assert_eq!(p.parse_status_line(&line).unwrap().1, expected);
    }

    #[test]
    fn sge_parses_submit_output() {
        let p = SgeProtocol::new();
        let out = p.parse_submit_output("Your job 98765 (\"mq.sh\") has been submitted\n").unwrap();
        assert_eq!(out.as_str(), "98765");
    }

    #[yare::parameterized(
        queued_waiting = {"qw", JobState::QueuedRemote},
        running = {"r", JobState::RunningRemote},
        transferring = {"t", JobState::RunningRemote},
        error = {"Eqw", JobState::Error},
        // "d" (deleting) is still present in `qstat`'s listing.
        deleting = {"dr", JobState::RunningRemote},
    )]
    fn sge_status_mapping(code: &str, expected: JobState) {
        let p = SgeProtocol::new();
        let line = format!("98765 0.5 mq.sh    user   {code}    08/01/2026 00:00:00");
        assert_eq!(p.parse_status_line(&line).unwrap().1, expected);
    }

    #[test]
    fn slurm_parses_submit_output() {
        let p = SlurmProtocol::new();
        assert_eq!(p.parse_submit_output("Submitted batch job 555\n").unwrap().as_str(), "555");
    }

    #[yare::parameterized(
        pending = {"PENDING", JobState::QueuedRemote},
        configuring = {"CONFIGURING", JobState::QueuedRemote},
        running = {"RUNNING", JobState::RunningRemote},
        completing = {"COMPLETING", JobState::RunningRemote},
        // Still listed, so not a terminal mapping: the pipeline
        // finalizes once `squeue` stops reporting the job at all.
        completed = {"COMPLETED", JobState::RunningRemote},
        cancelled = {"CANCELLED", JobState::RunningRemote},
        failed = {"FAILED", JobState::Error},
        timeout = {"TIMEOUT", JobState::Error},
        node_fail = {"NODE_FAIL", JobState::Error},
    )]
    fn slurm_status_mapping(code: &str, expected: JobState) {
        let p = SlurmProtocol::new();
        let line = format!("555 {code}");
        assert_eq!(p.parse_status_line(&line).unwrap().1, expected);
    }

    #[test]
    fn oar_parses_submit_output() {
        let p = OarProtocol::new();
        assert_eq!(p.parse_submit_output("OAR_JOB_ID=4242\n").unwrap().as_str(), "4242");
    }

    #[yare::parameterized(
        waiting = {"Waiting", JobState::QueuedRemote},
        to_launch = {"toLaunch", JobState::QueuedRemote},
        to_ack_reservation = {"toAckReservation", JobState::QueuedRemote},
        launching = {"Launching", JobState::RunningRemote},
        running = {"Running", JobState::RunningRemote},
        finishing = {"Finishing", JobState::RunningRemote},
        // Still listed as "Terminated" until `oarstat` drops it.
        terminated = {"Terminated", JobState::RunningRemote},
        error = {"Error", JobState::Error},
    )]
    fn oar_status_mapping(code: &str, expected: JobState) {
        let p = OarProtocol::new();
        let line = format!("4242 besteffort {code}");
        assert_eq!(p.parse_status_line(&line).unwrap().1, expected);
    }

    #[test]
    fn unrecognized_lines_yield_none() {
        let p = SlurmProtocol::new();
        assert!(p.parse_status_line("JOBID STATE").is_none());
    }
}
