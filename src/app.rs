//! # Monitor Module
//!
//! Consumer side of a measurement: drains sample updates from a source
//! thread into one `SessionController` and produces the final summary and
//! report once the source finishes or disconnects.

use crate::error::SessionError;
use crate::report::HeartRateReport;
use crate::session::{SessionController, SessionSummary};
use crate::source::SourceUpdate;
use crossbeam_channel::Receiver;
use serde::Serialize;

/// Summary and report of a completed measurement
#[derive(Debug, Clone, Serialize)]
pub struct MonitorOutcome {
    pub summary: SessionSummary,
    pub report: HeartRateReport,
}

pub struct Monitor {
    controller: SessionController,
    receiver: Receiver<SourceUpdate>,
    status_interval: u64,
}

impl Monitor {
    pub fn new(controller: SessionController, receiver: Receiver<SourceUpdate>) -> Self {
        // log a status line roughly every five seconds of frames
        let status_interval = (controller.config().sampling.sample_rate_hz * 5.0).round() as u64;
        Self {
            controller,
            receiver,
            status_interval: status_interval.max(1),
        }
    }

    pub fn run(mut self) -> Result<MonitorOutcome, SessionError> {
        self.controller.start_measurement();
        let mut last_rate = None;

        // Process updates until the source finishes or hangs up
        for update in self.receiver.iter() {
            match update {
                SourceUpdate::Sample(sample) => {
                    let status = self.controller.process_frame(sample);

                    if status.heart_rate != last_rate {
                        if let Some(bpm) = status.heart_rate {
                            log::info!("Heart rate: {} BPM ({})", bpm, self.controller.confidence());
                        }
                        last_rate = status.heart_rate;
                    }

                    if status.frame % self.status_interval == 0 {
                        log::info!(
                            "Frame {}: contact quality {:.1}, heart rate {:?}",
                            status.frame,
                            status.signal_quality,
                            status.heart_rate
                        );
                    }
                }
                SourceUpdate::Finished => {
                    log::debug!("Source finished");
                    break;
                }
                SourceUpdate::Error(e) => {
                    log::error!("{}", e);
                    break;
                }
            }
        }

        let summary = self.controller.stop_measurement()?;
        let report = self.controller.generate_report();

        Ok(MonitorOutcome { summary, report })
    }
}
