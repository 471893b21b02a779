use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rabit_cijobs::status::JobStatus;

use super::styling::{running, status_line};

/// Spinner shown while waiting for a build to leave `Inprogress`.
pub struct WaitProgress {
    pb: ProgressBar,
    label: String,
}

impl WaitProgress {
    pub fn start(job: &str, build: Option<u64>) -> Self {
        let label = match build {
            Some(build) => format!("{job}_{build}"),
            None => job.to_string(),
        };
        let pb = create_spinner(status_line(&label, Some(&JobStatus::Inprogress)));
        Self { pb, label }
    }

    pub fn tick(&self, polls: u32) {
        self.pb.set_message(
            running(format!("{}: Inprogress (poll {polls})", self.label)).to_string(),
        );
    }

    pub fn finish(self, status: Option<&JobStatus>) {
        self.pb.finish_with_message(status_line(&self.label, status));
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
