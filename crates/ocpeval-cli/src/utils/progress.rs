use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use ocpeval::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0).with_message("Initializing...");
        if let Ok(style) = Self::spinner_style() {
            pb.set_style(style);
        }
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    pb_guard.reset();
                    pb_guard.set_length(0);
                    Self::apply_style(&pb_guard, Self::spinner_style());
                    pb_guard.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb_guard.set_message(name.to_string());
                }
                Progress::PhaseFinish => {
                    pb_guard.disable_steady_tick();
                    pb_guard.finish_with_message("✓ Done");
                }
                Progress::TaskStart { total_batches } => {
                    pb_guard.reset();
                    pb_guard.set_position(0);
                    if let Some(total) = total_batches {
                        pb_guard.disable_steady_tick();
                        pb_guard.set_length(total);
                        Self::apply_style(&pb_guard, Self::bar_style());
                    } else {
                        pb_guard.unset_length();
                    }
                }
                Progress::BatchEvaluated { .. } => {
                    pb_guard.inc(1);
                }
                Progress::BatchSkipped { index, reason } => {
                    pb_guard.inc(1);
                    pb_guard.println(format!("  ! batch {index} skipped: {reason}"));
                }
                Progress::TaskFinish => {
                    if let Some(len) = pb_guard.length() {
                        if pb_guard.position() < len {
                            pb_guard.set_position(len);
                        }
                    }
                    pb_guard.finish();
                }
                Progress::Message(msg) => {
                    if !pb_guard.is_finished() {
                        pb_guard.println(format!("  {}", msg));
                    } else {
                        pb_guard.set_message(msg);
                    }
                }
            }
        })
    }

    fn apply_style(pb: &ProgressBar, style: Result<ProgressStyle, indicatif::style::TemplateError>) {
        match style {
            Ok(style) => pb.set_style(style),
            Err(e) => warn!("Invalid progress bar template: {}", e),
        }
    }

    fn spinner_style() -> Result<ProgressStyle, indicatif::style::TemplateError> {
        ProgressStyle::with_template("{spinner:.green} {msg}")
    }

    fn bar_style() -> Result<ProgressStyle, indicatif::style::TemplateError> {
        Ok(
            ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .with_key(
                    "eta",
                    |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                        let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                    },
                )
                .progress_chars("##-"),
        )
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
