//! Terminal spinner shown while a chapter is being processed.
//!
//! A [`Spinner`] is configured, then [`Spinner::start`]ed into a
//! [`RunningSpinner`] which draws on a background task until
//! [`RunningSpinner::stop`] replaces the line with a final message. Stopping
//! consumes the handle, so a spinner cannot be stopped twice or restarted.

use std::io::Write;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Interval between frames
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

const DEFAULT_FRAMES: [&str; 4] = ["[=  ]", "[ = ]", "[  =]", "[ = ]"];

type Output = Box<dyn Write + Send>;

/// A spinner that has not started drawing yet
pub struct Spinner {
    message: String,
    frames: Vec<String>,
    output: Option<Output>,
}

impl Spinner {
    /// Spinner drawing to stdout
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            frames: DEFAULT_FRAMES.iter().map(|f| f.to_string()).collect(),
            output: Some(Box::new(std::io::stdout())),
        }
    }

    /// Spinner that draws nothing, for non-interactive runs
    pub fn hidden(message: impl Into<String>) -> Self {
        Self {
            output: None,
            ..Self::new(message)
        }
    }

    /// Replace the animation frames. An empty list keeps the defaults.
    pub fn with_frames<I, F>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        let frames: Vec<String> = frames.into_iter().map(Into::into).collect();
        if !frames.is_empty() {
            self.frames = frames;
        }
        self
    }

    /// Draw to `output` instead of stdout
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    /// Begin animating on a background task
    pub fn start(self) -> RunningSpinner {
        let Spinner {
            message,
            frames,
            output,
        } = self;
        let cancel_token = CancellationToken::new();
        let Some(mut output) = output else {
            return RunningSpinner {
                cancel_token,
                handle: None,
            };
        };

        let token = cancel_token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(FRAME_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut drawn = 0usize;

            for frame in frames.iter().cycle() {
                tokio::select! {
                    _ = interval.tick() => {
                        let line = format!("{frame} {message}");
                        if write!(output, "\r{line}").and_then(|()| output.flush()).is_err() {
                            break;
                        }
                        drawn = drawn.max(line.chars().count());
                    }
                    _ = token.cancelled() => break,
                }
            }
            (output, drawn)
        });

        RunningSpinner {
            cancel_token,
            handle: Some(handle),
        }
    }
}

/// A spinner currently drawing; see [`RunningSpinner::stop`]
pub struct RunningSpinner {
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<(Output, usize)>>,
}

impl RunningSpinner {
    /// Stop the animation, clear its line and print `final_message` in its place
    pub async fn stop(mut self, final_message: &str) {
        self.cancel_token.cancel();
        let Some(handle) = self.handle.take() else {
            return;
        };

        match handle.await {
            Ok((mut output, drawn)) => {
                let cleared = write!(output, "\r{}\r", " ".repeat(drawn))
                    .and_then(|()| writeln!(output, "{final_message}"))
                    .and_then(|()| output.flush());
                if let Err(e) = cleared {
                    tracing::debug!(error = %e, "Failed to finish spinner line");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Spinner task failed"),
        }
    }
}

impl Drop for RunningSpinner {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
