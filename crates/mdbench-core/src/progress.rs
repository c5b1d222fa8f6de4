//! Progress events emitted while building and benchmarking.
//!
//! The core never draws anything itself. Front-ends install a callback on a
//! [`ProgressReporter`] and render the events however they like; a reporter
//! without a callback silently drops them.

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// A named phase began, e.g. "Setting up release simulation".
    PhaseStart { name: String },
    PhaseFinish,

    /// A counted task inside the current phase, one step per repetition.
    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    pub fn phase(&self, name: impl Into<String>) {
        self.report(Progress::PhaseStart { name: name.into() });
    }

    pub fn message(&self, text: impl Into<String>) {
        self.report(Progress::Message(text.into()));
    }
}
