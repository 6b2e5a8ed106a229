use crate::Phase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The start request was accepted; the caller must launch the pipeline.
    LaunchRun { run: u64 },
    /// A run is already active in `phase`.
    StartRejected { phase: Phase },
    /// A stage update arrived out of order and was ignored.
    TransitionIgnored { from: Phase, to: Phase },
}
