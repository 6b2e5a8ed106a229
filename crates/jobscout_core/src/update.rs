use crate::{Effect, Msg, Phase, RunState};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages about a run that is no longer active (counter updates, a late
/// `Finished`) are dropped, so a terminal state cannot be re-opened except by
/// `StartRequested`.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested { at } => {
            if state.is_running() {
                vec![Effect::StartRejected {
                    phase: state.phase(),
                }]
            } else {
                state.begin(at);
                vec![Effect::LaunchRun { run: state.run() }]
            }
        }
        Msg::PhaseEntered { phase, at } => {
            let from = state.phase();
            if phase.is_running() && state.enter(phase, at) {
                Vec::new()
            } else {
                vec![Effect::TransitionIgnored { from, to: phase }]
            }
        }
        Msg::ListingsFound { count, at } => {
            if state.is_running() {
                state.set_listings_found(count, at);
            }
            Vec::new()
        }
        Msg::ListingsProcessed { count, at } => {
            if state.is_running() {
                state.set_listings_processed(count, at);
            }
            Vec::new()
        }
        Msg::Enriched { count, at } => {
            if state.is_running() {
                state.set_enriched(count, at);
            }
            Vec::new()
        }
        Msg::Persisted { total, at } => {
            if state.is_running() {
                state.set_persisted(total, at);
            }
            Vec::new()
        }
        Msg::Finished { at } => {
            let from = state.phase();
            if state.enter(Phase::Completed, at) {
                Vec::new()
            } else {
                vec![Effect::TransitionIgnored {
                    from,
                    to: Phase::Completed,
                }]
            }
        }
        Msg::Failed { error, at } => {
            if state.is_running() {
                state.fail(error, at);
                Vec::new()
            } else {
                vec![Effect::TransitionIgnored {
                    from: state.phase(),
                    to: Phase::Failed,
                }]
            }
        }
    };

    (state, effects)
}
