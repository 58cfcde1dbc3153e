use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("confidant.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("confidant.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("confidant.client.request_duration_seconds");

pub(crate) static PERSONA_REQUESTS: Counter = Counter::new("confidant.persona.requests");
pub(crate) static PERSONA_REQUEST_ERRORS: Counter =
    Counter::new("confidant.persona.request_errors");

pub(crate) static SESSION_REPLIES: Counter = Counter::new("confidant.session.replies");
pub(crate) static SESSION_FAILURES_AUTH: Counter =
    Counter::new("confidant.session.failures.auth");
pub(crate) static SESSION_FAILURES_RATE_LIMITED: Counter =
    Counter::new("confidant.session.failures.rate_limited");
pub(crate) static SESSION_FAILURES_NETWORK: Counter =
    Counter::new("confidant.session.failures.network");
pub(crate) static SESSION_FAILURES_SERVER: Counter =
    Counter::new("confidant.session.failures.server");
pub(crate) static SESSION_FAILURES_OTHER: Counter =
    Counter::new("confidant.session.failures.other");
pub(crate) static SESSION_DROPPED_SUBMITS: Counter =
    Counter::new("confidant.session.dropped_submits");
pub(crate) static SESSION_TURN_DURATION: Moments =
    Moments::new("confidant.session.turn_duration_seconds");
pub(crate) static PERSONA_SWITCHES: Counter = Counter::new("confidant.session.persona_switches");
pub(crate) static CREDENTIAL_RESETS: Counter = Counter::new("confidant.session.credential_resets");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&PERSONA_REQUESTS);
    collector.register_counter(&PERSONA_REQUEST_ERRORS);

    collector.register_counter(&SESSION_REPLIES);
    collector.register_counter(&SESSION_FAILURES_AUTH);
    collector.register_counter(&SESSION_FAILURES_RATE_LIMITED);
    collector.register_counter(&SESSION_FAILURES_NETWORK);
    collector.register_counter(&SESSION_FAILURES_SERVER);
    collector.register_counter(&SESSION_FAILURES_OTHER);
    collector.register_counter(&SESSION_DROPPED_SUBMITS);
    collector.register_moments(&SESSION_TURN_DURATION);
    collector.register_counter(&PERSONA_SWITCHES);
    collector.register_counter(&CREDENTIAL_RESETS);
}
