//! Metric names and labels shared by the components.
use metrics::gauge;

pub mod names {
    use const_format::concatcp;

    pub const METRIC_NAME_PREFIX: &str = "heart_rate_";
    pub const COMPONENT_INFO: &str = concatcp!(METRIC_NAME_PREFIX, "component_info");
    pub const FRAMES_RECEIVED: &str = concatcp!(METRIC_NAME_PREFIX, "frames_received");
    pub const MEASUREMENTS_EMITTED: &str = concatcp!(METRIC_NAME_PREFIX, "measurements_emitted");
    pub const BEATS_DETECTED: &str = concatcp!(METRIC_NAME_PREFIX, "beats_detected");
    pub const LAST_HEART_RATE: &str = concatcp!(METRIC_NAME_PREFIX, "last_heart_rate_bpm");
    pub const FAILURES: &str = concatcp!(METRIC_NAME_PREFIX, "failures");
}

pub mod failures {
    use strum::{Display, IntoStaticStr};

    /// Reasons recorded against the [FAILURES](super::names::FAILURES) counter.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Display, IntoStaticStr)]
    #[strum(serialize_all = "snake_case")]
    pub enum FailureKind {
        /// A frame whose buffer does not match its declared geometry.
        InvalidFrame,
        /// The delivery channel had no room for another output.
        DeliveryBufferFull,
        /// The consumer side of the delivery channel has gone away.
        DeliveryChannelClosed,
        /// The sink could not write or serialise an output.
        SinkWriteFailed,
    }

    pub fn get_label(kind: FailureKind) -> (&'static str, &'static str) {
        ("failure_kind", kind.into())
    }
}

/// Publishes a constant gauge identifying the running component and its version.
pub fn component_info_metric(component: &'static str, version: &'static str) {
    gauge!(
        names::COMPONENT_INFO,
        &[("component", component), ("version", version)]
    )
    .set(1.0);
}
