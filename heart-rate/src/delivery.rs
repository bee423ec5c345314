//! Hands pipeline outputs to consumers without blocking the tick loop.
//!
//! The [Emitter] side lives with the pipeline and only ever calls `try_send`. If the
//! consumer falls behind, outputs are dropped rather than delaying the next tick.
//! [run_sink] is the consumer side, writing each output as one line of JSON.
use crate::{
    detectors::BeatEvent,
    pipeline::{Measurement, TickOutput},
};
use heart_rate_common::metrics::{
    failures::{self, FailureKind},
    names::{FAILURES, MEASUREMENTS_EMITTED},
};
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc::{self, Receiver, Sender, error::TrySendError},
};
use tracing::{debug, error, info, instrument, warn};

/// A single item delivered to consumers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Emission {
    Measurement(Measurement),
    Beat(BeatEvent),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Cannot serialise output: {0}")]
    Serialise(#[from] serde_json::Error),
    #[error("Cannot write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Creates an emitter and the receiver its outputs arrive on.
/// # Parameters
/// - buffer_size: the number of outputs that may be queued before new ones are dropped.
pub fn channel(buffer_size: usize) -> (Emitter, Receiver<Emission>) {
    let (sender, receiver) = mpsc::channel(buffer_size.max(1));
    (Emitter { sender }, receiver)
}

pub struct Emitter {
    sender: Sender<Emission>,
}

impl Emitter {
    /// Queues the measurement and, if there is one, the beat. Never waits.
    pub fn emit(&self, output: TickOutput) {
        if self.send(Emission::Measurement(output.measurement)) {
            counter!(MEASUREMENTS_EMITTED).increment(1);
        }
        if let Some(beat) = output.beat {
            self.send(Emission::Beat(beat));
        }
    }

    fn send(&self, emission: Emission) -> bool {
        match self.sender.try_send(emission) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Send-Output Buffer Full, dropping output");
                counter!(
                    FAILURES,
                    &[failures::get_label(FailureKind::DeliveryBufferFull)]
                )
                .increment(1);
                false
            }
            Err(TrySendError::Closed(_)) => {
                error!("Send-Output Channel Closed");
                counter!(
                    FAILURES,
                    &[failures::get_label(FailureKind::DeliveryChannelClosed)]
                )
                .increment(1);
                false
            }
        }
    }
}

/// Writes every emission received as a line of JSON, until all emitters are dropped.
///
/// Returns the number of lines written.
#[instrument(skip_all, err(level = "error"))]
pub async fn run_sink<W>(mut receiver: Receiver<Emission>, mut writer: W) -> Result<usize, SinkError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(emission) = receiver.recv().await {
        match &emission {
            Emission::Measurement(measurement) => debug!(
                "{} bpm, colour {}",
                measurement.hr.round(),
                measurement.rgb
            ),
            Emission::Beat(beat) => debug!("Beat at {} ms", beat.time),
        }
        write_line(&mut writer, &emission)
            .await
            .inspect_err(|_| {
                counter!(
                    FAILURES,
                    &[failures::get_label(FailureKind::SinkWriteFailed)]
                )
                .increment(1);
            })?;
        written += 1;
    }
    info!("Send-Output channel closed");
    writer.flush().await?;
    Ok(written)
}

async fn write_line<W>(writer: &mut W, emission: &Emission) -> Result<(), SinkError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(emission)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
