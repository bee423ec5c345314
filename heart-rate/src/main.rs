//! # Heart Rate
//!
//! The Heart Rate component performs the following functions:
//! * Reads a stream of raw frames, from a file or stdin, at the configured frame rate.
//! * Runs each frame through the heart rate pipeline.
//! * For each frame, writes a measurement as a line of JSON, followed by a beat line whenever one is detected.
//!
use clap::Parser;
use heart_rate::{
    delivery::{self, Emitter},
    frame::Frame,
    parameters::PipelineSettings,
    pipeline::Pipeline,
    source::{FrameReader, SourceError},
};
use heart_rate_common::{
    PixelLayout, Real, Timestamp,
    metrics::{
        component_info_metric,
        names::{BEATS_DETECTED, FAILURES, FRAMES_RECEIVED, LAST_HEART_RATE, MEASUREMENTS_EMITTED},
    },
    tracer::{TracerOptions, init_tracer},
};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use miette::IntoDiagnostic;
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    select,
    signal::unix::{SignalKind, signal},
    time::{Instant, Interval, MissedTickBehavior, interval},
};
use tracing::{info, instrument};

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// [clap] derived struct to handle command line parameters.
#[derive(Debug, Parser)]
#[clap(author, version = heart_rate_common::version!(), about)]
struct Cli {
    #[clap(flatten)]
    settings: PipelineSettings,

    /// Raw frame stream to read, "-" reads from stdin
    #[clap(long, default_value = "-")]
    input: PathBuf,

    /// Width of each frame, in pixels
    #[clap(long, default_value = "30")]
    width: usize,

    /// Height of each frame, in pixels
    #[clap(long, default_value = "30")]
    height: usize,

    /// Channel layout of each frame
    #[clap(long, value_enum, default_value_t = PixelLayout::Rgba)]
    layout: PixelLayout,

    /// File to write JSON lines to. If absent, lines are written to stdout
    #[clap(long)]
    output: Option<PathBuf>,

    /// Process frames as soon as they are read rather than at the frame rate.
    /// Timestamps are then derived from the frame index
    #[clap(long)]
    unpaced: bool,

    /// Size of the send output buffer.
    /// If this limit is exceeded, outputs are dropped until the consumer catches up.
    #[clap(long, default_value = "1024")]
    send_buffer_size: usize,

    /// Endpoint on which OpenMetrics flavour metrics are available. If absent, metrics are not exported
    #[clap(long, env)]
    observability_address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = Cli::parse();

    init_tracer(&TracerOptions::default()).into_diagnostic()?;

    if let Some(address) = args.observability_address {
        // Install exporter and register metrics
        PrometheusBuilder::new()
            .with_http_listener(address)
            .install()
            .into_diagnostic()?;
        describe_metrics();
    }
    component_info_metric("heart-rate", heart_rate_common::version!());

    let mut pipeline = Pipeline::new(&args.settings).into_diagnostic()?;
    let mut source = FrameReader::new(
        open_input(&args.input).await.into_diagnostic()?,
        args.width,
        args.height,
        args.layout,
    )
    .into_diagnostic()?;

    let (emitter, receiver) = delivery::channel(args.send_buffer_size);
    let sink_task_handle = tokio::spawn(delivery::run_sink(
        receiver,
        open_output(args.output.as_deref()).await.into_diagnostic()?,
    ));

    // Is used to await any sigint signals
    let mut sigint = signal(SignalKind::interrupt()).into_diagnostic()?;

    pipeline.start().into_diagnostic()?;
    run(&args, &mut pipeline, &mut source, &emitter, &mut sigint).await?;
    pipeline.stop().into_diagnostic()?;

    //  Close the channel and wait for all queued outputs to be written
    drop(emitter);
    let written = sink_task_handle.await.into_diagnostic()?.into_diagnostic()?;
    info!("Wrote {written} outputs from {} frames", source.frames_read());
    Ok(())
}

/// Runs one tick per frame until the input ends or the process is interrupted.
async fn run(
    args: &Cli,
    pipeline: &mut Pipeline,
    source: &mut FrameReader<BoxedReader>,
    emitter: &Emitter,
    sigint: &mut tokio::signal::unix::Signal,
) -> miette::Result<()> {
    let sample_rate = pipeline.layout().sample_rate;
    // Ticks are never run concurrently; if a tick overruns, later ticks are delayed.
    let mut ticker = interval(Duration::from_secs_f64(1.0 / sample_rate));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let started = Instant::now();

    loop {
        select! {
            frame = next_frame(&mut ticker, source, args.unpaced) => match frame.into_diagnostic()? {
                Some(frame) => {
                    let time = if args.unpaced {
                        ((source.frames_read() - 1) as Real * 1000.0 / sample_rate) as Timestamp
                    } else {
                        started.elapsed().as_millis() as Timestamp
                    };
                    process_frame(pipeline, emitter, time, frame)?;
                }
                None => {
                    info!("End of input");
                    return Ok(());
                }
            },
            _ = sigint.recv() => {
                info!("Interrupted");
                return Ok(());
            }
        }
    }
}

/// Waits for the next tick, unless unpaced, then reads a frame.
async fn next_frame(
    ticker: &mut Interval,
    source: &mut FrameReader<BoxedReader>,
    unpaced: bool,
) -> Result<Option<Frame>, SourceError> {
    if !unpaced {
        ticker.tick().await;
    }
    source.next_frame().await
}

#[instrument(skip_all, level = "debug", fields(time = time))]
fn process_frame(
    pipeline: &mut Pipeline,
    emitter: &Emitter,
    time: Timestamp,
    frame: Frame,
) -> miette::Result<()> {
    if let Some(output) = pipeline.process(time, frame).into_diagnostic()? {
        emitter.emit(output);
    }
    Ok(())
}

async fn open_input(path: &Path) -> std::io::Result<BoxedReader> {
    if path == Path::new("-") {
        Ok(Box::new(tokio::io::stdin()))
    } else {
        Ok(Box::new(tokio::fs::File::open(path).await?))
    }
}

async fn open_output(path: Option<&Path>) -> std::io::Result<BoxedWriter> {
    match path {
        Some(path) => Ok(Box::new(tokio::fs::File::create(path).await?)),
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

fn describe_metrics() {
    describe_counter!(
        FRAMES_RECEIVED,
        metrics::Unit::Count,
        "Number of frames received"
    );
    describe_counter!(
        MEASUREMENTS_EMITTED,
        metrics::Unit::Count,
        "Number of measurements handed to the consumer"
    );
    describe_counter!(
        BEATS_DETECTED,
        metrics::Unit::Count,
        "Number of beats detected"
    );
    describe_counter!(
        FAILURES,
        metrics::Unit::Count,
        "Number of failures encountered"
    );
    describe_gauge!(
        LAST_HEART_RATE,
        "Heart rate estimated on the most recent tick, in beats per minute"
    );
}
