//! Streaming API: observe outcomes as each file resolves.
//!
//! [`crate::convert::run`] returns only once the whole queue has been
//! walked. [`run_stream`] runs the same sequential loop on a background
//! task and yields every [`ConversionOutcome`] as soon as it is recorded,
//! which is what a UI or a long batch job wants for live feedback.
//!
//! Outcomes always arrive in queue order. Dropping the stream does not
//! cancel the run: remaining files are still converted and delivered to
//! the sink.

use crate::config::{ConversionRequest, ConverterConfig};
use crate::convert::dispatch;
use crate::error::ConvertError;
use crate::output::ConversionOutcome;
use crate::queue::FileQueue;
use crate::sink::ArtifactSink;
use futures::stream::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of per-route outcomes.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = ConversionOutcome> + Send>>;

/// Start a run in the background and stream its outcomes.
///
/// Takes ownership of the queue and configuration because the run outlives
/// this call. Must be called from within a tokio runtime.
///
/// # Errors
/// [`ConvertError::InvalidConfig`] before anything is spawned.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use gr_convert::{
///     run_stream, ConversionRequest, ConverterConfig, FileQueue, InputFile, MemorySink,
///     TargetFormat,
/// };
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut queue = FileQueue::new();
/// queue.add([InputFile::from_path("photo.png")?]);
///
/// let sink = Arc::new(MemorySink::new());
/// let mut outcomes = run_stream(
///     queue,
///     ConversionRequest::new(TargetFormat::Jpeg),
///     ConverterConfig::default(),
///     sink.clone(),
/// )
/// .await?;
///
/// while let Some(outcome) = outcomes.next().await {
///     println!("{}: {}", outcome.source(), outcome.is_success());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run_stream(
    queue: FileQueue,
    request: ConversionRequest,
    config: ConverterConfig,
    sink: Arc<dyn ArtifactSink>,
) -> Result<OutcomeStream, ConvertError> {
    config.validate()?;
    info!("Starting streaming run: {} queued file(s)", queue.len());

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let forward = |outcome: &ConversionOutcome| {
            // A closed receiver only means nobody is listening any more.
            let _ = tx.send(outcome.clone());
        };
        if let Err(e) = dispatch(&queue, &request, &config, sink.as_ref(), forward).await {
            warn!("Streaming run aborted: {}", e);
        }
    });

    Ok(UnboundedReceiverStream::new(rx).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetFormat;
    use crate::queue::InputFile;
    use crate::sink::MemorySink;
    use std::io::Cursor;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([0, 128, 255, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn yields_outcomes_in_queue_order() {
        let queue: FileQueue = vec![
            InputFile::from_bytes("first.png", png(2, 2)),
            InputFile::from_bytes("broken.png", b"nope".to_vec()),
            InputFile::from_bytes("ignored.txt", b"text".to_vec()),
            InputFile::from_bytes("last.webp.png", png(3, 1)),
        ]
        .into_iter()
        .collect();
        let sink = Arc::new(MemorySink::new());

        let outcomes: Vec<_> = run_stream(
            queue,
            ConversionRequest::new(TargetFormat::Png),
            ConverterConfig::default(),
            sink.clone(),
        )
        .await
        .unwrap()
        .collect()
        .await;

        let sources: Vec<_> = outcomes.iter().map(|o| o.source()).collect();
        assert_eq!(sources, vec!["first.png", "broken.png", "last.webp.png"]);
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert_eq!(
            outcomes[2].artifact().map(|a| a.file_name.as_str()),
            Some("last_GR.png")
        );
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn invalid_config_fails_before_spawning() {
        let config = ConverterConfig {
            output_suffix: "a/b".into(),
            ..Default::default()
        };
        let result = run_stream(
            FileQueue::new(),
            ConversionRequest::new(TargetFormat::Png),
            config,
            Arc::new(MemorySink::new()),
        )
        .await;
        assert!(matches!(result, Err(ConvertError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn empty_queue_ends_immediately() {
        let stream = run_stream(
            FileQueue::new(),
            ConversionRequest::new(TargetFormat::Docx),
            ConverterConfig::default(),
            Arc::new(MemorySink::new()),
        )
        .await
        .unwrap();
        assert_eq!(stream.count().await, 0);
    }
}
