//! Console surface
//!
//! Line commands in, rendered updates out. Commands become
//! [`DashboardEvent`]s; every [`UiUpdate`] is printed as one or more lines.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{error, info, trace};

use crate::client::Detection;
use crate::notifications::NotificationId;
use crate::pipeline::{DetectionResult, DetectionStats, MediaFile, Modality, RenderedMedia};
use crate::shared::{DashboardEvent, UiUpdate};
use crate::storage;
use crate::stream::RecentEvent;

pub const HELP: &str = "\
Commands:
  image <path>         detect objects in an image
  video <path>         process a video
  model <path>         load a model on the server
  models               list available models
  confidence <0..1>    set the confidence threshold
  stream start|stop    start or stop the live stream
  health               check the service
  dismiss <id>         close a notification
  help                 show this help
  quit                 exit";

/// A parsed console line
#[derive(Debug, Clone)]
pub enum Command {
    Event(DashboardEvent),
    Help,
    Quit,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("invalid {what}: '{value}'")]
    InvalidArgument { what: &'static str, value: String },

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "image" => Command::Event(DashboardEvent::ImageSelected(read_media(
            "image",
            rest,
        )?)),
        "video" => Command::Event(DashboardEvent::VideoSelected(read_media(
            "video",
            rest,
        )?)),
        "model" => Command::Event(DashboardEvent::SelectModel(
            required("model", rest)?.to_string(),
        )),
        "models" => Command::Event(DashboardEvent::RefreshModels),
        "confidence" => {
            let value = required("confidence", rest)?;
            let parsed = value
                .parse::<f32>()
                .map_err(|_| CommandError::InvalidArgument {
                    what: "confidence",
                    value: value.to_string(),
                })?;
            Command::Event(DashboardEvent::SetConfidence(parsed))
        }
        "stream" => match required("stream", rest)?.to_ascii_lowercase().as_str() {
            "start" => Command::Event(DashboardEvent::StartStream),
            "stop" => Command::Event(DashboardEvent::StopStream),
            other => {
                return Err(CommandError::InvalidArgument {
                    what: "stream action",
                    value: other.to_string(),
                })
            }
        },
        "health" => Command::Event(DashboardEvent::RefreshHealth),
        "dismiss" => {
            let value = required("dismiss", rest)?;
            let id = value
                .trim_start_matches('#')
                .parse::<u64>()
                .map_err(|_| CommandError::InvalidArgument {
                    what: "notification id",
                    value: value.to_string(),
                })?;
            Command::Event(DashboardEvent::DismissNotification(NotificationId::new(id)))
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

fn required<'a>(verb: &'static str, rest: &'a str) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument(verb))
    } else {
        Ok(rest)
    }
}

fn read_media(verb: &'static str, rest: &str) -> Result<MediaFile, CommandError> {
    let path = Path::new(required(verb, rest)?);
    MediaFile::from_path(path).map_err(|source| CommandError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Prints UI updates as text
pub struct ConsoleRenderer<W: Write> {
    out: W,
    /// Annotated images are written here when set
    save_dir: Option<PathBuf>,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, save_dir: Option<PathBuf>) -> Self {
        Self { out, save_dir }
    }

    pub fn render(&mut self, update: &UiUpdate) -> io::Result<()> {
        match update {
            UiUpdate::Busy(Some(message)) => writeln!(self.out, "... {}", message)?,
            UiUpdate::Busy(None) => {}
            UiUpdate::NotificationShown(n) => writeln!(
                self.out,
                "[{}] #{} {}",
                n.severity.label(),
                n.id,
                n.message
            )?,
            UiUpdate::NotificationRetired(id) => trace!("Notification {} closed", id),
            UiUpdate::ServiceStatus(status) => writeln!(self.out, "Service: {}", status.name())?,
            UiUpdate::Models(models) if models.is_empty() => {
                writeln!(self.out, "No models found")?
            }
            UiUpdate::Models(models) => {
                writeln!(self.out, "Models:")?;
                for model in models {
                    writeln!(self.out, "  {} ({})", model.name, model.path)?;
                }
            }
            UiUpdate::PreviewShown(preview) => {
                write!(
                    self.out,
                    "Preview #{}: {} {}",
                    preview.preview_id, preview.modality, preview.file_name
                )?;
                if let Some((w, h)) = preview.dimensions {
                    write!(self.out, " ({}x{})", w, h)?;
                }
                writeln!(self.out, ", {} bytes encoded", preview.data_url.len())?;
            }
            UiUpdate::PreviewReleased {
                modality,
                preview_id,
            } => trace!("{} preview #{} released", modality, preview_id),
            UiUpdate::Result(result) => self.render_result(result)?,
            UiUpdate::Statistics(stats) => {
                writeln!(self.out, "Statistics: {}", format_stats(stats))?
            }
            UiUpdate::StreamSource(Some(url)) => writeln!(self.out, "Live stream: {}", url)?,
            UiUpdate::StreamSource(None) => writeln!(self.out, "Live stream stopped")?,
            UiUpdate::LiveStatistics(stats) => writeln!(self.out, "Live: {}", format_stats(stats))?,
            UiUpdate::RecentEvents(events) => {
                if let Some(newest) = events.first() {
                    writeln!(self.out, "  {}", format_recent(newest))?;
                }
            }
        }
        self.out.flush()
    }

    fn render_result(&mut self, result: &DetectionResult) -> io::Result<()> {
        let metrics = result.metrics();
        match result.modality() {
            Modality::Video => {
                writeln!(
                    self.out,
                    "Video processed: {} ({} frames, {} detections, {:.1} fps)",
                    result.file_name(),
                    metrics.frame_count.unwrap_or_default(),
                    metrics.total_detections,
                    metrics.fps.unwrap_or_default()
                )?;
                if let RenderedMedia::Video { url } = result.media() {
                    writeln!(self.out, "  Playback: {}", url)?;
                }
            }
            Modality::Image => {
                writeln!(
                    self.out,
                    "Image result: {} ({} detections)",
                    result.file_name(),
                    metrics.total_detections
                )?;
                for detection in result.detections() {
                    writeln!(self.out, "  {}", format_detection(detection))?;
                }
                if let RenderedMedia::Image(jpeg) = result.media() {
                    self.save_image(result.file_name(), jpeg)?;
                }
            }
        }
        Ok(())
    }

    fn save_image(&mut self, source_name: &str, jpeg: &[u8]) -> io::Result<()> {
        let Some(dir) = self.save_dir.as_deref() else {
            return Ok(());
        };
        match storage::save_annotated_image(dir, source_name, jpeg) {
            Ok(path) => {
                info!("Saved annotated image to {}", path.display());
                writeln!(self.out, "  Saved: {}", path.display())?;
            }
            Err(e) => error!("Failed to save annotated image: {}", e),
        }
        Ok(())
    }
}

fn format_stats(stats: &DetectionStats) -> String {
    format!(
        "total {} | helmets {} | vests {}",
        stats.total, stats.helmets, stats.vests
    )
}

fn format_detection(detection: &Detection) -> String {
    let mut line = format!(
        "{} {:.1}%",
        detection.label,
        detection.confidence * 100.0
    );
    if let Some([x1, y1, x2, y2]) = detection.bbox {
        line.push_str(&format!(" [{}, {}, {}, {}]", x1, y1, x2, y2));
    }
    line
}

fn format_recent(event: &RecentEvent) -> String {
    format!(
        "{} {} {:.0}%",
        clock_time(event.at),
        event.label,
        event.confidence * 100.0
    )
}

/// `HH:MM:SS` in UTC
fn clock_time(at: SystemTime) -> String {
    let secs = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
