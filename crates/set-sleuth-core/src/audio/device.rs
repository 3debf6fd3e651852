use crate::{
    CoreError, CoreResult,
    audio::{AudioFormat, RecordedFile, Recorder},
};

use std::{
    collections::VecDeque,
    panic::Location,
    path::PathBuf,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use cpal::{
    Device, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument};

/// Headroom kept in the sample buffer beyond the maximum recording length.
const BUFFER_SLACK_SECS: u64 = 1;

/// Desktop recorder backed by the default cpal input device.
///
/// Samples are buffered in memory while recording and written to a
/// temporary 16-bit PCM WAV file on stop.
pub struct CpalRecorder {
    device: Device,
    config: StreamConfig,
    stream: Mutex<Option<Stream>>,
    samples: Arc<Mutex<VecDeque<f32>>>,
    max_samples: usize,
    /// Signals the audio callback to stop writing. Set to `true` before
    /// dropping the stream so no in-flight callback writes after `stop()`
    /// drains the buffer.
    shutdown: Arc<AtomicBool>,
    last: Mutex<Option<RecordedFile>>,
}

fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned mutex means a previous holder panicked; the data is still usable.
    mutex.lock().unwrap_or_else(|e| {
        error!("Recorder lock poisoned, recovering: {}", e);
        e.into_inner()
    })
}

impl CpalRecorder {
    /// Opens the default input device, sizing the buffer for `max_duration`.
    ///
    /// # Errors
    ///
    /// Returns error if no input device exists or its config cannot be read.
    #[track_caller]
    #[instrument]
    pub fn new(max_duration: Duration) -> CoreResult<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or(CoreError::NoInputDevice {
                location: ErrorLocation::from(Location::caller()),
            })?;

        let config: StreamConfig = device
            .default_input_config()
            .map_err(|e| CoreError::RecordingFailed {
                reason: format!("Failed to get config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .into();

        let max_samples = config.sample_rate as usize
            * config.channels as usize
            * (max_duration.as_secs() + BUFFER_SLACK_SECS) as usize;

        info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            max_samples,
            "CpalRecorder initialized"
        );

        Ok(Self {
            device,
            config,
            stream: Mutex::new(None),
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(max_samples))),
            max_samples,
            shutdown: Arc::new(AtomicBool::new(false)),
            last: Mutex::new(None),
        })
    }
}

/// Writes `samples` as 16-bit PCM to a new temporary WAV file and returns
/// its path. Blocking; runs on the blocking pool.
#[track_caller]
pub(crate) fn write_wav_clip(
    channels: u16,
    sample_rate: u32,
    samples: &[f32],
) -> CoreResult<PathBuf> {
    let path = tempfile::Builder::new()
        .prefix("set-sleuth-clip-")
        .suffix(".wav")
        .tempfile()
        .map_err(|e| CoreError::RecordingFailed {
            reason: format!("Failed to create temporary clip: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?
        .into_temp_path()
        .keep()
        .map_err(|e| CoreError::RecordingFailed {
            reason: format!("Failed to persist temporary clip: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let map_err = |e: hound::Error| CoreError::RecordingFailed {
        reason: format!("Failed to write clip: {}", e),
        location: ErrorLocation::from(Location::caller()),
    };

    let written = hound::WavWriter::create(&path, spec)
        .map_err(map_err)
        .and_then(|mut writer| {
            for &sample in samples {
                let pcm = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer.write_sample(pcm).map_err(map_err)?;
            }
            writer.finalize().map_err(map_err)
        });

    if let Err(e) = written {
        let _ = std::fs::remove_file(&path);
        return Err(e);
    }

    Ok(path)
}

#[async_trait]
impl Recorder for CpalRecorder {
    #[instrument(skip(self))]
    async fn start(&self) -> CoreResult<()> {
        let samples = Arc::clone(&self.samples);
        let shutdown = Arc::clone(&self.shutdown);
        let max_samples = self.max_samples;

        // Reset shutdown flag and forget the previous clip
        self.shutdown.store(false, Ordering::Release);
        lock_recovering(&self.samples).clear();
        *lock_recovering(&self.last) = None;

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    let mut buf = lock_recovering(&samples);
                    buf.extend(data.iter().copied());
                    while buf.len() > max_samples {
                        buf.pop_front();
                    }
                },
                |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| CoreError::RecordingFailed {
                reason: format!("Failed to build stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        stream.play().map_err(|e| CoreError::RecordingFailed {
            reason: format!("Failed to start stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        *lock_recovering(&self.stream) = Some(stream);
        info!("Input stream started");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop(&self) -> CoreResult<RecordedFile> {
        self.shutdown.store(true, Ordering::Release);

        // Dropping the stream stops the device before the buffer is drained.
        let was_running = lock_recovering(&self.stream).take().map(drop).is_some();
        if !was_running {
            return lock_recovering(&self.last)
                .clone()
                .ok_or(CoreError::RecordingFailed {
                    reason: "Recorder is not running".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
        }

        let samples: Vec<f32> = lock_recovering(&self.samples).drain(..).collect();
        let sample_count = samples.len();
        let channels = self.config.channels;
        let sample_rate = self.config.sample_rate;

        // WAV encoding and file IO are synchronous.
        let path =
            tokio::task::spawn_blocking(move || write_wav_clip(channels, sample_rate, &samples))
                .await
                .map_err(|e| CoreError::RecordingFailed {
                    reason: format!("Clip writer task failed: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })??;

        let file = RecordedFile {
            path,
            format: AudioFormat::Wav,
        };

        debug!(path = ?file.path, sample_count, "Input stream stopped");
        *lock_recovering(&self.last) = Some(file.clone());

        Ok(file)
    }

    async fn read(&self, file: &RecordedFile) -> CoreResult<Vec<u8>> {
        tokio::fs::read(&file.path)
            .await
            .map_err(|e| CoreError::RecordingFailed {
                reason: format!("Failed to read clip {:?}: {}", file.path, e),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    fn discard(&self, file: &RecordedFile) -> CoreResult<()> {
        {
            let mut last = lock_recovering(&self.last);
            if last.as_ref() == Some(file) {
                *last = None;
            }
        }

        std::fs::remove_file(&file.path).map_err(|e| CoreError::RecordingFailed {
            reason: format!("Failed to delete clip {:?}: {}", file.path, e),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
