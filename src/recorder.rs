use std::sync::{Arc, Mutex};

use crate::error::RecordingError;

/// Target capture rate; the device rate is decimated towards it.
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// A finished recording, ready to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAudio {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub file_name: String,
}

impl RecordedAudio {
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Result<Self, RecordingError> {
        if samples.is_empty() {
            return Err(RecordingError::Empty);
        }
        Ok(Self {
            bytes: samples_to_wav(samples, sample_rate)?,
            mime: "audio/wav".into(),
            file_name: "recorded_audio.wav".into(),
        })
    }
}

/// One microphone recording. Samples accumulate between `start` and
/// `stop`; stopping hands them back as a WAV file.
pub struct AudioRecordingSession {
    buffer: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
    #[cfg(feature = "microphone")]
    stream: Option<cpal::Stream>,
}

impl AudioRecordingSession {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate: TARGET_SAMPLE_RATE,
            #[cfg(feature = "microphone")]
            stream: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        #[cfg(feature = "microphone")]
        {
            self.stream.is_some()
        }
        #[cfg(not(feature = "microphone"))]
        {
            false
        }
    }

    /// Begin capturing from the default input device, discarding any
    /// previous samples.
    pub fn start(&mut self) -> Result<(), RecordingError> {
        self.buffer.lock().unwrap().clear();
        #[cfg(feature = "microphone")]
        {
            let (stream, rate) = capture::start(self.buffer.clone())?;
            self.sample_rate = rate;
            self.stream = Some(stream);
            log::info!("Recording started at {rate}Hz");
            Ok(())
        }
        #[cfg(not(feature = "microphone"))]
        {
            Err(RecordingError::Device(
                "built without microphone support".into(),
            ))
        }
    }

    /// Append already captured interleaved frames.
    pub fn push_frames(&self, data: &[f32], channels: usize, decimation: usize) {
        let mono = downmix(data, channels, decimation);
        self.buffer.lock().unwrap().extend(mono);
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    pub fn duration_secs(&self) -> f32 {
        self.buffer.lock().unwrap().len() as f32 / self.sample_rate as f32
    }

    /// Stop capturing and encode what was recorded.
    pub fn stop(&mut self) -> Result<RecordedAudio, RecordingError> {
        #[cfg(feature = "microphone")]
        {
            // dropping the stream stops the device
            self.stream = None;
        }
        let samples = std::mem::take(&mut *self.buffer.lock().unwrap());
        log::info!(
            "Recording stopped: {} samples at {}Hz",
            samples.len(),
            self.sample_rate
        );
        RecordedAudio::from_samples(&samples, self.sample_rate)
    }
}

impl Default for AudioRecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Average interleaved frames down to mono, keeping every `decimation`-th
/// frame.
pub fn downmix(data: &[f32], channels: usize, decimation: usize) -> Vec<f32> {
    let channels = channels.max(1);
    let decimation = decimation.max(1);
    data.chunks(channels)
        .step_by(decimation)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Convert f32 samples to WAV bytes (mono 16-bit PCM).
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, RecordingError> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &s in samples {
        let clamped = s.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

#[cfg(feature = "microphone")]
mod capture {
    use std::sync::{Arc, Mutex};

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    use super::{downmix, TARGET_SAMPLE_RATE};
    use crate::error::RecordingError;

    fn device_error(e: impl std::fmt::Display) -> RecordingError {
        RecordingError::Device(e.to_string())
    }

    /// Open the default input device, preferring native 16kHz mono.
    pub(super) fn start(
        buffer: Arc<Mutex<Vec<f32>>>,
    ) -> Result<(cpal::Stream, u32), RecordingError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(RecordingError::NoDevice)?;
        log::info!("Input device: {:?}", device.description());

        let supported: Vec<_> = device
            .supported_input_configs()
            .map_err(device_error)?
            .collect();
        let desired = supported.iter().find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= TARGET_SAMPLE_RATE
                && c.max_sample_rate() >= TARGET_SAMPLE_RATE
                && c.sample_format() == cpal::SampleFormat::F32
        });

        let (config, rate, decimation) = match desired {
            Some(cfg) => (cfg.with_sample_rate(TARGET_SAMPLE_RATE).config(), TARGET_SAMPLE_RATE, 1),
            None => {
                let default_config = device.default_input_config().map_err(device_error)?;
                let native = default_config.sample_rate();
                let factor = (native / TARGET_SAMPLE_RATE).max(1);
                log::info!("Using native rate {native}Hz, decimating by {factor}x");
                (default_config.config(), native / factor, factor as usize)
            }
        };
        let channels = config.channels as usize;

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    buffer
                        .lock()
                        .unwrap()
                        .extend(downmix(data, channels, decimation));
                },
                |err| log::error!("Input stream error: {err}"),
                None,
            )
            .map_err(device_error)?;
        stream.play().map_err(device_error)?;
        Ok((stream, rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_and_decimates() {
        let stereo = [0.25, 0.75, 1.0, 0.0, -0.5, -0.5, 0.5, 0.5];
        assert_eq!(downmix(&stereo, 2, 1), vec![0.5, 0.5, -0.5, 0.5]);
        assert_eq!(downmix(&stereo, 2, 2), vec![0.5, -0.5]);
        assert_eq!(downmix(&[0.125, 0.25], 0, 0), vec![0.125, 0.25]);
    }

    #[test]
    fn wav_encoding_is_mono_pcm16() {
        let bytes = samples_to_wav(&[0.0, 1.0, -2.0], 16000).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!((spec.channels, spec.sample_rate, spec.bits_per_sample), (1, 16000, 16));
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, i16::MAX, -i16::MAX]);
    }

    #[test]
    fn session_stop_encodes_pushed_frames() {
        let mut session = AudioRecordingSession::new();
        session.push_frames(&[0.5; 8000], 1, 1);
        assert_eq!(session.duration_secs(), 0.5);

        let audio = session.stop().unwrap();
        assert_eq!(audio.mime, "audio/wav");
        assert_eq!(audio.file_name, "recorded_audio.wav");
        assert_eq!(&audio.bytes[..4], b"RIFF");

        assert!(matches!(session.stop(), Err(RecordingError::Empty)));
    }
}
