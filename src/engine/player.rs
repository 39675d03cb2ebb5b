//! Real-time audio playback using cpal
//!
//! The output stream lives on its own thread and is driven through a
//! command channel; the callback pulls frames from the shared mix bus.
//! The running flag is owned by the control side and flips as soon as
//! `suspend` or `resume` is called, before the audio thread sees the
//! command.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, Stream, StreamConfig, SupportedBufferSize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use super::error::AudioError;
use super::mixer::SharedBus;

enum PlayerCommand {
    Suspend,
    Resume,
    Shutdown,
}

/// Stream parameters negotiated with the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Real-time audio player
pub struct Player {
    sender: Sender<PlayerCommand>,
    thread: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    info: StreamInfo,
}

impl Player {
    /// Open an output device and start streaming
    ///
    /// The bus is created by `make_bus` once the device sample rate is
    /// known; the shared bus is returned alongside the player.
    pub fn start<F>(
        device_name: Option<String>,
        buffer_size: usize,
        make_bus: F,
    ) -> Result<(Self, SharedBus), AudioError>
    where
        F: FnOnce(f64) -> SharedBus + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<PlayerCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(SharedBus, StreamInfo), AudioError>>();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();

        let thread = thread::Builder::new()
            .name("chordbox-audio".into())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref(), buffer_size, make_bus, thread_running) {
                    Ok((stream, bus, info)) => {
                        if ready_tx.send(Ok((bus, info))).is_err() {
                            return;
                        }
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                run_commands(&stream, receiver);
                debug!("audio thread exiting");
            })?;

        let (bus, info) = ready_rx.recv().map_err(|_| AudioError::ThreadGone)??;
        info!(sample_rate = info.sample_rate, channels = info.channels, "audio output started");

        Ok((
            Self {
                sender,
                thread: Some(thread),
                running,
                info,
            },
            bus,
        ))
    }

    /// Negotiated stream parameters
    pub fn info(&self) -> StreamInfo {
        self.info
    }

    /// Pause the output stream; the audio clock stops advancing
    pub fn suspend(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.sender.send(PlayerCommand::Suspend);
    }

    /// Resume a suspended stream
    pub fn resume(&self) {
        self.running.store(true, Ordering::SeqCst);
        let _ = self.sender.send(PlayerCommand::Resume);
    }

    /// Check if the stream is currently paused
    pub fn is_suspended(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        let _ = self.sender.send(PlayerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Apply commands to the stream in the order they were sent
fn run_commands<S: StreamTrait>(stream: &S, receiver: Receiver<PlayerCommand>) {
    // A closed channel means the player was dropped
    for command in receiver.iter() {
        match command {
            PlayerCommand::Suspend => {
                if let Err(e) = stream.pause() {
                    warn!("failed to pause output stream: {}", e);
                }
            }
            PlayerCommand::Resume => {
                if let Err(e) = stream.play() {
                    warn!("failed to resume output stream: {}", e);
                }
            }
            PlayerCommand::Shutdown => break,
        }
    }
}

fn open_stream<F>(
    device_name: Option<&str>,
    buffer_size: usize,
    make_bus: F,
    running: Arc<AtomicBool>,
) -> Result<(Stream, SharedBus, StreamInfo), AudioError>
where
    F: FnOnce(f64) -> SharedBus,
{
    let device = find_device(device_name)?;
    if let Ok(name) = device.name() {
        debug!(device = %name, "opening output device");
    }

    let supported = device.default_output_config()?;
    let sample_format = supported.sample_format();
    let fixed_buffer = match supported.buffer_size() {
        SupportedBufferSize::Range { min, max } => {
            u32::try_from(buffer_size).ok().filter(|n| (*min..=*max).contains(n))
        }
        SupportedBufferSize::Unknown => None,
    };

    let mut stream_config: StreamConfig = supported.into();
    if let Some(frames) = fixed_buffer {
        stream_config.buffer_size = BufferSize::Fixed(frames);
    }

    let info = StreamInfo {
        sample_rate: stream_config.sample_rate.0,
        channels: stream_config.channels,
    };
    let bus = make_bus(info.sample_rate as f64);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, bus.clone(), running)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, bus.clone(), running)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, bus.clone(), running)?,
        other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
    };
    stream.play()?;

    Ok((stream, bus, info))
}

fn find_device(name: Option<&str>) -> Result<Device, AudioError> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .output_devices()?
            .find(|d| d.name().map(|n| n.contains(name)).unwrap_or(false))
            .ok_or_else(|| AudioError::DeviceNotFound(name.to_string())),
        None => host.default_output_device().ok_or(AudioError::NoDevice),
    }
}

fn build_stream<T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>>(
    device: &Device,
    config: &StreamConfig,
    bus: SharedBus,
    running: Arc<AtomicBool>,
) -> Result<Stream, AudioError> {
    let channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if !running.load(Ordering::SeqCst) {
                data.fill(T::from_sample(0.0f32));
                return;
            }

            match bus.try_lock() {
                Some(mut bus) => {
                    scratch.resize(data.len(), 0.0);
                    bus.render(&mut scratch, channels);
                    for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample(sample);
                    }
                }
                // Control side holds the bus, fill with silence
                None => data.fill(T::from_sample(0.0f32)),
            }
        },
        |err| {
            error!("audio stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device().and_then(|d| d.name().ok())
}

/// List all available output devices with their default stream parameters
pub fn list_output_devices() -> Result<Vec<(String, StreamInfo)>, AudioError> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    for device in host.output_devices()? {
        if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
            devices.push((
                name,
                StreamInfo {
                    sample_rate: config.sample_rate().0,
                    channels: config.channels(),
                },
            ));
        }
    }

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::{PauseStreamError, PlayStreamError};
    use parking_lot::Mutex;

    /// Stream stand-in that records the calls it receives
    #[derive(Default)]
    struct RecordingStream {
        calls: Mutex<Vec<&'static str>>,
    }

    impl StreamTrait for RecordingStream {
        fn play(&self) -> Result<(), PlayStreamError> {
            self.calls.lock().push("play");
            Ok(())
        }

        fn pause(&self) -> Result<(), PauseStreamError> {
            self.calls.lock().push("pause");
            Ok(())
        }
    }

    /// A player whose commands are left in the returned receiver
    fn detached_player() -> (Player, Receiver<PlayerCommand>) {
        let (sender, receiver) = mpsc::channel();
        let player = Player {
            sender,
            thread: None,
            running: Arc::new(AtomicBool::new(true)),
            info: StreamInfo {
                sample_rate: 44100,
                channels: 2,
            },
        };
        (player, receiver)
    }

    #[test]
    fn test_suspend_is_visible_before_audio_thread_runs() {
        let (player, _receiver) = detached_player();
        assert!(!player.is_suspended());

        player.suspend();
        assert!(player.is_suspended());

        player.resume();
        assert!(!player.is_suspended());
    }

    #[test]
    fn test_quick_suspend_then_resume_ends_playing() {
        let (player, receiver) = detached_player();
        player.suspend();
        if player.is_suspended() {
            player.resume();
        }
        drop(player);

        let stream = RecordingStream::default();
        run_commands(&stream, receiver);
        assert_eq!(*stream.calls.lock(), vec!["pause", "play"]);
    }

    #[test]
    fn test_shutdown_stops_command_loop() {
        let (sender, receiver) = mpsc::channel();
        sender.send(PlayerCommand::Shutdown).unwrap();
        sender.send(PlayerCommand::Suspend).unwrap();

        let stream = RecordingStream::default();
        run_commands(&stream, receiver);
        assert!(stream.calls.lock().is_empty());
    }
}
