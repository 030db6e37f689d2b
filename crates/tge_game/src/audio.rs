//! Audio engine seam: fire-and-forget playback plus loadable, restartable sounds.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u32);

pub trait AudioEngine {
    fn play(&mut self, path: &Path);
    /// Load a sound for later `start`. Failed loads still return a handle
    /// that plays nothing.
    fn load(&mut self, path: &Path) -> SoundHandle;
    /// Restart from the beginning.
    fn start(&mut self, sound: SoundHandle, looping: bool);
    fn stop(&mut self, sound: SoundHandle);
}

struct LoadedSound {
    path: PathBuf,
    bytes: Option<Arc<[u8]>>,
    sink: Option<Sink>,
}

pub struct RodioAudio {
    // Dropping the stream silences every sink.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sounds: Vec<LoadedSound>,
}

impl RodioAudio {
    pub fn new() -> Result<Self, String> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| format!("Failed to open audio output: {e}"))?;
        log::info!("Audio output opened");
        Ok(Self {
            _stream: stream,
            handle,
            sounds: Vec::new(),
        })
    }

    fn decode(bytes: Arc<[u8]>) -> Result<Decoder<Cursor<Arc<[u8]>>>, String> {
        Decoder::new(Cursor::new(bytes)).map_err(|e| format!("Failed to decode sound: {e}"))
    }
}

impl AudioEngine for RodioAudio {
    fn play(&mut self, path: &Path) {
        log::info!("Playing sound: {}", path.display());
        let result = std::fs::read(path)
            .map_err(|e| format!("Failed to read sound {}: {e}", path.display()))
            .and_then(|bytes| Self::decode(Arc::from(bytes)))
            .and_then(|source| {
                let sink = Sink::try_new(&self.handle)
                    .map_err(|e| format!("Failed to create audio sink: {e}"))?;
                sink.append(source);
                sink.detach();
                Ok(())
            });
        if let Err(e) = result {
            log::warn!("{e}");
        }
    }

    fn load(&mut self, path: &Path) -> SoundHandle {
        log::info!("Loading sound: {}", path.display());
        let bytes = match std::fs::read(path) {
            Ok(bytes) => Some(Arc::from(bytes)),
            Err(e) => {
                log::warn!("Failed to read sound {}: {e}", path.display());
                None
            }
        };
        self.sounds.push(LoadedSound {
            path: path.to_path_buf(),
            bytes,
            sink: None,
        });
        SoundHandle((self.sounds.len() - 1) as u32)
    }

    fn start(&mut self, sound: SoundHandle, looping: bool) {
        let Some(entry) = self.sounds.get_mut(sound.0 as usize) else {
            return;
        };
        if let Some(old) = entry.sink.take() {
            old.stop();
        }
        let Some(bytes) = entry.bytes.clone() else {
            return;
        };
        let source = match Self::decode(bytes) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("{}: {e}", entry.path.display());
                return;
            }
        };
        let sink = match Sink::try_new(&self.handle) {
            Ok(sink) => sink,
            Err(e) => {
                log::warn!("Failed to create audio sink: {e}");
                return;
            }
        };
        if looping {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }
        entry.sink = Some(sink);
    }

    fn stop(&mut self, sound: SoundHandle) {
        if let Some(sink) = self
            .sounds
            .get(sound.0 as usize)
            .and_then(|entry| entry.sink.as_ref())
        {
            sink.pause();
        }
    }
}

/// Call recorded by [`SilentAudio`].
#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
pub enum AudioCall {
    Play(PathBuf),
    Load(PathBuf),
    Start(SoundHandle, bool),
    Stop(SoundHandle),
}

/// Audio engine without an output device.
#[cfg(test)]
#[derive(Default)]
pub struct SilentAudio {
    pub calls: std::rc::Rc<std::cell::RefCell<Vec<AudioCall>>>,
    /// Run when the engine is dropped.
    pub on_drop: Option<Box<dyn FnOnce()>>,
    loaded: u32,
}

#[cfg(test)]
impl Drop for SilentAudio {
    fn drop(&mut self) {
        if let Some(on_drop) = self.on_drop.take() {
            on_drop();
        }
    }
}

#[cfg(test)]
impl SilentAudio {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl AudioEngine for SilentAudio {
    fn play(&mut self, path: &Path) {
        self.calls.borrow_mut().push(AudioCall::Play(path.to_path_buf()));
    }

    fn load(&mut self, path: &Path) -> SoundHandle {
        self.calls.borrow_mut().push(AudioCall::Load(path.to_path_buf()));
        self.loaded += 1;
        SoundHandle(self.loaded - 1)
    }

    fn start(&mut self, sound: SoundHandle, looping: bool) {
        self.calls.borrow_mut().push(AudioCall::Start(sound, looping));
    }

    fn stop(&mut self, sound: SoundHandle) {
        self.calls.borrow_mut().push(AudioCall::Stop(sound));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_audio_records_calls_in_order() {
        let mut audio = SilentAudio::new();
        let calls = audio.calls.clone();
        let a = audio.load(Path::new("a.wav"));
        let b = audio.load(Path::new("b.wav"));
        audio.start(b, true);
        audio.stop(a);
        assert_eq!(a, SoundHandle(0));
        assert_eq!(b, SoundHandle(1));
        assert_eq!(
            calls.borrow().as_slice(),
            &[
                AudioCall::Load(PathBuf::from("a.wav")),
                AudioCall::Load(PathBuf::from("b.wav")),
                AudioCall::Start(SoundHandle(1), true),
                AudioCall::Stop(SoundHandle(0)),
            ]
        );
    }
}
