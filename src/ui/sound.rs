/// Sound cues: short synthesized tones played through rodio.
///
///   correct  rising two-note chime
///   wrong    falling buzz
///   toggle   single tick (Level 2 selection)
///   found    fanfare (Level 3 hit)
///   miss     low thud
///   move     very short blip for cursor movement
///
/// Buffers are rendered to WAV once at startup. Without the `sound`
/// feature, or with no audio device, `SoundEngine::new()` still succeeds
/// or returns `None` and every call is a no-op.

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        correct: Arc<Vec<u8>>,
        wrong: Arc<Vec<u8>>,
        toggle: Arc<Vec<u8>>,
        found: Arc<Vec<u8>>,
        miss: Arc<Vec<u8>>,
        blip: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("no audio output, sound disabled: {e}");
                    return None;
                }
            };
            let wav = |s: Vec<f32>| Arc::new(make_wav(&s));

            Some(SoundEngine {
                _stream: stream,
                handle,
                // C5 → G5
                correct: wav(notes(&[(523.0, 0.07), (784.0, 0.14)], 0.3)),
                // Two detuned low tones, slightly sour on purpose.
                wrong: wav(notes(&[(220.0, 0.12), (196.0, 0.22)], 0.35)),
                toggle: wav(notes(&[(1319.0, 0.03)], 0.0)),
                // C5 E5 G5 C6
                found: wav(notes(&[(523.0, 0.08), (659.0, 0.08), (784.0, 0.08), (1047.0, 0.3)], 0.2)),
                miss: wav(sweep(300.0, 120.0, 0.12)),
                blip: wav(notes(&[(880.0, 0.02)], 0.0)),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            let sink = match Sink::try_new(&self.handle) {
                Ok(s) => s,
                Err(e) => {
                    log::debug!("sink unavailable: {e}");
                    return;
                }
            };
            if let Ok(src) = rodio::Decoder::new(Cursor::new(buf.as_ref().clone())) {
                sink.append(src);
                sink.detach();
            }
        }

        pub fn play_correct(&self) { self.play(&self.correct); }
        pub fn play_wrong(&self) { self.play(&self.wrong); }
        pub fn play_toggle(&self) { self.play(&self.toggle); }
        pub fn play_found(&self) { self.play(&self.found); }
        pub fn play_miss(&self) { self.play(&self.miss); }
        pub fn play_move(&self) { self.play(&self.blip); }
    }

    // ── Waveforms (mono f32) ──

    /// A run of notes, each faded out. `overtone` mixes in the octave.
    fn notes(seq: &[(f32, f32)], overtone: f32) -> Vec<f32> {
        let mut out = Vec::new();
        for &(freq, dur) in seq {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - i as f32 / n as f32;
                let wave = (t * freq * TAU).sin() * (1.0 - overtone)
                    + (t * freq * 2.0 * TAU).sin() * overtone;
                out.push(wave * env * 0.3);
            }
        }
        out
    }

    /// Linear pitch sweep from `from` Hz to `to` Hz.
    fn sweep(from: f32, to: f32, dur: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                phase += (from + (to - from) * p) / SAMPLE_RATE as f32;
                (phase * TAU).sin() * (1.0 - p) * 0.35
            })
            .collect()
    }

    // ── 16-bit PCM WAV container ──

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let data_len = samples.len() as u32 * 2;
        let mut buf = Vec::with_capacity(44 + data_len as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_len).to_le_bytes());
        buf.extend_from_slice(b"WAVEfmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&1u16.to_le_bytes()); // mono
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&16u16.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_len.to_le_bytes());

        for &s in samples {
            buf.extend_from_slice(&((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes());
        }
        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_sizes() {
            let wav = make_wav(&notes(&[(440.0, 0.01)], 0.0));
            let samples = (SAMPLE_RATE as f32 * 0.01) as usize;
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(wav.len(), 44 + samples * 2);
            assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]) as usize, samples * 2);
        }
    }
}

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_correct(&self) {}
    pub fn play_wrong(&self) {}
    pub fn play_toggle(&self) {}
    pub fn play_found(&self) {}
    pub fn play_miss(&self) {}
    pub fn play_move(&self) {}
}
