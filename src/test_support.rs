//! Signal generators shared by the unit tests.

use std::path::{Path, PathBuf};

use crate::audio::{save_audio, AudioSpec, SampleBuffer};

/// Sine tone of `secs` seconds at peak `amplitude`, identical on every
/// channel.
pub fn tone(freq: f64, secs: f64, amplitude: f64, spec: AudioSpec) -> SampleBuffer {
    let frames = (secs * f64::from(spec.sample_rate)).round() as usize;
    let ch = usize::from(spec.channels);
    let mut values = Vec::with_capacity(frames * ch);
    for i in 0..frames {
        let t = i as f64 / f64::from(spec.sample_rate);
        let v = amplitude * (2.0 * std::f64::consts::PI * freq * t).sin();
        values.extend(std::iter::repeat(v).take(ch));
    }
    SampleBuffer::from_normalized(&values, spec).expect("valid tone spec")
}

/// Constant (DC) signal; handy when exact sample values matter.
pub fn constant(value: f64, frames: usize, spec: AudioSpec) -> SampleBuffer {
    let values = vec![value; frames * usize::from(spec.channels)];
    SampleBuffer::from_normalized(&values, spec).expect("valid constant spec")
}

/// Write a tone into `dir/name` and return its path.
pub fn write_tone(dir: &Path, name: &str, freq: f64, secs: f64, amplitude: f64, spec: AudioSpec) -> PathBuf {
    let path = dir.join(name);
    save_audio(&tone(freq, secs, amplitude, spec), &path).expect("write tone");
    path
}

pub fn mono_44k() -> AudioSpec {
    AudioSpec::new(1, 44_100, 16)
}
