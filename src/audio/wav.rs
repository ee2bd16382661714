//! WAV container boundary and corpus file discovery.
//!
//! Only integer PCM up to 16 bits is accepted; anything else is reported as
//! [`MergeError::IncompatibleFormat`] instead of being converted silently.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{MergeError, Result};

use super::buffer::{AudioSpec, SampleBuffer};

/// Decode the `.wav` file at `path` into a [`SampleBuffer`].
pub fn load_audio(path: &Path) -> Result<SampleBuffer> {
    let wav_err = |source| MergeError::Wav {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = WavReader::open(path).map_err(wav_err)?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample > 16 {
        return Err(MergeError::IncompatibleFormat {
            left: format!(
                "{} ({:?}, {} bit)",
                path.display(),
                spec.sample_format,
                spec.bits_per_sample
            ),
            right: "integer PCM up to 16 bit".into(),
        });
    }

    let samples = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<i16>, _>>()
        .map_err(wav_err)?;

    SampleBuffer::with_spec(
        samples,
        AudioSpec::new(spec.channels, spec.sample_rate, spec.bits_per_sample),
    )
}

/// Encode `buffer` as integer PCM at `path`, overwriting any existing file.
pub fn save_audio(buffer: &SampleBuffer, path: &Path) -> Result<()> {
    let wav_err = |source| MergeError::Wav {
        path: path.to_path_buf(),
        source,
    };

    let spec = WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        // hound only writes byte-aligned integer containers
        bits_per_sample: if buffer.bit_depth() <= 8 { 8 } else { 16 },
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(wav_err)?;
    for &sample in buffer.samples() {
        writer.write_sample(sample).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)?;

    log::debug!("wrote {} ({buffer})", path.display());
    Ok(())
}

/// List the `.wav` files directly inside `directory`, skipping hidden
/// (dot-prefixed) entries such as macOS `._` resource forks.
///
/// The result is sorted by file name so that a seeded run picks the same
/// files regardless of directory iteration order.
pub fn list_candidate_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source| MergeError::Io {
        path: directory.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if is_candidate(&path) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(MergeError::EmptyCorpus(format!(
            "no .wav files in {}",
            directory.display()
        )));
    }

    files.sort();
    Ok(files)
}

fn is_candidate(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.'));
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

    !hidden && is_wav && path.is_file()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tone;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_preserves_samples_and_format() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("tone.wav");

        let original = tone(440.0, 0.1, 0.3, AudioSpec::new(2, 22_050, 16));
        save_audio(&original, &path).expect("save");
        let loaded = load_audio(&path).expect("load");

        assert_eq!(loaded, original);
    }

    #[test]
    fn float_wav_is_rejected() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.5_f32).unwrap();
        writer.finalize().unwrap();

        let err = load_audio(&path).unwrap_err();
        assert!(matches!(err, MergeError::IncompatibleFormat { .. }), "{err}");
    }

    #[test]
    fn missing_file_is_wav_error() {
        let dir = tempdir().expect("temp dir");
        let err = load_audio(&dir.path().join("nope.wav")).unwrap_err();
        assert!(matches!(err, MergeError::Wav { .. }), "{err}");
    }

    #[test]
    fn candidates_skip_hidden_and_non_wav_files() {
        let dir = tempdir().expect("temp dir");
        let buf = tone(220.0, 0.05, 0.2, AudioSpec::new(1, 8_000, 16));
        save_audio(&buf, &dir.path().join("b.wav")).unwrap();
        save_audio(&buf, &dir.path().join("A.WAV")).unwrap();
        save_audio(&buf, &dir.path().join("._b.wav")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested.wav")).unwrap();

        let files = list_candidate_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.WAV", "b.wav"]);
    }

    #[test]
    fn empty_directory_is_empty_corpus() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join(".hidden.wav"), "x").unwrap();
        let err = list_candidate_files(dir.path()).unwrap_err();
        assert!(matches!(err, MergeError::EmptyCorpus(_)), "{err}");
    }
}
