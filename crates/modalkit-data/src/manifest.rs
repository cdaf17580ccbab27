use crate::error::{DataError, DataResult};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// One utterance of a NeMo manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioExample {
    /// Absolute, or relative to the manifest's directory
    pub audio_filepath: PathBuf,
    /// Seconds
    pub duration: f64,
    /// Start within the audio file, seconds
    pub offset: f64,
    pub text: Option<String>,
    pub lang: Option<String>,
    /// Every other key of the entry
    pub extra: Map<String, Value>,
}

/// A NeMo JSON-lines manifest, read lazily.
#[derive(Debug, Clone, PartialEq)]
pub struct NemoManifest {
    path: PathBuf,
    text_field: String,
    lang_field: String,
}

impl NemoManifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            text_field: "text".to_string(),
            lang_field: "lang".to_string(),
        }
    }

    /// Like [`NemoManifest::new`] but fails when the file cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> DataResult<Self> {
        let manifest = Self::new(path);
        manifest.reader()?;
        Ok(manifest)
    }

    pub fn with_fields(
        mut self,
        text_field: impl Into<String>,
        lang_field: impl Into<String>,
    ) -> Self {
        self.text_field = text_field.into();
        self.lang_field = lang_field.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text_field(&self) -> &str {
        &self.text_field
    }

    pub fn lang_field(&self) -> &str {
        &self.lang_field
    }

    /// Iterate over the entries. Blank lines are skipped.
    pub fn iter(&self) -> DataResult<ManifestIter<'_>> {
        Ok(ManifestIter {
            manifest: self,
            lines: self.reader()?.lines(),
            line: 0,
        })
    }

    /// Number of entries (non-blank lines).
    pub fn len(&self) -> DataResult<usize> {
        let mut count = 0;
        for line in self.reader()?.lines() {
            if !line.map_err(|source| self.io_error(source))?.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> DataResult<bool> {
        Ok(self.len()? == 0)
    }

    fn reader(&self) -> DataResult<BufReader<File>> {
        File::open(&self.path)
            .map(BufReader::new)
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> DataError {
        DataError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn parse_entry(&self, line: usize, raw: &str) -> DataResult<AudioExample> {
        let invalid = |reason: String| DataError::Manifest {
            path: self.path.display().to_string(),
            line,
            reason,
        };
        let mut entry: Map<String, Value> =
            serde_json::from_str(raw).map_err(|err| invalid(err.to_string()))?;

        let audio = match entry.remove("audio_filepath") {
            Some(Value::String(audio)) => PathBuf::from(audio),
            _ => return Err(invalid("missing string field 'audio_filepath'".to_string())),
        };
        let duration = entry
            .remove("duration")
            .and_then(|value| value.as_f64())
            .ok_or_else(|| invalid("missing numeric field 'duration'".to_string()))?;
        let offset = match entry.remove("offset") {
            None | Some(Value::Null) => 0.0,
            Some(value) => value
                .as_f64()
                .ok_or_else(|| invalid(format!("'offset' is not a number: {value}")))?,
        };
        let text = take_string(&mut entry, &self.text_field);
        let lang = take_string(&mut entry, &self.lang_field);

        let audio_filepath = if audio.is_relative() {
            match self.path.parent() {
                Some(dir) => dir.join(audio),
                None => audio,
            }
        } else {
            audio
        };

        Ok(AudioExample {
            audio_filepath,
            duration,
            offset,
            text,
            lang,
            extra: entry,
        })
    }
}

fn take_string(entry: &mut Map<String, Value>, key: &str) -> Option<String> {
    match entry.remove(key)? {
        Value::String(value) => Some(value),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Iterator over the entries of a [`NemoManifest`].
pub struct ManifestIter<'a> {
    manifest: &'a NemoManifest,
    lines: Lines<BufReader<File>>,
    line: usize,
}

impl Iterator for ManifestIter<'_> {
    type Item = DataResult<AudioExample>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(source) => return Some(Err(self.manifest.io_error(source))),
            };
            self.line += 1;
            if raw.trim().is_empty() {
                continue;
            }
            return Some(self.manifest.parse_entry(self.line, &raw));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_manifest(dir: &Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("manifest.json");
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    #[test]
    fn reads_entries_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            &[
                r#"{"audio_filepath": "a.wav", "duration": 1.5, "text": "hello", "lang": "en"}"#,
                "",
                r#"{"audio_filepath": "/abs/b.wav", "duration": 2, "offset": 0.5, "speaker": 3}"#,
            ],
        );
        let manifest = NemoManifest::open(&path).unwrap();

        let entries: Vec<AudioExample> = manifest.iter().unwrap().map(Result::unwrap).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(manifest.len().unwrap(), 2);

        assert_eq!(entries[0].audio_filepath, dir.path().join("a.wav"));
        assert_eq!(entries[0].duration, 1.5);
        assert_eq!(entries[0].offset, 0.0);
        assert_eq!(entries[0].text.as_deref(), Some("hello"));
        assert_eq!(entries[0].lang.as_deref(), Some("en"));

        assert_eq!(entries[1].audio_filepath, PathBuf::from("/abs/b.wav"));
        assert_eq!(entries[1].offset, 0.5);
        assert!(entries[1].text.is_none());
        assert_eq!(entries[1].extra["speaker"], 3);
    }

    #[test]
    fn custom_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            &[r#"{"audio_filepath": "a.wav", "duration": 1, "answer": "hi", "text": "ignored", "target_lang": "de"}"#],
        );
        let manifest = NemoManifest::new(&path).with_fields("answer", "target_lang");

        let entry = manifest.iter().unwrap().next().unwrap().unwrap();
        assert_eq!(entry.text.as_deref(), Some("hi"));
        assert_eq!(entry.lang.as_deref(), Some("de"));
        assert_eq!(entry.extra["text"], "ignored");
    }

    #[test]
    fn reports_line_of_invalid_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            &[
                r#"{"audio_filepath": "a.wav", "duration": 1}"#,
                r#"{"audio_filepath": "b.wav"}"#,
            ],
        );
        let manifest = NemoManifest::new(&path);

        let results: Vec<_> = manifest.iter().unwrap().collect();
        assert!(results[0].is_ok());
        match &results[1] {
            Err(DataError::Manifest { line, reason, .. }) => {
                assert_eq!(*line, 2);
                assert!(reason.contains("duration"));
            }
            other => panic!("expected manifest error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = NemoManifest::open("/nonexistent/manifest.json").unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
