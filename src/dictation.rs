//! Optional speech-to-text capability for intake.
//!
//! Intake never depends on dictation. A source either reports that it cannot
//! dictate, or yields a finite run of transcripts once. `capture_once` takes
//! the source by value, so a finished capture cannot be restarted.

use std::io::BufRead;

use crate::models::IntakeDraft;

pub trait Dictation {
    type Transcripts: Iterator<Item = String>;

    fn supports_dictation(&self) -> bool;

    /// Start capturing. Transcripts are produced lazily as the caller pulls.
    fn capture_once(self) -> Self::Transcripts;
}

/// Host without speech capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDictation;

impl Dictation for NoDictation {
    type Transcripts = std::iter::Empty<String>;

    fn supports_dictation(&self) -> bool {
        false
    }

    fn capture_once(self) -> Self::Transcripts {
        std::iter::empty()
    }
}

/// Treats each non-blank line of a reader as one transcript, e.g. piped
/// output from an external recognizer. Ends at EOF or on a read error.
pub struct LineDictation<R> {
    reader: R,
}

impl<R: BufRead> LineDictation<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Dictation for LineDictation<R> {
    type Transcripts = LineTranscripts<R>;

    fn supports_dictation(&self) -> bool {
        true
    }

    fn capture_once(self) -> Self::Transcripts {
        LineTranscripts {
            reader: Some(self.reader),
        }
    }
}

pub struct LineTranscripts<R> {
    reader: Option<R>,
}

impl<R: BufRead> Iterator for LineTranscripts<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) if line.trim().is_empty() => continue,
                Ok(_) => return Some(line.trim().to_string()),
                Err(e) => {
                    tracing::warn!(error = %e, "Dictation input failed, stopping capture");
                    break;
                }
            }
        }
        self.reader = None;
        None
    }
}

/// Run one capture from `source` into the draft's narrative.
/// Returns the number of transcripts appended (0 when unsupported).
pub fn dictate<D: Dictation>(draft: &mut IntakeDraft, source: D) -> usize {
    if !source.supports_dictation() {
        tracing::info!("Dictation unavailable, continuing with typed intake");
        return 0;
    }

    let mut appended = 0;
    for transcript in source.capture_once() {
        draft.append_transcript(&transcript);
        appended += 1;
    }
    appended
}
