//! Call Classification
//!
//! Rules, in order:
//! 1. only `Talking` calls count;
//! 2. a `PlayFile` caller is a recording leg;
//! 3. a callee mentioning `VoiceMail` is labelled from the caller alone;
//! 4. otherwise the caller, then the callee, may name the trunk when its
//!    id has the trunk-id length (the callee wins when both qualify).

use super::extension::{ExtensionParser, ParsedExtension};
use crate::error::ParseError;
use crate::pabx::{ActiveCallRecord, CallStatus};
use serde::Serialize;
use tracing::warn;

pub const INTERNAL_RECORDING: &str = "INTERNAL_RECORDING";
pub const INTERNAL_VOICE_MAIL: &str = "INTERNAL_VOICE_MAIL";
pub const INTERNAL_EXTENSION: &str = "INTERNAL_EXTENSION";

const RECORDING_CALLER: &str = "PlayFile";
const VOICE_MAIL_MARKER: &str = "VoiceMail";

/// Voice-mail legs always use a 5-digit trunk id, whatever the configured length
const VOICE_MAIL_TRUNK_ID_LENGTH: usize = 5;

/// A talking call with its trunk label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedCall {
    pub id: i64,
    pub caller: String,
    pub callee: String,
    pub trunk_name: String,
}

/// Why a record did not make it into the tally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotTalking(CallStatus),
    Unparsable(ParseError),
}

/// Outcome for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Call(ClassifiedCall),
    Skipped(SkipReason),
}

impl Classification {
    pub fn call(self) -> Option<ClassifiedCall> {
        match self {
            Classification::Call(call) => Some(call),
            Classification::Skipped(_) => None,
        }
    }
}

/// Result of classifying one tick's records
#[derive(Debug, Clone, Default)]
pub struct ClassifiedBatch {
    pub calls: Vec<ClassifiedCall>,
    pub not_talking: usize,
    pub unparsable: usize,
}

/// Stateless classifier; holds only the compiled pattern and trunk-id length
#[derive(Debug, Clone)]
pub struct CallClassifier {
    parser: ExtensionParser,
    trunk_id_length: usize,
}

impl CallClassifier {
    pub fn new(trunk_id_length: usize) -> Self {
        Self {
            parser: ExtensionParser::new(),
            trunk_id_length,
        }
    }

    pub fn trunk_id_length(&self) -> usize {
        self.trunk_id_length
    }

    /// Classify one record. Never fails: malformed records come back as
    /// [`SkipReason::Unparsable`].
    pub fn classify(&self, record: &ActiveCallRecord) -> Classification {
        if record.status != CallStatus::Talking {
            return Classification::Skipped(SkipReason::NotTalking(record.status));
        }

        match self.trunk_name(record) {
            Ok(trunk_name) => Classification::Call(ClassifiedCall {
                id: record.id,
                caller: record.caller.clone(),
                callee: record.callee.clone(),
                trunk_name,
            }),
            Err(e) => Classification::Skipped(SkipReason::Unparsable(e)),
        }
    }

    fn trunk_name(&self, record: &ActiveCallRecord) -> Result<String, ParseError> {
        if record.caller == RECORDING_CALLER {
            return Ok(INTERNAL_RECORDING.to_string());
        }

        if record.callee.contains(VOICE_MAIL_MARKER) {
            let caller = self.parse(&record.caller)?;
            let trunk = trunk_label(&caller, VOICE_MAIL_TRUNK_ID_LENGTH)
                .unwrap_or(INTERNAL_VOICE_MAIL);
            return Ok(trunk.to_string());
        }

        let caller = self.parse(&record.caller)?;
        let callee = self.parse(&record.callee)?;

        let mut trunk = INTERNAL_EXTENSION;
        if let Some(name) = trunk_label(&caller, self.trunk_id_length) {
            trunk = name;
        }
        if let Some(name) = trunk_label(&callee, self.trunk_id_length) {
            trunk = name;
        }

        Ok(trunk.to_string())
    }

    fn parse(&self, raw: &str) -> Result<ParsedExtension, ParseError> {
        self.parser
            .parse(raw)
            .parsed()
            .ok_or_else(|| ParseError::Extension { raw: raw.to_string() })
    }

    /// Classify a tick's worth of records, logging every unparsable one
    pub fn classify_all(&self, records: &[ActiveCallRecord]) -> ClassifiedBatch {
        let mut batch = ClassifiedBatch::default();

        for record in records {
            match self.classify(record) {
                Classification::Call(call) => batch.calls.push(call),
                Classification::Skipped(SkipReason::NotTalking(_)) => batch.not_talking += 1,
                Classification::Skipped(SkipReason::Unparsable(e)) => {
                    warn!(
                        call_id = record.id,
                        caller = %record.caller,
                        callee = %record.callee,
                        error = %e,
                        "Dropping active call with unrecognised caller/callee"
                    );
                    batch.unparsable += 1;
                }
            }
        }

        batch
    }
}

/// The extension's name when its id has the trunk length
fn trunk_label(extension: &ParsedExtension, trunk_id_length: usize) -> Option<&str> {
    if extension.id_len() == trunk_id_length {
        extension.name.as_deref()
    } else {
        None
    }
}
