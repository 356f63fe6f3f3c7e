//! Call Classifier Module
//! 
//! Maps raw active-call records to trunk labels.

pub mod classify;
pub mod extension;

pub use classify::{
    CallClassifier, ClassifiedBatch, ClassifiedCall, Classification, SkipReason,
    INTERNAL_EXTENSION, INTERNAL_RECORDING, INTERNAL_VOICE_MAIL,
};
pub use extension::{Extension, ExtensionParser, ParsedExtension};
