//! Graphics bundle accumulation.

use std::path::{Path, PathBuf};

use crate::config::MarkupConfig;
use crate::error::TransferError;
use crate::types::{AcquisitionResult, AssetDescriptor, AssetSource};

/// Accumulates chapters into one bundle document
///
/// Each chapter contributes a heading, one centered block per fragment and a
/// page break; [`MarkupSink::finish`] appends the trailer once.
#[derive(Debug)]
pub struct MarkupSink {
    layout: MarkupConfig,
    document: String,
    chapters: u32,
}

impl MarkupSink {
    /// Start an empty bundle
    pub fn new(layout: &MarkupConfig) -> Self {
        Self {
            layout: layout.clone(),
            document: String::new(),
            chapters: 0,
        }
    }

    /// Append chapter `unit` with its fragments, in ordinal order.
    pub fn acquire(
        &mut self,
        unit: u32,
        title: &str,
        descriptors: &[AssetDescriptor],
    ) -> Vec<AcquisitionResult> {
        self.document.push_str(
            &self
                .layout
                .heading
                .replace("{no}", &unit.to_string())
                .replace("{name}", &escape_text(title)),
        );

        let mut ordered: Vec<&AssetDescriptor> = descriptors.iter().collect();
        ordered.sort_by_key(|descriptor| descriptor.ordinal);

        let results = ordered
            .into_iter()
            .map(|descriptor| match &descriptor.source {
                AssetSource::Fragment(fragment) => {
                    let before = self.document.len();
                    self.document.push_str(&self.layout.wrapper_open);
                    self.document.push_str(fragment);
                    self.document.push_str(&self.layout.wrapper_close);
                    AcquisitionResult::Appended {
                        ordinal: descriptor.ordinal,
                        bytes: self.document.len() - before,
                    }
                }
                AssetSource::Url(_) => AcquisitionResult::Failed {
                    ordinal: descriptor.ordinal,
                    cause: TransferError::WrongKind {
                        ordinal: descriptor.ordinal,
                        expected: "markup fragment",
                    },
                },
            })
            .collect();

        self.document.push_str(&self.layout.page_break);
        self.chapters += 1;
        results
    }

    /// Chapters appended so far
    pub fn chapters(&self) -> u32 {
        self.chapters
    }

    /// Close the bundle with the trailer and return the document
    pub fn finish(mut self) -> String {
        self.document.push_str(&self.layout.trailer);
        self.document
    }

    /// Bundle file location inside `dir`
    pub fn output_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.layout.output_file)
    }
}

/// Chapter titles are plain text taken from an input's value
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
