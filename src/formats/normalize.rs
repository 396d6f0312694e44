//! Merging format descriptors from several sources into one canonical list.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use vidresolve_cipher::TransformProgram;
use vidresolve_common::{FormatDescriptor, StreamSource};

use super::itags;
use super::raw::append_query;
use crate::error::{Error, Result};

/// Format descriptors grouped by where they came from.
#[derive(Debug, Default)]
pub struct FormatSources {
    /// Player response and legacy stream maps.
    pub inline: Vec<FormatDescriptor>,
    pub dash: Vec<FormatDescriptor>,
    pub hls: Vec<FormatDescriptor>,
}

impl FormatSources {
    /// Returns true if any source still carries a signed token.
    pub fn needs_decipher(&self) -> bool {
        self.inline
            .iter()
            .chain(&self.dash)
            .chain(&self.hls)
            .any(FormatDescriptor::needs_decipher)
    }
}

/// Produces the canonical format list.
///
/// Sources are merged generic to specific (inline, DASH, HLS) so that a more
/// specific source overrides only the fields it carries. Missing fields are
/// then filled from the itag table, signed tokens are deciphered and the list
/// is sorted best first.
#[derive(Debug, Clone, Default)]
pub struct FormatNormalizer {
    program: Option<Arc<TransformProgram>>,
    live: bool,
}

impl FormatNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program used to decipher signed tokens.
    pub fn with_program(mut self, program: Arc<TransformProgram>) -> Self {
        self.program = Some(program);
        self
    }

    /// Mark every format as belonging to a live broadcast.
    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    pub fn normalize(&self, sources: FormatSources) -> Result<Vec<FormatDescriptor>> {
        let mut merged: Vec<FormatDescriptor> = Vec::new();
        let mut positions: HashMap<u32, usize> = HashMap::new();

        for format in sources
            .inline
            .into_iter()
            .chain(sources.dash)
            .chain(sources.hls)
        {
            match positions.get(&format.itag) {
                Some(&idx) => merged[idx].merge_from(format),
                None => {
                    positions.insert(format.itag, merged.len());
                    merged.push(format);
                }
            }
        }

        for format in &mut merged {
            if !itags::enrich(format) {
                debug!(itag = format.itag, "Unknown itag, keeping source fields only");
            }
            self.decipher(format)?;
            format.is_live |= self.live;
        }

        merged.sort_by(canonical_order);
        Ok(merged)
    }

    fn decipher(&self, format: &mut FormatDescriptor) -> Result<()> {
        let StreamSource::Ciphered { token, param, url } = &format.source else {
            return Ok(());
        };
        let program = self.program.as_ref().ok_or_else(|| {
            Error::malformed(
                "format",
                format!(
                    "itag {} carries a signed token but no signature transform is available",
                    format.itag
                ),
            )
        })?;

        let signature = vidresolve_cipher::decipher(program, token);
        format.source = StreamSource::Url {
            url: append_query(url, param, &signature),
        };
        Ok(())
    }
}

/// Muxed formats first, then by height, bitrate and audio bitrate
/// descending. Ties are broken by itag ascending.
pub fn canonical_order(a: &FormatDescriptor, b: &FormatDescriptor) -> Ordering {
    let muxed = |f: &FormatDescriptor| f.has_video && f.has_audio;
    muxed(b)
        .cmp(&muxed(a))
        .then_with(|| b.height.unwrap_or(0).cmp(&a.height.unwrap_or(0)))
        .then_with(|| b.bitrate.unwrap_or(0).cmp(&a.bitrate.unwrap_or(0)))
        .then_with(|| b.audio_bitrate.unwrap_or(0).cmp(&a.audio_bitrate.unwrap_or(0)))
        .then_with(|| a.itag.cmp(&b.itag))
}
