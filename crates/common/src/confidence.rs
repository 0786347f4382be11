//! Confidence scoring for format auto-detection
//!
//! Every file-based extractor scores a path with the same rules so that
//! competing candidates can be ranked against each other:
//!
//! | Evidence                                   | Confidence                |
//! |--------------------------------------------|---------------------------|
//! | single file, extension only                | 0.6                       |
//! | single file, extension + content marker    | 0.9                       |
//! | directory                                  | matching / candidates x 0.9 |
//! | directory, every candidate matches         | 0.95                      |
//! | live API, explicit credentials             | 0.7                       |
//! | live API, default credential chain         | 0.6                       |

/// Extension matches but no provider marker was found
pub const EXTENSION_ONLY: f32 = 0.6;

/// Extension matches and a provider-specific marker is present
pub const EXTENSION_AND_MARKER: f32 = 0.9;

/// Scale applied to the matching ratio of a directory scan
pub const DIRECTORY_WEIGHT: f32 = 0.9;

/// Directory where every candidate carries the marker
pub const DIRECTORY_ALL_MATCH: f32 = 0.95;

/// Live API with an explicitly configured credential source
pub const EXPLICIT_CREDENTIALS: f32 = 0.7;

/// Live API where only the default credential chain resolved
pub const DEFAULT_CREDENTIAL_CHAIN: f32 = 0.6;

/// Score a single file whose extension already matched
pub fn file_confidence(has_marker: bool) -> f32 {
    if has_marker {
        EXTENSION_AND_MARKER
    } else {
        EXTENSION_ONLY
    }
}

/// Score a directory scan
pub fn directory_confidence(matching: usize, candidates: usize) -> f32 {
    if candidates == 0 || matching == 0 {
        return 0.0;
    }
    if matching >= candidates {
        return DIRECTORY_ALL_MATCH;
    }
    (matching as f32 / candidates as f32 * DIRECTORY_WEIGHT).clamp(0.0, 1.0)
}

/// Human-readable level for a confidence value
pub fn level(confidence: f32) -> &'static str {
    match confidence {
        x if x >= 0.8 => "HIGH",
        x if x >= 0.6 => "MEDIUM",
        x if x > 0.0 => "LOW",
        _ => "NONE",
    }
}
