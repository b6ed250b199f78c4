//! Call-site resolution for intercepted operations.
//!
//! Every context carries a human-readable description of where in the call
//! stack the operation originated. The resolver strips its own frames and
//! the engine frames that invoked it, leaving the caller's frames.
//!
//! Capturing native backtraces is gated behind the `native-backtrace`
//! feature; without it the description is the empty string, which is also
//! the worst-case result when symbolication yields nothing usable.

/// Frames whose symbol names contain any of these fragments belong to the
/// resolver or to the engine's own dispatch machinery.
#[cfg(feature = "native-backtrace")]
const ENGINE_FRAME_MARKERS: &[&str] = &["vigil_engine::", "std::backtrace", "core::ops::function"];

/// Maximum number of caller frames retained in the description.
#[cfg(feature = "native-backtrace")]
const MAX_FRAMES: usize = 8;

/// Produces a multi-line description of the current call site.
///
/// Pure and synchronous; never fails. Returns an empty string when no
/// caller frame can be identified or the feature is disabled.
#[cfg(feature = "native-backtrace")]
pub fn call_site() -> String {
    let trace = std::backtrace::Backtrace::force_capture().to_string();

    let mut frames: Vec<&str> = Vec::new();
    let mut skipping = true;
    for line in trace.lines() {
        let is_frame_header = line
            .trim_start()
            .split(':')
            .next()
            .is_some_and(|n| n.chars().all(|c| c.is_ascii_digit()) && !n.is_empty());

        if is_frame_header {
            let engine_frame = ENGINE_FRAME_MARKERS.iter().any(|m| line.contains(m));
            skipping = engine_frame;
            if skipping {
                continue;
            }
            if frames.len() >= MAX_FRAMES * 2 {
                break;
            }
            frames.push(line.trim_end());
        } else if !skipping && !frames.is_empty() {
            // Location line attached to the previous frame header.
            frames.push(line.trim_end());
        }
    }

    frames.join("\n")
}

/// Produces a multi-line description of the current call site.
///
/// The `native-backtrace` feature is disabled, so this is always empty.
#[cfg(not(feature = "native-backtrace"))]
pub fn call_site() -> String {
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_site_never_panics() {
        // Contract: no failure mode, worst case empty string.
        let _ = call_site();
    }

    #[cfg(feature = "native-backtrace")]
    #[test]
    fn call_site_excludes_engine_frames() {
        let site = call_site();
        for marker in ENGINE_FRAME_MARKERS {
            for line in site.lines().filter(|l| {
                l.trim_start()
                    .split(':')
                    .next()
                    .is_some_and(|n| n.chars().all(|c| c.is_ascii_digit()) && !n.is_empty())
            }) {
                assert!(!line.contains(marker), "engine frame leaked: {line}");
            }
        }
    }
}
