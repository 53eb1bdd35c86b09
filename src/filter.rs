//! Echo and prompt stripping for captured shell output.
//!
//! A switch shell echoes every submitted line and prints its prompt after
//! each response. Given the raw capture and the first command that was sent,
//! [`filter_output`] finds the echo of that command, learns the prompt from
//! whatever precedes the command on the echo line, and keeps only the echo
//! line and what follows it, minus bare trailing prompts.
//!
//! This is a heuristic: it relies on the device echoing the command verbatim.
//! When the echo cannot be found the capture is returned untouched.

use log::debug;

/// Space followed by backspace, emitted by some shells while redrawing input.
const ERASE_SEQUENCE: &str = " \u{8}";

/// Returns the part of `raw` starting at the echo of `first_command`.
pub fn filter_output(raw: &str, first_command: &str) -> String {
    let mut filtered = String::new();
    let mut prompt: Option<String> = None;

    for line in raw.split('\n') {
        let line = line.replace(ERASE_SEQUENCE, "");

        if let Some(prompt) = prompt.as_deref() {
            if prompt.is_empty() || line.trim_end_matches('\r') != prompt {
                filtered.push_str(&line);
                filtered.push('\n');
            }
            continue;
        }

        if let Some(pos) = line.find(first_command) {
            let prefix = line[..pos].replace('\r', "");
            let prefix = prefix.trim().to_string();
            debug!("Find prompt='{}'", prefix);
            prompt = Some(prefix);
            filtered.push_str(&line);
            filtered.push('\n');
        }
    }

    if prompt.is_none() {
        return raw.to_string();
    }
    filtered
}
