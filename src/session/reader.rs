//! Idle-timeout reads over the inbound queue.
//!
//! A switch never says "done". A response is considered complete once the
//! shell has been quiet for two consecutive checks separated by a grace
//! sleep, or, in expect mode, as soon as output stops and contains one of the
//! expected substrings. The poll ceiling keeps a stuck device from blocking a
//! caller forever.

use super::*;

/// Everything queued right now, without waiting.
pub(super) fn drain_available(inbound: &mut Receiver<String>) -> String {
    let mut output = String::new();
    while let Ok(chunk) = inbound.try_recv() {
        output.push_str(&chunk);
    }
    output
}

/// Polls `inbound` until it goes quiet. An empty `expects` is timing mode.
pub(super) async fn read_until_idle(
    inbound: &mut Receiver<String>,
    timing: ReadTiming,
    quiet: Duration,
    expects: &[&str],
) -> String {
    let mut output = String::new();
    let mut delayed = false;

    for _ in 0..timing.max_polls {
        tokio::time::sleep(timing.poll_interval).await;

        let new_data = drain_available(inbound);
        if !new_data.is_empty() {
            trace!("read chunk: {:?}", new_data);
            output.push_str(&new_data);
            delayed = false;
            continue;
        }

        if expects.iter().any(|expect| output.contains(expect)) {
            return output;
        }

        if delayed {
            return output;
        }
        trace!("no new data, waiting {:?} once", quiet);
        tokio::time::sleep(quiet).await;
        delayed = true;
    }

    debug!("read gave up after {} polls", timing.max_polls);
    output
}
