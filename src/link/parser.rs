//! Parser activity: frames from the synchronizer into the telemetry store.

use tracing::{trace, warn};

use crate::crsf::decoder::FrameDispatcher;
use crate::crsf::sync::{FrameSynchronizer, RawFrame};
use crate::error::Result;
use crate::telemetry::TelemetryStore;

/// Decode frames until shutdown; malformed frames are logged and skipped
pub(crate) async fn run(
    mut sync: FrameSynchronizer,
    dispatcher: FrameDispatcher,
    store: TelemetryStore,
) -> Result<()> {
    loop {
        match sync.next_frame().await {
            Ok(frame) => {
                if let Err(e) = apply_frame(&dispatcher, &store, &frame) {
                    warn!(
                        error = %e,
                        address = ?frame.address(),
                        length = frame.length(),
                        frame = ?frame.body(),
                        "failed to apply frame"
                    );
                }
            }
            Err(e) if e.is_idle_line() => trace!(error = %e, "zero bytes on line"),
            Err(e) if e.is_recoverable() => warn!(error = %e, "failed validating frame"),
            Err(e) => return Err(e),
        }
    }
}

/// Decode one frame and store the result
pub(crate) fn apply_frame(
    dispatcher: &FrameDispatcher,
    store: &TelemetryStore,
    frame: &RawFrame,
) -> Result<()> {
    if let Some(update) = dispatcher.dispatch(frame.frame_type(), frame.body())? {
        trace!(?update, "applying telemetry update");
        store.apply(update);
    }
    Ok(())
}
