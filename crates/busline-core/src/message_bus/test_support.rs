//! Helpers shared by the unit tests of this module.

use std::thread;
use std::time::{Duration, Instant};

/// Poll `condition` until it holds or two seconds pass
pub(crate) fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}
