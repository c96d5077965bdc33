#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

/// Poll `condition` until it holds or two seconds pass
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Give workers a chance to run something that should not happen
pub fn settle() {
    thread::sleep(Duration::from_millis(50));
}
