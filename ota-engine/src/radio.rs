// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicBool, Ordering};

/// Wireless subsystem as seen by the update engine.
///
/// Sessions are refused while a scan runs, flash access stalls the CPU long enough to
/// break radio timing. This is a precondition check only: nothing waits for the scan
/// to end, the client retries later.
pub trait RadioScan {
    fn scan_active(&self) -> bool;
}

/// Flag owned by the radio task, set for the duration of a scan.
impl RadioScan for AtomicBool {
    fn scan_active(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<T: RadioScan + ?Sized> RadioScan for &T {
    fn scan_active(&self) -> bool {
        (**self).scan_active()
    }
}

/// For devices without a radio.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRadio;

impl RadioScan for NoRadio {
    fn scan_active(&self) -> bool {
        false
    }
}
