// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for page flip tracking.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::flip::{FlipEvent, PageFlip};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn one_flip_at_a_time() {
    let flip = PageFlip::new();
    flip.queue(FlipEvent { cookie: 1 }).unwrap();
    assert!(flip.is_pending());
    assert_eq!(
        flip.queue(FlipEvent { cookie: 2 }),
        Err(FlipEvent { cookie: 2 })
    );
    assert_eq!(flip.take(), Some(FlipEvent { cookie: 1 }));
    assert!(!flip.is_pending());
    assert_eq!(flip.take(), None);
}

#[test]
fn wait_without_flip_returns_immediately() {
    let flip = PageFlip::new();
    assert!(flip.wait(Duration::ZERO));
}

#[test]
fn wait_times_out_while_pending() {
    let flip = PageFlip::new();
    flip.queue(FlipEvent { cookie: 7 }).unwrap();
    assert!(!flip.wait(Duration::from_millis(5)));
    assert!(flip.is_pending());
}

#[test]
fn completion_wakes_waiter() {
    let flip = Arc::new(PageFlip::new());
    flip.queue(FlipEvent { cookie: 3 }).unwrap();

    let completer = {
        let flip = Arc::clone(&flip);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(2));
            flip.take()
        })
    };

    assert!(flip.wait(Duration::from_secs(5)));
    assert_eq!(completer.join().unwrap(), Some(FlipEvent { cookie: 3 }));
}
