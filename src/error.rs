// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

/// The error type for this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid {field} `{value}`: expected an integer in [0, 31]")]
    InvalidConfiguration { field: &'static str, value: String },
    #[error("clock moved backwards: last {last}ms, current {current}ms")]
    ClockMovedBackwards { last: i64, current: i64 },
    #[error("clock stuck at {current}ms after the sequence of {last}ms was exhausted")]
    ClockStalled { last: i64, current: i64 },
    #[error("over the time limit")]
    OverTimeLimit,
    #[error("mutex is poisoned (i.e. a panic happened while it was locked)")]
    MutexPoisoned,
    #[error("invalid tsid length: {0}, expected 13")]
    InvalidLength(usize),
    #[error("invalid tsid character: {0:?}")]
    InvalidCharacter(char),
    #[error("tsid string overflows 64 bits")]
    Overflow,
}
