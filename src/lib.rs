//! A time-sorted unique ID (TSID) generator, a Snowflake-style 64-bit id with
//! worker and process partitioning.
//!
//! An id is laid out, from the most significant bit:
//!
//! | bits | field |
//! |------|-------|
//! | 1    | unused, always 0 |
//! | 41   | milliseconds since 2015-01-01T00:00:00Z |
//! | 5    | worker id |
//! | 5    | process id |
//! | 12   | sequence within the millisecond |
//!
//! ## Quickstart
//!
//! ```
//! use tsid_gen::TsidGenerator;
//!
//! let generator = TsidGenerator::new(1, 1).unwrap();
//! let id = generator.generate().unwrap();
//!
//! let [_timestamp, worker_id, process_id, _sequence] = tsid_gen::parse(id);
//! assert_eq!((worker_id, process_id), (1, 1));
//! println!("{} generated at {}", id, tsid_gen::generated_at(id));
//! ```
//!
//! ## Concurrent use
//!
//! TsidGenerator is thread safe. `clone` it before moving to another thread:
//! ```
//! use tsid_gen::TsidGenerator;
//! use std::thread;
//!
//! let generator = TsidGenerator::new(3, 7).unwrap();
//!
//! let mut children = Vec::new();
//! for _ in 0..10 {
//!     let thread_generator = generator.clone();
//!     children.push(thread::spawn(move || {
//!         println!("{}", thread_generator.generate().unwrap());
//!     }));
//! }
//!
//! for child in children {
//!     child.join().unwrap();
//! }
//! ```
//!
//! ## Configuration
//!
//! Worker and process ids are static deployment configuration; two live
//! generators must never share a pair. [`Builder::from_env`] reads them from
//! `TSID_WORKER_ID` and `TSID_PROCESS_ID`.

mod builder;
mod clock;
mod error;
mod generator;
mod tsid;

pub use builder::*;
pub use clock::*;
pub use error::*;
pub use generator::*;
pub use tsid::*;
