//! Table transformations.
//!
//! Each submodule derives one side of the star schema from a raw record
//! set: `catalog` produces the songs and artists dimensions, `events`
//! produces the users and time dimensions plus the cleaned action stream,
//! and `songplays` manufactures the fact table by joining the action
//! stream back against the raw catalog.
//!
//! Everything here builds logical plans against the execution engine; no
//! module performs I/O of its own.

pub mod catalog;
pub mod events;
pub mod songplays;
