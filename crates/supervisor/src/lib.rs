//! Gamewrap's process-tree supervisor.
//!
//! This crate implements the supervision core for gamewrap: it launches a
//! command in its own process group, registers as a child subreaper so that
//! orphaned descendants get reparented to it, and then drives the whole tree
//! through a start/run/shutdown lifecycle, forwarding the launched command's
//! exit code to the caller.
//!
//! # Theory of operation
//!
//! Everything runs on a single current-thread Tokio runtime. The
//! [`LifecycleEngine`](engine::LifecycleEngine) is one task ticking every
//! 100ms: each tick it drains exited descendants through the
//! [`Reaper`](reaper::Reaper) (never blocking, never leaving zombies) and
//! steps a small phase machine that polls a [`ProcessOracle`](oracle::ProcessOracle)
//! to decide whether the actual workload has started, is still running, or
//! has exited and left stragglers to be terminated.
//!
//! The [relay](relay) is a second task on the same thread, woken by SIGTERM
//! or SIGINT. The first request is passed through to the workload untouched;
//! every request after that kills the whole tree. Which of the two happens is
//! decided by the shared [`ExitIntent`](intent::ExitIntent) cell, the only
//! state the relay writes: process membership itself is re-enumerated fresh
//! from the oracle on every use, so the engine and the relay never need a
//! lock between them.
//!
//! Process classification ("which of these pids are the game?") is policy,
//! not supervision, and lives behind the [`ProcessOracle`](oracle::ProcessOracle)
//! trait; gamewrap's CLI provides a procfs-walking implementation.

#![warn(clippy::unwrap_used, missing_docs, rustdoc::unescaped_backticks)]
#![deny(rust_2018_idioms)]

pub mod engine;
pub mod errors;
pub mod intent;
pub mod launch;
pub mod oracle;
pub mod reaper;
pub mod relay;
pub mod sink;
pub mod subreaper;
