#![doc = "docfmt-core: the format-document pipeline for docfmt."]

//! This crate turns one "format document" command into a deterministic,
//! cancellable, all-or-nothing sequence of text edits on an open document.
//! Formatting rules, editors and notification UIs plug in through the traits in
//! [`contract`].
//!
//! # Usage
//! Build a [`dispatcher::FormatDocumentCommand`] once per session and call
//! `execute` from a job on the [`scheduler::UiExecutor`].

pub mod changes;
pub mod contract;
pub mod diff;
pub mod dispatcher;
pub mod document;
pub mod error;
pub mod memory;
pub mod notification;
pub mod options;
pub mod progress;
pub mod scheduler;
pub mod strategy;
pub mod text;
pub mod transaction;

pub use dispatcher::{CommandResult, CommandState, FormatDocumentCommand};
pub use document::{Configuration, Document, DocumentId, LanguageId};
pub use error::{ApplyError, PipelineError};
pub use text::{TextChange, TextSpan};
