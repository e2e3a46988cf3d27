//! Pipeline stages for PDF-to-video generation.
//!
//! Each submodule implements one transformation step. Stages only talk to
//! each other through plain data ([`crate::document::Document`],
//! [`crate::script::Script`], file paths), so each is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ plan ──▶ ┬─ visual ────┐
//! (URL/path) (pdfium)  (script)  ├─ speech ────┼──▶ assemble
//!                                └─ character ─┘    (ffmpeg)
//! ```
//!
//! 1. [`input`]     canonicalise the user-supplied path or URL to a local file
//! 2. [`extract`]   pull the text layer and cut it into labelled sections;
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 3. [`plan`]      choose sections and turn them into timed scenes, using
//!    [`narration`] for the speech-ready text
//! 4. [`visual`]    draw one labelled diagram per scene on a [`canvas`],
//!    with [`text`] for titles and labels
//! 5. [`speech`]    synthesize narration; the only stage with network I/O
//! 6. [`character`] draw the presenter sprite and layer it onto the frame
//! 7. [`assemble`]  encode and join segments through [`media`] helpers

pub mod assemble;
pub mod canvas;
pub mod character;
pub mod extract;
pub mod input;
pub mod media;
pub mod narration;
pub mod plan;
pub mod speech;
pub mod text;
pub mod visual;
