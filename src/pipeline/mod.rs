//! Pipeline stages for turning a document into an episode script.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the generation backend can change without touching extraction.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ (prompts) ──▶ generate
//! (URL/path) (pdfium)   (template)    (gemini / edgequake-llm)
//! ```
//!
//! 1. [`input`]    — read a local file or download a URL into memory
//! 2. [`extract`]  — pull plain text out of the PDF; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`generate`] — the [`generate::ScriptGenerator`] seam and the
//!    edgequake-llm adapter
//! 4. [`gemini`]   — the built-in Gemini REST client

pub mod extract;
pub mod gemini;
pub mod generate;
pub mod input;
