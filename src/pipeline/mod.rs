//! Pipeline stages behind each conversion route.
//!
//! Each submodule wraps exactly one codec or collaborator so the dispatcher
//! in [`crate::convert`] only decides *which* stage runs, never *how*.
//!
//! ## Routes
//!
//! ```text
//! image  ──▶ input ──▶ raster::decode ──▶ raster::encode         (png / jpeg)
//! images ──▶ input ──▶ raster::decode ──▶ pdf::PdfBuilder        (one pdf)
//! docx   ──▶ input ──▶ markup (extract) ──▶ render (paginate)   (pdf)
//! pdf    ──▶ input ──▶ docx::placeholder_docx                    (docx stub)
//! ```
//!
//! 1. [`input`]  — read queued bytes and check magic numbers
//! 2. [`raster`] — sniff, decode and re-encode raster images
//! 3. [`pdf`]    — assemble PDF documents from image or text pages
//! 4. [`markup`] — DOCX → simplified HTML-like markup
//! 5. [`render`] — markup → paginated PDF
//! 6. [`docx`]   — write the placeholder DOCX for PDF input

pub mod docx;
pub mod input;
pub mod markup;
pub mod pdf;
pub mod raster;
pub mod render;
