//! MML note compiler for polysynth.
//!
//! Parses the compact music notation into per-channel sequencer frames.
//! Compilation is single pass and stops at the first error, which is
//! returned with its line and column and optionally reported to an
//! observer installed on the [`Compiler`].
//!
//! ```
//! let compiled = ps_mml::compile("t120 l8 cdefgab>c", 16_000).unwrap();
//! assert_eq!(compiled.map.channel(0).unwrap().len(), 8);
//! ```

mod channel;
mod compiler;
mod cursor;
mod error;

pub use compiler::{compile, Compiled, Compiler};
pub use error::{ErrorKind, ErrorObserver, ParseError};
