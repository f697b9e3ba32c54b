//! Exports every plugin provides
//!
//! | Export   | Params        | Returns                                  |
//! |----------|---------------|------------------------------------------|
//! | `render` | –             | status                                   |
//! | `open`   | state bytes   | 1 when the state was taken               |
//! | `save`   | –             | 1 when handled, state via `SetReturn`    |
//! | `info`   | –             | identity via `SetReturn`                 |

use gridwell_core::ArgType;

use crate::backend::ExportSignature;

pub const RENDER: &str = "render";
pub const OPEN: &str = "open";
pub const SAVE: &str = "save";
pub const INFO: &str = "info";

/// Signatures of the four standard exports.
pub fn standard() -> Vec<ExportSignature> {
    vec![
        ExportSignature::new(RENDER, &[], Some(ArgType::Int64)),
        ExportSignature::new(OPEN, &[ArgType::Bytes], Some(ArgType::Int64)),
        ExportSignature::new(SAVE, &[], Some(ArgType::Int64)),
        ExportSignature::new(INFO, &[], None),
    ]
}

/// Find `name` among `exports`.
pub fn find<'a>(exports: &'a [ExportSignature], name: &str) -> Option<&'a ExportSignature> {
    exports.iter().find(|e| e.name == name)
}
