//! JSON API for an interactive renderer.
//!
//! The server owns one [`CurationSession`](crate::session::CurationSession)
//! behind a single lock. The renderer asks for a frame, draws it, and sends
//! edits and gestures back.
//!
//! ## Starting the Server
//!
//! ```text
//! # Start on default port 8080
//! contig-scaffolder serve asm_vs_ref.coords
//!
//! # Resume a saved session, custom port, open a browser
//! contig-scaffolder serve asm_vs_ref.coords --session session.json --port 3000 --open
//! ```
//!
//! ## API Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/api/references` | References with contig counts and workspace status |
//! | GET | `/api/frame?reference=R` | Allowed contigs, layout and draw list (422 if unavailable) |
//! | GET, PUT | `/api/settings` | Visibility thresholds, viewport, mode and camera |
//! | POST | `/api/select`, `/api/select/resolve` | Reference switch protocol |
//! | POST | `/api/camera` | Zoom, pan, drag and mode gestures |
//! | POST | `/api/reset` | Drop every workspace |
//! | GET | `/api/workspace/{reference}` | Current workspace |
//! | POST, DELETE | `/api/workspace/{reference}/modifications[/{index}]` | Record or remove edits |
//! | POST, PUT, DELETE | `/api/workspace/{reference}/groups[/{name}]` | Chromosome groups |
//! | PUT | `/api/workspace/{reference}/order`, `selection`, `uninformative` | Replace workspace fields |
//! | POST | `/api/workspace/{reference}/undo`, `save` | Undo one step, mark saved |
//! | GET, POST | `/api/session` | Save or restore the whole session |
//! | GET | `/api/export/scaffold`, `/api/export/changelog` | Downstream exports |

pub mod server;
