//! Resumable reassembly of chunked partial result sets.
//!
//! A streaming query returns its result as a sequence of [`Fragment`]s. A value may be
//! split across two fragments, and a row across many. Some fragments carry a resume
//! token, from which the query can be restarted without repeating or losing data.
//!
//! [`PartialResultStream`] stitches fragments back into [`Row`]s and transparently
//! reissues the remote call from the last resume token on transient errors.
//!
//! # Examples
//!
//! ```no_run
//! use futures::{StreamExt, stream};
//! use rowstitch::{Field, Fragment, Options, Status, Type, partial_result_stream};
//!
//! # async fn app() -> rowstitch::Result<()> {
//! let fields = vec![Field::new("id", Type::Int64), Field::new("name", Type::String)];
//!
//! let request = move |_resume_token| {
//!     stream::iter(vec![
//!         Ok::<_, Status>(
//!             Fragment::new(vec!["1".into(), "Fo".into()])
//!                 .metadata(fields.clone())
//!                 .chunked(),
//!         ),
//!         Ok(Fragment::new(vec!["o".into()]).resume_token("t1")),
//!     ])
//! };
//!
//! let mut rows = partial_result_stream(request, Options::default()).rows();
//!
//! while let Some(row) = rows.next().await {
//!     let (id, name) = row?.decode::<(i64, String)>()?;
//!     assert_eq!(id, 1);
//!     assert_eq!(name, "Foo");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Push delivery into a bounded channel, with backoff while the consumer is full:
//!
//! ```no_run
//! use futures::{StreamExt, stream};
//! use rowstitch::{Fragment, Options, Status, partial_result_stream};
//!
//! # async fn app() -> rowstitch::Result<()> {
//! let request = |_| stream::iter(Vec::<Result<Fragment, Status>>::new());
//!
//! let mut events = partial_result_stream(request, Options::from_env()).spawn(16);
//!
//! while let Some(event) = events.next().await {
//!     let _row = event?.into_row();
//! }
//! # Ok(())
//! # }
//! ```
mod common;

// Data
pub mod value;
pub mod fragment;
pub mod row;
#[cfg(feature = "json")]
pub mod json;

// Assembly
pub mod merge;
pub mod builder;
pub mod checkpoint;

// Operation
pub mod retry;
pub mod config;
pub mod stream;
#[cfg(feature = "tokio")]
pub mod forward;

mod error;


pub use value::{Field, Type, Value};
pub use fragment::{Fragment, Metadata, Stats};
pub use row::{Row, FromRow, Decode, DecodeError};
#[cfg(feature = "json")]
pub use json::{JsonOptions, JsonRow};

pub use retry::{Code, Status, RetryPolicy};
pub use config::Options;
#[doc(inline)]
pub use stream::{partial_result_stream, Event, PartialResultStream};
#[cfg(feature = "tokio")]
pub use forward::{Forward, RowReceiver};
pub use error::{Error, ErrorKind, Result, ProtocolError, BackpressureError, ClosedError};
