//! Bridge between application event handlers and a native dispatch core.
//!
//! Applications implement [`EventHandler`]. The dispatch core only knows
//! [`NativeHandle`]s. [`resolve`] turns one into the other: a handler that
//! is already native passes through, anything else gets a fresh
//! [`Adaptor`] registered with the core.
//!
//! [`Reactor`] is an event loop built on top: a default handler, a global
//! handler that sees every event, and scheduled timer tasks.
//!
//! ```no_run
//! use std::time::Duration;
//! use proton_handler::{Event, EventHandler, Handler, HandlerError, Reactor, ReactorConfig};
//!
//! struct Hello;
//!
//! impl EventHandler for Hello {
//!     fn on_reactor_init(&self, _event: &Event) -> Result<(), HandlerError> {
//!         println!("Hello, World!");
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo() -> Result<(), proton_handler::ReactorError> {
//! let reactor = Reactor::with_handler(Handler::plain(Hello), ReactorConfig::default())?;
//! reactor.schedule(Duration::from_millis(10), None)?;
//! reactor.run().await
//! # }
//! ```

pub mod handler;
pub mod native;
pub mod reactor;
pub mod resolver;
pub mod sink;

pub use handler::{Event, EventHandler, EventKind, FnHandler, Handler, HandlerError};
pub use native::{CoreError, HandleTable, HandlerSet, NativeCore, NativeHandle, NativeHandler};
pub use reactor::{ErrorPolicy, Reactor, ReactorConfig, ReactorContext, ReactorError, Task};
pub use resolver::{Adaptor, resolve};
pub use sink::{ErrorLog, ErrorSink, TracingSink};
