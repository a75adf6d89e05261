//! Demo programs run by the `reactord` binary.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use proton_handler::{
    ErrorPolicy, Event, EventHandler, FnHandler, Handler, HandlerError, Reactor, ReactorConfig,
    ReactorContext, ReactorError,
};

use crate::cli::{OnError, ReactorArgs};

impl From<&ReactorArgs> for ReactorConfig {
    fn from(args: &ReactorArgs) -> Self {
        ReactorConfig {
            max_handles: args.max_handles,
            on_error: match args.on_error {
                OnError::Stop => ErrorPolicy::Stop,
                OnError::Log => ErrorPolicy::Log,
            },
        }
    }
}

fn reactor_of(event: &Event) -> Result<&ReactorContext, HandlerError> {
    event
        .reactor()
        .ok_or_else(|| HandlerError::failed("event did not come from a reactor"))
}

struct Program {
    delay: Duration,
}

impl EventHandler for Program {
    fn on_reactor_init(&self, event: &Event) -> Result<(), HandlerError> {
        println!("Hello, World!");
        let task = Handler::plain(FnHandler::new(|name, _event| {
            if name == "timer_task" {
                println!("Mission accomplished!");
            }
            Ok(())
        }));
        reactor_of(event)?
            .schedule(self.delay, Some(task))
            .map_err(HandlerError::wrap)?;
        Ok(())
    }

    fn on_reactor_final(&self, _event: &Event) -> Result<(), HandlerError> {
        println!("Goodbye, World!");
        Ok(())
    }
}

/// Program prints on init and final and schedules one task. A logger in
/// the global handler sees every event, the task's included.
pub async fn global_logger(delay_ms: u64, config: ReactorConfig) -> Result<(), ReactorError> {
    let program = Program {
        delay: Duration::from_millis(delay_ms),
    };
    let mut reactor = Reactor::with_handler(Handler::plain(program), config)?;
    reactor.add_global(Handler::plain(FnHandler::new(|name, _event| {
        println!("LOG: {name}");
        Ok(())
    })))?;
    reactor.run().await
}

struct Countdown {
    remaining: AtomicU32,
    interval: Duration,
}

impl EventHandler for Countdown {
    fn on_reactor_init(&self, event: &Event) -> Result<(), HandlerError> {
        reactor_of(event)?
            .schedule(Duration::ZERO, None)
            .map_err(HandlerError::wrap)?;
        Ok(())
    }

    fn on_timer_task(&self, event: &Event) -> Result<(), HandlerError> {
        let n = self.remaining.load(Ordering::Relaxed);
        println!("{n}");
        if n > 0 {
            self.remaining.store(n - 1, Ordering::Relaxed);
            reactor_of(event)?
                .schedule(self.interval, None)
                .map_err(HandlerError::wrap)?;
        }
        Ok(())
    }
}

/// A task that reschedules itself from its own callback until zero.
pub async fn countdown(
    from: u32,
    interval_ms: u64,
    config: ReactorConfig,
) -> Result<(), ReactorError> {
    let countdown = Countdown {
        remaining: AtomicU32::new(from),
        interval: Duration::from_millis(interval_ms),
    };
    Reactor::with_handler(Handler::plain(countdown), config)?
        .run()
        .await
}
