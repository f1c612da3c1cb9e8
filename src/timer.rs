use anyhow::Result;
use smithay_client_toolkit::reexports::calloop::{
    timer::{TimeoutAction, Timer},
    LoopHandle, RegistrationToken,
};
use std::time::Duration;

/// Recurring event-loop timer. Runs from `start` until `stop` or drop.
pub struct Ticker<D> {
    handle: LoopHandle<'static, D>,
    interval: Duration,
    token: Option<RegistrationToken>,
}

impl<D> Ticker<D> {
    pub fn new(handle: LoopHandle<'static, D>, interval: Duration) -> Self {
        Self {
            handle,
            interval,
            token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    pub fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            self.handle.remove(token);
        }
    }
}

impl<D: 'static> Ticker<D> {
    /// Calls `on_tick` every interval, first one interval from now.
    pub fn start<F>(&mut self, mut on_tick: F) -> Result<()>
    where
        F: FnMut(&mut D) + 'static,
    {
        self.stop();
        let interval = self.interval;
        let token = self
            .handle
            .insert_source(Timer::from_duration(interval), move |_deadline, _, data| {
                on_tick(data);
                TimeoutAction::ToDuration(interval)
            })
            .map_err(|err| anyhow::anyhow!("insert timer source: {}", err.error))?;
        self.token = Some(token);
        Ok(())
    }
}

impl<D> Drop for Ticker<D> {
    fn drop(&mut self) {
        self.stop();
    }
}
