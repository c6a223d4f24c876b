use crate::types::Schedule;
use std::sync::Arc;
use tokio::sync::watch::{self, Sender};
use tokio_stream::wrappers::WatchStream;

/// Latest schedule list, observable by any number of subscribers.
#[derive(Debug, Clone)]
pub struct ScheduleFeed {
    sender: Arc<Sender<Vec<Schedule>>>,
}

impl ScheduleFeed {
    pub fn new(schedules: Vec<Schedule>) -> Self {
        let (sender, _) = watch::channel(schedules);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Replaces the current list, also when nobody is subscribed.
    pub fn publish(&self, schedules: Vec<Schedule>) {
        self.sender.send_replace(schedules);
    }

    #[cfg(test)]
    pub fn current(&self) -> Vec<Schedule> {
        self.sender.borrow().clone()
    }

    /// Yields the current list first, then every published one.
    pub fn subscribe(&self) -> WatchStream<Vec<Schedule>> {
        WatchStream::new(self.sender.subscribe())
    }
}
