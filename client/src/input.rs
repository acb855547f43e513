use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::coords::Point;

const INPUT_BUFFER: usize = 256;

/// Pointer, wheel and touch input in container coordinates.
///
/// Events are delivered through one port regardless of which element they
/// hit, so a `PointerUp` released outside the canvas still ends a drag.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    Click(Point),
    Hover(Point),
    Wheel { delta_y: f64, at: Point },
    TouchStart(Vec<Point>),
    TouchMove(Vec<Point>),
}

/// Fan-out of input events to any number of subscribers.
pub struct InputPort {
    tx: broadcast::Sender<InputEvent>,
}

impl InputPort {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(INPUT_BUFFER);
        Self { tx }
    }

    pub fn publish(&self, event: InputEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    /// The subscription is removed when the returned value is dropped.
    pub fn subscribe(&self) -> InputSubscription {
        InputSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for InputPort {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InputSubscription {
    rx: broadcast::Receiver<InputEvent>,
}

impl InputSubscription {
    /// Next buffered event without waiting.
    pub fn try_next(&mut self) -> Option<InputEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Input subscriber lagged, skipped {} events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Wait for the next event; `None` once the port is gone.
    pub async fn next(&mut self) -> Option<InputEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Input subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_a_subscription_unsubscribes() {
        let port = InputPort::new();
        let first = port.subscribe();
        let second = port.subscribe();
        assert_eq!(port.subscriber_count(), 2);
        drop(first);
        assert_eq!(port.subscriber_count(), 1);
        drop(second);
        assert_eq!(port.subscriber_count(), 0);
        port.publish(InputEvent::PointerUp(Point::default()));
    }

    #[test]
    fn subscribers_see_events_published_after_subscribing() {
        let port = InputPort::new();
        port.publish(InputEvent::Click(Point::new(1.0, 1.0)));
        let mut sub = port.subscribe();
        port.publish(InputEvent::Hover(Point::new(2.0, 3.0)));
        port.publish(InputEvent::PointerUp(Point::new(2.0, 3.0)));
        assert_eq!(
            sub.drain(),
            vec![
                InputEvent::Hover(Point::new(2.0, 3.0)),
                InputEvent::PointerUp(Point::new(2.0, 3.0)),
            ]
        );
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn next_ends_when_port_is_dropped() {
        let port = InputPort::new();
        let mut sub = port.subscribe();
        port.publish(InputEvent::Click(Point::new(0.0, 0.0)));
        drop(port);
        assert!(sub.next().await.is_some());
        assert!(sub.next().await.is_none());
    }
}
