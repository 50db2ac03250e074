//! In-process fan-out of progress events.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::events::ProgressEvent;

/// Sink for progress events.
///
/// Publishing never blocks and never fails; events nobody listens to are
/// dropped.
pub trait ProgressPublisher: Send + Sync {
    fn publish(&self, event: ProgressEvent);
}

struct Topic {
    sender: broadcast::Sender<ProgressEvent>,
    history: Vec<ProgressEvent>,
}

/// Per-job broadcast topics with replayable history.
pub struct ProgressHub {
    topics: Mutex<HashMap<String, Topic>>,
    capacity: usize,
}

impl ProgressHub {
    /// Create a hub whose live channels buffer `capacity` events per job.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn new_topic(&self) -> Topic {
        let (sender, _) = broadcast::channel(self.capacity);
        Topic {
            sender,
            history: Vec::new(),
        }
    }

    /// Subscribe to a job's events.
    ///
    /// The subscription first yields every event published so far, then
    /// live events, and ends after the `complete` event.
    pub fn subscribe(&self, job_id: &str) -> Subscription {
        let mut topics = match self.topics.lock() {
            Ok(topics) => topics,
            Err(poisoned) => poisoned.into_inner(),
        };
        let topic = topics
            .entry(job_id.to_string())
            .or_insert_with(|| self.new_topic());

        let finished = topic.history.iter().any(ProgressEvent::is_complete);
        Subscription {
            backlog: topic.history.iter().cloned().collect(),
            receiver: if finished {
                None
            } else {
                Some(topic.sender.subscribe())
            },
            done: false,
        }
    }

    /// Events published for a job so far.
    pub fn history(&self, job_id: &str) -> Vec<ProgressEvent> {
        self.topics
            .lock()
            .ok()
            .and_then(|topics| topics.get(job_id).map(|t| t.history.clone()))
            .unwrap_or_default()
    }

    /// Drop a job's topic. Live subscribers see the end of the stream.
    pub fn remove(&self, job_id: &str) -> bool {
        match self.topics.lock() {
            Ok(mut topics) => topics.remove(job_id).is_some(),
            Err(_) => false,
        }
    }

    pub fn topic_count(&self) -> usize {
        self.topics.lock().map(|t| t.len()).unwrap_or(0)
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ProgressPublisher for ProgressHub {
    fn publish(&self, event: ProgressEvent) {
        let mut topics = match self.topics.lock() {
            Ok(topics) => topics,
            Err(poisoned) => poisoned.into_inner(),
        };
        let topic = topics
            .entry(event.job_id().to_string())
            .or_insert_with(|| self.new_topic());

        debug!(job_id = %event.job_id(), kind = event.kind(), "Publishing progress event");
        topic.history.push(event.clone());
        // No receivers is fine
        let _ = topic.sender.send(event);
    }
}

/// Ordered stream of one job's events.
pub struct Subscription {
    backlog: VecDeque<ProgressEvent>,
    receiver: Option<broadcast::Receiver<ProgressEvent>>,
    done: bool,
}

impl Subscription {
    /// Next event, or `None` once the job's `complete` event was yielded
    /// or the topic was removed.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        if self.done {
            return None;
        }

        let event = match self.backlog.pop_front() {
            Some(event) => event,
            None => self.recv().await?,
        };
        if event.is_complete() {
            self.done = true;
            self.receiver = None;
        }
        Some(event)
    }

    async fn recv(&mut self) -> Option<ProgressEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Progress subscriber lagged, skipped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FileOutcome, FileTask, Job, JobStatus};
    use chrono::Utc;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    fn complete(job_id: &str) -> ProgressEvent {
        ProgressEvent::complete(&Job {
            job_id: job_id.to_string(),
            files: vec![FileTask {
                original_name: "A.pdf".to_string(),
                source_path: PathBuf::from("/staging/a.pdf"),
                outcome: FileOutcome::succeeded("A.docx"),
            }],
            status: JobStatus::Completed,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            output_dir: PathBuf::from("/outputs"),
        })
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = ProgressHub::new(4);
        hub.publish(ProgressEvent::progress("job-1", None, 0, 1));
        assert_eq!(hub.history("job-1").len(), 1);
        assert!(hub.history("job-2").is_empty());
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_history_then_live() {
        let hub = Arc::new(ProgressHub::new(4));
        hub.publish(ProgressEvent::progress("job-1", None, 0, 1));
        hub.publish(ProgressEvent::progress("job-1", Some("A.pdf"), 0, 1));

        let mut sub = hub.subscribe("job-1");

        let publisher = Arc::clone(&hub);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            publisher.publish(ProgressEvent::progress("job-1", Some("A.pdf"), 1, 1));
            publisher.publish(complete("job-1"));
        });

        let mut currents = Vec::new();
        let mut last = None;
        while let Some(event) = sub.next().await {
            if let ProgressEvent::Progress { current, .. } = &event {
                currents.push(*current);
            }
            last = Some(event);
        }
        assert_eq!(currents, vec![0, 0, 1]);
        assert!(last.unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_subscribe_after_complete_replays_and_ends() {
        let hub = ProgressHub::new(4);
        hub.publish(ProgressEvent::progress("job-1", None, 0, 1));
        hub.publish(complete("job-1"));

        let mut sub = hub.subscribe("job-1");
        assert!(!sub.next().await.unwrap().is_complete());
        assert!(sub.next().await.unwrap().is_complete());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let hub = ProgressHub::new(4);
        let mut sub = hub.subscribe("job-1");
        hub.publish(ProgressEvent::progress("job-2", None, 0, 1));
        hub.publish(complete("job-1"));

        let event = sub.next().await.unwrap();
        assert_eq!(event.job_id(), "job-1");
        assert!(event.is_complete());
    }

    #[tokio::test]
    async fn test_remove_ends_subscription() {
        let hub = ProgressHub::new(4);
        let mut sub = hub.subscribe("job-1");
        assert_eq!(hub.topic_count(), 1);

        assert!(hub.remove("job-1"));
        assert!(sub.next().await.is_none());
        assert_eq!(hub.topic_count(), 0);
    }
}
